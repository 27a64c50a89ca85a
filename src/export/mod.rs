//! Response export: reconciles a survey's current structure with the answers
//! collected over time and writes one workbook sheet per patient type

pub mod descriptors;
mod formatting;
pub mod helpers;
pub mod table;
mod workbook;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::model::{DateRange, LocatedQuestion, Response, Survey};
use crate::storage::{RetryPolicy, Storage};
use descriptors::{QuestionCatalog, build_descriptors};
use helpers::export_filename;

pub use descriptors::{Descriptor, DescriptorSource, resolve_descriptor};
pub use table::{Cell, ExportStats, ExportTable, Sheet};
pub use workbook::write_workbook;

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Seoul;
pub const DEFAULT_COLUMN_WIDTH: f64 = 20.0;

/// Extra patient-info question shown as a leading column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientInfoQuestion {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub timezone: Tz,
    pub column_width: f64,
    pub patient_info_questions: Vec<PatientInfoQuestion>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE,
            column_width: DEFAULT_COLUMN_WIDTH,
            patient_info_questions: Vec::new(),
        }
    }
}

/// Reads the exporter needs from the store
#[async_trait]
pub trait ExportSource: Send + Sync {
    async fn survey(&self, survey_id: &str) -> Result<Option<Survey>>;

    async fn responses(&self, survey_id: &str) -> Result<Vec<Response>>;

    /// Question by id across all surveys
    async fn question(&self, question_id: &str) -> Result<Option<LocatedQuestion>>;
}

#[async_trait]
impl ExportSource for Storage {
    async fn survey(&self, survey_id: &str) -> Result<Option<Survey>> {
        self.get_survey(survey_id).await
    }

    async fn responses(&self, survey_id: &str) -> Result<Vec<Response>> {
        self.list_responses(Some(survey_id)).await
    }

    async fn question(&self, question_id: &str) -> Result<Option<LocatedQuestion>> {
        self.find_question(question_id).await
    }
}

/// Finished workbook plus what the download response reports about it
#[derive(Debug, Clone)]
pub struct ExportOutput {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub stats: ExportStats,
}

pub struct ResponseExporter<S> {
    source: S,
    options: ExportOptions,
    retry: RetryPolicy,
}

impl<S: ExportSource> ResponseExporter<S> {
    pub fn new(source: S, options: ExportOptions, retry: RetryPolicy) -> Self {
        Self { source, options, retry }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Reconcile a survey's responses into sheets; `None` for an unknown survey
    pub async fn build_table(&self, survey_id: &str, range: &DateRange) -> Result<Option<(Survey, ExportTable)>> {
        let source = &self.source;

        let Some(survey) = self
            .retry
            .run("Loading survey", || source.survey(survey_id))
            .await
            .with_context(|| format!("Failed to load survey {}", survey_id))?
        else {
            return Ok(None);
        };

        let all = self
            .retry
            .run("Loading responses", || source.responses(survey_id))
            .await
            .with_context(|| format!("Failed to load responses for survey {}", survey_id))?;

        let timezone = self.options.timezone;
        let responses: Vec<&Response> = all
            .iter()
            .filter(|response| range.contains(response.submitted_at, timezone))
            .collect();

        let catalog = self.load_catalog(&survey, &responses).await?;
        let descriptors = build_descriptors(&survey, &responses, &catalog);

        log::info!(
            "Export of survey {}: {} of {} responses in range, {} columns",
            survey_id,
            responses.len(),
            all.len(),
            descriptors.len()
        );

        let table = table::build_table(&responses, descriptors, &self.options);
        Ok(Some((survey, table)))
    }

    /// Build the table and serialize it to xlsx bytes
    pub async fn export(&self, survey_id: &str, range: &DateRange) -> Result<Option<ExportOutput>> {
        let Some((survey, table)) = self.build_table(survey_id, range).await? else {
            return Ok(None);
        };

        let bytes = write_workbook(&table, self.options.column_width)?;
        let today = Utc::now().with_timezone(&self.options.timezone).date_naive();

        Ok(Some(ExportOutput {
            filename: export_filename(&survey.title, range.from, range.to, today),
            bytes,
            stats: table.stats,
        }))
    }

    /// Look up answered question ids that the current structure no longer has
    async fn load_catalog(&self, survey: &Survey, responses: &[&Response]) -> Result<QuestionCatalog> {
        let current: HashSet<&str> = survey.questions().map(|(_, question)| question.id.as_str()).collect();
        let missing: HashSet<&str> = responses
            .iter()
            .flat_map(|response| response.answers.iter())
            .map(|answer| answer.question_id.as_str())
            .filter(|id| !current.contains(id))
            .collect();

        let mut catalog = QuestionCatalog::new();
        let source = &self.source;
        for question_id in missing {
            let located = self
                .retry
                .run("Looking up question", || source.question(question_id))
                .await
                .with_context(|| format!("Failed to look up question {}", question_id))?;
            if let Some(located) = located {
                catalog.insert(question_id.to_string(), located);
            } else {
                log::debug!("Question {} no longer exists in any survey", question_id);
            }
        }

        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Answer, ClosingMessage, Question, QuestionGroup, QuestionType};
    use chrono::{DateTime, NaiveDate, TimeZone};
    use std::collections::HashMap;

    struct FakeSource {
        survey: Survey,
        responses: Vec<Response>,
        catalog: HashMap<String, LocatedQuestion>,
    }

    #[async_trait]
    impl ExportSource for FakeSource {
        async fn survey(&self, survey_id: &str) -> Result<Option<Survey>> {
            Ok((self.survey.id == survey_id).then(|| self.survey.clone()))
        }

        async fn responses(&self, _survey_id: &str) -> Result<Vec<Response>> {
            Ok(self.responses.clone())
        }

        async fn question(&self, question_id: &str) -> Result<Option<LocatedQuestion>> {
            Ok(self.catalog.get(question_id).cloned())
        }
    }

    fn question(id: &str, text: &str, question_type: QuestionType, none: bool) -> Question {
        Question {
            id: id.to_string(),
            group_id: "g".to_string(),
            text: text.to_string(),
            order_index: 0,
            question_type,
            sub_questions: vec![],
            include_none_option: none,
        }
    }

    fn survey(questions: Vec<Question>) -> Survey {
        Survey {
            id: "s".to_string(),
            title: "Visit".to_string(),
            description: None,
            background_color: None,
            question_groups: vec![QuestionGroup {
                id: "g".to_string(),
                survey_id: "s".to_string(),
                title: "Service".to_string(),
                order_index: 0,
                questions,
            }],
            closing_message: ClosingMessage::default(),
            created_at: Utc::now(),
        }
    }

    fn response(id: &str, patient_type: &str, submitted_at: DateTime<Utc>, answers: Vec<Answer>) -> Response {
        Response {
            id: id.to_string(),
            survey_id: "s".to_string(),
            patient_name: None,
            patient_type: Some(patient_type.to_string()),
            patient_info_answers: None,
            submitted_at,
            answers,
            question_snapshot: None,
        }
    }

    fn exporter(source: FakeSource) -> ResponseExporter<FakeSource> {
        let options = ExportOptions {
            timezone: chrono_tz::UTC,
            ..ExportOptions::default()
        };
        ResponseExporter::new(source, options, RetryPolicy::default())
    }

    fn noon(month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, month, day, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_friendliness_and_comments() {
        let source = FakeSource {
            survey: survey(vec![
                question("q1", "Friendliness", QuestionType::Scale, false),
                question("q2", "Comments", QuestionType::Text, false),
            ]),
            responses: vec![
                response("r1", "outpatient", noon(1, 1), vec![Answer::scale("q1", None, 5), Answer::text("q2", "Great")]),
                response("r2", "ward-3", noon(1, 2), vec![Answer::scale("q1", None, 3)]),
            ],
            catalog: HashMap::new(),
        };

        let (_, table) = exporter(source)
            .build_table("s", &DateRange::unbounded())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            table.header,
            vec![
                "제출일시",
                "환자 성함",
                "환자 유형",
                "Service - Friendliness",
                "Service - Comments (주관식)"
            ]
        );
        let names: Vec<&str> = table.sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["outpatient", "ward-3"]);
        assert_eq!(table.sheets[0].rows[0][3..], [Cell::Number(5), Cell::Text("Great".to_string())]);
        assert_eq!(table.sheets[1].rows[0][3..], [Cell::Number(3), Cell::Empty]);
    }

    #[tokio::test]
    async fn test_not_applicable_cell() {
        let source = FakeSource {
            survey: survey(vec![question("q1", "Parking", QuestionType::Scale, true)]),
            responses: vec![response("r1", "checkup", noon(1, 1), vec![Answer::not_applicable("q1", None)])],
            catalog: HashMap::new(),
        };

        let (_, table) = exporter(source)
            .build_table("s", &DateRange::unbounded())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(table.sheets[0].rows[0][3].display(), "해당없음");
    }

    #[tokio::test]
    async fn test_date_filter_is_inclusive() {
        let answers = || vec![Answer::scale("q1", None, 4)];
        let source = FakeSource {
            survey: survey(vec![question("q1", "Friendliness", QuestionType::Scale, false)]),
            responses: vec![
                response("jan1", "outpatient", noon(1, 1), answers()),
                response("jan15", "outpatient", noon(1, 15), answers()),
                response("feb1", "outpatient", noon(2, 1), answers()),
            ],
            catalog: HashMap::new(),
        };

        let range = DateRange::new(NaiveDate::from_ymd_opt(2024, 1, 10), NaiveDate::from_ymd_opt(2024, 1, 31));
        let (_, table) = exporter(source).build_table("s", &range).await.unwrap().unwrap();

        assert_eq!(table.stats.total_responses, 1);
        assert_eq!(table.sheets[0].rows.len(), 1);
        assert_eq!(table.sheets[0].rows[0][0], Cell::Text("2024-01-15 12:00:00".to_string()));
    }

    #[tokio::test]
    async fn test_deleted_question_keeps_its_column() {
        let mut catalog = HashMap::new();
        catalog.insert(
            "moved".to_string(),
            LocatedQuestion {
                survey_id: "other".to_string(),
                group_title: "Other".to_string(),
                group_order: 0,
                question: question("moved", "Meals", QuestionType::Scale, false),
            },
        );
        let source = FakeSource {
            survey: survey(vec![question("q1", "Friendliness", QuestionType::Scale, false)]),
            responses: vec![response(
                "r1",
                "ward-6",
                noon(1, 1),
                vec![
                    Answer::scale("q1", None, 2),
                    Answer::scale("gone", None, 1),
                    Answer::scale("moved", None, 5),
                ],
            )],
            catalog,
        };

        let (_, table) = exporter(source)
            .build_table("s", &DateRange::unbounded())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            table.header[3..],
            ["Service - Friendliness", "Other - Meals", descriptors::DELETED_QUESTION_LABEL]
        );
        assert_eq!(
            table.sheets[0].rows[0][3..],
            [Cell::Number(2), Cell::Number(5), Cell::Number(1)]
        );
    }

    #[tokio::test]
    async fn test_unknown_survey_and_empty_survey() {
        let source = FakeSource {
            survey: Survey {
                question_groups: vec![],
                ..survey(vec![])
            },
            responses: vec![],
            catalog: HashMap::new(),
        };
        let exporter = exporter(source);

        assert!(exporter.export("nope", &DateRange::unbounded()).await.unwrap().is_none());

        let output = exporter.export("s", &DateRange::unbounded()).await.unwrap().unwrap();
        assert!(!output.bytes.is_empty());
        assert_eq!(output.stats.total_responses, 0);
        assert!(output.filename.starts_with("Visit_responses_"));
    }

    #[tokio::test]
    async fn test_export_is_idempotent() {
        let source = FakeSource {
            survey: survey(vec![question("q1", "Friendliness", QuestionType::Scale, false)]),
            responses: vec![
                response("r1", "outpatient", noon(1, 1), vec![Answer::scale("q1", None, 1)]),
                response("r2", "er", noon(1, 2), vec![Answer::scale("x", None, 1)]),
            ],
            catalog: HashMap::new(),
        };
        let exporter = exporter(source);

        let (_, first) = exporter.build_table("s", &DateRange::unbounded()).await.unwrap().unwrap();
        let (_, second) = exporter.build_table("s", &DateRange::unbounded()).await.unwrap().unwrap();
        assert_eq!(first, second);
    }
}
