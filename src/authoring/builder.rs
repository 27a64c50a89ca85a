use super::{DraftError, validate_draft};
use crate::model::{
    ClosingMessage, GroupDraft, MAX_SUB_QUESTIONS, QuestionDraft, QuestionType, SubQuestionDraft, Survey, SurveyDraft,
};

/// Editable survey structure.
///
/// Groups, questions and sub-questions are addressed by their current
/// position. Mutators return `false` when the position does not exist or the
/// change is not allowed, leaving the tree untouched.
#[derive(Debug, Clone, Default)]
pub struct SurveyBuilder {
    survey_id: Option<String>,
    draft: SurveyDraft,
}

impl SurveyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Edit mode: start from a stored survey, keeping every id
    pub fn from_survey(survey: &Survey) -> Self {
        Self {
            survey_id: Some(survey.id.clone()),
            draft: SurveyDraft::from(survey),
        }
    }

    /// Id of the survey being edited, if any
    pub fn survey_id(&self) -> Option<&str> {
        self.survey_id.as_deref()
    }

    pub fn draft(&self) -> &SurveyDraft {
        &self.draft
    }

    pub fn set_title(&mut self, title: &str) {
        self.draft.title = title.to_string();
    }

    pub fn set_description(&mut self, description: Option<&str>) {
        self.draft.description = description.map(str::to_string);
    }

    pub fn set_background_color(&mut self, color: Option<&str>) {
        self.draft.background_color = color.map(str::to_string);
    }

    pub fn set_closing_message(&mut self, message: ClosingMessage) {
        self.draft.closing_message = message;
    }

    // Groups

    /// Append a group and return its position
    pub fn add_group(&mut self, title: &str) -> usize {
        self.draft.question_groups.push(GroupDraft {
            id: None,
            title: title.to_string(),
            questions: Vec::new(),
        });
        self.draft.question_groups.len() - 1
    }

    pub fn set_group_title(&mut self, group: usize, title: &str) -> bool {
        match self.draft.question_groups.get_mut(group) {
            Some(g) => {
                g.title = title.to_string();
                true
            }
            None => false,
        }
    }

    pub fn remove_group(&mut self, group: usize) -> bool {
        if group >= self.draft.question_groups.len() {
            return false;
        }
        self.draft.question_groups.remove(group);
        true
    }

    pub fn move_group_up(&mut self, group: usize) -> bool {
        move_up(&mut self.draft.question_groups, group)
    }

    pub fn move_group_down(&mut self, group: usize) -> bool {
        move_down(&mut self.draft.question_groups, group)
    }

    // Questions

    /// Append an empty question to a group and return its position
    pub fn add_question(&mut self, group: usize, question_type: QuestionType) -> Option<usize> {
        let g = self.draft.question_groups.get_mut(group)?;
        g.questions.push(QuestionDraft::new(question_type));
        Some(g.questions.len() - 1)
    }

    pub fn set_question_text(&mut self, group: usize, question: usize, text: &str) -> bool {
        match self.question_mut(group, question) {
            Some(q) => {
                q.text = text.to_string();
                true
            }
            None => false,
        }
    }

    pub fn remove_question(&mut self, group: usize, question: usize) -> bool {
        match self.draft.question_groups.get_mut(group) {
            Some(g) if question < g.questions.len() => {
                g.questions.remove(question);
                true
            }
            _ => false,
        }
    }

    pub fn move_question_up(&mut self, group: usize, question: usize) -> bool {
        self.draft
            .question_groups
            .get_mut(group)
            .is_some_and(|g| move_up(&mut g.questions, question))
    }

    pub fn move_question_down(&mut self, group: usize, question: usize) -> bool {
        self.draft
            .question_groups
            .get_mut(group)
            .is_some_and(|g| move_down(&mut g.questions, question))
    }

    /// Switching to text drops sub-questions and the not-applicable flag
    pub fn change_question_type(&mut self, group: usize, question: usize, question_type: QuestionType) -> bool {
        let Some(q) = self.question_mut(group, question) else {
            return false;
        };
        q.question_type = question_type;
        if question_type == QuestionType::Text {
            q.sub_questions.clear();
            q.include_none_option = false;
        }
        true
    }

    /// Only scale questions offer a not-applicable choice
    pub fn set_include_none_option(&mut self, group: usize, question: usize, include: bool) -> bool {
        match self.question_mut(group, question) {
            Some(q) if q.question_type == QuestionType::Scale => {
                q.include_none_option = include;
                true
            }
            _ => false,
        }
    }

    // Sub-questions

    /// Returns `false` for text questions and once the cap is reached
    pub fn add_sub_question(&mut self, group: usize, question: usize, text: &str) -> bool {
        match self.question_mut(group, question) {
            Some(q) if q.question_type == QuestionType::Scale && q.sub_questions.len() < MAX_SUB_QUESTIONS => {
                q.sub_questions.push(SubQuestionDraft {
                    id: None,
                    text: text.to_string(),
                });
                true
            }
            _ => false,
        }
    }

    pub fn set_sub_question_text(&mut self, group: usize, question: usize, sub: usize, text: &str) -> bool {
        match self.question_mut(group, question).and_then(|q| q.sub_questions.get_mut(sub)) {
            Some(s) => {
                s.text = text.to_string();
                true
            }
            None => false,
        }
    }

    pub fn remove_sub_question(&mut self, group: usize, question: usize, sub: usize) -> bool {
        match self.question_mut(group, question) {
            Some(q) if sub < q.sub_questions.len() => {
                q.sub_questions.remove(sub);
                true
            }
            _ => false,
        }
    }

    pub fn validate(&self) -> Result<(), DraftError> {
        validate_draft(&self.draft)
    }

    /// Validated draft, ready for create or replace
    pub fn into_draft(self) -> Result<SurveyDraft, DraftError> {
        self.validate()?;
        Ok(self.draft)
    }

    fn question_mut(&mut self, group: usize, question: usize) -> Option<&mut QuestionDraft> {
        self.draft.question_groups.get_mut(group)?.questions.get_mut(question)
    }
}

fn move_up<T>(items: &mut [T], index: usize) -> bool {
    if index == 0 || index >= items.len() {
        return false;
    }
    items.swap(index - 1, index);
    true
}

fn move_down<T>(items: &mut [T], index: usize) -> bool {
    if index + 1 >= items.len() {
        return false;
    }
    items.swap(index, index + 1);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> SurveyBuilder {
        let mut b = SurveyBuilder::new();
        b.set_title("Visit");
        let g = b.add_group("Service");
        let q = b.add_question(g, QuestionType::Scale).unwrap();
        b.set_question_text(g, q, "Facilities");
        b
    }

    #[test]
    fn test_sub_question_cap() {
        let mut b = builder();
        for i in 0..MAX_SUB_QUESTIONS {
            assert!(b.add_sub_question(0, 0, &format!("item {i}")));
        }
        assert!(!b.add_sub_question(0, 0, "one too many"));
        assert_eq!(b.draft().question_groups[0].questions[0].sub_questions.len(), MAX_SUB_QUESTIONS);

        assert!(b.remove_sub_question(0, 0, 0));
        assert_eq!(b.draft().question_groups[0].questions[0].sub_questions[0].text, "item 1");
    }

    #[test]
    fn test_switching_to_text_clears_scale_settings() {
        let mut b = builder();
        b.add_sub_question(0, 0, "Lobby");
        b.set_include_none_option(0, 0, true);

        assert!(b.change_question_type(0, 0, QuestionType::Text));
        let question = &b.draft().question_groups[0].questions[0];
        assert!(question.sub_questions.is_empty());
        assert!(!question.include_none_option);

        assert!(!b.add_sub_question(0, 0, "Lobby"));
        assert!(!b.set_include_none_option(0, 0, true));
    }

    #[test]
    fn test_moves() {
        let mut b = builder();
        b.add_group("Facilities");
        b.add_group("Food");

        assert!(b.move_group_up(2));
        assert!(!b.move_group_up(0));
        assert!(!b.move_group_down(2));
        let titles: Vec<&str> = b.draft().question_groups.iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, vec!["Service", "Food", "Facilities"]);

        let q = b.add_question(0, QuestionType::Text).unwrap();
        b.set_question_text(0, q, "Comments");
        assert!(b.move_question_up(0, 1));
        assert_eq!(b.draft().question_groups[0].questions[0].text, "Comments");
        assert!(!b.move_question_down(0, 1));
        assert!(!b.move_question_up(5, 0));
    }

    #[test]
    fn test_into_draft_validates() {
        let mut b = builder();
        b.add_group("");
        assert_eq!(b.clone().into_draft(), Err(DraftError::EmptyGroupTitle { group: 2 }));

        assert!(b.remove_group(1));
        let draft = b.into_draft().unwrap();
        assert_eq!(draft.question_groups.len(), 1);
        assert!(draft.question_groups[0].id.is_none());
    }

    #[test]
    fn test_edit_mode_preserves_ids() {
        use crate::model::{ClosingMessage, Question, QuestionGroup};
        use chrono::Utc;

        let survey = Survey {
            id: "s1".to_string(),
            title: "Visit".to_string(),
            description: None,
            background_color: None,
            question_groups: vec![QuestionGroup {
                id: "g1".to_string(),
                survey_id: "s1".to_string(),
                title: "Service".to_string(),
                order_index: 0,
                questions: vec![Question {
                    id: "q1".to_string(),
                    group_id: "g1".to_string(),
                    text: "Friendliness".to_string(),
                    order_index: 0,
                    question_type: QuestionType::Scale,
                    sub_questions: vec![],
                    include_none_option: true,
                }],
            }],
            closing_message: ClosingMessage::default(),
            created_at: Utc::now(),
        };

        let mut b = SurveyBuilder::from_survey(&survey);
        assert_eq!(b.survey_id(), Some("s1"));
        b.add_question(0, QuestionType::Text);
        b.set_question_text(0, 1, "Comments");

        let draft = b.into_draft().unwrap();
        let questions = &draft.question_groups[0].questions;
        assert_eq!(draft.question_groups[0].id.as_deref(), Some("g1"));
        assert_eq!(questions[0].id.as_deref(), Some("q1"));
        assert!(questions[0].include_none_option);
        assert!(questions[1].id.is_none());
    }
}
