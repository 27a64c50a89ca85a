//! Repository for surveys and their question structure

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::model::{
    ClosingMessage, GroupDraft, LocatedQuestion, Question, QuestionGroup, Survey, SurveyDraft, SurveySummary,
};
use crate::storage::models::{DbQuestion, DbQuestionGroup, DbSubQuestion, DbSurvey};

const SURVEY_COLUMNS: &str = "id, title, description, background_color, closing_message, created_at";

/// Insert a survey with its full question structure
pub async fn insert(pool: &SqlitePool, draft: &SurveyDraft) -> Result<Survey> {
    let id = Uuid::new_v4().to_string();
    let closing_message =
        serde_json::to_string(&draft.closing_message).context("Failed to serialize closing message")?;

    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    sqlx::query(
        r#"
        INSERT INTO surveys (id, title, description, background_color, closing_message, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(&draft.background_color)
    .bind(&closing_message)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await
    .with_context(|| format!("Failed to insert survey '{}'", draft.title))?;

    insert_structure(&mut tx, &id, &draft.question_groups).await?;

    tx.commit().await.context("Failed to commit transaction")?;

    log::info!("Created survey {} ({})", id, draft.title);
    get(pool, &id)
        .await?
        .with_context(|| format!("Survey '{}' missing right after insert", id))
}

/// Get a survey with groups, questions and sub-questions in order
pub async fn get(pool: &SqlitePool, id: &str) -> Result<Option<Survey>> {
    let row: Option<DbSurvey> = sqlx::query_as(&format!("SELECT {} FROM surveys WHERE id = ?", SURVEY_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get survey '{}'", id))?;

    match row {
        Some(row) => Ok(Some(assemble(pool, row).await?)),
        None => Ok(None),
    }
}

/// List all surveys, newest first
pub async fn list(pool: &SqlitePool) -> Result<Vec<Survey>> {
    let rows: Vec<DbSurvey> = sqlx::query_as(&format!(
        "SELECT {} FROM surveys ORDER BY created_at DESC, rowid DESC",
        SURVEY_COLUMNS
    ))
    .fetch_all(pool)
    .await
    .context("Failed to list surveys")?;

    let mut surveys = Vec::with_capacity(rows.len());
    for row in rows {
        surveys.push(assemble(pool, row).await?);
    }
    Ok(surveys)
}

/// Replace a survey's fields and its whole question structure.
///
/// All existing groups (and through cascade their questions and
/// sub-questions) are deleted and the draft's structure is reinserted inside
/// one transaction. Returns `None` when the survey does not exist.
pub async fn replace(pool: &SqlitePool, id: &str, draft: &SurveyDraft) -> Result<Option<Survey>> {
    let closing_message =
        serde_json::to_string(&draft.closing_message).context("Failed to serialize closing message")?;

    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    let result = sqlx::query(
        r#"
        UPDATE surveys
        SET title = ?, description = ?, background_color = ?, closing_message = ?
        WHERE id = ?
        "#,
    )
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(&draft.background_color)
    .bind(&closing_message)
    .bind(id)
    .execute(&mut *tx)
    .await
    .with_context(|| format!("Failed to update survey '{}'", id))?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    sqlx::query("DELETE FROM question_groups WHERE survey_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to clear question structure of survey '{}'", id))?;

    insert_structure(&mut tx, id, &draft.question_groups).await?;

    tx.commit().await.context("Failed to commit transaction")?;

    log::info!("Replaced survey {} ({} groups)", id, draft.question_groups.len());
    get(pool, id).await
}

/// Delete a survey; its structure and responses go with it
pub async fn delete(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM surveys WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to delete survey '{}'", id))?;

    let deleted = result.rows_affected() > 0;
    if deleted {
        log::info!("Deleted survey {}", id);
    }
    Ok(deleted)
}

/// Per-survey group, question and response counts, newest survey first
pub async fn summaries(pool: &SqlitePool) -> Result<Vec<SurveySummary>> {
    let rows: Vec<(String, String, i64, i64, i64, chrono::DateTime<Utc>)> = sqlx::query_as(
        r#"
        SELECT s.id, s.title,
            (SELECT COUNT(*) FROM question_groups g WHERE g.survey_id = s.id),
            (SELECT COUNT(*) FROM questions q JOIN question_groups g ON q.group_id = g.id WHERE g.survey_id = s.id),
            (SELECT COUNT(*) FROM responses r WHERE r.survey_id = s.id),
            s.created_at
        FROM surveys s
        ORDER BY s.created_at DESC, s.rowid DESC
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to summarize surveys")?;

    Ok(rows
        .into_iter()
        .map(|(id, title, group_count, question_count, response_count, created_at)| SurveySummary {
            id,
            title,
            group_count,
            question_count,
            response_count,
            created_at,
        })
        .collect())
}

/// Find a question by id across all surveys
pub async fn find_question(pool: &SqlitePool, question_id: &str) -> Result<Option<LocatedQuestion>> {
    let row: Option<(String, String, i64)> = sqlx::query_as(
        r#"
        SELECT g.survey_id, g.title, g.order_index
        FROM questions q
        JOIN question_groups g ON q.group_id = g.id
        WHERE q.id = ?
        "#,
    )
    .bind(question_id)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("Failed to look up question '{}'", question_id))?;

    let Some((survey_id, group_title, group_order)) = row else {
        return Ok(None);
    };

    let question: DbQuestion = sqlx::query_as(
        "SELECT id, group_id, text, order_index, type, include_none_option FROM questions WHERE id = ?",
    )
    .bind(question_id)
    .fetch_one(pool)
    .await
    .with_context(|| format!("Failed to load question '{}'", question_id))?;

    let sub_questions: Vec<DbSubQuestion> = sqlx::query_as(
        "SELECT id, question_id, text, order_index FROM sub_questions WHERE question_id = ? ORDER BY order_index",
    )
    .bind(question_id)
    .fetch_all(pool)
    .await
    .with_context(|| format!("Failed to load sub-questions of '{}'", question_id))?;

    Ok(Some(LocatedQuestion {
        survey_id,
        group_title,
        group_order,
        question: build_question(question, sub_questions.into_iter().map(Into::into).collect()),
    }))
}

async fn assemble(pool: &SqlitePool, row: DbSurvey) -> Result<Survey> {
    let closing_message: ClosingMessage = serde_json::from_str(&row.closing_message)
        .with_context(|| format!("Invalid closing message stored for survey '{}'", row.id))?;

    let groups: Vec<DbQuestionGroup> = sqlx::query_as(
        "SELECT id, survey_id, title, order_index FROM question_groups WHERE survey_id = ? ORDER BY order_index",
    )
    .bind(&row.id)
    .fetch_all(pool)
    .await
    .with_context(|| format!("Failed to load groups of survey '{}'", row.id))?;

    let questions: Vec<DbQuestion> = sqlx::query_as(
        r#"
        SELECT q.id, q.group_id, q.text, q.order_index, q.type, q.include_none_option
        FROM questions q
        JOIN question_groups g ON q.group_id = g.id
        WHERE g.survey_id = ?
        ORDER BY q.order_index
        "#,
    )
    .bind(&row.id)
    .fetch_all(pool)
    .await
    .with_context(|| format!("Failed to load questions of survey '{}'", row.id))?;

    let sub_questions: Vec<DbSubQuestion> = sqlx::query_as(
        r#"
        SELECT s.id, s.question_id, s.text, s.order_index
        FROM sub_questions s
        JOIN questions q ON s.question_id = q.id
        JOIN question_groups g ON q.group_id = g.id
        WHERE g.survey_id = ?
        ORDER BY s.order_index
        "#,
    )
    .bind(&row.id)
    .fetch_all(pool)
    .await
    .with_context(|| format!("Failed to load sub-questions of survey '{}'", row.id))?;

    let mut subs_by_question: HashMap<String, Vec<_>> = HashMap::new();
    for sub in sub_questions {
        subs_by_question.entry(sub.question_id.clone()).or_default().push(sub.into());
    }

    let mut questions_by_group: HashMap<String, Vec<Question>> = HashMap::new();
    for question in questions {
        let subs = subs_by_question.remove(&question.id).unwrap_or_default();
        questions_by_group
            .entry(question.group_id.clone())
            .or_default()
            .push(build_question(question, subs));
    }

    let question_groups = groups
        .into_iter()
        .map(|group| QuestionGroup {
            questions: questions_by_group.remove(&group.id).unwrap_or_default(),
            id: group.id,
            survey_id: group.survey_id,
            title: group.title,
            order_index: group.order_index,
        })
        .collect();

    Ok(Survey {
        id: row.id,
        title: row.title,
        description: row.description,
        background_color: row.background_color,
        question_groups,
        closing_message,
        created_at: row.created_at,
    })
}

fn build_question(row: DbQuestion, sub_questions: Vec<crate::model::SubQuestion>) -> Question {
    Question {
        question_type: row.question_type(),
        id: row.id,
        group_id: row.group_id,
        text: row.text,
        order_index: row.order_index,
        sub_questions,
        include_none_option: row.include_none_option,
    }
}

/// Insert groups, questions and sub-questions with order indexes taken
/// from their position in the draft
async fn insert_structure(tx: &mut Transaction<'_, Sqlite>, survey_id: &str, groups: &[GroupDraft]) -> Result<()> {
    let mut claimed = HashSet::new();

    for (group_index, group) in groups.iter().enumerate() {
        let group_id = claim_id(&mut **tx, "question_groups", group.id.as_deref(), &mut claimed).await?;
        sqlx::query("INSERT INTO question_groups (id, survey_id, title, order_index) VALUES (?, ?, ?, ?)")
            .bind(&group_id)
            .bind(survey_id)
            .bind(&group.title)
            .bind(group_index as i64)
            .execute(&mut **tx)
            .await
            .with_context(|| format!("Failed to insert question group '{}'", group.title))?;

        for (question_index, question) in group.questions.iter().enumerate() {
            let question_id = claim_id(&mut **tx, "questions", question.id.as_deref(), &mut claimed).await?;
            sqlx::query(
                r#"
                INSERT INTO questions (id, group_id, text, order_index, type, include_none_option)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&question_id)
            .bind(&group_id)
            .bind(&question.text)
            .bind(question_index as i64)
            .bind(question.question_type.as_str())
            .bind(question.include_none_option)
            .execute(&mut **tx)
            .await
            .with_context(|| format!("Failed to insert question '{}'", question.text))?;

            for (sub_index, sub) in question.sub_questions.iter().enumerate() {
                let sub_id = claim_id(&mut **tx, "sub_questions", sub.id.as_deref(), &mut claimed).await?;
                sqlx::query("INSERT INTO sub_questions (id, question_id, text, order_index) VALUES (?, ?, ?, ?)")
                    .bind(&sub_id)
                    .bind(&question_id)
                    .bind(&sub.text)
                    .bind(sub_index as i64)
                    .execute(&mut **tx)
                    .await
                    .with_context(|| format!("Failed to insert sub-question '{}'", sub.text))?;
            }
        }
    }

    Ok(())
}

/// Keep a requested id when it is still free, otherwise generate one
async fn claim_id(
    conn: &mut SqliteConnection,
    table: &str,
    requested: Option<&str>,
    claimed: &mut HashSet<String>,
) -> Result<String> {
    if let Some(requested) = requested.filter(|id| !id.trim().is_empty()) {
        if !claimed.contains(requested) {
            let taken: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {} WHERE id = ?", table))
                .bind(requested)
                .fetch_one(&mut *conn)
                .await
                .with_context(|| format!("Failed to check id '{}' in {}", requested, table))?;

            if taken == 0 {
                claimed.insert(requested.to_string());
                return Ok(requested.to_string());
            }
            log::warn!("Id '{}' already used in {}, generating a new one", requested, table);
        }
    }

    let id = Uuid::new_v4().to_string();
    claimed.insert(id.clone());
    Ok(id)
}
