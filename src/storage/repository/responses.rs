//! Repository for responses and their answers

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::model::{Answer, DateRange, NewResponse, QuestionSnapshot, Response};
use crate::storage::models::{DbAnswer, DbResponse, answer_columns};

const RESPONSE_COLUMNS: &str =
    "id, survey_id, patient_name, patient_type, patient_info_answers, question_snapshot, submitted_at";

/// Insert a response with its answers, stamped with the current time
pub async fn insert(
    pool: &SqlitePool,
    response: &NewResponse,
    snapshot: Option<&QuestionSnapshot>,
) -> Result<Response> {
    insert_at(pool, response, snapshot, Utc::now()).await
}

/// Insert a response with its answers at an explicit submission time
pub async fn insert_at(
    pool: &SqlitePool,
    response: &NewResponse,
    snapshot: Option<&QuestionSnapshot>,
    submitted_at: DateTime<Utc>,
) -> Result<Response> {
    let id = Uuid::new_v4().to_string();
    let patient_info = response
        .patient_info_answers
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .context("Failed to serialize patient info answers")?;
    let snapshot_json = snapshot
        .map(serde_json::to_string)
        .transpose()
        .context("Failed to serialize question snapshot")?;

    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    sqlx::query(
        r#"
        INSERT INTO responses
            (id, survey_id, patient_name, patient_type, patient_info_answers, question_snapshot, submitted_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&response.survey_id)
    .bind(&response.patient_name)
    .bind(&response.patient_type)
    .bind(&patient_info)
    .bind(&snapshot_json)
    .bind(submitted_at)
    .execute(&mut *tx)
    .await
    .with_context(|| format!("Failed to insert response for survey '{}'", response.survey_id))?;

    for (position, answer) in response.answers.iter().enumerate() {
        let (value, text_value) = answer_columns(&answer.value);
        sqlx::query(
            r#"
            INSERT INTO answers (response_id, question_id, sub_question_id, value, text_value, position)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&answer.question_id)
        .bind(&answer.sub_question_id)
        .bind(value)
        .bind(text_value)
        .bind(position as i64)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to insert answer for question '{}'", answer.key()))?;
    }

    tx.commit().await.context("Failed to commit transaction")?;

    log::info!(
        "Stored response {} for survey {} ({} answers)",
        id,
        response.survey_id,
        response.answers.len()
    );

    Ok(Response {
        id,
        survey_id: response.survey_id.clone(),
        patient_name: response.patient_name.clone(),
        patient_type: response.patient_type.clone(),
        patient_info_answers: response.patient_info_answers.clone(),
        submitted_at,
        answers: response.answers.clone(),
        question_snapshot: snapshot.cloned(),
    })
}

pub async fn get(pool: &SqlitePool, id: &str) -> Result<Option<Response>> {
    let row: Option<DbResponse> =
        sqlx::query_as(&format!("SELECT {} FROM responses WHERE id = ?", RESPONSE_COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
            .with_context(|| format!("Failed to get response '{}'", id))?;

    let Some(row) = row else {
        return Ok(None);
    };

    let answers: Vec<DbAnswer> = sqlx::query_as(
        r#"
        SELECT response_id, question_id, sub_question_id, value, text_value
        FROM answers WHERE response_id = ? ORDER BY position
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await
    .with_context(|| format!("Failed to load answers of response '{}'", id))?;

    Ok(Some(build_response(row, answers.into_iter().map(Into::into).collect())?))
}

/// List responses, optionally restricted to one survey, oldest first
pub async fn list(pool: &SqlitePool, survey_id: Option<&str>) -> Result<Vec<Response>> {
    let rows: Vec<DbResponse> = sqlx::query_as(&format!(
        "SELECT {} FROM responses WHERE ?1 IS NULL OR survey_id = ?1 ORDER BY submitted_at ASC, rowid ASC",
        RESPONSE_COLUMNS
    ))
    .bind(survey_id)
    .fetch_all(pool)
    .await
    .context("Failed to list responses")?;

    let answer_rows: Vec<DbAnswer> = sqlx::query_as(
        r#"
        SELECT a.response_id, a.question_id, a.sub_question_id, a.value, a.text_value
        FROM answers a
        JOIN responses r ON a.response_id = r.id
        WHERE ?1 IS NULL OR r.survey_id = ?1
        ORDER BY a.response_id, a.position
        "#,
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await
    .context("Failed to load answers")?;

    let mut answers_by_response: HashMap<String, Vec<Answer>> = HashMap::new();
    for row in answer_rows {
        answers_by_response.entry(row.response_id.clone()).or_default().push(row.into());
    }

    rows.into_iter()
        .map(|row| {
            let answers = answers_by_response.remove(&row.id).unwrap_or_default();
            build_response(row, answers)
        })
        .collect()
}

pub async fn delete(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM responses WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to delete response '{}'", id))?;

    Ok(result.rows_affected() > 0)
}

/// Delete a survey's responses whose local submission date falls inside
/// `range`. Returns how many were deleted.
pub async fn delete_in_range(pool: &SqlitePool, survey_id: &str, range: &DateRange, timezone: Tz) -> Result<u64> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    let candidates: Vec<(String, DateTime<Utc>)> =
        sqlx::query_as("SELECT id, submitted_at FROM responses WHERE survey_id = ?")
            .bind(survey_id)
            .fetch_all(&mut *tx)
            .await
            .with_context(|| format!("Failed to list responses of survey '{}'", survey_id))?;

    let mut deleted = 0;
    for (id, submitted_at) in candidates {
        if !range.contains(submitted_at, timezone) {
            continue;
        }
        let result = sqlx::query("DELETE FROM responses WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to delete response '{}'", id))?;
        deleted += result.rows_affected();
    }

    tx.commit().await.context("Failed to commit transaction")?;

    log::info!("Deleted {} responses of survey {} ({:?})", deleted, survey_id, range);
    Ok(deleted)
}

fn build_response(row: DbResponse, answers: Vec<Answer>) -> Result<Response> {
    let patient_info_answers: Option<Map<String, Value>> = row
        .patient_info_answers
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .with_context(|| format!("Invalid patient info stored for response '{}'", row.id))?;

    // A snapshot that no longer parses only costs label recovery, not the response
    let question_snapshot = row.question_snapshot.as_deref().and_then(|json| {
        serde_json::from_str::<QuestionSnapshot>(json)
            .inspect_err(|e| log::warn!("Ignoring unreadable snapshot on response {}: {}", row.id, e))
            .ok()
    });

    Ok(Response {
        id: row.id,
        survey_id: row.survey_id,
        patient_name: row.patient_name,
        patient_type: row.patient_type,
        patient_info_answers,
        submitted_at: row.submitted_at,
        answers,
        question_snapshot,
    })
}
