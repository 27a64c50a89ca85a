//! SQLite storage gateway for surveys and responses
//!
//! Owns the relational schema (surveys, question_groups, questions,
//! sub_questions, responses, answers, homepage_config) and translates rows to
//! and from the records in [`crate::model`].

use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use sqlx::SqlitePool;
use std::path::Path;

pub mod db;
pub mod migrations;
pub mod models;
pub mod repository;
pub mod retry;

pub use retry::{RetryConfig, RetryPolicy};

use crate::model::{
    DateRange, HomepageConfig, LocatedQuestion, NewResponse, QuestionSnapshot, Response, Survey, SurveyDraft,
    SurveySummary,
};

/// Handle to the survey database; cheap to clone
#[derive(Debug, Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Open (creating if needed) the database file and run migrations
    pub async fn open(db_path: &Path) -> Result<Self> {
        let pool = db::connect(db_path).await?;
        db::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Fresh in-memory database with the schema applied
    pub async fn open_memory() -> Result<Self> {
        let pool = db::connect_memory().await?;
        db::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // Surveys
    pub async fn create_survey(&self, draft: &SurveyDraft) -> Result<Survey> {
        repository::surveys::insert(&self.pool, draft).await
    }

    pub async fn get_survey(&self, id: &str) -> Result<Option<Survey>> {
        repository::surveys::get(&self.pool, id).await
    }

    pub async fn list_surveys(&self) -> Result<Vec<Survey>> {
        repository::surveys::list(&self.pool).await
    }

    pub async fn replace_survey(&self, id: &str, draft: &SurveyDraft) -> Result<Option<Survey>> {
        repository::surveys::replace(&self.pool, id, draft).await
    }

    pub async fn delete_survey(&self, id: &str) -> Result<bool> {
        repository::surveys::delete(&self.pool, id).await
    }

    pub async fn survey_summaries(&self) -> Result<Vec<SurveySummary>> {
        repository::surveys::summaries(&self.pool).await
    }

    pub async fn find_question(&self, question_id: &str) -> Result<Option<LocatedQuestion>> {
        repository::surveys::find_question(&self.pool, question_id).await
    }

    // Responses
    pub async fn create_response(
        &self,
        response: &NewResponse,
        snapshot: Option<&QuestionSnapshot>,
    ) -> Result<Response> {
        repository::responses::insert(&self.pool, response, snapshot).await
    }

    pub async fn create_response_at(
        &self,
        response: &NewResponse,
        snapshot: Option<&QuestionSnapshot>,
        submitted_at: DateTime<Utc>,
    ) -> Result<Response> {
        repository::responses::insert_at(&self.pool, response, snapshot, submitted_at).await
    }

    pub async fn get_response(&self, id: &str) -> Result<Option<Response>> {
        repository::responses::get(&self.pool, id).await
    }

    pub async fn list_responses(&self, survey_id: Option<&str>) -> Result<Vec<Response>> {
        repository::responses::list(&self.pool, survey_id).await
    }

    pub async fn delete_response(&self, id: &str) -> Result<bool> {
        repository::responses::delete(&self.pool, id).await
    }

    pub async fn delete_responses(&self, survey_id: &str, range: &DateRange, timezone: Tz) -> Result<u64> {
        repository::responses::delete_in_range(&self.pool, survey_id, range, timezone).await
    }

    // Homepage
    pub async fn homepage_config(&self) -> Result<HomepageConfig> {
        repository::homepage::get(&self.pool).await
    }

    pub async fn set_homepage_config(&self, config: &HomepageConfig) -> Result<()> {
        repository::homepage::put(&self.pool, config).await
    }
}
