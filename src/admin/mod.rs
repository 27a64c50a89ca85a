//! Admin shell: shared-credential gate, dashboard listing and purge

use anyhow::Result;
use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;

use crate::config::AdminSettings;
use crate::model::{DateRange, SurveySummary};
use crate::storage::Storage;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("invalid admin credentials")]
    InvalidCredentials,

    #[error("purging responses requires confirm=true")]
    ConfirmationRequired,

    #[error("date range starts after it ends")]
    InvertedRange,

    #[error("survey {0} not found")]
    SurveyNotFound(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Compares submitted credentials against the configured pair.
///
/// Keeps casual visitors out of the admin screens; it does not protect the
/// API routes themselves.
#[derive(Debug, Clone)]
pub struct AdminGate {
    identifier: String,
    secret: String,
}

impl AdminGate {
    pub fn new(identifier: &str, secret: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            secret: secret.to_string(),
        }
    }

    pub fn from_settings(settings: &AdminSettings) -> Self {
        Self::new(&settings.identifier, &settings.secret)
    }

    pub fn check(&self, identifier: &str, secret: &str) -> bool {
        identifier.trim() == self.identifier && secret == self.secret
    }

    pub fn login(&self, identifier: &str, secret: &str) -> Result<(), AdminError> {
        if self.check(identifier, secret) {
            log::info!("Admin login accepted for '{}'", identifier.trim());
            Ok(())
        } else {
            log::warn!("Admin login rejected for '{}'", identifier.trim());
            Err(AdminError::InvalidCredentials)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub surveys: Vec<SurveySummary>,
    pub total_responses: i64,
}

/// Every survey, published or not, with its counts
pub async fn load_dashboard(storage: &Storage) -> Result<Dashboard> {
    let surveys = storage.survey_summaries().await?;
    let total_responses = surveys.iter().map(|survey| survey.response_count).sum();
    Ok(Dashboard {
        surveys,
        total_responses,
    })
}

/// Delete a survey's responses inside `range`; returns how many went
pub async fn purge_responses(
    storage: &Storage,
    survey_id: &str,
    range: &DateRange,
    timezone: Tz,
    confirm: bool,
) -> Result<u64, AdminError> {
    if !confirm {
        return Err(AdminError::ConfirmationRequired);
    }
    if range.is_inverted() {
        return Err(AdminError::InvertedRange);
    }
    if storage.get_survey(survey_id).await?.is_none() {
        return Err(AdminError::SurveyNotFound(survey_id.to_string()));
    }

    Ok(storage.delete_responses(survey_id, range, timezone).await?)
}
