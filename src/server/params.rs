//! Query-string parameters shared by several routes

use chrono::NaiveDate;
use serde::Deserialize;

use super::error::ApiError;
use crate::model::DateRange;

/// `surveyId`, `from` and `to` as sent by the admin screens; blank values
/// count as absent
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub survey_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub confirm: Option<String>,
}

fn parse_date(name: &str, value: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("{} must be a YYYY-MM-DD date, got '{}'", name, value))),
    }
}

impl RangeQuery {
    pub fn survey_id(&self) -> Option<&str> {
        self.survey_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }

    pub fn require_survey_id(&self) -> Result<&str, ApiError> {
        self.survey_id()
            .ok_or_else(|| ApiError::BadRequest("surveyId is required".to_string()))
    }

    pub fn range(&self) -> Result<DateRange, ApiError> {
        Ok(DateRange::new(
            parse_date("from", self.from.as_deref())?,
            parse_date("to", self.to.as_deref())?,
        ))
    }

    pub fn confirmed(&self) -> bool {
        matches!(self.confirm.as_deref().map(str::trim), Some("true") | Some("1"))
    }
}
