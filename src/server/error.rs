use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::admin::AdminError;
use crate::authoring::DraftError;
use crate::taking::SubmissionError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Draft(#[from] DraftError),

    #[error("{0}")]
    BadRequest(String),

    #[error("invalid admin credentials")]
    Unauthorized,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn not_found(what: &str, id: &str) -> Self {
        Self::NotFound(format!("{} {}", what, id))
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Submission(_) | Self::Draft(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Submission(_) => "invalid_response",
            Self::Draft(_) => "invalid_survey",
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized => "unauthorized",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<AdminError> for ApiError {
    fn from(value: AdminError) -> Self {
        match value {
            AdminError::InvalidCredentials => Self::Unauthorized,
            AdminError::SurveyNotFound(id) => Self::not_found("survey", &id),
            AdminError::Storage(err) => Self::Internal(err),
            other @ (AdminError::ConfirmationRequired | AdminError::InvertedRange) => Self::BadRequest(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Full context chain for storage failures
            Self::Internal(err) => {
                log::error!("Request failed: {:#}", err);
                format!("{:#}", err)
            }
            other => {
                log::debug!("Request rejected ({}): {}", status, other);
                other.to_string()
            }
        };

        (status, Json(json!({ "error": self.kind(), "message": message }))).into_response()
    }
}
