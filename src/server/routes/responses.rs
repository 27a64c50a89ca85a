use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::{Value, json};

use crate::admin::purge_responses;
use crate::model::{NewResponse, QuestionSnapshot, Response};
use crate::server::AppContext;
use crate::server::error::ApiError;
use crate::server::params::RangeQuery;
use crate::storage::Storage;
use crate::taking::validate_submission;

pub(crate) fn create_router() -> Router {
    Router::new()
        .route("/", get(list_responses).post(submit_response).delete(purge))
        .route("/{id}", get(get_response).delete(delete_response))
}

pub(crate) async fn list_responses(
    Query(query): Query<RangeQuery>,
    Extension(storage): Extension<Storage>,
) -> Result<Json<Vec<Response>>, ApiError> {
    Ok(Json(storage.list_responses(query.survey_id()).await?))
}

/// Validate against the current survey and store with a snapshot of it
pub(crate) async fn submit_response(
    Extension(storage): Extension<Storage>,
    Json(submission): Json<NewResponse>,
) -> Result<impl IntoResponse, ApiError> {
    let survey = storage
        .get_survey(&submission.survey_id)
        .await?
        .ok_or_else(|| ApiError::not_found("survey", &submission.survey_id))?;

    let patient_type = validate_submission(&survey, &submission)?;
    let submission = NewResponse {
        patient_type: Some(patient_type.as_str().to_string()),
        ..submission
    };

    let snapshot = QuestionSnapshot {
        groups: survey.question_groups,
    };
    let response = storage.create_response(&submission, Some(&snapshot)).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Bulk delete by survey and optional date range; needs `confirm=true`
pub(crate) async fn purge(
    Query(query): Query<RangeQuery>,
    Extension(storage): Extension<Storage>,
    Extension(context): Extension<AppContext>,
) -> Result<Json<Value>, ApiError> {
    let survey_id = query.require_survey_id()?;
    let range = query.range()?;
    let deleted = purge_responses(&storage, survey_id, &range, context.timezone(), query.confirmed()).await?;
    Ok(Json(json!({ "deleted": deleted })))
}

pub(crate) async fn get_response(
    Path(id): Path<String>,
    Extension(storage): Extension<Storage>,
) -> Result<Json<Response>, ApiError> {
    storage
        .get_response(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("response", &id))
}

pub(crate) async fn delete_response(
    Path(id): Path<String>,
    Extension(storage): Extension<Storage>,
) -> Result<StatusCode, ApiError> {
    if storage.delete_response(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("response", &id))
    }
}
