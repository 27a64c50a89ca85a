use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Deserialize;

use crate::authoring::validate_draft;
use crate::model::{Survey, SurveyDraft};
use crate::server::error::ApiError;
use crate::storage::Storage;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListQuery {
    #[serde(default)]
    include_empty: bool,
}

pub(crate) fn create_router() -> Router {
    Router::new()
        .route("/", get(list_surveys).post(create_survey))
        .route("/{id}", get(get_survey).put(replace_survey).delete(delete_survey))
}

/// Published surveys, newest first
pub(crate) async fn list_surveys(
    Query(query): Query<ListQuery>,
    Extension(storage): Extension<Storage>,
) -> Result<Json<Vec<Survey>>, ApiError> {
    let surveys = storage.list_surveys().await?;
    let surveys = if query.include_empty {
        surveys
    } else {
        surveys.into_iter().filter(Survey::is_published).collect()
    };
    Ok(Json(surveys))
}

pub(crate) async fn create_survey(
    Extension(storage): Extension<Storage>,
    Json(draft): Json<SurveyDraft>,
) -> Result<impl IntoResponse, ApiError> {
    validate_draft(&draft)?;
    let survey = storage.create_survey(&draft).await?;
    Ok((StatusCode::CREATED, Json(survey)))
}

pub(crate) async fn get_survey(
    Path(id): Path<String>,
    Extension(storage): Extension<Storage>,
) -> Result<Json<Survey>, ApiError> {
    storage
        .get_survey(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("survey", &id))
}

/// Replace the whole structure; ids carried by the draft are kept
pub(crate) async fn replace_survey(
    Path(id): Path<String>,
    Extension(storage): Extension<Storage>,
    Json(draft): Json<SurveyDraft>,
) -> Result<Json<Survey>, ApiError> {
    validate_draft(&draft)?;
    let survey = storage
        .replace_survey(&id, &draft)
        .await?
        .ok_or_else(|| ApiError::not_found("survey", &id))?;
    Ok(Json(survey))
}

pub(crate) async fn delete_survey(
    Path(id): Path<String>,
    Extension(storage): Extension<Storage>,
) -> Result<StatusCode, ApiError> {
    if storage.delete_survey(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("survey", &id))
    }
}
