use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::admin::{Dashboard, load_dashboard};
use crate::server::AppContext;
use crate::server::error::ApiError;
use crate::storage::Storage;

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    identifier: String,
    secret: String,
}

pub(crate) fn create_router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/surveys", get(dashboard))
}

pub(crate) async fn login(
    Extension(context): Extension<AppContext>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    context.gate().login(&request.identifier, &request.secret)?;
    Ok(Json(json!({ "ok": true })))
}

/// All surveys, including unpublished ones, with their counts
pub(crate) async fn dashboard(Extension(storage): Extension<Storage>) -> Result<Json<Dashboard>, ApiError> {
    Ok(Json(load_dashboard(&storage).await?))
}
