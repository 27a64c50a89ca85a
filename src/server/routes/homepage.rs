use axum::routing::get;
use axum::{Extension, Json, Router};

use crate::model::HomepageConfig;
use crate::server::error::ApiError;
use crate::storage::Storage;

pub(crate) fn create_router() -> Router {
    Router::new().route("/", get(get_homepage_config).put(put_homepage_config))
}

pub(crate) async fn get_homepage_config(
    Extension(storage): Extension<Storage>,
) -> Result<Json<HomepageConfig>, ApiError> {
    Ok(Json(storage.homepage_config().await?))
}

pub(crate) async fn put_homepage_config(
    Extension(storage): Extension<Storage>,
    Json(config): Json<HomepageConfig>,
) -> Result<Json<HomepageConfig>, ApiError> {
    if config.title.trim().is_empty() {
        return Err(ApiError::BadRequest("homepage title is required".to_string()));
    }
    storage.set_homepage_config(&config).await?;
    Ok(Json(config))
}
