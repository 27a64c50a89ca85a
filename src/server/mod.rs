//! HTTP surface: axum router over the storage gateway and the flows

mod error;
mod params;
mod routes;

use anyhow::{Context, Result};
use axum::http::{HeaderName, Method, header};
use axum::{Extension, Router};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::admin::AdminGate;
use crate::config::Settings;
use crate::export::{ExportOptions, ResponseExporter};
use crate::storage::{RetryPolicy, Storage};

pub use error::ApiError;

pub const LATEST_RESPONSE_HEADER: &str = "x-latest-response-date";
pub const OLDEST_RESPONSE_HEADER: &str = "x-oldest-response-date";
pub const TOTAL_RESPONSES_HEADER: &str = "x-total-responses";

#[derive(Debug)]
struct InnerAppContext {
    gate: AdminGate,
    export_options: ExportOptions,
    retry: RetryPolicy,
}

/// Per-process settings shared with every handler
#[derive(Clone, Debug)]
pub struct AppContext(Arc<InnerAppContext>);

impl AppContext {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self(Arc::new(InnerAppContext {
            gate: AdminGate::from_settings(&settings.admin),
            export_options: settings.export_options()?,
            retry: settings.retry_policy(),
        })))
    }

    pub fn gate(&self) -> &AdminGate {
        &self.0.gate
    }

    pub fn timezone(&self) -> Tz {
        self.0.export_options.timezone
    }

    pub fn exporter(&self, storage: Storage) -> ResponseExporter<Storage> {
        ResponseExporter::new(storage, self.0.export_options.clone(), self.0.retry.clone())
    }
}

fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer> {
    let origin = if allowed_origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            allowed_origins
                .iter()
                .map(|origin| origin.parse())
                .collect::<Result<Vec<_>, _>>()
                .context("Invalid allowed origin")?,
        )
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE, header::ORIGIN])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .expose_headers([
            header::CONTENT_DISPOSITION,
            HeaderName::from_static(LATEST_RESPONSE_HEADER),
            HeaderName::from_static(OLDEST_RESPONSE_HEADER),
            HeaderName::from_static(TOTAL_RESPONSES_HEADER),
        ])
        .max_age(Duration::from_secs(3600)))
}

pub fn create_app(storage: Storage, settings: &Settings) -> Result<Router> {
    let context = AppContext::from_settings(settings)?;

    let app = Router::new()
        .merge(routes::health::create_router())
        .nest("/surveys", routes::surveys::create_router())
        .nest("/responses", routes::responses::create_router())
        .nest("/export", routes::export::create_router())
        .nest("/homepage-config", routes::homepage::create_router())
        .nest("/admin", routes::admin::create_router())
        // Router layers are called bottom to top
        .layer(Extension(context))
        .layer(Extension(storage))
        .layer(cors_layer(&settings.server.allowed_origins)?);

    Ok(app)
}

/// Bind and serve until the process is stopped
pub async fn serve(storage: Storage, settings: &Settings) -> Result<()> {
    let app = create_app(storage, settings)?;
    let address = settings.bind_address();

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
