use axum::extract::Query;
use axum::http::{HeaderMap, HeaderName, HeaderValue, header};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};

use crate::export::ExportStats;
use crate::export::helpers::format_timestamp;
use crate::server::error::ApiError;
use crate::server::params::RangeQuery;
use crate::server::{AppContext, LATEST_RESPONSE_HEADER, OLDEST_RESPONSE_HEADER, TOTAL_RESPONSES_HEADER};
use crate::storage::Storage;

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub(crate) fn create_router() -> Router {
    Router::new().route("/", get(export_responses))
}

/// `attachment` disposition with an ASCII fallback and the UTF-8 name
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    )
}

fn stats_headers(stats: &ExportStats, context: &AppContext) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    let format = |value| format_timestamp(value, context.timezone());

    let dates = [
        (LATEST_RESPONSE_HEADER, stats.latest.map(format)),
        (OLDEST_RESPONSE_HEADER, stats.oldest.map(format)),
        (TOTAL_RESPONSES_HEADER, Some(stats.total_responses.to_string())),
    ];
    for (name, value) in dates {
        if let Some(value) = value {
            let value = HeaderValue::from_str(&value).map_err(|e| anyhow::anyhow!("Invalid header value: {}", e))?;
            headers.insert(HeaderName::from_static(name), value);
        }
    }

    Ok(headers)
}

/// Workbook download for one survey and an optional inclusive date range
pub(crate) async fn export_responses(
    Query(query): Query<RangeQuery>,
    Extension(storage): Extension<Storage>,
    Extension(context): Extension<AppContext>,
) -> Result<impl IntoResponse, ApiError> {
    let survey_id = query.require_survey_id()?;
    let range = query.range()?;

    let output = context
        .exporter(storage)
        .export(survey_id, &range)
        .await?
        .ok_or_else(|| ApiError::not_found("survey", survey_id))?;

    let mut headers = stats_headers(&output.stats, &context)?;
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(XLSX_CONTENT_TYPE));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&content_disposition(&output.filename))
            .map_err(|e| anyhow::anyhow!("Invalid file name: {}", e))?,
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));

    log::info!(
        "Exported {} response(s) of survey {} as {}",
        output.stats.total_responses,
        survey_id,
        output.filename
    );
    Ok((headers, output.bytes))
}
