//! Repository for the landing page title and description

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::model::HomepageConfig;

/// Get the stored homepage config, falling back to defaults
pub async fn get(pool: &SqlitePool) -> Result<HomepageConfig> {
    let row: Option<(String, String)> = sqlx::query_as("SELECT title, description FROM homepage_config WHERE id = 1")
        .fetch_optional(pool)
        .await
        .context("Failed to get homepage config")?;

    Ok(row
        .map(|(title, description)| HomepageConfig { title, description })
        .unwrap_or_default())
}

pub async fn put(pool: &SqlitePool, config: &HomepageConfig) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO homepage_config (id, title, description, updated_at)
        VALUES (1, ?, ?, ?)
        "#,
    )
    .bind(&config.title)
    .bind(&config.description)
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to save homepage config")?;

    log::info!("Saved homepage config: {}", config.title);
    Ok(())
}
