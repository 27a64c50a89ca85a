//! Applies and reverts embedded migrations against a pool

use anyhow::{Context, Result};
use log::{debug, info};
use sqlx::SqlitePool;
use std::fmt;

use super::{AppliedMigration, Migration, MigrationSet};

pub struct Migrator<'a> {
    pool: &'a SqlitePool,
    set: MigrationSet,
}

impl<'a> Migrator<'a> {
    pub fn new(pool: &'a SqlitePool) -> Result<Self> {
        Ok(Self {
            pool,
            set: MigrationSet::embedded()?,
        })
    }

    async fn ensure_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                checksum TEXT NOT NULL
            )
            "#,
        )
        .execute(self.pool)
        .await
        .context("Failed to create schema_migrations")?;
        Ok(())
    }

    async fn applied(&self) -> Result<Vec<AppliedMigration>> {
        self.ensure_table().await?;
        sqlx::query_as::<_, AppliedMigration>(
            "SELECT version, name, applied_at, checksum FROM schema_migrations ORDER BY version",
        )
        .fetch_all(self.pool)
        .await
        .context("Failed to read schema_migrations")
    }

    /// Apply everything pending; returns how many ran
    pub async fn up(&self) -> Result<usize> {
        let applied = self.applied().await?;
        self.set.verify(&applied)?;

        let pending = self.set.pending(&applied);
        if pending.is_empty() {
            debug!("Schema is current");
            return Ok(0);
        }

        for migration in &pending {
            info!("Applying migration {} '{}'", migration.version, migration.name);
            self.apply(migration).await?;
        }
        Ok(pending.len())
    }

    /// Revert every applied migration above `target`; returns how many ran
    pub async fn down_to(&self, target: i64) -> Result<usize> {
        let applied = self.applied().await?;
        self.set.verify(&applied)?;

        let mut reverted = 0;
        for row in applied.iter().rev().filter(|row| row.version > target) {
            let migration = self
                .set
                .get(row.version)
                .with_context(|| format!("Cannot revert migration {}: script missing", row.version))?;
            info!("Reverting migration {} '{}'", migration.version, migration.name);
            self.revert(migration).await?;
            reverted += 1;
        }
        Ok(reverted)
    }

    /// Revert only the most recently applied migration
    pub async fn step_back(&self) -> Result<usize> {
        let current = self.applied().await?.last().map(|row| row.version);
        match current {
            Some(version) => self.down_to(version - 1).await,
            None => Ok(0),
        }
    }

    async fn apply(&self, migration: &Migration) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin migration")?;
        sqlx::raw_sql(&migration.up_sql)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Migration {} '{}' failed", migration.version, migration.name))?;
        sqlx::query("INSERT INTO schema_migrations (version, name, checksum) VALUES (?, ?, ?)")
            .bind(migration.version)
            .bind(&migration.name)
            .bind(migration.checksum())
            .execute(&mut *tx)
            .await
            .context("Failed to record migration")?;
        tx.commit().await.context("Failed to commit migration")?;
        Ok(())
    }

    async fn revert(&self, migration: &Migration) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin rollback")?;
        if !migration.down_sql.trim().is_empty() {
            sqlx::raw_sql(&migration.down_sql)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Rollback of {} '{}' failed", migration.version, migration.name))?;
        }
        sqlx::query("DELETE FROM schema_migrations WHERE version = ?")
            .bind(migration.version)
            .execute(&mut *tx)
            .await
            .context("Failed to unrecord migration")?;
        tx.commit().await.context("Failed to commit rollback")?;
        Ok(())
    }

    pub async fn status(&self) -> Result<SchemaStatus> {
        let applied = self.applied().await?;
        let pending = self
            .set
            .pending(&applied)
            .into_iter()
            .map(|migration| (migration.version, migration.name.clone()))
            .collect();

        Ok(SchemaStatus {
            current_version: applied.last().map(|row| row.version),
            latest_version: self.set.latest_version(),
            applied,
            pending,
        })
    }
}

#[derive(Debug)]
pub struct SchemaStatus {
    pub current_version: Option<i64>,
    pub latest_version: Option<i64>,
    pub applied: Vec<AppliedMigration>,
    pub pending: Vec<(i64, String)>,
}

impl SchemaStatus {
    pub fn is_current(&self) -> bool {
        self.pending.is_empty()
    }
}

impl fmt::Display for SchemaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let version = |v: Option<i64>| v.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string());
        writeln!(
            f,
            "Schema version {} of {}",
            version(self.current_version),
            version(self.latest_version)
        )?;
        for row in &self.applied {
            writeln!(
                f,
                "  applied  {:03} {} ({})",
                row.version,
                row.name,
                row.applied_at.format("%Y-%m-%d %H:%M:%S")
            )?;
        }
        for (version, name) in &self.pending {
            writeln!(f, "  pending  {:03} {}", version, name)?;
        }
        Ok(())
    }
}
