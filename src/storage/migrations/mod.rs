//! Versioned schema migrations embedded at compile time
//!
//! Each directory under `files/` is named `NNN_name` and holds `up.sql` and
//! `down.sql`. Applied versions are tracked in `schema_migrations` together
//! with a checksum of their up script.

use anyhow::{Context, Result, bail};
use include_dir::{Dir, include_dir};
use std::collections::{BTreeMap, HashSet};

pub mod manager;

pub use manager::{Migrator, SchemaStatus};

static MIGRATION_FILES: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/storage/migrations/files");

#[derive(Debug, Clone, PartialEq)]
pub struct Migration {
    pub version: i64,
    pub name: String,
    pub up_sql: String,
    pub down_sql: String,
}

impl Migration {
    pub fn checksum(&self) -> String {
        checksum(&self.up_sql)
    }
}

/// Row of `schema_migrations`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AppliedMigration {
    pub version: i64,
    pub name: String,
    pub applied_at: chrono::NaiveDateTime,
    pub checksum: String,
}

/// FNV-1a over the script with CRLF folded to LF, stable across builds
pub fn checksum(sql: &str) -> String {
    let normalized = sql.replace("\r\n", "\n");
    let hash = normalized
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
        });
    format!("{:016x}", hash)
}

/// The ordered set of migrations shipped with the binary
#[derive(Debug, Clone)]
pub struct MigrationSet {
    migrations: BTreeMap<i64, Migration>,
}

impl MigrationSet {
    pub fn embedded() -> Result<Self> {
        let mut migrations = BTreeMap::new();

        for dir in MIGRATION_FILES.dirs() {
            let dir_name = dir
                .path()
                .file_name()
                .and_then(|name| name.to_str())
                .context("Migration directory name is not UTF-8")?;
            let migration = parse_dir(dir_name)?;
            if let Some(existing) = migrations.insert(migration.version, migration) {
                bail!("Two migrations share version {} ('{}')", existing.version, existing.name);
            }
        }

        if migrations.is_empty() {
            bail!("No migrations are embedded");
        }
        Ok(Self { migrations })
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    pub fn get(&self, version: i64) -> Option<&Migration> {
        self.migrations.get(&version)
    }

    pub fn latest_version(&self) -> Option<i64> {
        self.migrations.keys().next_back().copied()
    }

    /// Migrations not yet recorded, lowest version first
    pub fn pending(&self, applied: &[AppliedMigration]) -> Vec<&Migration> {
        let applied: HashSet<i64> = applied.iter().map(|row| row.version).collect();
        self.migrations
            .values()
            .filter(|migration| !applied.contains(&migration.version))
            .collect()
    }

    /// Every recorded migration must still ship with an unchanged up script
    pub fn verify(&self, applied: &[AppliedMigration]) -> Result<()> {
        for row in applied {
            let Some(migration) = self.get(row.version) else {
                bail!(
                    "Database has migration {} '{}' which this build does not know",
                    row.version,
                    row.name
                );
            };
            let expected = migration.checksum();
            if row.checksum != expected {
                bail!(
                    "Migration {} '{}' was changed after it was applied (recorded {}, embedded {})",
                    row.version,
                    row.name,
                    row.checksum,
                    expected
                );
            }
        }
        Ok(())
    }
}

fn parse_dir(dir_name: &str) -> Result<Migration> {
    let (version, name) = dir_name
        .split_once('_')
        .with_context(|| format!("Migration directory '{}' is not named NNN_name", dir_name))?;
    let version = version
        .parse()
        .with_context(|| format!("Migration directory '{}' has no numeric version", dir_name))?;

    Ok(Migration {
        version,
        name: name.to_string(),
        up_sql: script(dir_name, "up.sql")?,
        down_sql: script(dir_name, "down.sql")?,
    })
}

fn script(dir_name: &str, file: &str) -> Result<String> {
    MIGRATION_FILES
        .get_file(format!("{}/{}", dir_name, file))
        .with_context(|| format!("Migration '{}' has no {}", dir_name, file))?
        .contents_utf8()
        .map(str::to_string)
        .with_context(|| format!("{} of migration '{}' is not UTF-8", file, dir_name))
}
