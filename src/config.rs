use anyhow::{Context, Result};
use chrono_tz::Tz;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::export::{DEFAULT_COLUMN_WIDTH, ExportOptions, PatientInfoQuestion};
use crate::storage::{RetryConfig, RetryPolicy};

pub const ENV_DATABASE: &str = "PATIENT_SURVEY_DATABASE";
pub const ENV_ADMIN_ID: &str = "PATIENT_SURVEY_ADMIN_ID";
pub const ENV_ADMIN_SECRET: &str = "PATIENT_SURVEY_ADMIN_SECRET";
pub const ENV_PORT: &str = "PATIENT_SURVEY_PORT";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub admin: AdminSettings,
    pub export: ExportSettings,
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Empty allows any origin
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Defaults to `survey.db` in the data directory
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSettings {
    pub identifier: String,
    pub secret: String,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            identifier: "admin".to_string(),
            secret: "admin".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub timezone: String,
    pub column_width: f64,
    pub patient_info_questions: Vec<PatientInfoQuestion>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            timezone: "Asia/Seoul".to_string(),
            column_width: DEFAULT_COLUMN_WIDTH,
            patient_info_questions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let config = RetryConfig::default();
        Self {
            max_attempts: config.max_attempts,
            base_delay_ms: config.base_delay.as_millis() as u64,
            max_delay_ms: config.max_delay.as_millis() as u64,
            backoff_multiplier: config.backoff_multiplier,
            jitter: config.jitter,
        }
    }
}

fn app_dir(base: Option<PathBuf>, fallback: Option<PathBuf>) -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // XDG directory on Linux
        Ok(base.context("Failed to get XDG directory")?.join("patient-survey"))
    } else {
        // Home directory with dot prefix on Windows/Mac
        Ok(fallback.context("Failed to get home directory")?.join(".patient-survey"))
    }
}

impl Settings {
    pub fn default_path() -> Result<PathBuf> {
        Ok(app_dir(dirs::config_dir(), dirs::home_dir())?.join("config.toml"))
    }

    /// Read settings from `path` (or the default location), then apply
    /// environment overrides. A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };
        debug!("Loading settings from: {:?}", config_path);

        let mut settings = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
            Self::parse(&content).with_context(|| format!("Failed to parse config file: {:?}", config_path))?
        } else {
            info!("Config file {:?} doesn't exist, using defaults", config_path);
            Self::default()
        };

        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.timezone()?;
        Ok(settings)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid settings TOML")
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize settings to TOML")
    }

    /// Override file values with `PATIENT_SURVEY_*` variables
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DATABASE) {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(identifier) = lookup(ENV_ADMIN_ID) {
            self.admin.identifier = identifier;
        }
        if let Some(secret) = lookup(ENV_ADMIN_SECRET) {
            self.admin.secret = secret;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("{} must be a port number, got '{}'", ENV_PORT, port))?;
        }
        Ok(())
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database.path {
            Some(path) => Ok(path.clone()),
            None => Ok(app_dir(dirs::data_dir(), dirs::home_dir())?.join("survey.db")),
        }
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.export
            .timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Invalid export timezone '{}': {}", self.export.timezone, e))
    }

    pub fn export_options(&self) -> Result<ExportOptions> {
        Ok(ExportOptions {
            timezone: self.timezone()?,
            column_width: self.export.column_width,
            patient_info_questions: self.export.patient_info_questions.clone(),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(RetryConfig {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            backoff_multiplier: self.retry.backoff_multiplier,
            jitter: self.retry.jitter,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
