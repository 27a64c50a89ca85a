//! Retry policy with exponential backoff for transient storage failures
//!
//! Reads at the export boundary go through [`RetryPolicy::run`] so a
//! briefly busy or locked database does not fail the whole download.

use log::{debug, info, warn};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Single attempt, no waiting
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

/// How a storage failure should be treated
#[derive(Debug, Clone, PartialEq)]
pub enum RetryableError {
    /// SQLite reported the database busy or locked
    Busy,
    /// No pooled connection became available in time
    PoolTimeout,
    Io,
    /// Anything else: constraint violations, bad SQL, decode errors
    Permanent,
}

impl RetryableError {
    pub fn should_retry(&self) -> bool {
        !matches!(self, RetryableError::Permanent)
    }

    pub fn from_sqlx_error(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut => RetryableError::PoolTimeout,
            sqlx::Error::Io(_) => RetryableError::Io,
            sqlx::Error::Database(db_error) => {
                // Extended result codes keep the primary code in the low byte
                let primary = db_error
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .map(|code| code & 0xff);
                match primary {
                    Some(5) | Some(6) => RetryableError::Busy,
                    _ => RetryableError::Permanent,
                }
            }
            _ => RetryableError::Permanent,
        }
    }

    /// Classify by the first sqlx error found in the context chain
    pub fn from_anyhow(error: &anyhow::Error) -> Self {
        error
            .chain()
            .find_map(|cause| cause.downcast_ref::<sqlx::Error>())
            .map(Self::from_sqlx_error)
            .unwrap_or(RetryableError::Permanent)
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run the read named by `what`, repeating it while it fails transiently
    pub async fn run<F, Fut, T>(&self, what: &str, mut read: F) -> anyhow::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let error = match read().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!("{} succeeded on attempt {}", what, attempt);
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            let kind = RetryableError::from_anyhow(&error);
            if !kind.should_retry() || attempt >= attempts {
                warn!("{} failed after {} attempt(s) ({:?}): {:#}", what, attempt, kind, error);
                return Err(error);
            }

            let delay = self.backoff(attempt);
            debug!("{} hit {:?} on attempt {}, retrying in {:?}", what, kind, attempt, delay);
            tokio::time::sleep(delay).await;
        }
    }

    /// Wait before attempt `attempt + 1`
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.config.base_delay.as_secs_f64() * self.config.backoff_multiplier.powi(exponent);
        let delay = if secs.is_finite() && secs < self.config.max_delay.as_secs_f64() {
            Duration::from_secs_f64(secs.max(0.0))
        } else {
            self.config.max_delay
        };

        if self.config.jitter {
            delay.mul_f64(rand::rng().random_range(0.5..=1.5))
        } else {
            delay
        }
    }
}
