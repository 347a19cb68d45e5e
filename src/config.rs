//! Runtime configuration, read from environment variables.

use crate::error::AppError;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound for `REVIEWBOT_WORKLOAD_WINDOW_DAYS`.
pub const MAX_WORKLOAD_WINDOW_DAYS: i64 = 3650;

/// Settings for the assignment pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentConfig {
    /// MRs carrying this label are left to the release process.
    pub release_label: String,
    /// MRs carrying any of these labels are considered blocked.
    pub block_labels: Vec<String>,
    /// Trailing window for workload counts.
    pub workload_window_days: i64,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            release_label: "release".to_string(),
            block_labels: vec!["blocked".to_string()],
            workload_window_days: 14,
        }
    }
}

impl AssignmentConfig {
    /// Labels that exclude an MR from assignment.
    pub fn skip_labels(&self) -> Vec<String> {
        let mut labels = vec![self.release_label.clone()];
        labels.extend(self.block_labels.iter().cloned());
        labels
    }
}

/// Settings for the notification passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    /// Actions older than this are marked notified without evaluation.
    pub stale_after: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(3600),
        }
    }
}

/// Timer periods for the background passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub assign_interval: Duration,
    pub notify_interval: Duration,
    pub events_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            assign_interval: Duration::from_secs(60),
            notify_interval: Duration::from_secs(30),
            events_interval: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub gitlab_url: String,
    pub gitlab_token: String,
    pub chat_api_url: String,
    pub chat_bot_token: String,
    pub http_timeout: Duration,
    /// Fixed seed for the reviewer selector. Random when unset.
    pub rng_seed: Option<u64>,
    pub assignment: AssignmentConfig,
    pub notification: NotificationConfig,
    pub scheduler: SchedulerConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let required = |key: &str| {
            var(key).ok_or_else(|| {
                AppError::invalid_input_field(
                    format!("{} environment variable is required", key),
                    key,
                )
            })
        };

        let number = |key: &str, default: u64| -> Result<u64, AppError> {
            match var(key) {
                Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                    AppError::invalid_input_field(format!("{} must be a valid number", key), key)
                }),
                None => Ok(default),
            }
        };

        let positive_secs = |key: &str, default: u64| -> Result<Duration, AppError> {
            match number(key, default)? {
                0 => Err(AppError::invalid_input_field(
                    format!("{} must be greater than zero", key),
                    key,
                )),
                secs => Ok(Duration::from_secs(secs)),
            }
        };

        let defaults = AssignmentConfig::default();
        let assignment = AssignmentConfig {
            release_label: var("REVIEWBOT_RELEASE_LABEL")
                .map(|s| s.trim().to_string())
                .unwrap_or(defaults.release_label),
            block_labels: var("REVIEWBOT_BLOCK_LABELS")
                .map(|s| parse_label_list(&s))
                .unwrap_or(defaults.block_labels),
            workload_window_days: window_days(number(
                "REVIEWBOT_WORKLOAD_WINDOW_DAYS",
                defaults.workload_window_days.unsigned_abs(),
            )?)?,
        };

        let notification = NotificationConfig {
            stale_after: positive_secs("REVIEWBOT_STALE_ACTION_SECS", 3600)?,
        };

        let scheduler = SchedulerConfig {
            assign_interval: positive_secs("REVIEWBOT_ASSIGN_INTERVAL_SECS", 60)?,
            notify_interval: positive_secs("REVIEWBOT_NOTIFY_INTERVAL_SECS", 30)?,
            events_interval: positive_secs("REVIEWBOT_EVENTS_INTERVAL_SECS", 30)?,
        };

        let rng_seed = match var("REVIEWBOT_RNG_SEED") {
            Some(_) => Some(number("REVIEWBOT_RNG_SEED", 0)?),
            None => None,
        };

        Ok(Config {
            database_path: var("REVIEWBOT_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("reviewbot.db")),
            gitlab_url: required("GITLAB_URL")?,
            gitlab_token: required("GITLAB_TOKEN")?,
            chat_api_url: required("CHAT_API_URL")?,
            chat_bot_token: required("CHAT_BOT_TOKEN")?,
            http_timeout: positive_secs("REVIEWBOT_HTTP_TIMEOUT_SECS", 30)?,
            rng_seed,
            assignment,
            notification,
            scheduler,
        })
    }
}

fn window_days(days: u64) -> Result<i64, AppError> {
    i64::try_from(days)
        .ok()
        .filter(|d| (1..=MAX_WORKLOAD_WINDOW_DAYS).contains(d))
        .ok_or_else(|| {
            AppError::invalid_input_field(
                format!(
                    "REVIEWBOT_WORKLOAD_WINDOW_DAYS must be between 1 and {}",
                    MAX_WORKLOAD_WINDOW_DAYS
                ),
                "REVIEWBOT_WORKLOAD_WINDOW_DAYS",
            )
        })
}

/// Split a comma-separated label list, dropping blanks.
pub fn parse_label_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
