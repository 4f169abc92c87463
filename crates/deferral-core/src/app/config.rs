//! DeferConfig - プロセス起動時に一度だけ読む環境設定
//!
//! グローバルなキャッシュは持たず、構築した値を Scheduler / Runner に渡します。
//!
//! # 環境変数
//! | 変数 | 既定値 |
//! |---|---|
//! | `TASKS_PROJECT` | なし（未設定だと queue path 生成時に ConfigurationError） |
//! | `TASKS_LOCATION` | なし（同上） |
//! | `TASKS_EMULATOR_HOST` | なし |
//! | `APP_VERSION` | `local` |
//! | `TASKS_DB_CONNECTIONS` | `default` |
//! | `TASKS_HANDLER_PATH` | `/_tasks/deferred` |
//! | `TASKS_DEFAULT_QUEUE` | `default` |
//! | `TASKS_DEADLINE_MS` | `30000` |
//! | `TASKS_CLEANUP_TIMEOUT_MS` | `5000` |
//! | `TASKS_ENQUEUE_MAX_ATTEMPTS` | `3` |

use std::time::Duration;

use super::retry::RetryPolicy;
use crate::domain::DeferError;

pub const DEFAULT_CONNECTION: &str = "default";
pub const DEFAULT_QUEUE: &str = "default";
pub const DEFAULT_HANDLER_PATH: &str = "/_tasks/deferred";
pub const DEFAULT_VERSION: &str = "local";

#[derive(Debug, Clone, PartialEq)]
pub struct DeferConfig {
    pub project: Option<String>,
    pub location: Option<String>,
    pub emulator_host: Option<String>,
    /// Running build's version; default routing target.
    pub version: String,
    /// Database connections a task may be tied to.
    pub connections: Vec<String>,
    pub handler_path: String,
    pub default_queue: String,
    /// Ambient deadline of a whole `defer` / `execute` call.
    pub deadline: Duration,
    /// Independent budget for overflow cleanup after a failure.
    pub cleanup_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for DeferConfig {
    fn default() -> Self {
        Self {
            project: None,
            location: None,
            emulator_host: None,
            version: DEFAULT_VERSION.to_string(),
            connections: vec![DEFAULT_CONNECTION.to_string()],
            handler_path: DEFAULT_HANDLER_PATH.to_string(),
            default_queue: DEFAULT_QUEUE.to_string(),
            deadline: Duration::from_secs(30),
            cleanup_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }
}

impl DeferConfig {
    pub fn from_env() -> Result<Self, DeferError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DeferError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let connections = match get("TASKS_DB_CONNECTIONS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
            None => defaults.connections,
        };

        let mut retry = defaults.retry;
        if let Some(attempts) = get("TASKS_ENQUEUE_MAX_ATTEMPTS") {
            retry.max_attempts = parse_number("TASKS_ENQUEUE_MAX_ATTEMPTS", &attempts)?;
            if retry.max_attempts == 0 {
                return Err(DeferError::configuration(
                    "TASKS_ENQUEUE_MAX_ATTEMPTS must be at least 1",
                ));
            }
        }

        let config = Self {
            project: get("TASKS_PROJECT"),
            location: get("TASKS_LOCATION"),
            emulator_host: get("TASKS_EMULATOR_HOST"),
            version: get("APP_VERSION").unwrap_or(defaults.version),
            connections,
            handler_path: get("TASKS_HANDLER_PATH").unwrap_or(defaults.handler_path),
            default_queue: get("TASKS_DEFAULT_QUEUE").unwrap_or(defaults.default_queue),
            deadline: match get("TASKS_DEADLINE_MS") {
                Some(ms) => Duration::from_millis(parse_number("TASKS_DEADLINE_MS", &ms)?),
                None => defaults.deadline,
            },
            cleanup_timeout: match get("TASKS_CLEANUP_TIMEOUT_MS") {
                Some(ms) => Duration::from_millis(parse_number("TASKS_CLEANUP_TIMEOUT_MS", &ms)?),
                None => defaults.cleanup_timeout,
            },
            retry,
        };

        if config.connections.is_empty() {
            return Err(DeferError::configuration(
                "TASKS_DB_CONNECTIONS names no connection",
            ));
        }
        Ok(config)
    }

    /// Where a control-plane client should connect: the emulator when one is
    /// configured, otherwise the provider default (`None`).
    pub fn control_plane_endpoint(&self) -> Option<&str> {
        self.emulator_host.as_deref()
    }

    pub fn with_project(mut self, project: impl Into<String>, location: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self.location = Some(location.into());
        self
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, DeferError>
where
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| DeferError::configuration(format!("{key}={raw:?}: {e}")))
}
