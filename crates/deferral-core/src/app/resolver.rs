//! OptionsResolver - RawTaskOptions を正規化された TaskOptions に変換
//!
//! 純粋関数として設計されています（副作用なし）。時刻と乱数は port 経由です。
//!
//! # 正規化のルール
//! - `connection_name` は既知の接続でなければ ConfigurationError
//! - `countdown` は 0 より大きくなければならず、指定時は `eta = created_at + countdown`
//!   （`eta` が同時に指定されていても上書き）
//! - `name` 未指定時は `{type}:{timestamp}-{random8hex}` を生成
//! - `created_at` はここで一度だけ決まる

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::config::DeferConfig;
use crate::domain::{DeferError, RawTaskOptions, RoutingOptions, TaskOptions};
use crate::ports::{Clock, IdGenerator};

pub struct OptionsResolver {
    connections: Vec<String>,
    version: String,
    handler_path: String,
    default_queue: String,
    default_connection: String,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl OptionsResolver {
    pub fn new(config: &DeferConfig, clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        let default_connection = config
            .connections
            .first()
            .cloned()
            .unwrap_or_else(|| super::config::DEFAULT_CONNECTION.to_string());
        Self {
            connections: config.connections.clone(),
            version: config.version.clone(),
            handler_path: config.handler_path.clone(),
            default_queue: config.default_queue.clone(),
            default_connection,
            clock,
            ids,
        }
    }

    pub fn resolve(&self, task_type: &str, raw: RawTaskOptions) -> Result<TaskOptions, DeferError> {
        let connection_name = raw
            .connection_name
            .unwrap_or_else(|| self.default_connection.clone());
        if !self.connections.contains(&connection_name) {
            return Err(DeferError::configuration(format!(
                "'{connection_name}' is not a known database connection (known: {})",
                self.connections.join(",")
            )));
        }

        let created_at = raw.created_at.unwrap_or_else(|| self.clock.now());

        let eta = match raw.countdown {
            Some(countdown) if countdown.is_zero() => {
                return Err(DeferError::configuration("countdown must be greater than zero"));
            }
            Some(countdown) => {
                let delta = chrono::Duration::from_std(countdown).map_err(|e| {
                    DeferError::configuration(format!("countdown {countdown:?} out of range: {e}"))
                })?;
                let eta = created_at.checked_add_signed(delta).ok_or_else(|| {
                    DeferError::configuration(format!("countdown {countdown:?} out of range"))
                })?;
                Some(eta)
            }
            None => raw.eta,
        };

        let name = match raw.name {
            Some(name) if name.trim().is_empty() => {
                return Err(DeferError::configuration("task name must not be blank"));
            }
            Some(name) => name,
            None => self.generate_name(task_type, created_at),
        };

        let routing = RoutingOptions {
            version: raw.routing.version.or_else(|| Some(self.version.clone())),
            ..raw.routing
        };

        Ok(TaskOptions {
            name,
            created_at,
            small_task: raw.small_task,
            transactional: raw.transactional,
            connection_name,
            countdown: raw.countdown,
            eta,
            routing,
            handler_path: raw
                .handler_path
                .unwrap_or_else(|| self.handler_path.clone()),
            extra_headers: raw.extra_headers,
            queue_name: raw
                .queue_name
                .unwrap_or_else(|| self.default_queue.clone()),
        })
    }

    fn generate_name(&self, task_type: &str, created_at: DateTime<Utc>) -> String {
        format!(
            "{task_type}:{}-{}",
            created_at.timestamp_micros(),
            self.ids.task_name_suffix()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use crate::ports::{FixedClock, UlidGenerator};
    use chrono::{Duration as ChronoDuration, TimeZone};
    use std::time::Duration;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
    }

    fn resolver(config: DeferConfig) -> OptionsResolver {
        let clock = Arc::new(FixedClock::new(at()));
        OptionsResolver::new(&config, clock.clone(), Arc::new(UlidGenerator::new(clock)))
    }

    #[test]
    fn defaults_are_filled() {
        let opts = resolver(DeferConfig::default())
            .resolve("acme.mail.v1", RawTaskOptions::new())
            .unwrap();

        assert_eq!(opts.created_at(), at());
        assert_eq!(opts.connection_name(), "default");
        assert_eq!(opts.queue_name(), "default");
        assert_eq!(opts.handler_path(), "/_tasks/deferred");
        assert_eq!(opts.routing().version.as_deref(), Some("local"));
        assert_eq!(opts.transactional(), None);
        assert!(!opts.small_task());
        assert_eq!(opts.eta(), None);
    }

    #[test]
    fn generated_name_has_type_timestamp_and_suffix() {
        let opts = resolver(DeferConfig::default())
            .resolve("acme.mail.v1", RawTaskOptions::new())
            .unwrap();

        let (prefix, rest) = opts.name().split_once(':').unwrap();
        assert_eq!(prefix, "acme.mail.v1");
        let (stamp, suffix) = rest.split_once('-').unwrap();
        assert_eq!(stamp, at().timestamp_micros().to_string());
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_names_differ_per_call() {
        let r = resolver(DeferConfig::default());
        let a = r.resolve("t", RawTaskOptions::new()).unwrap();
        let b = r.resolve("t", RawTaskOptions::new()).unwrap();
        assert_ne!(a.name(), b.name());
    }

    #[test]
    fn custom_name_and_created_at_are_kept() {
        let created = at() - ChronoDuration::minutes(5);
        let raw = RawTaskOptions {
            created_at: Some(created),
            ..RawTaskOptions::new().name("nightly-report")
        };
        let opts = resolver(DeferConfig::default()).resolve("t", raw).unwrap();
        assert_eq!(opts.name(), "nightly-report");
        assert_eq!(opts.created_at(), created);
    }

    #[test]
    fn countdown_overrides_eta() {
        let raw = RawTaskOptions::new()
            .eta(at() + ChronoDuration::hours(1))
            .countdown(Duration::from_secs(30));
        let opts = resolver(DeferConfig::default()).resolve("t", raw).unwrap();
        assert_eq!(opts.eta(), Some(at() + ChronoDuration::seconds(30)));
        assert_eq!(opts.countdown(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn eta_is_kept_without_countdown() {
        let eta = at() + ChronoDuration::hours(1);
        let opts = resolver(DeferConfig::default())
            .resolve("t", RawTaskOptions::new().eta(eta))
            .unwrap();
        assert_eq!(opts.eta(), Some(eta));
    }

    #[test]
    fn zero_countdown_is_rejected() {
        let err = resolver(DeferConfig::default())
            .resolve("t", RawTaskOptions::new().countdown(Duration::ZERO))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn unknown_connection_is_rejected() {
        let err = resolver(DeferConfig::default())
            .resolve("t", RawTaskOptions::new().using("analytics"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("analytics"));
    }

    #[test]
    fn configured_connections_are_accepted() {
        let config = DeferConfig {
            connections: vec!["default".into(), "replica".into()],
            ..DeferConfig::default()
        };
        let opts = resolver(config)
            .resolve("t", RawTaskOptions::new().using("replica"))
            .unwrap();
        assert_eq!(opts.connection_name(), "replica");
    }

    #[test]
    fn explicit_routing_is_passed_through() {
        let routing = RoutingOptions {
            version: Some("canary".into()),
            service: Some("worker".into()),
            instance: None,
        };
        let opts = resolver(DeferConfig::default())
            .resolve("t", RawTaskOptions::new().routing(routing.clone()))
            .unwrap();
        assert_eq!(opts.routing(), &routing);
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = resolver(DeferConfig::default())
            .resolve("t", RawTaskOptions::new().name("  "))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
