//! Task options: raw (caller supplied) and canonical (post-resolution).
//!
//! `RawTaskOptions` は呼び出し側が指定する部分的な設定です。
//! `TaskOptions` は `OptionsResolver` だけが生成でき、生成後は不変です。

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Addressing hints passed through to the queue's target resolution.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoutingOptions {
    /// Defaults to the running build's version when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

/// Per-task configuration as supplied by the caller.
///
/// Every field is optional; `OptionsResolver::resolve` fills the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTaskOptions {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub small_task: bool,

    /// `None` inherits the ambient transaction state at defer time.
    #[serde(default)]
    pub transactional: Option<bool>,

    #[serde(default)]
    pub connection_name: Option<String>,

    #[serde(default)]
    pub countdown: Option<Duration>,

    #[serde(default)]
    pub eta: Option<DateTime<Utc>>,

    #[serde(default)]
    pub routing: RoutingOptions,

    #[serde(default)]
    pub handler_path: Option<String>,

    #[serde(default)]
    pub extra_headers: BTreeMap<String, String>,

    #[serde(default)]
    pub queue_name: Option<String>,
}

impl RawTaskOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn small_task(mut self, small_task: bool) -> Self {
        self.small_task = small_task;
        self
    }

    pub fn transactional(mut self, transactional: bool) -> Self {
        self.transactional = Some(transactional);
        self
    }

    pub fn using(mut self, connection_name: impl Into<String>) -> Self {
        self.connection_name = Some(connection_name.into());
        self
    }

    pub fn countdown(mut self, countdown: Duration) -> Self {
        self.countdown = Some(countdown);
        self
    }

    pub fn eta(mut self, eta: DateTime<Utc>) -> Self {
        self.eta = Some(eta);
        self
    }

    pub fn routing(mut self, routing: RoutingOptions) -> Self {
        self.routing = routing;
        self
    }

    pub fn handler_path(mut self, path: impl Into<String>) -> Self {
        self.handler_path = Some(path.into());
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }

    pub fn queue(mut self, queue_name: impl Into<String>) -> Self {
        self.queue_name = Some(queue_name.into());
        self
    }
}

/// Canonical options record.
///
/// Only the resolver builds one; callers get read-only accessors, so
/// `created_at` and the derived `eta` never change after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOptions {
    pub(crate) name: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) small_task: bool,
    pub(crate) transactional: Option<bool>,
    pub(crate) connection_name: String,
    pub(crate) countdown: Option<Duration>,
    pub(crate) eta: Option<DateTime<Utc>>,
    pub(crate) routing: RoutingOptions,
    pub(crate) handler_path: String,
    pub(crate) extra_headers: BTreeMap<String, String>,
    pub(crate) queue_name: String,
}

impl TaskOptions {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn small_task(&self) -> bool {
        self.small_task
    }

    pub fn transactional(&self) -> Option<bool> {
        self.transactional
    }

    pub fn connection_name(&self) -> &str {
        &self.connection_name
    }

    pub fn countdown(&self) -> Option<Duration> {
        self.countdown
    }

    /// Absolute schedule time; already derived from `countdown` when one was given.
    pub fn eta(&self) -> Option<DateTime<Utc>> {
        self.eta
    }

    pub fn routing(&self) -> &RoutingOptions {
        &self.routing
    }

    pub fn handler_path(&self) -> &str {
        &self.handler_path
    }

    pub fn extra_headers(&self) -> &BTreeMap<String, String> {
        &self.extra_headers
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }
}
