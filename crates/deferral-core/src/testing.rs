//! Runnable fixtures shared by unit tests.
//!
//! Runnables are rebuilt from bytes on the receiving side, so their effects
//! go to a process-wide ledger keyed by a per-test string.

use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::DeferError;
use crate::typed::{INDIRECTION_TYPE, Runnable};

static LEDGER: LazyLock<Mutex<HashMap<String, u32>>> = LazyLock::new(Default::default);

fn record_run(key: &str) {
    let mut ledger = LEDGER.lock().unwrap();
    *ledger.entry(key.to_string()).or_default() += 1;
}

pub fn runs_of(key: &str) -> u32 {
    LEDGER.lock().unwrap().get(key).copied().unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EchoTask {
    pub key: String,
    pub message: String,
}

impl EchoTask {
    pub fn new(key: &str, message: &str) -> Self {
        Self {
            key: key.to_string(),
            message: message.to_string(),
        }
    }

    /// A task whose encoded form is at least `bytes` long.
    pub fn sized(key: &str, bytes: usize) -> Self {
        Self::new(key, &"x".repeat(bytes))
    }
}

#[async_trait]
impl Runnable for EchoTask {
    const TYPE: &'static str = "test.echo.v1";

    async fn run(&self) -> Result<(), DeferError> {
        record_run(&self.key);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inner {
    pub depth: u32,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedTask {
    pub key: String,
    pub labels: HashMap<String, String>,
    pub inner: Inner,
}

impl NestedTask {
    pub fn new(key: &str, labels: HashMap<String, String>) -> Self {
        Self {
            key: key.to_string(),
            labels,
            inner: Inner {
                depth: 2,
                tags: vec!["a".to_string(), "b".to_string()],
            },
        }
    }
}

#[async_trait]
impl Runnable for NestedTask {
    const TYPE: &'static str = "test.nested.v1";

    async fn run(&self) -> Result<(), DeferError> {
        record_run(&self.key);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Failure {
    Transient,
    Permanent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailingTask {
    pub key: String,
    pub failure: Failure,
    /// Optional filler to push the payload over the inline limit.
    #[serde(default)]
    pub filler: String,
}

impl FailingTask {
    pub fn new(key: &str, failure: Failure) -> Self {
        Self {
            key: key.to_string(),
            failure,
            filler: String::new(),
        }
    }

    pub fn sized(key: &str, failure: Failure, bytes: usize) -> Self {
        Self {
            filler: "y".repeat(bytes),
            ..Self::new(key, failure)
        }
    }
}

#[async_trait]
impl Runnable for FailingTask {
    const TYPE: &'static str = "test.failing.v1";

    async fn run(&self) -> Result<(), DeferError> {
        record_run(&self.key);
        match self.failure {
            Failure::Transient => Err(DeferError::transient("downstream busy")),
            Failure::Permanent => Err(DeferError::permanent("bad input")),
        }
    }
}

/// Map keys that JSON cannot represent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpaqueKeyTask {
    pub by_pair: HashMap<(u8, u8), String>,
}

impl OpaqueKeyTask {
    pub fn new() -> Self {
        let mut by_pair = HashMap::new();
        by_pair.insert((1, 2), "edge".to_string());
        Self { by_pair }
    }
}

#[async_trait]
impl Runnable for OpaqueKeyTask {
    const TYPE: &'static str = "test.opaque.v1";

    async fn run(&self) -> Result<(), DeferError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservedTask;

#[async_trait]
impl Runnable for ReservedTask {
    const TYPE: &'static str = INDIRECTION_TYPE;

    async fn run(&self) -> Result<(), DeferError> {
        Ok(())
    }
}
