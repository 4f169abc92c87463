//! Runner - 受信したタスク body を復元して実行する
//!
//! # フロー
//! 1. PayloadCodec で decode
//! 2. indirection なら overflow store から本体を取得（NotFound は Permanent）
//! 3. TypedRegistry から DynHandler を引いて実行
//! 4. 結果に応じて overflow レコードを削除 / 保持
//!
//! # overflow レコードの扱い
//! | 結果 | レコード |
//! |---|---|
//! | 成功 | 削除 |
//! | Permanent（未知の型、壊れた本体を含む） | 削除 |
//! | Transient / DeadlineExceeded | 保持（キューの再配送で再実行） |

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::Instrument;

use super::config::DeferConfig;
use super::deadline::{discard_overflow, within};
use crate::domain::{DeferError, OverflowId, Outcome};
use crate::ports::OverflowStore;
use crate::typed::{Payload, PayloadCodec, TypedRegistry};

pub struct Runner {
    registry: Arc<TypedRegistry>,
    store: Arc<dyn OverflowStore>,
    codec: PayloadCodec,
    deadline: Duration,
    cleanup_timeout: Duration,
}

impl Runner {
    pub fn new(config: &DeferConfig, registry: Arc<TypedRegistry>, store: Arc<dyn OverflowStore>) -> Self {
        Self {
            registry,
            store,
            codec: PayloadCodec::new(),
            deadline: config.deadline,
            cleanup_timeout: config.cleanup_timeout,
        }
    }

    pub async fn execute(&self, body: &[u8]) -> Result<Outcome, DeferError> {
        self.execute_until(body, Instant::now() + self.deadline).await
    }

    pub async fn execute_until(&self, body: &[u8], deadline: Instant) -> Result<Outcome, DeferError> {
        let span = tracing::info_span!(
            "execute",
            task_type = tracing::field::Empty,
            overflow = tracing::field::Empty,
        );
        let result = self.execute_inner(body, deadline).instrument(span.clone()).await;
        span.in_scope(|| match &result {
            Ok(outcome) => tracing::info!(task_type = %outcome.task_type, "task finished"),
            Err(error) if error.is_retryable() => {
                tracing::warn!(%error, "task failed; will be redelivered")
            }
            Err(error) => tracing::error!(%error, "task failed permanently"),
        });
        result
    }

    async fn execute_inner(&self, body: &[u8], deadline: Instant) -> Result<Outcome, DeferError> {
        let (payload, overflow) = match self.codec.decode(body)? {
            Payload::Indirection(handle) => {
                tracing::Span::current().record("overflow", tracing::field::display(handle));
                (self.load_overflow(handle, deadline).await?, Some(handle))
            }
            task => (task, None),
        };

        let Payload::Task { task_type, data } = payload else {
            // load_overflow never returns an indirection
            return Err(DeferError::permanent("indirection resolved to another indirection"));
        };
        tracing::Span::current().record("task_type", task_type.as_str());

        let Some(handler) = self.registry.get(&task_type) else {
            self.discard(overflow).await;
            return Err(DeferError::permanent(format!(
                "unknown task type '{task_type}' (registered: {})",
                self.registry.registered_types().join(",")
            )));
        };

        match within(deadline, "run", handler.handle_dyn(data)).await {
            Ok(()) => {
                self.discard(overflow).await;
                Ok(Outcome { task_type, overflow })
            }
            Err(error) if error.is_retryable() => Err(error),
            Err(error) => {
                self.discard(overflow).await;
                Err(error)
            }
        }
    }

    /// Fetches and decodes the stored payload behind `handle`.
    async fn load_overflow(&self, handle: OverflowId, deadline: Instant) -> Result<Payload, DeferError> {
        let bytes = within(deadline, "overflow get", async {
            self.store.get(handle).await.map_err(DeferError::from)
        })
        .await?;

        match self.codec.decode(&bytes) {
            Ok(task @ Payload::Task { .. }) => Ok(task),
            Ok(Payload::Indirection(inner)) => {
                discard_overflow(&self.store, handle, self.cleanup_timeout).await;
                Err(DeferError::permanent(format!(
                    "overflow record {handle} points at another record {inner}"
                )))
            }
            Err(error) => {
                discard_overflow(&self.store, handle, self.cleanup_timeout).await;
                Err(error)
            }
        }
    }

    async fn discard(&self, overflow: Option<OverflowId>) {
        if let Some(handle) = overflow {
            discard_overflow(&self.store, handle, self.cleanup_timeout).await;
        }
    }

    /// HTTP status a task endpoint should answer with.
    ///
    /// Only retryable failures ask the queue to redeliver; anything else is
    /// acknowledged so a doomed task is not retried forever.
    pub fn status_code(result: &Result<Outcome, DeferError>) -> u16 {
        match result {
            Err(error) if error.is_retryable() => 503,
            _ => 200,
        }
    }
}
