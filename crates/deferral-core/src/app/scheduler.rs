//! Scheduler - defer() の本体
//!
//! # フロー
//! 1. OptionsResolver でオプションを正規化（名前と created_at はここで確定）
//! 2. PayloadCodec でシリアライズ
//! 3. トランザクション中ならコミットフックに登録、そうでなければ即 enqueue
//! 4. 制御プレーンが body サイズで拒否したら、overflow store に退避して
//!    ハンドルだけを持つ indirection タスクを enqueue
//!
//! # 副作用の順序
//! - put → indirection enqueue → (失敗時) delete の順を守る
//! - まだ書き込まれていないレコードを参照するタスクは作らない
//! - 自分が制御できる失敗のあとにレコードを残さない
//! - 呼び出し側が future を捨てても OverflowGuard が削除を起動する
//!
//! コミット後・enqueue 前にプロセスが落ちるとタスクは失われます（既知のギャップ）。

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::Instrument;

use super::adapter::QueueClientAdapter;
use super::config::DeferConfig;
use super::deadline::{OverflowGuard, within};
use super::resolver::OptionsResolver;
use crate::domain::{
    DeferError, DeferReceipt, Dispatch, OverflowId, RawTaskOptions, TaskMessage, TaskOptions,
};
use crate::ports::{Clock, HookFuture, IdGenerator, OverflowStore, TaskControlPlane, TransactionScope};
use crate::typed::{PayloadCodec, Runnable};

/// Entry point for deferring work. Cheap to clone.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    resolver: OptionsResolver,
    codec: PayloadCodec,
    adapter: QueueClientAdapter,
    store: Arc<dyn OverflowStore>,
    deadline: Duration,
    cleanup_timeout: Duration,
}

impl Scheduler {
    pub fn new(
        config: &DeferConfig,
        control_plane: Arc<dyn TaskControlPlane>,
        store: Arc<dyn OverflowStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        let adapter = QueueClientAdapter::new(
            control_plane,
            config.project.clone(),
            config.location.clone(),
            config.retry.clone(),
        );
        Self {
            inner: Arc::new(Inner {
                resolver: OptionsResolver::new(config, clock, ids),
                codec: PayloadCodec::new(),
                adapter,
                store,
                deadline: config.deadline,
                cleanup_timeout: config.cleanup_timeout,
            }),
        }
    }

    /// Defers `task` under the configured deadline.
    pub async fn defer<T: Runnable>(
        &self,
        task: &T,
        options: RawTaskOptions,
        scope: &dyn TransactionScope,
    ) -> Result<DeferReceipt, DeferError> {
        let deadline = Instant::now() + self.inner.deadline;
        self.defer_until(task, options, scope, deadline).await
    }

    pub async fn defer_until<T: Runnable>(
        &self,
        task: &T,
        options: RawTaskOptions,
        scope: &dyn TransactionScope,
        deadline: Instant,
    ) -> Result<DeferReceipt, DeferError> {
        let opts = self.inner.resolver.resolve(T::TYPE, options)?;
        let span = tracing::info_span!(
            "defer",
            task_name = %opts.name(),
            task_type = T::TYPE,
            queue = %opts.queue_name(),
        );

        async move {
            let payload = self.inner.codec.encode(task)?;
            let name = opts.name().to_string();
            let connection = opts.connection_name().to_string();

            let in_block = scope.in_atomic_block(&connection);
            let transactional = opts.transactional().unwrap_or(in_block);

            if transactional && in_block {
                let scheduler = self.clone();
                let budget = self.inner.deadline;
                let span = tracing::Span::current();
                scope.on_commit(
                    &connection,
                    Box::new(move || -> HookFuture {
                        Box::pin(
                            async move {
                                let deadline = Instant::now() + budget;
                                match scheduler.schedule_task(payload, &opts, deadline).await {
                                    Ok(dispatch) => {
                                        tracing::debug!(?dispatch, "enqueued after commit")
                                    }
                                    Err(error) => tracing::error!(
                                        %error,
                                        "enqueue after commit failed; task dropped"
                                    ),
                                }
                            }
                            .instrument(span),
                        )
                    }),
                );
                tracing::debug!(%connection, "enqueue waits for commit");
                return Ok(DeferReceipt {
                    name,
                    dispatch: Dispatch::PendingCommit,
                });
            }

            if transactional {
                tracing::debug!(%connection, "no open transaction; enqueueing now");
            }
            let dispatch = self.schedule_task(payload, &opts, deadline).await?;
            Ok::<_, DeferError>(DeferReceipt { name, dispatch })
        }
        .instrument(span)
        .await
    }

    async fn schedule_task(
        &self,
        payload: Vec<u8>,
        opts: &TaskOptions,
        deadline: Instant,
    ) -> Result<Dispatch, DeferError> {
        let inner = &self.inner;
        let queue_path = inner.adapter.queue_path(opts.queue_name())?;
        let message = TaskMessage::build(payload, opts);

        let first = within(deadline, "enqueue", inner.adapter.enqueue(&queue_path, &message)).await;
        match first {
            Ok(ack) => {
                tracing::info!(task = %ack.name, bytes = message.body_len(), "task enqueued");
                Ok(Dispatch::Inline)
            }
            Err(DeferError::Oversize { size }) => {
                self.schedule_overflow(message.http_request.body, opts, &queue_path, size, deadline)
                    .await
            }
            Err(error) => Err(error),
        }
    }

    async fn schedule_overflow(
        &self,
        payload: Vec<u8>,
        opts: &TaskOptions,
        queue_path: &str,
        size: usize,
        deadline: Instant,
    ) -> Result<Dispatch, DeferError> {
        let inner = &self.inner;
        if opts.small_task() {
            return Err(DeferError::permanent(format!(
                "payload of {size} bytes is too large and small_task is set"
            )));
        }

        let handle = within(deadline, "overflow put", async {
            inner.store.put(payload).await.map_err(DeferError::from)
        })
        .await?;
        tracing::debug!(%handle, size, "payload moved to overflow store");

        let guard = OverflowGuard::new(inner.store.clone(), handle, inner.cleanup_timeout);

        match self.enqueue_indirection(handle, opts, queue_path, deadline).await {
            Ok(()) => {
                guard.disarm();
                Ok(Dispatch::Overflow(handle))
            }
            Err(error) => {
                guard.discard().await;
                Err(match error {
                    DeferError::Oversize { size } => DeferError::permanent(format!(
                        "indirection task of {size} bytes rejected as too large"
                    )),
                    other => other,
                })
            }
        }
    }

    async fn enqueue_indirection(
        &self,
        handle: OverflowId,
        opts: &TaskOptions,
        queue_path: &str,
        deadline: Instant,
    ) -> Result<(), DeferError> {
        let inner = &self.inner;
        let body = inner.codec.encode_indirection(handle)?;
        let message = TaskMessage::build(body, opts);
        let ack = within(
            deadline,
            "indirection enqueue",
            inner.adapter.enqueue(queue_path, &message),
        )
        .await?;
        tracing::info!(task = %ack.name, %handle, "indirection task enqueued");
        Ok(())
    }
}
