//! QueueClientAdapter - 制御プレーンの結果をエラー分類に翻訳する
//!
//! # 翻訳ルール
//! - `InvalidArgument` + "Task size too large" → `Oversize`（overflow への切り替え合図）
//! - それ以外の `InvalidArgument` → `Permanent`（リクエスト不正）
//! - `AlreadyExists` → 初回は `Permanent`（名前の重複）。再試行時は、直前の失敗が
//!   結果不明（`DeadlineExceeded` / `Unavailable` / `Internal`）だった場合だけ成功扱い
//!   （前回の試行が実は届いていた）。それ以外は `Permanent`
//! - その他すべて → `Transient`（ネットワーク、クォータ、認証など）
//!
//! Transient は `RetryPolicy` に従ってこの中で再試行します。

use std::sync::Arc;

use super::retry::RetryPolicy;
use crate::domain::{DeferError, TaskMessage};
use crate::ports::{ControlPlaneCode, ControlPlaneError, TaskAck, TaskControlPlane};

pub struct QueueClientAdapter {
    control_plane: Arc<dyn TaskControlPlane>,
    project: Option<String>,
    location: Option<String>,
    retry: RetryPolicy,
}

impl QueueClientAdapter {
    pub fn new(
        control_plane: Arc<dyn TaskControlPlane>,
        project: Option<String>,
        location: Option<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            control_plane,
            project,
            location,
            retry,
        }
    }

    /// `projects/{project}/locations/{location}/queues/{queue}`
    pub fn queue_path(&self, queue_name: &str) -> Result<String, DeferError> {
        let project = self
            .project
            .as_deref()
            .ok_or_else(|| DeferError::configuration("queue project identifier is not set"))?;
        let location = self
            .location
            .as_deref()
            .ok_or_else(|| DeferError::configuration("queue location identifier is not set"))?;
        if queue_name.is_empty() {
            return Err(DeferError::configuration("queue name must not be empty"));
        }
        Ok(format!(
            "projects/{project}/locations/{location}/queues/{queue_name}"
        ))
    }

    pub async fn enqueue(&self, queue_path: &str, task: &TaskMessage) -> Result<TaskAck, DeferError> {
        let mut attempts = 0;
        let mut may_have_landed = false;
        loop {
            attempts += 1;
            let err = match self.control_plane.create_task(queue_path, task).await {
                Ok(ack) => return Ok(ack),
                Err(err) => err,
            };

            if err.code == ControlPlaneCode::AlreadyExists && may_have_landed {
                tracing::info!(
                    task = %task.name,
                    attempts,
                    "task already exists after retry; earlier attempt landed"
                );
                return Ok(TaskAck {
                    name: format!("{queue_path}/tasks/{}", task.name),
                    schedule_time: task.schedule_time,
                });
            }

            may_have_landed |= outcome_unknown(err.code);
            let translated = translate(err, task.body_len());
            if !translated.is_retryable() || !self.retry.should_retry(attempts) {
                return Err(translated);
            }

            let delay = self.retry.next_delay(attempts);
            tracing::warn!(
                task = %task.name,
                attempts,
                delay_ms = delay.as_millis() as u64,
                error = %translated,
                "enqueue failed; retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Codes after which the task may have been created anyway.
fn outcome_unknown(code: ControlPlaneCode) -> bool {
    matches!(
        code,
        ControlPlaneCode::DeadlineExceeded | ControlPlaneCode::Unavailable | ControlPlaneCode::Internal
    )
}

fn translate(err: ControlPlaneError, body_len: usize) -> DeferError {
    if err.is_body_too_large() {
        return DeferError::Oversize { size: body_len };
    }
    match err.code {
        ControlPlaneCode::InvalidArgument | ControlPlaneCode::AlreadyExists => {
            DeferError::permanent(err.to_string())
        }
        _ => DeferError::transient(err.to_string()),
    }
}
