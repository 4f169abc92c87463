//! TaskControlPlane port - リモートのタスクキュー制御プレーン
//!
//! 制御プレーンはワイヤプロトコルを話す外部コラボレーターです。
//! ステータスの解釈（oversize / transient / permanent）は
//! `app::adapter::QueueClientAdapter` が担当します。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::TaskMessage;

/// Marker the control plane puts in an `InvalidArgument` rejection caused
/// solely by the inline body size.
pub const TASK_SIZE_TOO_LARGE: &str = "Task size too large";

/// gRPC-style status codes reported by the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlPlaneCode {
    InvalidArgument,
    AlreadyExists,
    NotFound,
    FailedPrecondition,
    PermissionDenied,
    Unauthenticated,
    ResourceExhausted,
    Unavailable,
    DeadlineExceeded,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("control plane {code:?}: {message}")]
pub struct ControlPlaneError {
    pub code: ControlPlaneCode,
    pub message: String,
}

impl ControlPlaneError {
    pub fn new(code: ControlPlaneCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The rejection an inline body over the size ceiling produces.
    pub fn body_too_large(size: usize, limit: usize) -> Self {
        Self::new(
            ControlPlaneCode::InvalidArgument,
            format!("{TASK_SIZE_TOO_LARGE}: {size} bytes exceeds {limit} bytes"),
        )
    }

    pub fn is_body_too_large(&self) -> bool {
        self.code == ControlPlaneCode::InvalidArgument && self.message.contains(TASK_SIZE_TOO_LARGE)
    }
}

/// Acknowledgement of a created task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskAck {
    /// Fully qualified task resource name.
    pub name: String,
    pub schedule_time: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait TaskControlPlane: Send + Sync {
    async fn create_task(
        &self,
        queue_path: &str,
        task: &TaskMessage,
    ) -> Result<TaskAck, ControlPlaneError>;
}
