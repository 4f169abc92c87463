//! DynHandler - Runnable 型の型消去
//!
//! # 学習ポイント
//! - Object-safe trait (DynHandler)
//! - Type erasure パターン (TypedHandler<T> → DynHandler)

use std::marker::PhantomData;

use async_trait::async_trait;

use super::runnable::Runnable;
use crate::domain::DeferError;

/// DynHandler は object-safe な Runnable の抽象化
///
/// TypedHandler<T> を DynHandler に変換することで、
/// HashMap<String, Arc<dyn DynHandler>> に格納可能にします。
#[async_trait]
pub trait DynHandler: Send + Sync {
    /// Rebuilds the runnable from its serialized state and runs it.
    async fn handle_dyn(&self, data: serde_json::Value) -> Result<(), DeferError>;

    fn task_type(&self) -> &str;
}

pub struct TypedHandler<T: Runnable> {
    _marker: PhantomData<T>,
}

impl<T: Runnable> TypedHandler<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T: Runnable> Default for TypedHandler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Runnable> DynHandler for TypedHandler<T> {
    async fn handle_dyn(&self, data: serde_json::Value) -> Result<(), DeferError> {
        let task: T = serde_json::from_value(data)
            .map_err(|e| DeferError::permanent(format!("corrupt {} state: {e}", T::TYPE)))?;
        task.run().await
    }

    fn task_type(&self) -> &str {
        T::TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use crate::testing::{EchoTask, runs_of};
    use serde_json::json;

    #[tokio::test]
    async fn typed_handler_runs_decoded_task() {
        let handler = TypedHandler::<EchoTask>::new();
        assert_eq!(handler.task_type(), EchoTask::TYPE);

        handler
            .handle_dyn(json!({ "key": "handler-ok", "message": "hi" }))
            .await
            .unwrap();
        assert_eq!(runs_of("handler-ok"), 1);
    }

    #[tokio::test]
    async fn typed_handler_rejects_foreign_state() {
        let handler = TypedHandler::<EchoTask>::new();
        let err = handler.handle_dyn(json!({ "value": 100 })).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permanent);
    }
}
