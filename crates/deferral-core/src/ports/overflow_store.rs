//! OverflowStore port - inline に載らないペイロードの退避先
//!
//! OverflowStore は巨大なペイロードを不透明なハンドルで保存します。
//! 実体はリレーショナルテーブルでもドキュメントストアでも構いません。
//!
//! # 設計原則
//! - ハンドルは `put` ごとに一意で再利用されない
//! - `delete` は冪等（存在しないハンドルの削除はエラーではない）
//! - `get` と `delete` の競合は `NotFound` として解決される（torn read なし）

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{DeferError, OverflowId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverflowRecord {
    pub id: OverflowId,
    pub payload: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("overflow store unavailable: {0}")]
    Unavailable(String),

    #[error("overflow record {0} not found")]
    NotFound(OverflowId),
}

impl From<StoreError> for DeferError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(_) => DeferError::transient(err.to_string()),
            StoreError::NotFound(_) => DeferError::permanent(err.to_string()),
        }
    }
}

#[async_trait]
pub trait OverflowStore: Send + Sync {
    async fn put(&self, payload: Vec<u8>) -> Result<OverflowId, StoreError>;

    async fn get(&self, id: OverflowId) -> Result<Vec<u8>, StoreError>;

    async fn delete(&self, id: OverflowId) -> Result<(), StoreError>;

    /// Deletes records created before `cutoff`; returns how many went.
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError>;
}
