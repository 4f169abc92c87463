//! Errors - エラー型と分類
//!
//! `DeferError` は Scheduler / Runner の呼び出し元に見える唯一のエラー型です。
//! port ごとのエラー（`ControlPlaneError`, `StoreError`）は `From` で変換されます。
//!
//! # 分類
//! - Configuration: 設定・オプション不正（リトライ無意味）
//! - Encoding: Runnable をシリアライズできない
//! - Oversize: inline body 上限超過（Scheduler 内部でのみ扱う）
//! - Transient: 一時的なエラー（リトライ推奨）
//! - Permanent: 恒久的なエラー（リトライ無意味）

use thiserror::Error;

/// ErrorKind は DeferError の運用分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Encoding,
    Oversize,
    Transient,
    Permanent,
}

#[derive(Debug, Error)]
pub enum DeferError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    /// The control plane rejected the task only because of its body size.
    #[error("payload of {size} bytes exceeds the inline task body limit")]
    Oversize { size: usize },

    #[error("transient error: {0}")]
    Transient(String),

    #[error("permanent error: {0}")]
    Permanent(String),

    #[error("deadline exceeded during {0}")]
    DeadlineExceeded(&'static str),
}

impl DeferError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding(message.into())
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Encoding(_) => ErrorKind::Encoding,
            Self::Oversize { .. } => ErrorKind::Oversize,
            Self::Transient(_) | Self::DeadlineExceeded(_) => ErrorKind::Transient,
            Self::Permanent(_) => ErrorKind::Permanent,
        }
    }

    /// Only transient failures can succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}
