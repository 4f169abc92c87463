//! TransactionScope port - DB トランザクションへのコミットフック登録
//!
//! 呼び出し側（リクエストハンドラ）がトランザクションを所有し、
//! Scheduler はコールバックを登録するだけです。
//! Scheduler がトランザクションを開始・コミットすることはありません。

use std::future::Future;
use std::pin::Pin;

pub type HookFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Work to run once the owning transaction has committed.
pub type CommitHook = Box<dyn FnOnce() -> HookFuture + Send + 'static>;

pub trait TransactionScope: Send + Sync {
    /// Whether `connection` currently has an open transaction.
    fn in_atomic_block(&self, connection: &str) -> bool;

    /// Registers `hook` against the open transaction on `connection`.
    ///
    /// The hook runs only after a successful commit and is dropped on
    /// rollback. Callers check `in_atomic_block` first.
    fn on_commit(&self, connection: &str, hook: CommitHook);
}

/// Scope for callers that never hold a transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTransaction;

impl TransactionScope for NoTransaction {
    fn in_atomic_block(&self, _connection: &str) -> bool {
        false
    }

    fn on_commit(&self, connection: &str, _hook: CommitHook) {
        tracing::warn!(connection, "on_commit outside a transaction; hook dropped");
    }
}
