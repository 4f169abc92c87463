//! InMemoryTransaction - コミットフックを持つトランザクションスコープ
//!
//! 実際の DB ドライバの代わりに、接続名ごとの atomic ブロックの入れ子と
//! コミットフックだけを管理します。
//!
//! # 入れ子のルール
//! - 内側のブロックで登録したフックは、内側のコミットで外側に引き継がれる
//! - 内側のロールバックでは、内側のフックだけが捨てられる
//! - 最も外側のコミットでだけ、登録順にフックが実行される
//!
//! フック実行中はロックを保持しません。

use std::collections::HashMap;
use std::sync::Mutex;

use crate::ports::{CommitHook, TransactionScope};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    #[error("no open transaction on connection '{0}'")]
    NotInTransaction(String),
}

/// Per connection: one hook list per open (possibly nested) block.
type Blocks = Vec<Vec<CommitHook>>;

#[derive(Default)]
pub struct InMemoryTransaction {
    connections: Mutex<HashMap<String, Blocks>>,
}

impl InMemoryTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a block on `connection`, nested if one is already open.
    pub fn begin(&self, connection: &str) {
        self.with_blocks(|c| c.entry(connection.to_string()).or_default().push(Vec::new()));
    }

    /// Depth of open blocks on `connection`.
    pub fn depth(&self, connection: &str) -> usize {
        self.with_blocks(|c| c.get(connection).map(Vec::len).unwrap_or(0))
    }

    pub fn pending_hooks(&self, connection: &str) -> usize {
        self.with_blocks(|c| {
            c.get(connection)
                .map(|blocks| blocks.iter().map(Vec::len).sum())
                .unwrap_or(0)
        })
    }

    /// Commits the innermost block; on the outermost one, runs its hooks.
    pub async fn commit(&self, connection: &str) -> Result<(), TransactionError> {
        let hooks = self.with_blocks(|c| -> Result<Vec<CommitHook>, TransactionError> {
            let blocks = c
                .get_mut(connection)
                .ok_or_else(|| TransactionError::NotInTransaction(connection.to_string()))?;
            let hooks = blocks
                .pop()
                .ok_or_else(|| TransactionError::NotInTransaction(connection.to_string()))?;

            match blocks.last_mut() {
                Some(parent) => {
                    parent.extend(hooks);
                    Ok(Vec::new())
                }
                None => {
                    c.remove(connection);
                    Ok(hooks)
                }
            }
        })?;

        if !hooks.is_empty() {
            tracing::debug!(connection, hooks = hooks.len(), "running commit hooks");
        }
        for hook in hooks {
            hook().await;
        }
        Ok(())
    }

    /// Rolls back the innermost block and drops its hooks.
    pub fn rollback(&self, connection: &str) -> Result<(), TransactionError> {
        let dropped = self.with_blocks(|c| -> Result<usize, TransactionError> {
            let blocks = c
                .get_mut(connection)
                .ok_or_else(|| TransactionError::NotInTransaction(connection.to_string()))?;
            let hooks = blocks
                .pop()
                .ok_or_else(|| TransactionError::NotInTransaction(connection.to_string()))?;
            if blocks.is_empty() {
                c.remove(connection);
            }
            Ok(hooks.len())
        })?;

        if dropped > 0 {
            tracing::debug!(connection, hooks = dropped, "rollback dropped commit hooks");
        }
        Ok(())
    }

    fn with_blocks<R>(&self, f: impl FnOnce(&mut HashMap<String, Blocks>) -> R) -> R {
        let mut connections = self.connections.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut connections)
    }
}

impl TransactionScope for InMemoryTransaction {
    fn in_atomic_block(&self, connection: &str) -> bool {
        self.depth(connection) > 0
    }

    fn on_commit(&self, connection: &str, hook: CommitHook) {
        self.with_blocks(|c| match c.get_mut(connection).and_then(|b| b.last_mut()) {
            Some(block) => block.push(hook),
            None => tracing::warn!(connection, "on_commit outside a transaction; hook dropped"),
        });
    }
}
