//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports のインメモリ実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryControlPlane**: ローカル用のタスクキュー制御プレーン
//! - **InMemoryOverflowStore**: overflow ペイロードの退避先
//! - **InMemoryTransaction**: コミットフック付きトランザクションスコープ
//!
//! # 本番用実装
//! 本番用の実装（クラウドのタスクキュー、DB テーブル）は別クレートに配置します。

pub mod inmem_control_plane;
pub mod inmem_overflow;
pub mod inmem_tx;

pub use self::inmem_control_plane::{CreatedTask, DEFAULT_MAX_BODY_BYTES, InMemoryControlPlane};
pub use self::inmem_overflow::{InMemoryOverflowStore, StoreStats};
pub use self::inmem_tx::{InMemoryTransaction, TransactionError};
