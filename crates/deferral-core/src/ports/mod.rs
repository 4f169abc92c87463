//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（タスクキュー制御プレーン、DB、Blob 退避先など）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! グローバルなシングルトンは持たず、すべてプロセス起動時に構築して
//! Scheduler / Runner に渡します。

pub mod clock;
pub mod control_plane;
pub mod id_generator;
pub mod overflow_store;
pub mod transaction;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::control_plane::{
    ControlPlaneCode, ControlPlaneError, TaskAck, TaskControlPlane, TASK_SIZE_TOO_LARGE,
};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::overflow_store::{OverflowRecord, OverflowStore, StoreError};
pub use self::transaction::{CommitHook, HookFuture, NoTransaction, TransactionScope};
