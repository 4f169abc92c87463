//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: アプリケーションの構築とワイヤリング
//! - **Scheduler**: 送信側（defer）
//! - **Runner**: 受信側（execute）
//! - **QueueClientAdapter**: 制御プレーンのエラー翻訳と再試行
//! - **OptionsResolver**: タスクオプションの正規化
//! - **OverflowSweeper**: 古い overflow レコードの回収

pub mod adapter;
pub mod builder;
pub mod config;
mod deadline;
pub mod resolver;
pub mod retry;
pub mod runner;
pub mod scheduler;
pub mod sweeper;

// 主要な型を再エクスポート
pub use self::adapter::QueueClientAdapter;
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::config::DeferConfig;
pub use self::resolver::OptionsResolver;
pub use self::retry::RetryPolicy;
pub use self::runner::Runner;
pub use self::scheduler::Scheduler;
pub use self::sweeper::OverflowSweeper;
