//! deferral-core
//!
//! 型付きのバックグラウンドタスクを HTTP ターゲット型のマネージドキューに
//! 送り、受信側で復元・実行するための部品群。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, options, message, outcome, errors）
//! - **ports**: 抽象化レイヤー（TaskControlPlane, OverflowStore, TransactionScope, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（scheduler, runner, adapter, resolver, sweeper, builder）
//! - **typed**: 型付き Task API（Runnable trait, TypedRegistry, PayloadCodec）
//! - **impls**: 実装（InMemoryControlPlane など開発用）

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod typed;

#[cfg(test)]
mod testing;
