//! Typed - 型付き Runnable API
//!
//! 任意オブジェクトの pickle ではなく、型識別子と登録済みデコーダの組で
//! ペイロードを扱います。
//!
//! # 二層構造
//! - **表層（Typed）**: `Runnable` trait - 型安全
//! - **内部（Dyn）**: `DynHandler` trait - object-safe, type erasure

pub mod codec;
pub mod handler;
pub mod registry;
pub mod runnable;

pub use self::codec::{CODEC_VERSION, INDIRECTION_TYPE, Payload, PayloadCodec};
pub use self::handler::{DynHandler, TypedHandler};
pub use self::registry::{RegistryError, TypedRegistry};
pub use self::runnable::Runnable;
