//! PayloadCodec - Runnable とバイト列の相互変換
//!
//! ペイロードはバージョン付き JSON エンベロープです:
//!
//! ```text
//! {"data":{...},"type":"acme.mail.welcome.v1","v":1}
//! ```
//!
//! いったん `serde_json::Value` を経由するため、オブジェクトのキーは常にソートされ、
//! 同じ値からは常に同じバイト列が得られます。
//! デコードは型レジストリに登録済みの型しか復元しません（任意コード実行なし）。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::runnable::Runnable;
use crate::domain::{DeferError, OverflowId};

pub const CODEC_VERSION: u32 = 1;

/// Reserved type of the indirection task.
pub const INDIRECTION_TYPE: &str = "deferral.run_from_store.v1";

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    v: u32,
    #[serde(rename = "type")]
    task_type: String,
    data: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct Indirection {
    handle: OverflowId,
}

/// A decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Points at the real payload in the overflow store.
    Indirection(OverflowId),

    /// A registered task type and its serialized state.
    Task { task_type: String, data: Value },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadCodec;

impl PayloadCodec {
    pub fn new() -> Self {
        Self
    }

    pub fn encode<T: Runnable>(&self, task: &T) -> Result<Vec<u8>, DeferError> {
        let data = serde_json::to_value(task)
            .map_err(|e| DeferError::encoding(format!("{}: {e}", T::TYPE)))?;
        self.seal(T::TYPE, data)
    }

    pub fn encode_indirection(&self, handle: OverflowId) -> Result<Vec<u8>, DeferError> {
        let data = serde_json::to_value(Indirection { handle })
            .map_err(|e| DeferError::encoding(format!("{INDIRECTION_TYPE}: {e}")))?;
        self.seal(INDIRECTION_TYPE, data)
    }

    /// Corrupt bytes, a foreign version or a malformed indirection are all
    /// permanent: no retry can make them valid.
    pub fn decode(&self, bytes: &[u8]) -> Result<Payload, DeferError> {
        let envelope: Envelope = serde_json::from_slice(bytes)
            .map_err(|e| DeferError::permanent(format!("corrupt payload: {e}")))?;

        if envelope.v != CODEC_VERSION {
            return Err(DeferError::permanent(format!(
                "unsupported payload version {} (expected {CODEC_VERSION})",
                envelope.v
            )));
        }

        if envelope.task_type == INDIRECTION_TYPE {
            let indirection: Indirection = serde_json::from_value(envelope.data)
                .map_err(|e| DeferError::permanent(format!("corrupt indirection: {e}")))?;
            return Ok(Payload::Indirection(indirection.handle));
        }

        Ok(Payload::Task {
            task_type: envelope.task_type,
            data: envelope.data,
        })
    }

    /// Decodes `bytes` straight into `T`.
    pub fn decode_as<T: Runnable>(&self, bytes: &[u8]) -> Result<T, DeferError> {
        match self.decode(bytes)? {
            Payload::Task { task_type, data } if task_type == T::TYPE => serde_json::from_value(data)
                .map_err(|e| DeferError::permanent(format!("corrupt {task_type} state: {e}"))),
            Payload::Task { task_type, .. } => Err(DeferError::permanent(format!(
                "expected {} but payload carries {task_type}",
                T::TYPE
            ))),
            Payload::Indirection(handle) => Err(DeferError::permanent(format!(
                "expected {} but payload is an indirection to {handle}",
                T::TYPE
            ))),
        }
    }

    fn seal(&self, task_type: &str, data: Value) -> Result<Vec<u8>, DeferError> {
        let envelope = Envelope {
            v: CODEC_VERSION,
            task_type: task_type.to_string(),
            data,
        };
        let value = serde_json::to_value(&envelope)
            .map_err(|e| DeferError::encoding(format!("{task_type}: {e}")))?;
        serde_json::to_vec(&value).map_err(|e| DeferError::encoding(format!("{task_type}: {e}")))
    }
}
