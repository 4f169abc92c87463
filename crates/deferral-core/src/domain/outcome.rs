//! Results reported by `Scheduler::defer` and `Runner::execute`.

use serde::{Deserialize, Serialize};

use super::ids::OverflowId;

/// How a deferred task left the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "handle", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Dispatch {
    /// The payload was enqueued as the task body.
    Inline,

    /// The payload was stashed in the overflow store and an indirection task
    /// referencing it was enqueued.
    Overflow(OverflowId),

    /// Enqueue will happen when the surrounding transaction commits.
    PendingCommit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferReceipt {
    pub name: String,
    pub dispatch: Dispatch,
}

/// A successful execution on the receiving side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub task_type: String,

    /// Overflow record the payload was read from (already deleted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overflow: Option<OverflowId>,
}
