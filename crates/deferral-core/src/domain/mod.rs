//! Domain model (errors, ids, options, task message, outcomes).

pub mod errors;
pub mod ids;
pub mod message;
pub mod options;
pub mod outcome;

pub use errors::{DeferError, ErrorKind};
pub use ids::{Id, IdMarker, OverflowId};
pub use message::{HttpMethod, HttpRequest, TaskMessage};
pub use options::{RawTaskOptions, RoutingOptions, TaskOptions};
pub use outcome::{DeferReceipt, Dispatch, Outcome};
