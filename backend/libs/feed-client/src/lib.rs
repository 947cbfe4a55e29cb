//! Client side of the Nova Pulse live feed
//!
//! - [`engine`]: the pure reconciliation data structure. No I/O; merges the
//!   snapshot, the acknowledgment of the client's own submission, and live
//!   broadcasts into one ordered, duplicate-free feed.
//! - [`api`], [`live`]: HTTP and WebSocket transports.
//! - [`session`]: drives an engine from the transports, including resync
//!   after a dropped live connection.

pub mod api;
pub mod engine;
pub mod error;
pub mod live;
pub mod session;

pub use api::FeedApi;
pub use engine::{MergeOutcome, PendingSubmission, ReconciliationEngine};
pub use error::{ClientError, EngineError};
pub use session::{FeedSession, FeedUpdate, SessionOptions};
