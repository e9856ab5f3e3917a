//! c3qo Control-Plane Protocol
//!
//! Topic-framed messages exchanged with the c3qo worker over its control
//! socket. Every message is a two-part unit: an ASCII topic followed by a
//! payload whose format depends on the topic.

pub mod command;
pub mod error;
pub mod message;
pub mod schema;
pub mod stats;
pub mod topic;

pub use command::{decode_command, encode, LifecycleCommand, LifecycleVerb};
pub use error::ProtocolError;
pub use message::ControlMessage;
pub use stats::{decode_stats, encode_stats, BlockMessageKind, StatsReply};
pub use topic::Topic;

/// Payload sent on the `STATS` topic to request a statistics reply.
pub const STATS_REQUEST_MARKER: &[u8] = b"HELLO";

/// Default control endpoint of a locally running worker.
pub const DEFAULT_CONTROL_ENDPOINT: &str = "tcp://127.0.0.1:1664";
