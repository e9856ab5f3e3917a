//! Control Plane
//!
//! Two-part topic/payload messaging with the worker:
//! - [`Transport`]: send and bounded receive, implemented by the real
//!   [`ControlChannel`] and by the in-process mock worker for tests
//! - [`ControlChannel`]: persistent ZeroMQ `PAIR` connection to the worker
//!
//! A timed-out receive is `Ok(None)`, not an error. Turning silence into an
//! error is left to application-level queries such as
//! [`crate::stats::query_stats`].

mod channel;

pub use channel::{ControlChannel, DEFAULT_LINGER};

use std::time::Duration;

use c3qo_protocol::{ControlMessage, LifecycleCommand, ProtocolError};

/// Control-plane errors
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to open control channel to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        source: zmq::Error,
    },

    #[error("Transport error during {op}: {source}")]
    Transport {
        op: &'static str,
        source: zmq::Error,
    },

    #[error("Refusing to send invalid message: {0}")]
    InvalidMessage(#[from] ProtocolError),

    #[error("Discarded malformed message with {parts} part(s); expected topic and payload")]
    MalformedMessage { parts: usize },

    #[error("Control channel is closed")]
    Closed,
}

/// Message transport to the worker's control endpoint
///
/// Not safe for concurrent use; one owner per transport.
pub trait Transport {
    /// Queue one message for delivery
    ///
    /// Success means the local transport accepted the message, not that the
    /// worker received it.
    fn send(&mut self, message: &ControlMessage) -> Result<(), ChannelError>;

    /// Wait at most `timeout` for one complete message
    fn receive(&mut self, timeout: Duration) -> Result<Option<ControlMessage>, ChannelError>;

    /// Send a lifecycle command on the command topic
    fn send_command(&mut self, command: &LifecycleCommand) -> Result<(), ChannelError> {
        self.send(&ControlMessage::lifecycle(command))
    }

    /// Send a raw configuration line
    fn send_config_line(&mut self, line: &str) -> Result<(), ChannelError> {
        self.send(&ControlMessage::config_line(line))
    }
}
