//! Statistics Query
//!
//! Sends the fixed `STATS` request and waits once for the worker's reply.
//! This is the layer where silence becomes an error: a receive that times
//! out is reported as [`StatsError::Timeout`]. Retrying is up to the caller.

use std::time::Duration;

use c3qo_protocol::{decode_stats, ControlMessage, ProtocolError, StatsReply};
use tracing::debug;

use crate::control::{ChannelError, Transport};

/// Statistics query errors
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("No statistics reply within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("Failed to decode statistics reply: {0}")]
    Decode(#[from] ProtocolError),
}

impl StatsError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, StatsError::Timeout(_))
    }
}

/// Request statistics and decode the first reply received within `timeout`
///
/// Replies carry no request identifier. A reply that arrives after an
/// earlier query timed out is still queued on the channel and will be taken
/// as the answer to the next query; callers that retry should drain the
/// channel with short receives first.
pub fn query_stats<C>(channel: &mut C, timeout: Duration) -> Result<StatsReply, StatsError>
where
    C: Transport + ?Sized,
{
    channel.send(&ControlMessage::stats_request())?;

    let reply = channel.receive(timeout)?.ok_or(StatsError::Timeout(timeout))?;
    let stats = decode_stats(&reply.topic, &reply.payload)?;

    debug!(topic = %stats.topic, kind = ?stats.kind, block_id = ?stats.block_id, "Statistics received");
    Ok(stats)
}
