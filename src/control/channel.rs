//! ZeroMQ control channel.

use std::time::{Duration, Instant};

use c3qo_protocol::ControlMessage;
use tracing::{debug, warn};

use super::{ChannelError, Transport};

/// Linger applied to new channels
pub const DEFAULT_LINGER: Duration = Duration::from_secs(1);

/// Persistent `PAIR` connection to the worker's control endpoint
///
/// ZeroMQ connects in the background, so [`ControlChannel::open`] only fails
/// for endpoints it cannot parse or whose transport is unsupported. An
/// unreachable worker is not reported at open time; it shows up later as
/// receives that time out.
///
/// Sends made before the connection is up are queued. After [`close`], they
/// keep being flushed for at most the linger period, and dropping the last
/// channel on a context waits for that flush.
///
/// [`close`]: ControlChannel::close
pub struct ControlChannel {
    endpoint: String,
    // Declared before the context so it closes first on drop
    socket: Option<zmq::Socket>,
    context: zmq::Context,
}

impl ControlChannel {
    /// Connect a fresh context to `endpoint`
    pub fn open(endpoint: &str) -> Result<Self, ChannelError> {
        Self::open_in(&zmq::Context::new(), endpoint)
    }

    /// Connect using an existing context (needed for `inproc://` peers)
    pub fn open_in(context: &zmq::Context, endpoint: &str) -> Result<Self, ChannelError> {
        let connect_err = |source| ChannelError::Connect {
            endpoint: endpoint.to_string(),
            source,
        };

        let socket = context.socket(zmq::PAIR).map_err(connect_err)?;
        socket.set_linger(linger_ms(DEFAULT_LINGER)).map_err(connect_err)?;
        socket.connect(endpoint).map_err(connect_err)?;

        debug!(endpoint = %endpoint, "Opened control channel");
        Ok(Self {
            endpoint: endpoint.to_string(),
            socket: Some(socket),
            context: context.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn context(&self) -> &zmq::Context {
        &self.context
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    /// Bound how long queued messages may delay shutdown after close
    pub fn set_linger(&mut self, linger: Duration) -> Result<(), ChannelError> {
        self.socket()?
            .set_linger(linger_ms(linger))
            .map_err(|source| ChannelError::Transport { op: "set_linger", source })
    }

    /// Release the connection; calling it again is a no-op
    pub fn close(&mut self) {
        if self.socket.take().is_some() {
            debug!(endpoint = %self.endpoint, "Closed control channel");
        }
    }

    fn socket(&self) -> Result<&zmq::Socket, ChannelError> {
        self.socket.as_ref().ok_or(ChannelError::Closed)
    }

    /// Wait until the socket is readable or the deadline passes
    fn wait_readable(&self, socket: &zmq::Socket, timeout: Duration) -> Result<bool, ChannelError> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            // Round up so a sub-millisecond remainder still waits
            let timeout_ms = i64::try_from((remaining.as_micros() + 999) / 1000).unwrap_or(i64::MAX);

            let mut items = [socket.as_poll_item(zmq::POLLIN)];
            match zmq::poll(&mut items, timeout_ms) {
                Ok(0) if Instant::now() < deadline => continue,
                Ok(0) => return Ok(false),
                Ok(_) => return Ok(items[0].is_readable()),
                // Interrupted by a signal: poll again for what is left
                Err(zmq::Error::EINTR) if !remaining.is_zero() => continue,
                Err(zmq::Error::EINTR) => return Ok(false),
                Err(source) => return Err(ChannelError::Transport { op: "poll", source }),
            }
        }
    }
}

impl Transport for ControlChannel {
    fn send(&mut self, message: &ControlMessage) -> Result<(), ChannelError> {
        message.check_shape()?;
        let socket = self.socket()?;

        socket
            .send_multipart(
                [message.topic.as_bytes(), message.payload.as_slice()],
                zmq::DONTWAIT,
            )
            .map_err(|source| ChannelError::Transport { op: "send", source })?;

        debug!(
            endpoint = %self.endpoint,
            topic = %message.topic,
            payload_size = message.payload.len(),
            "Control message sent"
        );
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<ControlMessage>, ChannelError> {
        let socket = self.socket()?;

        if !self.wait_readable(socket, timeout)? {
            return Ok(None);
        }

        // Multipart units arrive whole, so reading them consumes every part
        let parts = match socket.recv_multipart(zmq::DONTWAIT) {
            Ok(parts) => parts,
            Err(zmq::Error::EAGAIN) => return Ok(None),
            Err(source) => return Err(ChannelError::Transport { op: "receive", source }),
        };

        let count = parts.len();
        match ControlMessage::from_parts(parts) {
            Some(message) => {
                debug!(
                    endpoint = %self.endpoint,
                    topic = %message.topic,
                    payload_size = message.payload.len(),
                    "Control message received"
                );
                Ok(Some(message))
            }
            None => {
                warn!(endpoint = %self.endpoint, parts = count, "Discarded malformed control message");
                Err(ChannelError::MalformedMessage { parts: count })
            }
        }
    }
}

fn linger_ms(linger: Duration) -> i32 {
    i32::try_from(linger.as_millis()).unwrap_or(i32::MAX)
}

impl Drop for ControlChannel {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_rejects_bad_endpoint() {
        let err = ControlChannel::open("not-an-endpoint").err().unwrap();
        assert!(matches!(err, ChannelError::Connect { ref endpoint, .. } if endpoint == "not-an-endpoint"));

        let err = ControlChannel::open("carrier-pigeon://127.0.0.1:1664").err().unwrap();
        assert!(matches!(err, ChannelError::Connect { .. }));
    }

    #[test]
    fn test_open_unreachable_endpoint_succeeds() {
        let channel = ControlChannel::open("tcp://127.0.0.1:1").unwrap();
        assert!(channel.is_open());
        assert_eq!(channel.endpoint(), "tcp://127.0.0.1:1");
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut channel = ControlChannel::open("tcp://127.0.0.1:1").unwrap();
        channel.close();
        channel.close();
        assert!(!channel.is_open());

        let err = channel.send(&ControlMessage::stats_request()).unwrap_err();
        assert!(matches!(err, ChannelError::Closed));
        let err = channel.receive(Duration::from_millis(1)).unwrap_err();
        assert!(matches!(err, ChannelError::Closed));
    }

    #[test]
    fn test_receive_never_returns_early() {
        let mut channel = ControlChannel::open("tcp://127.0.0.1:1").unwrap();
        for timeout in [Duration::from_micros(1500), Duration::from_micros(300)] {
            let started = Instant::now();
            assert!(channel.receive(timeout).unwrap().is_none());
            assert!(started.elapsed() >= timeout, "returned after {:?}", started.elapsed());
        }
    }

    #[test]
    fn test_set_linger_after_close() {
        let mut channel = ControlChannel::open("tcp://127.0.0.1:1").unwrap();
        channel.set_linger(Duration::ZERO).unwrap();
        channel.close();
        assert!(matches!(channel.set_linger(DEFAULT_LINGER), Err(ChannelError::Closed)));
    }

    #[test]
    fn test_invalid_topic_not_sent() {
        let mut channel = ControlChannel::open("tcp://127.0.0.1:1").unwrap();
        let err = channel.send(&ControlMessage::new("", b"x".to_vec())).unwrap_err();
        assert!(matches!(err, ChannelError::InvalidMessage(_)));
        assert!(channel.is_open());
    }

    #[test]
    fn test_inproc_round_trip() {
        let context = zmq::Context::new();
        let peer = context.socket(zmq::PAIR).unwrap();
        peer.bind("inproc://control-test").unwrap();

        let mut channel = ControlChannel::open_in(&context, "inproc://control-test").unwrap();
        channel.send(&ControlMessage::stats_request()).unwrap();

        let parts = peer.recv_multipart(0).unwrap();
        assert_eq!(parts, vec![b"STATS".to_vec(), b"HELLO".to_vec()]);

        peer.send_multipart([&b"BLOCK.MSG"[..], &[0x08, 0x01][..]], 0).unwrap();
        let reply = channel.receive(Duration::from_secs(5)).unwrap().unwrap();
        assert_eq!(reply.topic, "BLOCK.MSG");
        assert_eq!(reply.payload, vec![0x08, 0x01]);
    }
}
