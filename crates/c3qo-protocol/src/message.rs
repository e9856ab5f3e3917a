//! Two-part control message.

use crate::command::{encode, LifecycleCommand};
use crate::error::ProtocolError;
use crate::topic::Topic;
use crate::STATS_REQUEST_MARKER;

/// One unit of control-plane communication.
///
/// A message always has exactly one topic and one payload. Both parts travel
/// together; a unit carrying any other number of parts is malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl ControlMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Lifecycle command serialized for the `CONF.PROTO.CMD` topic.
    pub fn lifecycle(command: &LifecycleCommand) -> Self {
        Self::new(Topic::LifecycleCommand.as_str(), encode(command))
    }

    /// Raw configuration line for the `CONF.LINE` topic.
    pub fn config_line(line: &str) -> Self {
        Self::new(Topic::ConfigLine.as_str(), line.as_bytes())
    }

    /// The fixed statistics request.
    pub fn stats_request() -> Self {
        Self::new(Topic::StatsRequest.as_str(), STATS_REQUEST_MARKER)
    }

    /// Resolve the topic against the known set.
    pub fn known_topic(&self) -> Result<Topic, ProtocolError> {
        self.topic.parse()
    }

    /// Check that the message can be framed on the wire.
    ///
    /// Topics must be non-empty printable ASCII. Payloads are opaque and may
    /// be empty.
    pub fn check_shape(&self) -> Result<(), ProtocolError> {
        let printable = self.topic.bytes().all(|b| b.is_ascii_graphic());
        if self.topic.is_empty() || !printable {
            return Err(ProtocolError::InvalidTopic(self.topic.clone()));
        }
        Ok(())
    }

    /// Build a message from received frames.
    ///
    /// Returns `None` unless there are exactly two frames and the topic is
    /// UTF-8.
    pub fn from_parts(mut parts: Vec<Vec<u8>>) -> Option<Self> {
        if parts.len() != 2 {
            return None;
        }
        let payload = parts.pop()?;
        let topic = String::from_utf8(parts.pop()?).ok()?;
        Some(Self { topic, payload })
    }

    /// Split into wire frames: topic first, then payload.
    pub fn into_parts(self) -> [Vec<u8>; 2] {
        [self.topic.into_bytes(), self.payload]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::LifecycleVerb;

    #[test]
    fn test_stats_request_shape() {
        let msg = ControlMessage::stats_request();
        assert_eq!(msg.topic, "STATS");
        assert_eq!(msg.payload, b"HELLO");
        assert_eq!(msg.known_topic().unwrap(), Topic::StatsRequest);
    }

    #[test]
    fn test_lifecycle_message_uses_command_topic() {
        let cmd = LifecycleCommand::new(LifecycleVerb::Start, 4);
        let msg = ControlMessage::lifecycle(&cmd);
        assert_eq!(msg.topic, "CONF.PROTO.CMD");
        assert_eq!(msg.payload, encode(&cmd));
    }

    #[test]
    fn test_config_line_has_no_terminator() {
        let msg = ControlMessage::config_line("1 1 1");
        assert_eq!(msg.topic, "CONF.LINE");
        assert_eq!(msg.payload, b"1 1 1");
    }

    #[test]
    fn test_check_shape_rejects_bad_topics() {
        assert!(ControlMessage::new("", b"x".to_vec()).check_shape().is_err());
        assert!(ControlMessage::new("CONF LINE", b"x".to_vec()).check_shape().is_err());
        assert!(ControlMessage::new("STATS\u{e9}", b"x".to_vec()).check_shape().is_err());
        assert!(ControlMessage::new("STATS", Vec::new()).check_shape().is_ok());
    }

    #[test]
    fn test_from_parts_requires_two_frames() {
        assert!(ControlMessage::from_parts(vec![b"STATS".to_vec()]).is_none());
        assert!(ControlMessage::from_parts(vec![
            b"STATS".to_vec(),
            b"a".to_vec(),
            b"b".to_vec()
        ])
        .is_none());
        assert!(ControlMessage::from_parts(vec![vec![0xff, 0xfe], b"a".to_vec()]).is_none());

        let msg = ControlMessage::from_parts(vec![b"BLOCK.MSG".to_vec(), vec![8, 1]]).unwrap();
        assert_eq!(msg.topic, "BLOCK.MSG");
        assert_eq!(msg.payload, vec![8, 1]);
    }

    #[test]
    fn test_into_parts_order() {
        let [topic, payload] = ControlMessage::new("STATS", b"HELLO".to_vec()).into_parts();
        assert_eq!(topic, b"STATS");
        assert_eq!(payload, b"HELLO");
    }
}
