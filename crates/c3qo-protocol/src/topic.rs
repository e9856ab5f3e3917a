//! Known control-plane topics.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Topic tag selecting which handler the worker applies to a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    /// Serialized lifecycle command (`PbcCmd`)
    #[serde(rename = "CONF.PROTO.CMD")]
    LifecycleCommand,
    /// Raw configuration line in the worker's text format
    #[serde(rename = "CONF.LINE")]
    ConfigLine,
    /// Statistics request
    #[serde(rename = "STATS")]
    StatsRequest,
    /// Block message emitted by the worker (statistics reply)
    #[serde(rename = "BLOCK.MSG")]
    BlockMessage,
}

impl Topic {
    pub const ALL: [Topic; 4] = [
        Topic::LifecycleCommand,
        Topic::ConfigLine,
        Topic::StatsRequest,
        Topic::BlockMessage,
    ];

    /// Wire representation of the topic.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::LifecycleCommand => "CONF.PROTO.CMD",
            Topic::ConfigLine => "CONF.LINE",
            Topic::StatsRequest => "STATS",
            Topic::BlockMessage => "BLOCK.MSG",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::ALL
            .into_iter()
            .find(|topic| topic.as_str() == s)
            .ok_or_else(|| ProtocolError::UnrecognizedTopic(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_wire_strings() {
        assert_eq!(Topic::LifecycleCommand.as_str(), "CONF.PROTO.CMD");
        assert_eq!(Topic::StatsRequest.to_string(), "STATS");
    }

    #[test]
    fn test_topic_parse_known() {
        for topic in Topic::ALL {
            assert_eq!(topic.as_str().parse::<Topic>().unwrap(), topic);
        }
    }

    #[test]
    fn test_topic_parse_unknown() {
        let err = "CONF.XML".parse::<Topic>().unwrap_err();
        assert!(matches!(err, ProtocolError::UnrecognizedTopic(ref t) if t == "CONF.XML"));
    }
}
