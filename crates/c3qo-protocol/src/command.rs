//! Lifecycle commands and their wire encoding.

use std::fmt;
use std::str::FromStr;

use prost::Message;
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::schema::{CmdType, PbcCmd};

/// Lifecycle verb applied to a block.
///
/// Closed set: adding a verb is a protocol version change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleVerb {
    Add,
    Init,
    Start,
    Stop,
}

impl LifecycleVerb {
    pub const ALL: [LifecycleVerb; 4] = [
        LifecycleVerb::Add,
        LifecycleVerb::Init,
        LifecycleVerb::Start,
        LifecycleVerb::Stop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleVerb::Add => "add",
            LifecycleVerb::Init => "init",
            LifecycleVerb::Start => "start",
            LifecycleVerb::Stop => "stop",
        }
    }

    fn to_wire(self) -> CmdType {
        match self {
            LifecycleVerb::Add => CmdType::CmdAdd,
            LifecycleVerb::Init => CmdType::CmdInit,
            LifecycleVerb::Start => CmdType::CmdStart,
            LifecycleVerb::Stop => CmdType::CmdStop,
        }
    }

    fn from_wire(value: i32) -> Result<Self, ProtocolError> {
        match CmdType::from_i32(value) {
            Some(CmdType::CmdAdd) => Ok(LifecycleVerb::Add),
            Some(CmdType::CmdInit) => Ok(LifecycleVerb::Init),
            Some(CmdType::CmdStart) => Ok(LifecycleVerb::Start),
            Some(CmdType::CmdStop) => Ok(LifecycleVerb::Stop),
            // CONF and BIND exist in the worker schema but are not lifecycle verbs
            Some(other) => Err(ProtocolError::UnrecognizedVerb(format!("{:?}", other))),
            None => Err(ProtocolError::UnrecognizedVerb(value.to_string())),
        }
    }
}

impl fmt::Display for LifecycleVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleVerb {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        LifecycleVerb::ALL
            .into_iter()
            .find(|verb| verb.as_str() == lower)
            .ok_or_else(|| ProtocolError::UnrecognizedVerb(s.to_string()))
    }
}

/// A command controlling one block of the worker.
///
/// Built right before sending and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleCommand {
    pub verb: LifecycleVerb,
    pub target_id: i32,
    /// Only meaningful for `Add`, where it names the block type.
    pub arg: Option<String>,
}

impl LifecycleCommand {
    pub fn new(verb: LifecycleVerb, target_id: i32) -> Self {
        Self {
            verb,
            target_id,
            arg: None,
        }
    }

    /// `ADD` a block of the given type.
    pub fn add(target_id: i32, block_type: impl Into<String>) -> Self {
        Self {
            verb: LifecycleVerb::Add,
            target_id,
            arg: Some(block_type.into()),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.arg = Some(arg.into());
        self
    }
}

/// Serialize a lifecycle command as a `PbcCmd`.
pub fn encode(command: &LifecycleCommand) -> Vec<u8> {
    PbcCmd {
        r#type: Some(command.verb.to_wire() as i32),
        block_id: Some(command.target_id),
        block_arg: command.arg.clone(),
    }
    .encode_to_vec()
}

/// Decode a `PbcCmd` payload the way the worker does.
pub fn decode_command(payload: &[u8]) -> Result<LifecycleCommand, ProtocolError> {
    let cmd = PbcCmd::decode(payload)?;
    let verb = LifecycleVerb::from_wire(cmd.r#type.ok_or(ProtocolError::MissingField("type"))?)?;
    let target_id = cmd.block_id.ok_or(ProtocolError::MissingField("block_id"))?;

    Ok(LifecycleCommand {
        verb,
        target_id,
        arg: cmd.block_arg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_every_verb() {
        for verb in LifecycleVerb::ALL {
            let cmd = LifecycleCommand::new(verb, 42).with_arg("hello");
            assert_eq!(decode_command(&encode(&cmd)).unwrap(), cmd);
        }
    }

    #[test]
    fn test_roundtrip_without_arg() {
        let cmd = LifecycleCommand::new(LifecycleVerb::Stop, -3);
        let decoded = decode_command(&encode(&cmd)).unwrap();
        assert_eq!(decoded.arg, None);
        assert_eq!(decoded.target_id, -3);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let cmd = LifecycleCommand::add(1, "hello");
        assert_eq!(encode(&cmd), encode(&cmd.clone()));
    }

    #[test]
    fn test_wire_layout_matches_worker_schema() {
        // type=ADD(1), block_id=7, block_arg="hi"
        let bytes = encode(&LifecycleCommand::add(7, "hi"));
        assert_eq!(bytes, vec![0x08, 0x01, 0x10, 0x07, 0x1a, 0x02, b'h', b'i']);
    }

    #[test]
    fn test_decode_rejects_non_lifecycle_command() {
        let bind = PbcCmd {
            r#type: Some(CmdType::CmdBind as i32),
            block_id: Some(1),
            block_arg: Some("2:5".to_string()),
        }
        .encode_to_vec();
        assert!(matches!(
            decode_command(&bind),
            Err(ProtocolError::UnrecognizedVerb(_))
        ));

        let unknown = PbcCmd {
            r#type: Some(99),
            block_id: Some(1),
            block_arg: None,
        }
        .encode_to_vec();
        assert!(matches!(
            decode_command(&unknown),
            Err(ProtocolError::UnrecognizedVerb(ref v)) if v == "99"
        ));
    }

    #[test]
    fn test_decode_requires_fields() {
        let no_id = PbcCmd {
            r#type: Some(CmdType::CmdStart as i32),
            block_id: None,
            block_arg: None,
        }
        .encode_to_vec();
        assert!(matches!(
            decode_command(&no_id),
            Err(ProtocolError::MissingField("block_id"))
        ));
        assert!(matches!(
            decode_command(&[]),
            Err(ProtocolError::MissingField("type"))
        ));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode_command(&[0xff, 0xff, 0xff]),
            Err(ProtocolError::Decode(_))
        ));
    }

    #[test]
    fn test_verb_parse() {
        assert_eq!("START".parse::<LifecycleVerb>().unwrap(), LifecycleVerb::Start);
        assert_eq!("init".parse::<LifecycleVerb>().unwrap(), LifecycleVerb::Init);
        assert!("bind".parse::<LifecycleVerb>().is_err());
    }
}
