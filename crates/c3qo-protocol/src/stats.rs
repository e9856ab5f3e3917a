//! Statistics replies (`BLOCK.MSG` payloads).

use prost::Message;
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::schema::{MsgType, PbMsgBlock, PbMsgHello, PbMsgZmqPair};

/// Which block produced a statistics reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockMessageKind {
    Hello,
    ZmqPair,
    /// Type value not known to this client
    Unrecognized(i32),
    /// The worker did not set the type field
    Unset,
}

/// Decoded statistics reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsReply {
    /// Topic the reply arrived on
    pub topic: String,
    pub kind: BlockMessageKind,
    /// Identifier of the reporting block, when present
    pub block_id: Option<i32>,
}

/// Decode a `PbMsgBlock` payload received on `topic`.
pub fn decode_stats(topic: &str, payload: &[u8]) -> Result<StatsReply, ProtocolError> {
    let msg = PbMsgBlock::decode(payload)?;

    let kind = match msg.r#type {
        None => BlockMessageKind::Unset,
        Some(value) => match MsgType::from_i32(value) {
            Some(MsgType::MsgHello) => BlockMessageKind::Hello,
            Some(MsgType::MsgZmqPair) => BlockMessageKind::ZmqPair,
            None => BlockMessageKind::Unrecognized(value),
        },
    };

    let block_id = match kind {
        BlockMessageKind::Hello => msg.hello.and_then(|h| h.bk_id),
        BlockMessageKind::ZmqPair => msg.zmq_pair.and_then(|z| z.bk_id),
        _ => None,
    };

    Ok(StatsReply {
        topic: topic.to_string(),
        kind,
        block_id,
    })
}

/// Serialize a statistics reply the way the worker's `trans_pb` block does.
pub fn encode_stats(kind: BlockMessageKind, block_id: i32) -> Vec<u8> {
    let mut msg = PbMsgBlock::default();
    match kind {
        BlockMessageKind::Hello => {
            msg.r#type = Some(MsgType::MsgHello as i32);
            msg.hello = Some(PbMsgHello {
                bk_id: Some(block_id),
            });
        }
        BlockMessageKind::ZmqPair => {
            msg.r#type = Some(MsgType::MsgZmqPair as i32);
            msg.zmq_pair = Some(PbMsgZmqPair {
                bk_id: Some(block_id),
            });
        }
        BlockMessageKind::Unrecognized(value) => msg.r#type = Some(value),
        BlockMessageKind::Unset => {}
    }
    msg.encode_to_vec()
}
