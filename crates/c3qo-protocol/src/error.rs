//! Error types for the control-plane protocol.

/// Errors raised while building or decoding control-plane payloads.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Unrecognized lifecycle verb: {0}")]
    UnrecognizedVerb(String),

    #[error("Unrecognized topic: {0}")]
    UnrecognizedTopic(String),

    #[error("Invalid topic {0:?}: must be non-empty printable ASCII")]
    InvalidTopic(String),

    #[error("Command payload is missing field '{0}'")]
    MissingField(&'static str),

    #[error("Failed to decode protobuf payload: {0}")]
    Decode(#[from] prost::DecodeError),
}
