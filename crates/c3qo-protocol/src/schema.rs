//! Protobuf wire schemas understood by the worker.
//!
//! These mirror the worker's `conf.proto` and `block.proto` (proto2). Field
//! tags and enum values are part of the worker's versioned contract and must
//! not change.

/// Configuration command (`CONF.PROTO.CMD` payload).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PbcCmd {
    #[prost(enumeration = "CmdType", optional, tag = "1")]
    pub r#type: ::core::option::Option<i32>,
    #[prost(int32, optional, tag = "2")]
    pub block_id: ::core::option::Option<i32>,
    #[prost(string, optional, tag = "3")]
    pub block_arg: ::core::option::Option<::prost::alloc::string::String>,
}

/// Block command numbering shared with the worker's configuration file format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum CmdType {
    CmdAdd = 1,
    CmdInit = 2,
    CmdConf = 3,
    CmdBind = 4,
    CmdStart = 5,
    CmdStop = 6,
}

/// Block message (`BLOCK.MSG` payload).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PbMsgBlock {
    #[prost(enumeration = "MsgType", optional, tag = "1")]
    pub r#type: ::core::option::Option<i32>,
    #[prost(message, optional, tag = "2")]
    pub hello: ::core::option::Option<PbMsgHello>,
    #[prost(message, optional, tag = "3")]
    pub zmq_pair: ::core::option::Option<PbMsgZmqPair>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MsgType {
    MsgHello = 1,
    MsgZmqPair = 2,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PbMsgHello {
    #[prost(int32, optional, tag = "1")]
    pub bk_id: ::core::option::Option<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PbMsgZmqPair {
    #[prost(int32, optional, tag = "1")]
    pub bk_id: ::core::option::Option<i32>,
}
