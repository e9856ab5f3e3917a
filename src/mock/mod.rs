//! Mock Worker
//!
//! In-process stand-in for the worker's control plane, for tests that do not
//! need a real worker or socket.
//!
//! Handles:
//! - `CONF.PROTO.CMD`: decode the lifecycle command and update block state
//! - `CONF.LINE`: record the raw configuration line
//! - `STATS`: reply on `BLOCK.MSG` with a hello statistics message
//!
//! Like the real worker, it never replies to configuration messages and
//! logs bad input instead of answering with an error.

mod transport;
mod worker;

pub use transport::MockTransport;
pub use worker::{BlockState, MockBlock, MockWorker, ReplyBehavior};
