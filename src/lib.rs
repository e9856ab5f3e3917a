//! c3qo Supervisor
//!
//! Launches and stops the c3qo worker, detects running instances from the
//! live-process table, and drives the worker's control plane: lifecycle
//! commands for blocks and statistics queries over a ZeroMQ `PAIR` socket.

pub mod config;
pub mod control;
pub mod launch;
pub mod mock;
pub mod stats;
pub mod supervisor;

pub use c3qo_protocol as protocol;

pub use config::{ConfigError, SupervisorConfig};
pub use control::{ChannelError, ControlChannel, Transport};
pub use launch::{LaunchCommand, LaunchSpec, LogLevel};
pub use protocol::{ControlMessage, LifecycleCommand, LifecycleVerb, StatsReply, Topic};
pub use stats::{query_stats, StatsError};
pub use supervisor::{ProcTable, ProcessSupervisor, ProcessTable, SupervisorError};
