//! Mock worker state machine.

use std::collections::BTreeMap;

use c3qo_protocol::{
    decode_command, encode_stats, BlockMessageKind, ControlMessage, LifecycleCommand,
    LifecycleVerb, Topic, STATS_REQUEST_MARKER,
};

/// Block identifier the worker reports in its hello statistics
pub const DEFAULT_STATS_BLOCK_ID: i32 = 12;

/// How the mock answers statistics requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyBehavior {
    /// Reply with a valid hello message
    Normal,
    /// Never reply
    Silent,
    /// Reply with an undecodable payload
    Garbage,
}

/// Lifecycle state of a mock block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Added,
    Initialized,
    Started,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockBlock {
    pub block_type: Option<String>,
    pub state: BlockState,
}

/// Configurable mock worker
#[derive(Debug)]
pub struct MockWorker {
    behavior: ReplyBehavior,
    stats_block_id: i32,
    blocks: BTreeMap<i32, MockBlock>,
    commands: Vec<LifecycleCommand>,
    config_lines: Vec<String>,
    received: Vec<ControlMessage>,
    errors: Vec<String>,
}

impl Default for MockWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl MockWorker {
    pub fn new() -> Self {
        Self {
            behavior: ReplyBehavior::Normal,
            stats_block_id: DEFAULT_STATS_BLOCK_ID,
            blocks: BTreeMap::new(),
            commands: Vec::new(),
            config_lines: Vec::new(),
            received: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn with_behavior(mut self, behavior: ReplyBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn with_stats_block_id(mut self, block_id: i32) -> Self {
        self.stats_block_id = block_id;
        self
    }

    pub fn set_behavior(&mut self, behavior: ReplyBehavior) {
        self.behavior = behavior;
    }

    pub fn block(&self, id: i32) -> Option<&MockBlock> {
        self.blocks.get(&id)
    }

    pub fn blocks(&self) -> &BTreeMap<i32, MockBlock> {
        &self.blocks
    }

    /// Successfully decoded lifecycle commands, in arrival order
    pub fn commands(&self) -> &[LifecycleCommand] {
        &self.commands
    }

    pub fn config_lines(&self) -> &[String] {
        &self.config_lines
    }

    /// Every message handed to the worker, valid or not
    pub fn received(&self) -> &[ControlMessage] {
        &self.received
    }

    /// Problems the worker would have logged
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Process one inbound message, returning the reply if any
    pub fn handle(&mut self, message: &ControlMessage) -> Option<ControlMessage> {
        self.received.push(message.clone());

        let topic = match message.known_topic() {
            Ok(topic) => topic,
            Err(e) => {
                self.errors.push(e.to_string());
                return None;
            }
        };

        match topic {
            Topic::LifecycleCommand => {
                match decode_command(&message.payload) {
                    Ok(command) => self.apply(command),
                    Err(e) => self.errors.push(e.to_string()),
                }
                None
            }
            Topic::ConfigLine => {
                self.config_lines
                    .push(String::from_utf8_lossy(&message.payload).into_owned());
                None
            }
            Topic::StatsRequest => {
                if message.payload != STATS_REQUEST_MARKER {
                    self.errors.push("unexpected statistics request payload".to_string());
                    return None;
                }
                self.stats_reply()
            }
            Topic::BlockMessage => {
                self.errors.push("worker does not accept BLOCK.MSG".to_string());
                None
            }
        }
    }

    fn stats_reply(&self) -> Option<ControlMessage> {
        let payload = match self.behavior {
            ReplyBehavior::Silent => return None,
            ReplyBehavior::Normal => encode_stats(BlockMessageKind::Hello, self.stats_block_id),
            ReplyBehavior::Garbage => vec![0xff, 0xff, 0xff],
        };
        Some(ControlMessage::new(Topic::BlockMessage.as_str(), payload))
    }

    fn apply(&mut self, command: LifecycleCommand) {
        let id = command.target_id;
        match command.verb {
            LifecycleVerb::Add => {
                if self.blocks.contains_key(&id) {
                    self.errors.push(format!("block {} already exists", id));
                    return;
                }
                self.blocks.insert(
                    id,
                    MockBlock {
                        block_type: command.arg.clone(),
                        state: BlockState::Added,
                    },
                );
            }
            verb => {
                let Some(block) = self.blocks.get_mut(&id) else {
                    self.errors.push(format!("no block {} for {}", id, verb));
                    return;
                };
                block.state = match verb {
                    LifecycleVerb::Init => BlockState::Initialized,
                    LifecycleVerb::Start => BlockState::Started,
                    _ => BlockState::Stopped,
                };
            }
        }
        self.commands.push(command);
    }
}
