//! Mock transport wired directly to a [`MockWorker`].

use std::collections::VecDeque;
use std::time::Duration;

use c3qo_protocol::ControlMessage;

use super::worker::MockWorker;
use crate::control::{ChannelError, Transport};

/// Transport that delivers messages to an in-process mock worker
///
/// Replies are queued and returned by `receive` in order. With nothing
/// queued, `receive` returns `None` right away instead of waiting out the
/// timeout.
#[derive(Debug, Default)]
pub struct MockTransport {
    worker: MockWorker,
    inbox: VecDeque<ControlMessage>,
    closed: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::with_worker(MockWorker::new())
    }

    pub fn with_worker(worker: MockWorker) -> Self {
        Self {
            worker,
            inbox: VecDeque::new(),
            closed: false,
        }
    }

    pub fn worker(&self) -> &MockWorker {
        &self.worker
    }

    pub fn worker_mut(&mut self) -> &mut MockWorker {
        &mut self.worker
    }

    /// Queue a message as if the worker had sent it unprompted
    pub fn push_inbound(&mut self, message: ControlMessage) {
        self.inbox.push_back(message);
    }

    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    pub fn close(&mut self) {
        self.closed = true;
    }
}

impl Transport for MockTransport {
    fn send(&mut self, message: &ControlMessage) -> Result<(), ChannelError> {
        if self.closed {
            return Err(ChannelError::Closed);
        }
        message.check_shape()?;
        if let Some(reply) = self.worker.handle(message) {
            self.inbox.push_back(reply);
        }
        Ok(())
    }

    fn receive(&mut self, _timeout: Duration) -> Result<Option<ControlMessage>, ChannelError> {
        if self.closed {
            return Err(ChannelError::Closed);
        }
        Ok(self.inbox.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use c3qo_protocol::{LifecycleCommand, LifecycleVerb};

    #[test]
    fn test_commands_reach_worker() {
        let mut transport = MockTransport::new();
        transport.send_command(&LifecycleCommand::add(3, "hello")).unwrap();
        transport
            .send_command(&LifecycleCommand::new(LifecycleVerb::Init, 3))
            .unwrap();
        transport.send_config_line("3 1 1").unwrap();

        assert_eq!(transport.worker().commands().len(), 2);
        assert_eq!(transport.worker().config_lines(), &["3 1 1".to_string()]);
        assert_eq!(transport.pending(), 0);
    }

    #[test]
    fn test_receive_empty_is_none() {
        let mut transport = MockTransport::new();
        assert!(transport.receive(Duration::from_millis(10)).unwrap().is_none());
    }

    #[test]
    fn test_invalid_message_keeps_transport_usable() {
        let mut transport = MockTransport::new();
        let err = transport
            .send(&ControlMessage::new("bad topic", Vec::new()))
            .unwrap_err();
        assert!(matches!(err, ChannelError::InvalidMessage(_)));
        assert!(transport.worker().received().is_empty());

        transport.send(&ControlMessage::stats_request()).unwrap();
        assert!(transport.receive(Duration::from_millis(10)).unwrap().is_some());
    }

    #[test]
    fn test_closed_transport() {
        let mut transport = MockTransport::new();
        transport.close();
        assert!(matches!(
            transport.send(&ControlMessage::stats_request()),
            Err(ChannelError::Closed)
        ));
        assert!(matches!(
            transport.receive(Duration::from_millis(1)),
            Err(ChannelError::Closed)
        ));
    }

    #[test]
    fn test_push_inbound() {
        let mut transport = MockTransport::new();
        transport.push_inbound(ControlMessage::new("BLOCK.MSG", vec![]));
        let msg = transport.receive(Duration::from_millis(1)).unwrap().unwrap();
        assert_eq!(msg.topic, "BLOCK.MSG");
    }
}
