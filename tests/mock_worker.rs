//! Mock Worker Scenarios
//!
//! End-to-end block configuration against the in-process worker, the same
//! sequence an operator drives over the real control endpoint.

use std::time::Duration;

use c3qo_supervisor::mock::{BlockState, MockTransport, MockWorker, ReplyBehavior};
use c3qo_supervisor::protocol::BlockMessageKind;
use c3qo_supervisor::{query_stats, LifecycleCommand, LifecycleVerb, StatsError, Transport};

const TIMEOUT: Duration = Duration::from_millis(100);

fn configure_hello_block(transport: &mut MockTransport, id: i32) {
    transport.send_command(&LifecycleCommand::add(id, "hello")).unwrap();
    for verb in [LifecycleVerb::Init, LifecycleVerb::Start] {
        transport
            .send_command(&LifecycleCommand::new(verb, id))
            .unwrap();
    }
}

#[test]
fn test_configure_then_query_stats() {
    let mut transport = MockTransport::new();
    configure_hello_block(&mut transport, 1);
    configure_hello_block(&mut transport, 2);

    let worker = transport.worker();
    assert_eq!(worker.blocks().len(), 2);
    assert_eq!(worker.block(2).unwrap().state, BlockState::Started);
    assert!(worker.errors().is_empty());

    let reply = query_stats(&mut transport, TIMEOUT).unwrap();
    assert_eq!(reply.kind, BlockMessageKind::Hello);
    assert_eq!(reply.block_id, Some(12));

    transport
        .send_command(&LifecycleCommand::new(LifecycleVerb::Stop, 1))
        .unwrap();
    assert_eq!(transport.worker().block(1).unwrap().state, BlockState::Stopped);
}

#[test]
fn test_config_lines_are_recorded_verbatim() {
    let mut transport = MockTransport::new();
    transport.send_config_line("1 1 1").unwrap();
    transport.send_config_line("2 1 1").unwrap();

    assert_eq!(transport.worker().config_lines(), ["1 1 1", "2 1 1"]);
    assert!(transport.worker().blocks().is_empty());
}

#[test]
fn test_boxed_transport() {
    let mut transport: Box<dyn Transport> = Box::new(MockTransport::new());
    transport.send_command(&LifecycleCommand::add(7, "zmq_pair")).unwrap();

    let reply = query_stats(transport.as_mut(), TIMEOUT).unwrap();
    assert_eq!(reply.topic, "BLOCK.MSG");
}

#[test]
fn test_silent_worker_then_recovery() {
    let worker = MockWorker::new().with_behavior(ReplyBehavior::Silent);
    let mut transport = MockTransport::with_worker(worker);

    let err = query_stats(&mut transport, TIMEOUT).unwrap_err();
    assert!(err.is_timeout());

    transport.worker_mut().set_behavior(ReplyBehavior::Normal);
    assert!(query_stats(&mut transport, TIMEOUT).is_ok());
}

#[test]
fn test_garbage_reply_is_decode_error() {
    let worker = MockWorker::new().with_behavior(ReplyBehavior::Garbage);
    let mut transport = MockTransport::with_worker(worker);

    let err = query_stats(&mut transport, TIMEOUT).unwrap_err();
    assert!(matches!(err, StatsError::Decode(_)));
}
