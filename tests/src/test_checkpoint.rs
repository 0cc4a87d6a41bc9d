use std::path::Path;
use std::sync::Arc;

use common::err::decode_error::ReError;
use common::lifecycle::Lifecycle;
use common::log::init_test_log;
use pipe::source::Source;
use pipe::state::{JsonFileStateHistoryRepository, JsonFileStateRepository, StateHistoryRepository, StateRepository};
use pipe::{BinlogSource, BinlogSourceBuilder, DestinationBuilder, NoopMetrics, Pipe};

use crate::support::{pos, temp_dir, transaction, wait_until, Change, RecordingPublisher, ServerHandle, SERVER_UUID};

fn source(handle: &ServerHandle, dir: &Path) -> Arc<BinlogSource> {
    Arc::new(BinlogSourceBuilder::new("users", handle.client())
        .with_server_uuid(SERVER_UUID)
        .with_state_history_size(10)
        .with_state_repository(Arc::new(JsonFileStateRepository::new(dir.join("state.json"))))
        .with_history_repository(Arc::new(JsonFileStateHistoryRepository::new(dir.join("history.json"))))
        .build()
        .unwrap())
}

fn pipe(source: Arc<BinlogSource>, publisher: Arc<RecordingPublisher>) -> Pipe {
    let destination = Arc::new(DestinationBuilder::new("users", publisher).build().unwrap());
    Pipe::new(source, destination, Arc::new(NoopMetrics))
}

fn txn1() -> Vec<binlog::events::binlog_event::BinlogEvent> {
    transaction(100, &[Change::Insert(1, "a"), Change::Insert(2, "b")])
}

fn txn2() -> Vec<binlog::events::binlog_event::BinlogEvent> {
    transaction(200, &[Change::Update(1, "a", "a2")])
}

fn txn3() -> Vec<binlog::events::binlog_event::BinlogEvent> {
    transaction(300, &[Change::Insert(3, "c")])
}

/// Runs txn1 and txn2 with a checkpoint after each.
fn first_run(dir: &Path) {
    let handle = ServerHandle::new(txn1());
    let publisher = Arc::new(RecordingPublisher::default());
    let pipe = pipe(source(&handle, dir), publisher.clone());

    pipe.start().unwrap();
    assert!(wait_until(|| publisher.len() == 2));
    pipe.checkpoint().unwrap();

    handle.append(txn2());
    assert!(wait_until(|| publisher.len() == 3));
    pipe.stop().unwrap();
}

#[test]
fn test_restart_resumes_from_checkpoint() {
    init_test_log();
    let dir = temp_dir();
    first_run(&dir);

    let saved = JsonFileStateRepository::new(dir.join("state.json")).read().unwrap().unwrap();
    assert_eq!(saved.last_position(), &pos(200));
    assert_eq!(saved.last_offset(), 202);

    let json: serde_json::Value = serde_json::from_slice(&std::fs::read(dir.join("state.json")).unwrap()).unwrap();
    assert!(json.get("lastOffset").is_some());
    assert!(json.get("lastTimestamp").is_some());
    assert_eq!(json["lastPosition"]["serverUUID"], SERVER_UUID);
    assert!(json.get("lastId").is_none());

    // the whole file is replayed, the source drops what is behind the checkpoint
    let mut events = txn1();
    events.extend(txn2());
    events.extend(txn3());
    let handle = ServerHandle::new(events);
    let publisher = Arc::new(RecordingPublisher::default());
    let source = source(&handle, &dir);
    let pipe = pipe(source.clone(), publisher.clone());

    pipe.start().unwrap();
    assert_eq!(handle.connects(), vec![pos(200)]);
    assert!(wait_until(|| publisher.len() == 2));
    pipe.stop().unwrap();

    // txn2 was not acknowledged as a whole before, it comes again
    assert_eq!(publisher.user_ids(), vec!["1", "3"]);
    assert_eq!(source.saved_state().unwrap().last_position(), &pos(300));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_history_is_persisted_oldest_first() {
    init_test_log();
    let dir = temp_dir();
    first_run(&dir);

    let states = JsonFileStateHistoryRepository::new(dir.join("history.json")).read().unwrap();
    let positions = states.iter().map(|s| s.last_position().get_position()).collect::<Vec<_>>();
    // the initial state is recorded when the source opens
    assert_eq!(positions, vec![4, 100, 200]);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_invalid_position_rolls_back_history() {
    init_test_log();
    let dir = temp_dir();
    first_run(&dir);

    let mut events = txn1();
    events.extend(txn2());
    let handle = ServerHandle::new(events);
    handle.purge(200);

    let publisher = Arc::new(RecordingPublisher::default());
    let source = source(&handle, &dir);
    let pipe = pipe(source.clone(), publisher.clone());

    let err = pipe.start().unwrap_err();
    assert!(matches!(err, ReError::InvalidPositionErr(_)));
    assert!(!pipe.is_started());
    assert!(!source.is_started());
    assert_eq!(source.failures(), 1);

    // the newest state is dropped, the source resumes one checkpoint earlier
    pipe.start().unwrap();
    assert_eq!(handle.connects(), vec![pos(200), pos(100)]);
    assert_eq!(source.history().last().unwrap().last_position(), &pos(100));
    assert_eq!(JsonFileStateRepository::new(dir.join("state.json")).read().unwrap().unwrap().last_position(), &pos(100));

    assert!(wait_until(|| publisher.len() == 3));
    assert_eq!(publisher.user_ids(), vec!["1", "2", "1"]);

    pipe.stop().unwrap();
    assert_eq!(source.failures(), 0);
    assert_eq!(source.saved_state().unwrap().last_position(), &pos(200));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_rollback_past_history_uses_initial_position() {
    init_test_log();
    let dir = temp_dir();

    let handle = ServerHandle::new(txn1());
    handle.purge(4);
    let source = source(&handle, &dir);

    assert!(source.open().is_err());
    assert!(source.open().is_err());
    assert_eq!(source.failures(), 2);
    assert!(source.history().len() <= 1);
    assert!(handle.connects().iter().all(|p| p.get_position() == 4));

    // a raw mutation carries no binlog position
    let raw = binlog::mutation::RawMutation {
        metadata: binlog::mutation::Metadata::new(1, 0),
        mutation_type: binlog::mutation::MutationType::Insert,
        payload: vec![],
    };
    assert!(source.checkpoint(Some(&raw.into())).is_err());
    assert!(source.checkpoint(None).is_ok());
    let _ = std::fs::remove_dir_all(&dir);
}
