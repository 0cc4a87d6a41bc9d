use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::sync::{Arc, Mutex};

use binlog::events::binlog_event::BinlogEvent;
use binlog::events::log_position::BinlogFilePos;
use binlog::mutation::{Mutation, MutationType};
use binlog::MysqlKeyProvider;
use common::config::parse_config;
use common::err::CResult;
use common::err::decode_error::ReError;
use common::lifecycle::Lifecycle;
use common::log::init_test_log;
use common::schema::Value;
use pipe::destination::{Codec, JsonCodec, StreamPublisher};
use pipe::metrics::MetricsSnapshot;
use pipe::source::BinlogClient;
use pipe::{BinlogSource, BinlogSourceBuilder, DestinationBuilder, Pipe, PipeMetrics, PooledDestination};

use crate::support::{header, orders_insert, pos, transaction, users_table, wait_until, Change, RecordingPublisher,
                     ServerHandle, SERVER_UUID, USERS_ID};

struct Fixture {
    source: Arc<BinlogSource>,
    destination: Arc<PooledDestination>,
    metrics: Arc<PipeMetrics>,
    pipe: Pipe,
}

fn fixture(handle: &ServerHandle, publisher: Arc<RecordingPublisher>, pool_size: usize, tables: Vec<String>) -> Fixture {
    let source = Arc::new(BinlogSourceBuilder::new("users", handle.client())
        .with_server_uuid(SERVER_UUID)
        .with_tables(tables)
        .build()
        .unwrap());
    let destination = Arc::new(DestinationBuilder::new("users", publisher)
        .with_pool(pool_size, Arc::new(MysqlKeyProvider))
        .with_buffer(4)
        .with_max_batch_size(3)
        .build()
        .unwrap());
    let metrics = Arc::new(PipeMetrics::new("users"));
    let pipe = Pipe::new(source.clone(), destination.clone(), metrics.clone());

    Fixture { source, destination, metrics, pipe }
}

fn types_by_key(mutations: &[Mutation]) -> BTreeMap<String, Vec<(i64, MutationType)>> {
    let mut by_key: BTreeMap<String, Vec<(i64, MutationType)>> = BTreeMap::new();
    for m in mutations {
        let key = m.as_mysql().unwrap().row().primary_key_value().unwrap();
        by_key.entry(key).or_default().push((m.id(), m.mutation_type()));
    }
    by_key
}

#[test]
fn test_per_key_order_with_pool() {
    init_test_log();

    let mut events = transaction(100, &[Change::Insert(1, "a"), Change::Insert(2, "b"), Change::Insert(3, "c")]);
    events.extend(transaction(200, &[
        Change::Update(1, "a", "a2"), Change::Update(2, "b", "b2"), Change::Delete(3, "c"),
    ]));
    events.extend(transaction(300, &[Change::Update(1, "a2", "a3"), Change::Delete(2, "b2")]));
    let handle = ServerHandle::new(events);

    let publisher = Arc::new(RecordingPublisher::default());
    let f = fixture(&handle, publisher.clone(), 4, vec![]);
    f.pipe.start().unwrap();
    assert!(f.pipe.is_started());
    assert_eq!(f.destination.pool_size(), 4);

    assert!(wait_until(|| publisher.len() == 8));
    assert!(wait_until(|| f.destination.pending() == 0));

    let by_key = types_by_key(&publisher.published());
    let types = |key: &str| by_key[key].iter().map(|(_, t)| *t).collect::<Vec<_>>();
    assert_eq!(types("1"), vec![MutationType::Insert, MutationType::Update, MutationType::Update]);
    assert_eq!(types("2"), vec![MutationType::Insert, MutationType::Update, MutationType::Delete]);
    assert_eq!(types("3"), vec![MutationType::Insert, MutationType::Delete]);
    for ids in by_key.values() {
        assert!(ids.windows(2).all(|w| w[0].0 < w[1].0));
    }

    f.pipe.stop().unwrap();
    assert!(!f.pipe.is_started());

    let saved = f.source.saved_state().unwrap();
    assert_eq!(saved.last_position(), &pos(300));
    assert_eq!(saved.last_offset(), 303);
    assert_eq!(f.source.validation_failures(), 0);
    assert_eq!(f.metrics.snapshot(), MetricsSnapshot { received: 8, published: 8, errors: 0, checkpoints: 1 });
}

#[test]
fn test_update_columns_and_transaction() {
    init_test_log();

    let handle = ServerHandle::new(transaction(100, &[Change::Insert(1, "a"), Change::Update(1, "a", "b")]));
    let publisher = Arc::new(RecordingPublisher::default());
    let f = fixture(&handle, publisher.clone(), 1, vec![]);
    f.pipe.start().unwrap();
    assert!(wait_until(|| publisher.len() == 2));
    f.pipe.stop().unwrap();

    let published = publisher.published();
    let update = published[1].as_mysql().unwrap();
    assert_eq!(update.mutation_type(), MutationType::Update);
    assert_eq!(update.updated_columns(), Some(&BTreeSet::from(["name".to_string()])));
    assert_eq!(update.previous_row().unwrap().value("name"), Some(&Value::String("a".to_string())));
    assert_eq!(update.file_pos(), &pos(103));

    let transaction = update.metadata.transaction.as_ref().unwrap();
    assert_eq!(transaction.position, pos(100));
    assert_eq!(update.metadata.data_source, f.source.data_source().clone());
}

#[test]
fn test_table_filter() {
    init_test_log();

    let mut events = orders_insert(50, 7);
    events.extend(transaction(100, &[Change::Insert(1, "a")]));
    events.extend(orders_insert(150, 8));
    events.extend(transaction(200, &[Change::Insert(2, "b")]));
    let handle = ServerHandle::new(events);

    let publisher = Arc::new(RecordingPublisher::default());
    let f = fixture(&handle, publisher.clone(), 2, vec!["test.users".to_string()]);
    f.pipe.start().unwrap();
    assert!(wait_until(|| publisher.len() == 2));
    f.pipe.stop().unwrap();

    assert!(publisher.published().iter().all(|m| m.as_mysql().unwrap().table().name() == "users"));
    assert!(f.source.table_cache().get_by_name("test", "orders").is_none());
    assert!(f.source.table_cache().contains(USERS_ID));
}

#[test]
fn test_violations_are_reported_not_dropped() {
    init_test_log();

    let mut events = transaction(100, &[Change::Insert(1, "a")]);
    // behind the previous transaction
    events.extend(transaction(50, &[Change::Insert(2, "b")]));
    // a row missing the name column
    events.push(BinlogEvent::WriteRows { header: header(400), table_id: USERS_ID, rows: vec![vec![Value::Long(3)]] });
    let handle = ServerHandle::new(events);

    let publisher = Arc::new(RecordingPublisher::default());
    let f = fixture(&handle, publisher.clone(), 1, vec![]);
    f.pipe.start().unwrap();
    assert!(wait_until(|| publisher.len() == 3));
    f.pipe.stop().unwrap();

    assert_eq!(publisher.user_ids(), vec!["1", "2", "3"]);
    // one event and one mutation out of order, one schema mismatch
    assert_eq!(f.source.validation_failures(), 3);
}

#[test]
fn test_unknown_table_stops_source() {
    init_test_log();

    let handle = ServerHandle::new(vec![
        BinlogEvent::WriteRows { header: header(100), table_id: 99, rows: vec![vec![Value::Long(1)]] },
    ]);
    let publisher = Arc::new(RecordingPublisher::default());
    let f = fixture(&handle, publisher.clone(), 1, vec![]);
    f.pipe.start().unwrap();

    assert!(wait_until(|| !f.pipe.is_started()));
    assert!(wait_until(|| f.metrics.snapshot().errors == 1));
    assert_eq!(publisher.len(), 0);
    f.pipe.stop().unwrap();
}

/// Fails the first read after being created, then behaves like the wrapped client.
struct FlakyClient {
    inner: Box<dyn BinlogClient>,
    failed: bool,
}

impl BinlogClient for FlakyClient {
    fn connect(&mut self, from: &BinlogFilePos) -> CResult<()> {
        self.inner.connect(from)
    }

    fn next_event(&mut self) -> CResult<Option<BinlogEvent>> {
        if !self.failed {
            self.failed = true;
            return Err(ReError::SourceErr("connection reset".to_string()));
        }
        self.inner.next_event()
    }

    fn disconnect(&mut self) -> CResult<()> {
        self.inner.disconnect()
    }
}

#[test]
fn test_restart_after_source_failure() {
    init_test_log();

    let handle = ServerHandle::new(transaction(100, &[Change::Insert(1, "a")]));
    let client = Box::new(FlakyClient { inner: handle.client(), failed: false });
    let source = Arc::new(BinlogSourceBuilder::new("users", client)
        .with_server_uuid(SERVER_UUID)
        .build()
        .unwrap());
    let publisher = Arc::new(RecordingPublisher::default());
    let destination = Arc::new(DestinationBuilder::new("users", publisher.clone()).build().unwrap());
    let metrics = Arc::new(PipeMetrics::new("users"));
    let pipe = Pipe::new(source.clone(), destination.clone(), metrics.clone());

    pipe.start().unwrap();
    assert!(wait_until(|| !pipe.is_started()));
    // the destination stays open while the source is down
    assert!(destination.is_started());

    pipe.start().unwrap();
    assert!(pipe.is_started());
    assert!(wait_until(|| publisher.len() == 1));
    pipe.stop().unwrap();

    assert_eq!(publisher.user_ids(), vec!["1"]);
    assert_eq!(handle.connects().len(), 2);
    let snapshot = metrics.snapshot();
    assert_eq!((snapshot.received, snapshot.published, snapshot.errors), (1, 1, 1));
}

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_config_and_json_lines() {
    init_test_log();

    let config = parse_config(&format!(r#"
        [source]
        name = "users_db"
        server_uuid = "{}"
        initial_position = "mysql-bin.000002:4:4"
        tables = ["test.users"]

        [destination]
        pool_size = 2
        buffer_size = 2
        max_batch_size = 2

        [pipe]
        checkpoint_period_ms = 20
    "#, SERVER_UUID)).unwrap();

    let handle = ServerHandle::new(transaction(100, &[Change::Insert(1, "a"), Change::Insert(2, "b")]));
    let buf = SharedBuf::default();

    let source = Arc::new(BinlogSourceBuilder::new("ignored", handle.client())
        .with_config(&config.source)
        .unwrap()
        .build()
        .unwrap());
    let destination = Arc::new(DestinationBuilder::from_config(
        "users_db", Arc::new(StreamPublisher::new(buf.clone())), &config.destination)
        .build()
        .unwrap());
    let pipe = Pipe::new(source.clone(), destination.clone(), Arc::new(PipeMetrics::new("users_db")))
        .with_config(&config.pipe);
    assert_eq!(pipe.name(), "users_db");
    assert_eq!(destination.pool_size(), 2);

    pipe.start().unwrap();
    assert_eq!(handle.connects()[0].get_file_name(), "mysql-bin.000002");
    assert_eq!(handle.connects()[0].get_server_uuid(), Some(SERVER_UUID));

    // the periodic checkpoint catches up without a stop
    assert!(wait_until(|| source.saved_state().map(|s| s.last_position() == &pos(100)).unwrap_or(false)));
    pipe.stop().unwrap();

    let codec = JsonCodec::new();
    let out = buf.0.lock().unwrap().clone();
    let mut ids = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|line| codec.decode(line.as_bytes()).unwrap())
        .map(|m| m.as_mysql().unwrap().row().primary_key_value().unwrap())
        .collect::<Vec<_>>();
    ids.sort();
    assert_eq!(ids, vec!["1", "2"]);

    let table = users_table();
    assert_eq!(source.table_cache().get(USERS_ID).as_deref(), Some(table.as_ref()));
}
