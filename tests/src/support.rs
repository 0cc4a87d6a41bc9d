use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use binlog::events::binlog_event::BinlogEvent;
use binlog::events::event_header::EventHeader;
use binlog::events::log_position::BinlogFilePos;
use binlog::mutation::Mutation;
use common::err::CResult;
use common::err::decode_error::ReError;
use common::schema::{ColumnDataType, ColumnMetadata, Table, Value};
use pipe::destination::Publisher;
use pipe::source::BinlogClient;

pub const SERVER_UUID: &str = "24bc7850-2c16-11e6-a073-0242ac110001";
pub const FILE: &str = "mysql-bin.000003";
pub const USERS_ID: i64 = 10;
pub const ORDERS_ID: i64 = 11;

pub fn pos(position: u64) -> BinlogFilePos {
    BinlogFilePos::new(FILE, position, position + 1).with_gtid(None, Some(SERVER_UUID))
}

pub fn header(position: u64) -> EventHeader {
    EventHeader::new(position as i64, 1_700_000_000_000 + position as i64, 1, pos(position))
}

pub fn users_table() -> Arc<Table> {
    Arc::new(Table::new(USERS_ID, "users", "test", vec![
        ColumnMetadata::new("id", ColumnDataType::LongLong, true, 0),
        ColumnMetadata::new("name", ColumnDataType::VarChar, false, 1),
    ]))
}

pub fn orders_table() -> Arc<Table> {
    Arc::new(Table::new(ORDERS_ID, "orders", "test", vec![
        ColumnMetadata::new("id", ColumnDataType::LongLong, true, 0),
    ]))
}

fn user(id: i64, name: &str) -> Vec<Value> {
    vec![Value::Long(id), Value::String(name.to_string())]
}

/// One row change on `test.users`.
#[derive(Debug, Clone)]
pub enum Change {
    Insert(i64, &'static str),
    Update(i64, &'static str, &'static str),
    Delete(i64, &'static str),
}

/// BEGIN, table map, one row event per change, XID. Positions start at `start` and
/// grow by one per event.
pub fn transaction(start: u64, changes: &[Change]) -> Vec<BinlogEvent> {
    let mut events = vec![
        BinlogEvent::Query { header: header(start), database: "test".to_string(), sql: "BEGIN".to_string() },
        BinlogEvent::TableMap { header: header(start + 1), table: users_table() },
    ];

    let mut p = start + 2;
    for change in changes {
        let event = match change {
            Change::Insert(id, name) => {
                BinlogEvent::WriteRows { header: header(p), table_id: USERS_ID, rows: vec![user(*id, name)] }
            }
            Change::Update(id, before, after) => BinlogEvent::UpdateRows {
                header: header(p),
                table_id: USERS_ID,
                rows: vec![(user(*id, before), user(*id, after))],
            },
            Change::Delete(id, name) => {
                BinlogEvent::DeleteRows { header: header(p), table_id: USERS_ID, rows: vec![user(*id, name)] }
            }
        };
        events.push(event);
        p += 1;
    }

    events.push(BinlogEvent::Xid { header: header(p), xid: start });
    events
}

pub fn orders_insert(start: u64, id: i64) -> Vec<BinlogEvent> {
    vec![
        BinlogEvent::TableMap { header: header(start), table: orders_table() },
        BinlogEvent::WriteRows { header: header(start + 1), table_id: ORDERS_ID, rows: vec![vec![Value::Long(id)]] },
    ]
}

#[derive(Default)]
struct ServerLog {
    events: Vec<BinlogEvent>,
    purged: HashSet<u64>,
    connects: Vec<BinlogFilePos>,
}

/// Test side of a [`ScriptedClient`], shared with the client handed to the source.
#[derive(Clone, Default)]
pub struct ServerHandle {
    log: Arc<Mutex<ServerLog>>,
}

impl ServerHandle {
    pub fn new(events: Vec<BinlogEvent>) -> Self {
        let handle = ServerHandle::default();
        handle.append(events);
        handle
    }

    pub fn client(&self) -> Box<dyn BinlogClient> {
        Box::new(ScriptedClient { log: self.log.clone(), cursor: 0 })
    }

    pub fn append(&self, events: Vec<BinlogEvent>) {
        self.log.lock().unwrap().events.extend(events);
    }

    /// Connecting at `position` fails with an invalid position error.
    pub fn purge(&self, position: u64) {
        self.log.lock().unwrap().purged.insert(position);
    }

    pub fn connects(&self) -> Vec<BinlogFilePos> {
        self.log.lock().unwrap().connects.clone()
    }
}

/// Replays the scripted log from the beginning of the file on every connect, like a
/// server resuming at file granularity. Events before the resume point come through
/// again and are left to the source to drop.
pub struct ScriptedClient {
    log: Arc<Mutex<ServerLog>>,
    cursor: usize,
}

impl BinlogClient for ScriptedClient {
    fn connect(&mut self, from: &BinlogFilePos) -> CResult<()> {
        let mut log = self.log.lock().unwrap();
        log.connects.push(from.clone());
        if log.purged.contains(&from.get_position()) {
            return Err(ReError::InvalidPositionErr(format!("{} was purged", from)));
        }
        self.cursor = 0;
        Ok(())
    }

    fn next_event(&mut self) -> CResult<Option<BinlogEvent>> {
        let event = self.log.lock().unwrap().events.get(self.cursor).cloned();
        match event {
            Some(e) => {
                self.cursor += 1;
                Ok(Some(e))
            }
            None => {
                thread::sleep(Duration::from_millis(1));
                Ok(None)
            }
        }
    }

    fn disconnect(&mut self) -> CResult<()> {
        Ok(())
    }
}

/// Keeps every published mutation in publish order.
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<Mutation>>,
}

impl RecordingPublisher {
    pub fn published(&self) -> Vec<Mutation> {
        self.published.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    /// Primary key values of the published `test.users` mutations, in publish order.
    pub fn user_ids(&self) -> Vec<String> {
        self.published()
            .iter()
            .filter_map(|m| m.as_mysql())
            .filter(|m| m.table().name() == "users")
            .filter_map(|m| m.row().primary_key_value())
            .collect()
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&self, mutations: &[Mutation]) -> CResult<()> {
        self.published.lock().unwrap().extend_from_slice(mutations);
        Ok(())
    }
}

pub fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    let done = condition();
    if !done {
        tracing::warn!("condition not reached within {:?}", Duration::from_secs(10));
    }
    done
}

pub fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("cdc-pipe-{}", uuid::Uuid::new_v4()))
}
