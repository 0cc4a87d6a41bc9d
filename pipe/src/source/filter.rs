use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::debug;

use binlog::events::binlog_event::BinlogEvent;
use binlog::events::log_position::BinlogFilePos;

/// Decides whether an event goes further down the source pipeline.
pub trait EventFilter: Send {
    fn apply(&mut self, event: &BinlogEvent) -> bool;
}

/// Keeps row events of the subscribed tables (`database.table`). No subscription
/// means every table.
pub struct TableFilter {
    tables: HashSet<String>,
    table_ids: HashSet<i64>,
}

impl TableFilter {
    pub fn new(tables: &[String]) -> Self {
        TableFilter {
            tables: tables.iter().map(|t| t.trim().to_string()).collect(),
            table_ids: HashSet::new(),
        }
    }
}

impl EventFilter for TableFilter {
    fn apply(&mut self, event: &BinlogEvent) -> bool {
        if self.tables.is_empty() {
            return true;
        }

        match event {
            BinlogEvent::TableMap { table, .. } => {
                if self.tables.contains(&table.canonical_name()) {
                    self.table_ids.insert(table.id());
                    true
                } else {
                    self.table_ids.remove(&table.id());
                    false
                }
            }
            BinlogEvent::WriteRows { table_id, .. }
            | BinlogEvent::UpdateRows { table_id, .. }
            | BinlogEvent::DeleteRows { table_id, .. } => self.table_ids.contains(table_id),
            _ => true,
        }
    }
}

/// Drops row events already behind the position the source resumed from. Only
/// positions of the same server are compared.
pub struct DuplicateFilter {
    resumed_from: BinlogFilePos,
}

impl DuplicateFilter {
    pub fn new(resumed_from: BinlogFilePos) -> Self {
        DuplicateFilter {
            resumed_from,
        }
    }
}

impl EventFilter for DuplicateFilter {
    fn apply(&mut self, event: &BinlogEvent) -> bool {
        if !event.is_row_event() {
            return true;
        }

        let pos = event.file_pos();
        if pos.get_server_uuid() != self.resumed_from.get_server_uuid() {
            return true;
        }

        if pos.compare_to(&self.resumed_from) == Ordering::Less {
            debug!("skip duplicated event at {}, resumed from {}", pos, self.resumed_from);
            return false;
        }
        true
    }
}
