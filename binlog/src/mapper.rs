use std::sync::Arc;

use tracing::debug;

use common::err::CResult;
use common::err::decode_error::ReError;
use common::schema::{Row, Table};

use crate::events::binlog_event::BinlogEvent;
use crate::events::event_header::EventHeader;
use crate::metadata::table_cache::TableCache;
use crate::mutation::{DataSource, Metadata, Mutation, MysqlMutation, MysqlMutationMetadata, Transaction};

/// Converts binlog events into mutations.
///
/// Table map events fill the schema cache, row events are turned into one mutation per
/// row. `BEGIN`, GTID and XID events track the transaction each mutation belongs to.
pub struct EventMapper {
    data_source: DataSource,
    table_cache: TableCache,

    /// gtid 事件之后, BEGIN 之前
    pending_gtid: Option<String>,
    transaction: Option<Transaction>,
}

impl EventMapper {
    pub fn new(data_source: DataSource, table_cache: TableCache) -> Self {
        EventMapper {
            data_source,
            table_cache,
            pending_gtid: None,
            transaction: None,
        }
    }

    pub fn table_cache(&self) -> &TableCache {
        &self.table_cache
    }

    pub fn current_transaction(&self) -> Option<&Transaction> {
        self.transaction.as_ref()
    }

    /// 重新连接后事务状态失效
    pub fn reset(&mut self) {
        self.pending_gtid = None;
        self.transaction = None;
    }

    pub fn map(&mut self, event: &BinlogEvent) -> CResult<Vec<Mutation>> {
        let mutations = match event {
            BinlogEvent::TableMap { table, .. } => {
                self.table_cache.register(table.clone());
                vec![]
            }
            BinlogEvent::Gtid { gtid, .. } => {
                self.pending_gtid = Some(gtid.clone());
                vec![]
            }
            BinlogEvent::Query { header, sql, .. } => {
                self.on_query(header, sql);
                vec![]
            }
            BinlogEvent::Xid { .. } => {
                self.transaction = None;
                vec![]
            }
            BinlogEvent::WriteRows { header, table_id, rows } => {
                let table = self.table(*table_id)?;
                rows.iter()
                    .enumerate()
                    .map(|(i, values)| {
                        let row = Row::from_values(table.clone(), values.clone());
                        Mutation::from(MysqlMutation::insert(self.metadata(header, &table, i), row))
                    })
                    .collect()
            }
            BinlogEvent::UpdateRows { header, table_id, rows } => {
                let table = self.table(*table_id)?;
                rows.iter()
                    .enumerate()
                    .map(|(i, (before, after))| {
                        let previous = Row::from_values(table.clone(), before.clone());
                        let row = Row::from_values(table.clone(), after.clone());
                        Mutation::from(MysqlMutation::update(self.metadata(header, &table, i), previous, row))
                    })
                    .collect()
            }
            BinlogEvent::DeleteRows { header, table_id, rows } => {
                let table = self.table(*table_id)?;
                rows.iter()
                    .enumerate()
                    .map(|(i, values)| {
                        let row = Row::from_values(table.clone(), values.clone());
                        Mutation::from(MysqlMutation::delete(self.metadata(header, &table, i), row))
                    })
                    .collect()
            }
        };

        Ok(mutations)
    }

    fn on_query(&mut self, header: &EventHeader, sql: &str) {
        let sql = sql.trim();
        if sql.eq_ignore_ascii_case("BEGIN") {
            self.transaction = Some(Transaction {
                timestamp: header.timestamp(),
                offset: header.offset(),
                position: header.file_pos().clone(),
                gtid: self.pending_gtid.take(),
            });
        } else if sql.eq_ignore_ascii_case("COMMIT") {
            self.transaction = None;
        } else {
            debug!("skip query event at {}: {}", header.file_pos(), sql);
        }
    }

    fn table(&self, table_id: i64) -> CResult<Arc<Table>> {
        self.table_cache
            .get(table_id)
            .ok_or_else(|| ReError::OpTableNotExistErr(format!("table id {}", table_id)))
    }

    fn metadata(&self, header: &EventHeader, table: &Arc<Table>, row_position: usize) -> MysqlMutationMetadata {
        MysqlMutationMetadata {
            metadata: Metadata::new(header.offset(), header.timestamp()),
            data_source: self.data_source.clone(),
            file_pos: header.file_pos().clone(),
            table: table.clone(),
            server_id: header.server_id(),
            transaction: self.transaction.clone(),
            event_row_position: row_position as i32,
        }
    }
}
