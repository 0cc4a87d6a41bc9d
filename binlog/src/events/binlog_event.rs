use std::sync::Arc;

use serde::{Deserialize, Serialize};

use common::schema::{Table, Value};

use crate::events::event_header::EventHeader;
use crate::events::log_position::BinlogFilePos;

/// Decoded binlog events the pipe consumes.
///
/// 协议层的解码不在这里, `BinlogClient` 负责把复制流转换为这些事件。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BinlogEvent {
    /// 表结构映射, 紧跟在行事件之前
    TableMap {
        header: EventHeader,
        table: Arc<Table>,
    },

    WriteRows {
        header: EventHeader,
        table_id: i64,
        rows: Vec<Vec<Value>>,
    },

    /// 每一项为 (before, after)
    UpdateRows {
        header: EventHeader,
        table_id: i64,
        rows: Vec<(Vec<Value>, Vec<Value>)>,
    },

    DeleteRows {
        header: EventHeader,
        table_id: i64,
        rows: Vec<Vec<Value>>,
    },

    Query {
        header: EventHeader,
        database: String,
        sql: String,
    },

    /// 事务提交
    Xid {
        header: EventHeader,
        xid: u64,
    },

    /// `uuid:transaction_id` of the transaction that follows
    Gtid {
        header: EventHeader,
        gtid: String,
    },
}

impl BinlogEvent {
    pub fn header(&self) -> &EventHeader {
        match self {
            BinlogEvent::TableMap { header, .. }
            | BinlogEvent::WriteRows { header, .. }
            | BinlogEvent::UpdateRows { header, .. }
            | BinlogEvent::DeleteRows { header, .. }
            | BinlogEvent::Query { header, .. }
            | BinlogEvent::Xid { header, .. }
            | BinlogEvent::Gtid { header, .. } => header,
        }
    }

    pub fn id(&self) -> i64 {
        self.header().offset()
    }

    pub fn timestamp(&self) -> i64 {
        self.header().timestamp()
    }

    pub fn file_pos(&self) -> &BinlogFilePos {
        self.header().file_pos()
    }

    /// Table id for row and table map events.
    pub fn table_id(&self) -> Option<i64> {
        match self {
            BinlogEvent::TableMap { table, .. } => Some(table.id()),
            BinlogEvent::WriteRows { table_id, .. }
            | BinlogEvent::UpdateRows { table_id, .. }
            | BinlogEvent::DeleteRows { table_id, .. } => Some(*table_id),
            _ => None,
        }
    }

    pub fn is_row_event(&self) -> bool {
        matches!(
            self,
            BinlogEvent::WriteRows { .. } | BinlogEvent::UpdateRows { .. } | BinlogEvent::DeleteRows { .. }
        )
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            BinlogEvent::TableMap { .. } => "TableMap",
            BinlogEvent::WriteRows { .. } => "WriteRows",
            BinlogEvent::UpdateRows { .. } => "UpdateRows",
            BinlogEvent::DeleteRows { .. } => "DeleteRows",
            BinlogEvent::Query { .. } => "Query",
            BinlogEvent::Xid { .. } => "Xid",
            BinlogEvent::Gtid { .. } => "Gtid",
        }
    }
}
