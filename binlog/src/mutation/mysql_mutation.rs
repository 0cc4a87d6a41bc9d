use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use common::schema::{Row, Table};

use crate::events::log_position::BinlogFilePos;
use crate::mutation::{get_updated_columns, Metadata, MutationType};

/// Where the mutation was read from.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
pub struct DataSource {
    pub host: String,
    pub port: u16,
    /// 所属服务(source 名称)
    pub service: String,
}

impl DataSource {
    pub fn new(host: &str, port: u16, service: &str) -> Self {
        DataSource {
            host: host.to_string(),
            port,
            service: service.to_string(),
        }
    }
}

/// 行变更所属的事务, 在 BEGIN 时确定
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Transaction {
    pub timestamp: i64,
    pub offset: i64,
    pub position: BinlogFilePos,
    pub gtid: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct MysqlMutationMetadata {
    pub metadata: Metadata,
    pub data_source: DataSource,
    /// 产生该变更的事件位点
    pub file_pos: BinlogFilePos,
    pub table: Arc<Table>,
    pub server_id: u32,
    pub transaction: Option<Transaction>,
    /// 在所属行事件中的序号
    pub event_row_position: i32,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub enum RowChange {
    Insert(Row),
    Update {
        previous: Row,
        row: Row,
        updated_columns: BTreeSet<String>,
    },
    Delete(Row),
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct MysqlMutation {
    pub metadata: MysqlMutationMetadata,
    pub change: RowChange,
}

impl MysqlMutation {
    pub fn insert(metadata: MysqlMutationMetadata, row: Row) -> Self {
        MysqlMutation {
            metadata,
            change: RowChange::Insert(row),
        }
    }

    pub fn update(metadata: MysqlMutationMetadata, previous: Row, row: Row) -> Self {
        let updated_columns = get_updated_columns(&previous, &row);
        MysqlMutation {
            metadata,
            change: RowChange::Update {
                previous,
                row,
                updated_columns,
            },
        }
    }

    pub fn delete(metadata: MysqlMutationMetadata, row: Row) -> Self {
        MysqlMutation {
            metadata,
            change: RowChange::Delete(row),
        }
    }

    pub fn mutation_type(&self) -> MutationType {
        match &self.change {
            RowChange::Insert(_) => MutationType::Insert,
            RowChange::Update { .. } => MutationType::Update,
            RowChange::Delete(_) => MutationType::Delete,
        }
    }

    /// The row image after the change; for deletes, the deleted row.
    pub fn row(&self) -> &Row {
        match &self.change {
            RowChange::Insert(row) | RowChange::Delete(row) => row,
            RowChange::Update { row, .. } => row,
        }
    }

    pub fn previous_row(&self) -> Option<&Row> {
        match &self.change {
            RowChange::Update { previous, .. } => Some(previous),
            _ => None,
        }
    }

    pub fn updated_columns(&self) -> Option<&BTreeSet<String>> {
        match &self.change {
            RowChange::Update { updated_columns, .. } => Some(updated_columns),
            _ => None,
        }
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.metadata.table
    }

    pub fn file_pos(&self) -> &BinlogFilePos {
        &self.metadata.file_pos
    }
}
