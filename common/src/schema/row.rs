use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::schema::data_type::Value;
use crate::schema::table::{ColumnMetadata, Table};

/// 一列数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub metadata: ColumnMetadata,
    pub value: Value,
}

impl Column {
    pub fn new(metadata: ColumnMetadata, value: Value) -> Self {
        Column {
            metadata,
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

/// 一行数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    table: Arc<Table>,
    columns: BTreeMap<String, Column>,
}

impl Row {
    pub fn new(table: Arc<Table>, columns: Vec<Column>) -> Self {
        let columns = columns
            .into_iter()
            .map(|c| (c.metadata.name.clone(), c))
            .collect();

        Row {
            table,
            columns,
        }
    }

    /// Pairs positional values with the table's columns. Extra values are ignored and
    /// missing trailing values leave their columns out of the row.
    pub fn from_values(table: Arc<Table>, values: Vec<Value>) -> Self {
        let columns = table
            .columns()
            .iter()
            .zip(values)
            .map(|(metadata, value)| Column::new(metadata.clone(), value))
            .collect();

        Row::new(table, columns)
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    pub fn columns(&self) -> &BTreeMap<String, Column> {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.columns.get(name).map(|c| &c.value)
    }

    pub fn column_metadata_map(&self) -> HashMap<&str, &ColumnMetadata> {
        self.columns
            .iter()
            .map(|(name, c)| (name.as_str(), &c.metadata))
            .collect()
    }

    /// Concatenation of the primary key values in declared order, without delimiter.
    ///
    /// `None` when the table declares no primary key. A key column that is null or
    /// missing from the row contributes `"null"`.
    pub fn primary_key_value(&self) -> Option<String> {
        let pk = self.table.primary_key_column_names();
        if pk.is_empty() {
            return None;
        }

        let mut value = String::new();
        for name in pk {
            match self.value(name) {
                Some(v) => value.push_str(&v.to_string()),
                None => value.push_str("null"),
            }
        }
        Some(value)
    }
}
