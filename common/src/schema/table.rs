use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::schema::data_type::ColumnDataType;

/// 列元数据
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    pub data_type: ColumnDataType,
    pub is_primary_key: bool,
    /// 列在表中的序号, 从 0 开始
    pub position: i32,
}

impl ColumnMetadata {
    pub fn new(name: &str, data_type: ColumnDataType, is_primary_key: bool, position: i32) -> Self {
        ColumnMetadata {
            name: name.to_string(),
            data_type,
            is_primary_key,
            position,
        }
    }
}

/// Table schema as captured from the schema cache.
///
/// The numeric `id` is what MySQL assigns in the table map event and may change
/// across restarts; `canonical_name` is the stable identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    id: i64,
    name: String,
    database: String,
    /// 按序号排列的列
    columns: Vec<ColumnMetadata>,
    primary_key_column_names: Vec<String>,
}

impl Table {
    /// Builds a table whose primary key is made of the columns flagged as such, in
    /// column order.
    pub fn new(id: i64, name: &str, database: &str, mut columns: Vec<ColumnMetadata>) -> Self {
        columns.sort_by_key(|c| c.position);
        let primary_key_column_names = columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.clone())
            .collect();

        Table::new_with_primary_key(id, name, database, columns, primary_key_column_names)
    }

    /// Builds a table with an explicitly ordered primary key (composite keys may be
    /// declared in an order different from the column order).
    pub fn new_with_primary_key(id: i64, name: &str, database: &str,
                                mut columns: Vec<ColumnMetadata>, primary_key_column_names: Vec<String>) -> Self {
        columns.sort_by_key(|c| c.position);

        let mut seen = Vec::with_capacity(primary_key_column_names.len());
        for pk in primary_key_column_names {
            if !seen.contains(&pk) {
                seen.push(pk);
            }
        }

        Table {
            id,
            name: name.to_string(),
            database: database.to_string(),
            columns,
            primary_key_column_names: seen,
        }
    }

    pub fn canonical_name_of(database: &str, name: &str) -> String {
        format!("{}.{}", database, name)
    }

    pub fn canonical_name(&self) -> String {
        Table::canonical_name_of(&self.database, &self.name)
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn columns(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_map(&self) -> HashMap<&str, &ColumnMetadata> {
        self.columns.iter().map(|c| (c.name.as_str(), c)).collect()
    }

    pub fn primary_key_column_names(&self) -> &[String] {
        &self.primary_key_column_names
    }

    pub fn has_primary_key(&self) -> bool {
        !self.primary_key_column_names.is_empty()
    }
}
