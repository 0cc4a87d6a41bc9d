use std::collections::BTreeSet;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use common::schema::Row;

pub mod mysql_mutation;

pub use mysql_mutation::{DataSource, MysqlMutation, MysqlMutationMetadata, RowChange, Transaction};

/// 变更类型, 编码为单字节
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum MutationType {
    Invalid = 0,
    Insert = 1,
    Update = 2,
    Delete = 3,
}

impl MutationType {
    pub fn code(&self) -> u8 {
        (*self).into()
    }

    /// Unknown codes decode as `Invalid`.
    pub fn from_code(code: u8) -> MutationType {
        MutationType::try_from(code).unwrap_or(MutationType::Invalid)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
pub struct Metadata {
    /// Strictly increasing upstream
    pub id: i64,

    /// 毫秒
    pub timestamp: i64,
}

impl Metadata {
    pub fn new(id: i64, timestamp: i64) -> Self {
        Metadata {
            id,
            timestamp,
        }
    }
}

/// Mutation without table or row context, e.g. forwarded from a non-MySQL source.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct RawMutation {
    pub metadata: Metadata,
    pub mutation_type: MutationType,
    pub payload: Vec<u8>,
}

/// Change record flowing from a source to a destination.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub enum Mutation {
    Mysql(MysqlMutation),
    Raw(RawMutation),
}

impl Mutation {
    pub fn metadata(&self) -> &Metadata {
        match self {
            Mutation::Mysql(m) => &m.metadata.metadata,
            Mutation::Raw(m) => &m.metadata,
        }
    }

    pub fn id(&self) -> i64 {
        self.metadata().id
    }

    pub fn timestamp(&self) -> i64 {
        self.metadata().timestamp
    }

    pub fn mutation_type(&self) -> MutationType {
        match self {
            Mutation::Mysql(m) => m.mutation_type(),
            Mutation::Raw(m) => m.mutation_type,
        }
    }

    pub fn as_mysql(&self) -> Option<&MysqlMutation> {
        match self {
            Mutation::Mysql(m) => Some(m),
            Mutation::Raw(_) => None,
        }
    }
}

impl From<MysqlMutation> for Mutation {
    fn from(m: MysqlMutation) -> Self {
        Mutation::Mysql(m)
    }
}

impl From<RawMutation> for Mutation {
    fn from(m: RawMutation) -> Self {
        Mutation::Raw(m)
    }
}

/// Columns that differ between two images of a row: names present in only one of
/// them, plus shared names whose values are not equal. Byte values compare by content.
pub fn get_updated_columns(previous: &Row, current: &Row) -> BTreeSet<String> {
    let mut updated = BTreeSet::new();

    for (name, column) in previous.columns() {
        match current.column(name) {
            Some(c) if c.value == column.value => {}
            _ => {
                updated.insert(name.clone());
            }
        }
    }

    for name in current.columns().keys() {
        if previous.column(name).is_none() {
            updated.insert(name.clone());
        }
    }

    updated
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use common::schema::{Column, ColumnDataType, ColumnMetadata, Row, Table, Value};

    use crate::mutation::{get_updated_columns, Metadata, Mutation, MutationType, RawMutation};

    fn table() -> Arc<Table> {
        Arc::new(Table::new(1, "users", "test", vec![
            ColumnMetadata::new("id", ColumnDataType::Long, true, 0),
            ColumnMetadata::new("name", ColumnDataType::VarChar, false, 1),
            ColumnMetadata::new("avatar", ColumnDataType::Blob, false, 2),
        ]))
    }

    fn row(values: Vec<(&str, Value)>) -> Row {
        let table = table();
        let columns = values
            .into_iter()
            .map(|(name, v)| Column::new(table.column(name).unwrap().clone(), v))
            .collect();
        Row::new(table, columns)
    }

    fn names(v: &[&str]) -> BTreeSet<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_type_code() {
        assert_eq!(MutationType::Insert.code(), 1);
        assert_eq!(MutationType::Update.code(), 2);
        assert_eq!(MutationType::Delete.code(), 3);
        assert_eq!(MutationType::Invalid.code(), 0);
        assert_eq!(MutationType::from_code(2), MutationType::Update);
        assert_eq!(MutationType::from_code(99), MutationType::Invalid);
    }

    #[test]
    fn test_updated_columns_value_changed() {
        let previous = row(vec![("id", Value::Long(1)), ("name", "Bob".into())]);
        let current = row(vec![("id", Value::Long(1)), ("name", "Alice".into())]);
        assert_eq!(get_updated_columns(&previous, &current), names(&["name"]));
        assert!(get_updated_columns(&previous, &previous).is_empty());
    }

    #[test]
    fn test_updated_columns_added_and_removed() {
        let previous = row(vec![("id", Value::Long(1)), ("name", "Bob".into())]);
        let current = row(vec![("id", Value::Long(1)), ("avatar", Value::Blob(vec![1]))]);
        assert_eq!(get_updated_columns(&previous, &current), names(&["avatar", "name"]));
        assert_eq!(get_updated_columns(&current, &previous), names(&["avatar", "name"]));
    }

    #[test]
    fn test_updated_columns_bytes_by_content() {
        let previous = row(vec![("id", Value::Long(1)), ("avatar", Value::Blob(vec![1, 2, 3]))]);
        let same = row(vec![("id", Value::Long(1)), ("avatar", Value::Blob(vec![1, 2, 3]))]);
        let changed = row(vec![("id", Value::Long(1)), ("avatar", Value::Blob(vec![1, 2, 4]))]);

        assert!(get_updated_columns(&previous, &same).is_empty());
        assert_eq!(get_updated_columns(&previous, &changed), names(&["avatar"]));
    }

    #[test]
    fn test_null_to_value() {
        let previous = row(vec![("id", Value::Long(1)), ("name", Value::Null)]);
        let current = row(vec![("id", Value::Long(1)), ("name", "Bob".into())]);
        assert_eq!(get_updated_columns(&previous, &current), names(&["name"]));
    }

    #[test]
    fn test_raw_mutation() {
        let m: Mutation = RawMutation {
            metadata: Metadata::new(5, 100),
            mutation_type: MutationType::Insert,
            payload: vec![],
        }.into();
        assert_eq!(m.id(), 5);
        assert_eq!(m.timestamp(), 100);
        assert_eq!(m.mutation_type(), MutationType::Insert);
        assert!(m.as_mysql().is_none());
    }
}
