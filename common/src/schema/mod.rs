pub mod data_type;
pub mod table;
pub mod row;

pub use data_type::{ColumnDataType, Value};
pub use row::{Column, Row};
pub use table::{ColumnMetadata, Table};
