use std::fmt::{Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// MYSQL 数据类型
///
/// type def ref: https://dev.mysql.com/doc/internals/en/table-map-event.html
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ColumnDataType {
    Decimal = 0,
    Tiny = 1,
    Short = 2,
    Long = 3,
    Float = 4,
    Double = 5,
    Null = 6,
    Timestamp = 7,
    LongLong = 8,
    Int24 = 9,
    Date = 10,
    Time = 11,
    DateTime = 12,
    Year = 13,
    NewDate = 14,
    VarChar = 15,
    Bit = 16,
    Timestamp2 = 17,
    DateTime2 = 18,
    Time2 = 19,

    Invalid = 243,
    Bool = 244,

    /// JSON is MySQL 5.7.8+ type. Not supported in MariaDB.
    Json = 245,
    NewDecimal = 246,
    Enum = 247,
    Set = 248,
    TinyBlob = 249,
    MediumBlob = 250,
    LongBlob = 251,
    Blob = 252,
    VarString = 253,
    String = 254,
    Geometry = 255,
}

impl ColumnDataType {
    /// Types whose values are carried as raw bytes.
    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            ColumnDataType::TinyBlob
                | ColumnDataType::MediumBlob
                | ColumnDataType::LongBlob
                | ColumnDataType::Blob
                | ColumnDataType::Geometry
                | ColumnDataType::Bit
        )
    }
}

/// 列值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,

    Boolean(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    UnsignedLong(u64),

    String(String),
    JSON(String),

    Float(f32),
    Double(f64),

    Decimal(String),

    /// millis from unix time
    Date(i64),
    Time(i64),
    DateTime(i64),
    Timestamp(i64),

    Binary(Vec<u8>),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl Display for Value {
    /// 值的字符串形式, 主键拼接使用。二进制内容按十六进制输出
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Byte(v) => write!(f, "{}", v),
            Value::Short(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::UnsignedLong(v) => write!(f, "{}", v),
            Value::String(v) | Value::JSON(v) | Value::Decimal(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Date(v) | Value::Time(v) | Value::DateTime(v) | Value::Timestamp(v) => write!(f, "{}", v),
            Value::Binary(v) | Value::Blob(v) => write!(f, "{}", hex::encode(v)),
        }
    }
}

macro_rules! define_from {
    ($($ft: ty, $tt: expr); *) => {
        $(impl From<$ft> for Value {
            #[inline]
            fn from(v: $ft) -> Self {
                $tt(v)
            }
        })*
    };
}

define_from!(
    i64, Value::Long;
    u64, Value::UnsignedLong;
    i32, Value::Int;
    i16, Value::Short;
    i8, Value::Byte;
    bool, Value::Boolean;
    f64, Value::Double;
    f32, Value::Float;
    String, Value::String;
    Vec<u8>, Value::Blob
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
