use std::io;
use std::num::ParseIntError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReError {
    #[error("io error: {0}")]
    IoError(#[from] io::Error),

    #[error("parse int error: {0}")]
    ParseIntError(#[from] ParseIntError),

    #[error("json error: {0}")]
    SerdeJsonErr(#[from] serde_json::Error),

    #[error("{0}")]
    String(String),

    #[error("config file parse error: {0}")]
    ConfigFileParseErr(String),

    /// gtid set 字符串格式错误
    #[error("invalid gtid set: {0}")]
    GtidSetParseErr(String),

    /// binlog position 字符串格式错误, 期望 `<file>:<position>:<nextPosition>`
    #[error("invalid binlog position: {0}")]
    BinlogPosParseErr(String),

    /// A column or attribute value could not be decoded. Fatal for the mutation
    /// that carried it.
    #[error("deserialization failed: {message}")]
    DeserializationErr {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("source error: {0}")]
    SourceErr(String),

    #[error("destination error: {0}")]
    DestinationErr(String),

    /// The requested or observed binlog position cannot be resolved by the server.
    #[error("invalid binlog position requested: {0}")]
    InvalidPositionErr(String),

    #[error("illegal state: {0}")]
    IllegalStateErr(String),

    #[error("table not exist: {0}")]
    OpTableNotExistErr(String),

    #[error("state repository error: {0}")]
    StateRepositoryErr(String),
}

impl ReError {
    pub fn deserialization<E>(message: impl Into<String>, source: E) -> Self
        where E: std::error::Error + Send + Sync + 'static {
        ReError::DeserializationErr {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// 当前 source/destination 的尝试是否已经无法继续。
    /// 顺序、schema 校验的问题不会走到这里，它们由 handler 回调处理。
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReError::DeserializationErr { .. }
                | ReError::InvalidPositionErr(_)
                | ReError::SourceErr(_)
                | ReError::DestinationErr(_)
        )
    }

    pub fn is_invalid_position(&self) -> bool {
        matches!(self, ReError::InvalidPositionErr(_))
    }
}
