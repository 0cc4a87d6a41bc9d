use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::err::CResult;
use crate::err::decode_error::ReError;

pub const DEFAULT_STATE_HISTORY_SIZE: usize = 50;
pub const DEFAULT_POOL_SIZE: usize = 4;
pub const DEFAULT_BUFFER_SIZE: usize = 1000;
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;
pub const DEFAULT_TABLE_CACHE_CAPACITY: usize = 1000;

/// CDC 配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CdcConfig {
    pub source: SourceConfig,
    pub destination: DestinationConfig,
    pub pipe: PipeConfig,
    pub table_cache: TableCacheConfig,
}

/// Source 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// source 名称，同时也是 pipe 的名称
    pub name: String,

    pub host: String,
    pub port: u16,

    /// 当前连接的 mysql server uuid, 用于位点比较
    pub server_uuid: Option<String>,

    /// 保留的历史 state 数量
    pub state_history_size: usize,

    /// 没有保存的 state 时的起始位点, 如 mysql-bin.000005:4:4
    pub initial_position: Option<String>,

    /// 需要订阅的表(database.table)。为空时订阅全部
    pub tables: Vec<String>,
}

/// Destination 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationConfig {
    /// worker 数量
    pub pool_size: usize,

    /// 每个 worker 的队列长度
    pub buffer_size: usize,

    /// 单次 publish 的最大 mutation 数量
    pub max_batch_size: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipeConfig {
    /// 周期性 checkpoint 的间隔, 为空时只在 stop 时 checkpoint
    pub checkpoint_period_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableCacheConfig {
    pub capacity: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            name: "default".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3306,
            server_uuid: None,
            state_history_size: DEFAULT_STATE_HISTORY_SIZE,
            initial_position: None,
            tables: vec![],
        }
    }
}

impl Default for DestinationConfig {
    fn default() -> Self {
        DestinationConfig {
            pool_size: DEFAULT_POOL_SIZE,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

impl Default for TableCacheConfig {
    fn default() -> Self {
        TableCacheConfig {
            capacity: DEFAULT_TABLE_CACHE_CAPACITY,
        }
    }
}

pub fn read_config<P: AsRef<Path>>(path: P) -> CResult<CdcConfig> {
    let mut file = File::open(path.as_ref())?;
    let mut s = String::new();
    file.read_to_string(&mut s)?;
    parse_config(s.as_str())
}

pub fn parse_config(s: &str) -> CResult<CdcConfig> {
    toml::from_str(s)
        .map_err(|e| ReError::ConfigFileParseErr(e.to_string()))
}
