pub mod config;

pub use config::{
    CdcConfig, DestinationConfig, PipeConfig, SourceConfig, TableCacheConfig, parse_config, read_config,
};
