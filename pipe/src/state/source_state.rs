use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};

use binlog::events::log_position::BinlogFilePos;
use binlog::mutation::MysqlMutation;

const INITIAL_ID: i64 = -1;

fn initial_id() -> i64 {
    INITIAL_ID
}

/// Progress of a source, persisted on checkpoint and used as the resume point.
///
/// json: `{"lastOffset":..,"lastTimestamp":..,"lastPosition":{..}}`. `last_id` only
/// lives in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, CopyGetters)]
#[serde(rename_all = "camelCase")]
pub struct SourceState {
    /// id of the last checkpointed mutation
    #[serde(skip, default = "initial_id")]
    #[getset(get_copy = "pub")]
    last_id: i64,

    /// 最后一个 checkpoint 的 mutation 所在事件的文件偏移
    #[getset(get_copy = "pub")]
    last_offset: i64,

    #[getset(get_copy = "pub")]
    last_timestamp: i64,

    /// 恢复时的起始位点
    #[getset(get = "pub")]
    last_position: BinlogFilePos,
}

impl SourceState {
    pub fn new(last_timestamp: i64, last_offset: i64, last_position: BinlogFilePos) -> Self {
        SourceState {
            last_id: INITIAL_ID,
            last_offset,
            last_timestamp,
            last_position,
        }
    }

    /// 没有任何进度时, 从给定位点开始
    pub fn initial(position: BinlogFilePos) -> Self {
        SourceState::new(0, 0, position)
    }

    /// Resume point after `mutation` was delivered: the beginning of its transaction
    /// when known, so a partially delivered transaction is read again.
    pub fn from_mutation(mutation: &MysqlMutation) -> Self {
        let metadata = &mutation.metadata;
        let last_position = metadata
            .transaction
            .as_ref()
            .map(|t| t.position.clone())
            .unwrap_or_else(|| metadata.file_pos.clone());

        SourceState {
            last_id: metadata.metadata.id,
            last_offset: metadata.file_pos.get_position() as i64,
            last_timestamp: metadata.metadata.timestamp,
            last_position,
        }
    }
}
