use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};

use crate::events::log_position::BinlogFilePos;

/// Header shared by every binlog event handed to the pipe.
///
/// `offset` 是事件在复制流中的序号, 在一个连接内严格递增, 用作 event id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, CopyGetters)]
pub struct EventHeader {
    #[getset(get_copy = "pub")]
    offset: i64,

    /// 事件创建时间, 毫秒
    #[getset(get_copy = "pub")]
    timestamp: i64,

    /// 产生该事件的 server id
    #[getset(get_copy = "pub")]
    server_id: u32,

    #[getset(get = "pub")]
    file_pos: BinlogFilePos,
}

impl EventHeader {
    pub fn new(offset: i64, timestamp: i64, server_id: u32, file_pos: BinlogFilePos) -> Self {
        EventHeader {
            offset,
            timestamp,
            server_id,
            file_pos,
        }
    }
}
