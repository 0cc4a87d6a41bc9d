use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use common::err::CResult;
use common::err::decode_error::ReError;

use crate::gtid::GtidSet;

/// Binlog 位点: `<file>:<position>:<nextPosition>`, 可附带 gtid 与产生该位点的 server uuid.
///
/// 文件序号取文件名最后一个 `.` 之后的数字部分, `mysql-bin.000012` 与 `mysql-bin.12` 序号相同。
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct BinlogFilePos {
    /// binlog file's name
    file_name: String,

    /// position in file
    position: u64,

    /// position of the event that follows
    next_position: u64,

    #[serde(default)]
    gtid_set: Option<GtidSet>,

    #[serde(default, rename = "serverUUID")]
    server_uuid: Option<String>,
}

impl BinlogFilePos {
    pub fn new(file_name: &str, position: u64, next_position: u64) -> Self {
        BinlogFilePos {
            file_name: file_name.to_string(),
            position,
            next_position,
            gtid_set: None,
            server_uuid: None,
        }
    }

    pub fn new_with_gtid(file_name: &str, position: u64, next_position: u64,
                         gtid_set: Option<GtidSet>, server_uuid: Option<&str>) -> Self {
        BinlogFilePos {
            file_name: file_name.to_string(),
            position,
            next_position,
            gtid_set,
            server_uuid: server_uuid.map(|s| s.trim().to_lowercase()),
        }
    }

    /// Same position, tagged with a gtid set and the server that produced it.
    pub fn with_gtid(mut self, gtid_set: Option<GtidSet>, server_uuid: Option<&str>) -> Self {
        self.gtid_set = gtid_set;
        self.server_uuid = server_uuid.map(|s| s.trim().to_lowercase());
        self
    }

    /// 文件名中 `.` 之后的序号。没有序号或无法解析时为 0
    pub fn file_number_of(file_name: &str) -> u64 {
        file_name
            .rsplit_once('.')
            .and_then(|(_, suffix)| suffix.parse::<u64>().ok())
            .unwrap_or(0)
    }

    pub fn get_file_name(&self) -> &str {
        &self.file_name
    }

    pub fn get_file_number(&self) -> u64 {
        BinlogFilePos::file_number_of(&self.file_name)
    }

    pub fn get_position(&self) -> u64 {
        self.position
    }

    pub fn get_next_position(&self) -> u64 {
        self.next_position
    }

    pub fn get_gtid_set(&self) -> Option<&GtidSet> {
        self.gtid_set.as_ref()
    }

    pub fn get_server_uuid(&self) -> Option<&str> {
        self.server_uuid.as_deref()
    }

    /// Progress ordering between two positions.
    ///
    /// Positions from the same server compare by `(file number, position)`. Across
    /// servers the binlog coordinates are meaningless, so when one gtid set contains the
    /// other the two are treated as the same progress; incomparable or missing gtid sets
    /// fall back to file/position.
    pub fn compare_to(&self, other: &BinlogFilePos) -> Ordering {
        if let (Some(a), Some(b)) = (&self.server_uuid, &other.server_uuid) {
            if a == b {
                return self.compare_file_pos(other);
            }
        }

        if let (Some(a), Some(b)) = (&self.gtid_set, &other.gtid_set) {
            if a.is_contained_within(b) || b.is_contained_within(a) {
                return Ordering::Equal;
            }
        }

        self.compare_file_pos(other)
    }

    fn compare_file_pos(&self, other: &BinlogFilePos) -> Ordering {
        (self.get_file_number(), self.position).cmp(&(other.get_file_number(), other.position))
    }
}

impl FromStr for BinlogFilePos {
    type Err = ReError;

    /// `mysql-bin-changelog.218:14:6`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s.trim().rsplitn(3, ':').collect::<Vec<&str>>();
        if parts.len() != 3 || parts[2].is_empty() {
            return Err(ReError::BinlogPosParseErr(s.to_string()));
        }

        let parse = |v: &str| -> CResult<u64> {
            v.parse::<u64>()
                .map_err(|e| ReError::BinlogPosParseErr(format!("{}, {}", s, e)))
        };

        // rsplitn 逆序返回
        Ok(BinlogFilePos::new(parts[2], parse(parts[1])?, parse(parts[0])?))
    }
}

impl Display for BinlogFilePos {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file_name, self.position, self.next_position)
    }
}
