use binlog::events::binlog_event::BinlogEvent;
use binlog::events::log_position::BinlogFilePos;
use common::err::CResult;

/// Replication stream client. Decoding the MySQL protocol happens behind this trait.
pub trait BinlogClient: Send {
    /// Starts streaming from `from`. An unknown or purged position fails with
    /// `ReError::InvalidPositionErr`.
    fn connect(&mut self, from: &BinlogFilePos) -> CResult<()>;

    /// Next event, or `None` when nothing arrived within the client's poll interval.
    fn next_event(&mut self) -> CResult<Option<BinlogEvent>>;

    fn disconnect(&mut self) -> CResult<()>;
}
