pub mod log_position;
pub mod event_header;
pub mod binlog_event;

pub use binlog_event::BinlogEvent;
pub use event_header::EventHeader;
pub use log_position::BinlogFilePos;
