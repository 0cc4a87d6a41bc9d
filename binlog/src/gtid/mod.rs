pub mod interval;
pub mod uuid_set;
pub mod gtid_set;

pub use gtid_set::GtidSet;
pub use interval::Interval;
pub use uuid_set::UuidSet;
