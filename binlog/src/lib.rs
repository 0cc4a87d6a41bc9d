pub mod gtid;
pub mod events;
pub mod mutation;
pub mod validator;
pub mod key_provider;
pub mod metadata;
pub mod mapper;

pub use events::log_position::BinlogFilePos;
pub use gtid::GtidSet;
pub use key_provider::{KeyProvider, MysqlKeyProvider};
pub use mutation::{Mutation, MutationType};
