use crate::events::binlog_event::BinlogEvent;
use crate::mutation::Mutation;

pub mod order_validator;
pub mod schema_validator;

pub use order_validator::{EventOrderValidator, MutationOrderValidator, OrderValidator};
pub use schema_validator::MutationSchemaValidator;

/// Callback invoked with the offending item. Validators only report, they never drop.
pub type ValidationHandler<T> = Box<dyn FnMut(&T) + Send>;

/// Inline check on a stream of items. Each instance keeps its own state.
pub trait Validator<T>: Send {
    fn validate(&mut self, item: &T);

    /// 清除状态, 例如重新连接之后
    fn reset(&mut self);
}

/// Items carrying a sequence id that must not go backwards.
pub trait Sequenced {
    fn sequence_id(&self) -> i64;
}

impl Sequenced for BinlogEvent {
    fn sequence_id(&self) -> i64 {
        self.id()
    }
}

impl Sequenced for Mutation {
    fn sequence_id(&self) -> i64 {
        self.id()
    }
}
