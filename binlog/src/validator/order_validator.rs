use tracing::warn;

use crate::events::binlog_event::BinlogEvent;
use crate::mutation::Mutation;
use crate::validator::{Sequenced, ValidationHandler, Validator};

const INITIAL_ID: i64 = -1;

/// Reports items whose id is lower than the one seen before them.
pub struct OrderValidator<T> {
    name: &'static str,
    last_seen_id: i64,
    handler: ValidationHandler<T>,
}

pub type EventOrderValidator = OrderValidator<BinlogEvent>;

pub type MutationOrderValidator = OrderValidator<Mutation>;

impl<T: Sequenced> OrderValidator<T> {
    pub fn new(name: &'static str, handler: ValidationHandler<T>) -> Self {
        OrderValidator {
            name,
            last_seen_id: INITIAL_ID,
            handler,
        }
    }

    pub fn last_seen_id(&self) -> i64 {
        self.last_seen_id
    }
}

impl EventOrderValidator {
    pub fn for_events(handler: ValidationHandler<BinlogEvent>) -> Self {
        OrderValidator::new("event", handler)
    }
}

impl MutationOrderValidator {
    pub fn for_mutations(handler: ValidationHandler<Mutation>) -> Self {
        OrderValidator::new("mutation", handler)
    }
}

impl<T: Sequenced> Validator<T> for OrderValidator<T> {
    fn validate(&mut self, item: &T) {
        let id = item.sequence_id();
        if self.last_seen_id > id {
            warn!("{} out of order, id: {}, last seen id: {}", self.name, id, self.last_seen_id);
            (self.handler)(item);
        }
        self.last_seen_id = id;
    }

    fn reset(&mut self) {
        self.last_seen_id = INITIAL_ID;
    }
}
