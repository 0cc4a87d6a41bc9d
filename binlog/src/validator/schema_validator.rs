use tracing::warn;

use common::schema::Row;

use crate::mutation::{Mutation, MysqlMutation};
use crate::validator::{ValidationHandler, Validator};

/// Reports mutations whose row columns do not match the table schema they claim.
pub struct MutationSchemaValidator {
    handler: ValidationHandler<Mutation>,
}

impl MutationSchemaValidator {
    pub fn new(handler: ValidationHandler<Mutation>) -> Self {
        MutationSchemaValidator {
            handler,
        }
    }

    fn conforms(m: &MysqlMutation) -> bool {
        let conforms = |row: &Row| row.column_metadata_map() == m.table().column_map();

        conforms(m.row()) && m.previous_row().map(conforms).unwrap_or(true)
    }
}

impl Validator<Mutation> for MutationSchemaValidator {
    fn validate(&mut self, item: &Mutation) {
        if let Mutation::Mysql(m) = item {
            if !MutationSchemaValidator::conforms(m) {
                warn!("mutation {} does not match schema of {}", item.id(), m.table().canonical_name());
                (self.handler)(item);
            }
        }
    }

    fn reset(&mut self) {}
}
