use common::err::CResult;
use common::err::decode_error::ReError;

use crate::mutation::Mutation;

/// Partition key of a mutation. Mutations with the same key are delivered in order.
pub trait KeyProvider: Send + Sync {
    fn get(&self, mutation: &Mutation) -> CResult<String>;
}

/// `<database>:<table>:<primaryKeyValue>`. A table without primary key renders `null`
/// as its key value, so all its rows share one key.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlKeyProvider;

impl KeyProvider for MysqlKeyProvider {
    fn get(&self, mutation: &Mutation) -> CResult<String> {
        match mutation {
            Mutation::Mysql(m) => {
                let table = m.table();
                let pk = m.row().primary_key_value().unwrap_or_else(|| "null".to_string());
                Ok(format!("{}:{}:{}", table.database(), table.name(), pk))
            }
            Mutation::Raw(_) => Err(ReError::IllegalStateErr(format!(
                "no table context to build a key for mutation {}", mutation.id()))),
        }
    }
}
