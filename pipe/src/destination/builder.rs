use std::sync::Arc;

use binlog::key_provider::{KeyProvider, MysqlKeyProvider};
use common::config::config::{DEFAULT_BUFFER_SIZE, DEFAULT_MAX_BATCH_SIZE};
use common::config::DestinationConfig;
use common::err::CResult;
use common::err::decode_error::ReError;

use crate::destination::pooled_destination::PooledDestination;
use crate::destination::publisher::Publisher;

/// Builds a [`PooledDestination`]. Without `with_pool` a single worker keeps the global
/// send order.
pub struct DestinationBuilder {
    name: String,
    publisher: Arc<dyn Publisher>,
    key_provider: Arc<dyn KeyProvider>,
    pool_size: usize,
    buffer_size: usize,
    max_batch_size: usize,
}

impl DestinationBuilder {
    pub fn new(name: &str, publisher: Arc<dyn Publisher>) -> Self {
        DestinationBuilder {
            name: name.to_string(),
            publisher,
            key_provider: Arc::new(MysqlKeyProvider),
            pool_size: 1,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    /// Applies the `[destination]` section, keys come from [`MysqlKeyProvider`].
    pub fn from_config(name: &str, publisher: Arc<dyn Publisher>, config: &DestinationConfig) -> Self {
        DestinationBuilder::new(name, publisher)
            .with_pool(config.pool_size, Arc::new(MysqlKeyProvider))
            .with_buffer(config.buffer_size)
            .with_max_batch_size(config.max_batch_size)
    }

    pub fn with_pool(mut self, size: usize, key_provider: Arc<dyn KeyProvider>) -> Self {
        self.pool_size = size;
        self.key_provider = key_provider;
        self
    }

    /// Capacity of each worker queue. Senders block while it is full.
    pub fn with_buffer(mut self, capacity: usize) -> Self {
        self.buffer_size = capacity;
        self
    }

    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    pub fn build(self) -> CResult<PooledDestination> {
        if self.pool_size == 0 || self.buffer_size == 0 || self.max_batch_size == 0 {
            return Err(ReError::IllegalStateErr(format!(
                "destination {}: pool size {}, buffer size {} and batch size {} must be positive",
                self.name, self.pool_size, self.buffer_size, self.max_batch_size)));
        }

        Ok(PooledDestination::new(
            &self.name,
            self.publisher,
            self.key_provider,
            self.pool_size,
            self.buffer_size,
            self.max_batch_size,
        ))
    }
}
