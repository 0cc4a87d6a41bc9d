use std::sync::{Arc, RwLock};

use binlog::events::binlog_event::BinlogEvent;
use binlog::mutation::Mutation;
use common::err::CResult;
use common::err::decode_error::ReError;
use common::lifecycle::Lifecycle;

pub mod binlog_client;
pub mod filter;
pub mod binlog_source;

pub use binlog_client::BinlogClient;
pub use binlog_source::{BinlogSource, BinlogSourceBuilder};
pub use filter::{DuplicateFilter, EventFilter, TableFilter};

/// Receives what a source reads, on the source's reader thread.
pub trait SourceListener: Send + Sync {
    /// Mutations of one binlog event, in order. An error stops the source.
    fn on_mutation(&self, mutations: Vec<Mutation>) -> CResult<()>;

    fn on_event(&self, _event: &BinlogEvent) {}

    fn on_error(&self, _error: &ReError) {}
}

/// Emits ordered mutations and persists checkpoints.
pub trait Source: Lifecycle {
    fn name(&self) -> &str;

    fn add_listener(&self, listener: Arc<dyn SourceListener>);

    fn remove_listener(&self, listener: &Arc<dyn SourceListener>);

    /// Saves the resume point after `mutation` was delivered. `None` is a no-op.
    fn checkpoint(&self, mutation: Option<&Mutation>) -> CResult<()>;
}

/// Listener set shared with the reader thread.
#[derive(Clone, Default)]
pub struct SourceListeners {
    listeners: Arc<RwLock<Vec<Arc<dyn SourceListener>>>>,
}

impl SourceListeners {
    /// Registers `listener` once, adding the same `Arc` again is a no-op.
    pub fn add(&self, listener: Arc<dyn SourceListener>) {
        let target = Arc::as_ptr(&listener) as *const ();
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        if listeners.iter().all(|l| Arc::as_ptr(l) as *const () != target) {
            listeners.push(listener);
        }
    }

    pub fn remove(&self, listener: &Arc<dyn SourceListener>) {
        let target = Arc::as_ptr(listener) as *const ();
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|l| Arc::as_ptr(l) as *const () != target);
    }

    pub fn len(&self) -> usize {
        self.listeners.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<Arc<dyn SourceListener>> {
        self.listeners.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn on_mutation(&self, mutations: Vec<Mutation>) -> CResult<()> {
        let listeners = self.snapshot();
        if let Some((last, others)) = listeners.split_last() {
            for l in others {
                l.on_mutation(mutations.clone())?;
            }
            last.on_mutation(mutations)?;
        }
        Ok(())
    }

    pub fn on_event(&self, event: &BinlogEvent) {
        for l in self.snapshot() {
            l.on_event(event);
        }
    }

    pub fn on_error(&self, error: &ReError) {
        for l in self.snapshot() {
            l.on_error(error);
        }
    }
}
