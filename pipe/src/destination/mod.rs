use std::sync::{Arc, RwLock};

use binlog::mutation::Mutation;
use common::err::CResult;
use common::err::decode_error::ReError;
use common::lifecycle::Lifecycle;

pub mod codec;
pub mod publisher;
pub mod ack_tracker;
pub mod pooled_destination;
pub mod builder;

pub use ack_tracker::AckTracker;
pub use builder::DestinationBuilder;
pub use codec::{Codec, JsonCodec};
pub use pooled_destination::PooledDestination;
pub use publisher::{Publisher, StreamPublisher};

/// Notified by a destination from its worker threads.
pub trait DestinationListener: Send + Sync {
    /// A batch was published.
    fn on_send(&self, _mutations: &[Mutation]) {}

    fn on_error(&self, _error: &ReError) {}
}

/// Delivers mutations downstream.
pub trait Destination: Lifecycle {
    fn add_listener(&self, listener: Arc<dyn DestinationListener>);

    fn remove_listener(&self, listener: &Arc<dyn DestinationListener>);

    /// Hands mutations over for delivery, blocking while the buffer is full.
    fn send(&self, mutations: Vec<Mutation>) -> CResult<()>;

    /// Most recent mutation whose delivery, and that of everything sent before it, is
    /// confirmed.
    fn last_published_mutation(&self) -> Option<Mutation>;
}

#[derive(Clone, Default)]
pub struct DestinationListeners {
    listeners: Arc<RwLock<Vec<Arc<dyn DestinationListener>>>>,
}

impl DestinationListeners {
    /// Registers `listener` once, adding the same `Arc` again is a no-op.
    pub fn add(&self, listener: Arc<dyn DestinationListener>) {
        let target = Arc::as_ptr(&listener) as *const ();
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        if listeners.iter().all(|l| Arc::as_ptr(l) as *const () != target) {
            listeners.push(listener);
        }
    }

    pub fn remove(&self, listener: &Arc<dyn DestinationListener>) {
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

    fn snapshot(&self) -> Vec<Arc<dyn DestinationListener>> {
        self.listeners.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn on_send(&self, mutations: &[Mutation]) {
        for l in self.snapshot() {
            l.on_send(mutations);
        }
    }

    pub fn on_error(&self, error: &ReError) {
        for l in self.snapshot() {
            l.on_error(error);
        }
    }
}
