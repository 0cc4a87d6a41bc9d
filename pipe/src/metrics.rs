use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use tracing::info;

use common::err::decode_error::ReError;
use common::time_util::{now_millis, now_str};

/// Pipe level metrics. Emission backends sit behind this trait.
pub trait Metrics: Send + Sync {
    fn open(&self);

    fn close(&self);

    fn mutations_received(&self, _count: usize) {}

    fn mutations_published(&self, _count: usize) {}

    fn error(&self, _error: &ReError) {}

    fn checkpoint(&self) {}
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub received: u64,
    pub published: u64,
    pub errors: u64,
    pub checkpoints: u64,
}

/// Counts in memory and logs on open and close.
#[derive(Debug, Default)]
pub struct PipeMetrics {
    name: String,
    opened: AtomicBool,
    /// millis, 0 before the first open
    opened_at: AtomicI64,
    received: AtomicU64,
    published: AtomicU64,
    errors: AtomicU64,
    checkpoints: AtomicU64,
}

impl PipeMetrics {
    pub fn new(name: &str) -> Self {
        PipeMetrics {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn is_open(&self) -> bool {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn opened_at(&self) -> i64 {
        self.opened_at.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            received: self.received.load(Ordering::SeqCst),
            published: self.published.load(Ordering::SeqCst),
            errors: self.errors.load(Ordering::SeqCst),
            checkpoints: self.checkpoints.load(Ordering::SeqCst),
        }
    }
}

impl Metrics for PipeMetrics {
    fn open(&self) {
        self.opened.store(true, Ordering::SeqCst);
        self.opened_at.store(now_millis(), Ordering::SeqCst);
        info!("pipe {} metrics opened at {}", self.name, now_str());
    }

    fn close(&self) {
        self.opened.store(false, Ordering::SeqCst);
        let uptime = now_millis() - self.opened_at();
        info!("pipe {} metrics closed after {}ms: {:?}", self.name, uptime, self.snapshot());
    }

    fn mutations_received(&self, count: usize) {
        self.received.fetch_add(count as u64, Ordering::SeqCst);
    }

    fn mutations_published(&self, count: usize) {
        self.published.fetch_add(count as u64, Ordering::SeqCst);
    }

    fn error(&self, _error: &ReError) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }

    fn checkpoint(&self) {
        self.checkpoints.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn open(&self) {}

    fn close(&self) {}
}
