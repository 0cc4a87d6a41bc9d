use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use binlog::mutation::Mutation;

/// Tracks delivery of dispatched mutations across workers.
///
/// Workers acknowledge out of order, the last published mutation only moves forward
/// over a contiguous prefix of acknowledged dispatches.
#[derive(Debug, Default)]
pub struct AckTracker {
    inner: Mutex<AckState>,
}

#[derive(Debug, Default)]
struct AckState {
    next_seq: u64,
    /// seq -> (mutation, acked)
    pending: BTreeMap<u64, (Mutation, bool)>,
    last_published: Option<Mutation>,
}

impl AckState {
    fn advance(&mut self) {
        while let Some(entry) = self.pending.first_entry() {
            if !entry.get().1 {
                break;
            }
            let (mutation, _) = entry.remove();
            self.last_published = Some(mutation);
        }
    }
}

impl AckTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, AckState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers a dispatch and returns its sequence number.
    pub fn register(&self, mutation: Mutation) -> u64 {
        let mut state = self.state();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.pending.insert(seq, (mutation, false));
        seq
    }

    pub fn ack(&self, seq: u64) {
        let mut state = self.state();
        match state.pending.get_mut(&seq) {
            Some(entry) => entry.1 = true,
            None => return,
        }
        state.advance();
    }

    /// Forgets a dispatch that never reached a worker.
    pub fn cancel(&self, seq: u64) {
        let mut state = self.state();
        if state.pending.remove(&seq).is_some() {
            state.advance();
        }
    }

    pub fn last_published(&self) -> Option<Mutation> {
        self.state().last_published.clone()
    }

    /// 未确认的数量
    pub fn pending(&self) -> usize {
        self.state().pending.len()
    }

    /// Forgets dispatches that will never be acknowledged. The last published mutation
    /// is kept.
    pub fn discard_pending(&self) {
        self.state().pending.clear();
    }
}
