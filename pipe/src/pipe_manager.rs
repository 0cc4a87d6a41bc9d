use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use tracing::{error, info, warn};

use common::err::CResult;

use crate::pipe::Pipe;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipeKey {
    name: String,
    partition: String,
}

impl PipeKey {
    pub fn new(name: &str, partition: &str) -> Self {
        PipeKey {
            name: name.to_string(),
            partition: partition.to_string(),
        }
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_partition(&self) -> &str {
        &self.partition
    }
}

impl Display for PipeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.name, self.partition)
    }
}

type Slot = Arc<Mutex<Vec<Arc<Pipe>>>>;

fn lock(slot: &Slot) -> MutexGuard<'_, Vec<Arc<Pipe>>> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

/// Registry of running pipes keyed by `(name, partition)`.
///
/// Each key owns a slot whose lock serializes add and remove for that key, so pipes
/// of different keys start and stop concurrently. The map lock is never held while a
/// slot lock is waited on.
#[derive(Default)]
pub struct PipeManager {
    slots: DashMap<PipeKey, Slot>,
}

impl PipeManager {
    pub fn new() -> Self {
        PipeManager::default()
    }

    /// Starts every pipe of the group, then registers them under the key.
    ///
    /// When one fails to start, the pipes already started are stopped again and nothing
    /// is registered.
    pub fn add_pipes(&self, name: &str, partition: &str, pipes: Vec<Arc<Pipe>>) -> CResult<()> {
        let key = PipeKey::new(name, partition);

        loop {
            let slot = self.slots.entry(key.clone()).or_default().clone();
            let mut registered = lock(&slot);

            // removed concurrently while we waited for it
            if !self.is_current(&key, &slot) {
                continue;
            }

            let mut started: Vec<Arc<Pipe>> = Vec::with_capacity(pipes.len());
            for pipe in &pipes {
                if let Err(e) = pipe.start() {
                    error!("failed to start pipe {} of {}: {}", pipe.name(), key, e);
                    for p in started.iter().rev() {
                        Self::stop_pipe(&key, p);
                    }
                    let empty = registered.is_empty();
                    drop(registered);
                    if empty {
                        self.remove_slot_if_empty(&key, &slot);
                    }
                    return Err(e);
                }
                started.push(pipe.clone());
            }

            info!("added {} pipes to {}", started.len(), key);
            registered.extend(started);
            return Ok(());
        }
    }

    /// Stops and unregisters every pipe of the key. All pipes are stopped even when one
    /// fails, the first error is returned. Unknown keys are a no-op.
    pub fn remove_pipe(&self, name: &str, partition: &str) -> CResult<()> {
        let key = PipeKey::new(name, partition);
        let slot = match self.slots.get(&key) {
            None => return Ok(()),
            Some(s) => s.value().clone(),
        };

        let mut registered = lock(&slot);
        let pipes = std::mem::take(&mut *registered);
        let mut result = Ok(());
        for pipe in &pipes {
            if let Err(e) = pipe.stop() {
                error!("failed to stop pipe {} of {}: {}", pipe.name(), key, e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        drop(registered);
        self.remove_slot_if_empty(&key, &slot);

        info!("removed {} pipes from {}", pipes.len(), key);
        result
    }

    pub fn get_pipes(&self, name: &str, partition: &str) -> Vec<Arc<Pipe>> {
        let slot = match self.slots.get(&PipeKey::new(name, partition)) {
            None => return vec![],
            Some(s) => s.value().clone(),
        };
        let pipes = lock(&slot).clone();
        pipes
    }

    pub fn is_empty(&self) -> bool {
        self.pipe_count() == 0
    }

    pub fn pipe_count(&self) -> usize {
        self.snapshot().iter().map(|(_, slot)| lock(slot).len()).sum()
    }

    /// Keys with at least one registered pipe, sorted.
    pub fn keys(&self) -> Vec<PipeKey> {
        let mut keys = self
            .snapshot()
            .into_iter()
            .filter(|(_, slot)| !lock(slot).is_empty())
            .map(|(key, _)| key)
            .collect::<Vec<_>>();
        keys.sort();
        keys
    }

    pub fn stop_all(&self) -> CResult<()> {
        let mut result = Ok(());
        for key in self.keys() {
            if let Err(e) = self.remove_pipe(key.get_name(), key.get_partition()) {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    fn snapshot(&self) -> Vec<(PipeKey, Slot)> {
        self.slots
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    fn is_current(&self, key: &PipeKey, slot: &Slot) -> bool {
        self.slots
            .get(key)
            .map(|s| Arc::ptr_eq(s.value(), slot))
            .unwrap_or(false)
    }

    /// A slot locked by someone else is about to be used, it stays.
    fn remove_slot_if_empty(&self, key: &PipeKey, slot: &Slot) {
        self.slots.remove_if(key, |_, s| {
            Arc::ptr_eq(s, slot) && s.try_lock().map(|pipes| pipes.is_empty()).unwrap_or(false)
        });
    }

    fn stop_pipe(key: &PipeKey, pipe: &Pipe) {
        if let Err(e) = pipe.stop() {
            warn!("failed to stop pipe {} of {} after a failed add: {}", pipe.name(), key, e);
        }
    }
}
