use std::hash::Hasher;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use fnv::FnvHasher;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, error, info, warn};

use binlog::key_provider::KeyProvider;
use binlog::mutation::Mutation;
use common::err::CResult;
use common::err::decode_error::ReError;
use common::lifecycle::Lifecycle;

use crate::destination::ack_tracker::AckTracker;
use crate::destination::publisher::Publisher;
use crate::destination::{Destination, DestinationListener, DestinationListeners};

#[derive(Debug)]
enum WorkerMessage {
    Dispatch(u64, Mutation),
    Stop,
}

/// Destination backed by a fixed pool of workers, each draining its own bounded queue.
///
/// A mutation goes to worker `fnv(key) % pool_size`, so mutations with the same key are
/// published in the order they were sent while unrelated keys proceed in parallel.
/// Queues exist for the whole life of the destination; workers own their receiver while
/// running and hand it back when they exit.
pub struct PooledDestination {
    name: String,
    publisher: Arc<dyn Publisher>,
    key_provider: Arc<dyn KeyProvider>,
    max_batch_size: usize,

    senders: Vec<Sender<WorkerMessage>>,
    pool: Mutex<WorkerPool>,

    listeners: DestinationListeners,
    tracker: Arc<AckTracker>,
    started: AtomicBool,
    /// 发布失败后不再接收 mutation, 直到重新 open
    failed: Arc<AtomicBool>,
}

struct WorkerPool {
    receivers: Vec<Option<Receiver<WorkerMessage>>>,
    handles: Vec<(usize, JoinHandle<Receiver<WorkerMessage>>)>,
}

impl PooledDestination {
    pub(crate) fn new(name: &str, publisher: Arc<dyn Publisher>, key_provider: Arc<dyn KeyProvider>,
                      pool_size: usize, buffer_size: usize, max_batch_size: usize) -> Self {
        let (senders, receivers): (Vec<Sender<WorkerMessage>>, Vec<Option<Receiver<WorkerMessage>>>) = (0..pool_size)
            .map(|_| {
                let (tx, rx) = mpsc::channel(buffer_size);
                (tx, Some(rx))
            })
            .unzip();

        PooledDestination {
            name: name.to_string(),
            publisher,
            key_provider,
            max_batch_size,
            senders,
            pool: Mutex::new(WorkerPool {
                receivers,
                handles: vec![],
            }),
            listeners: DestinationListeners::default(),
            tracker: Arc::new(AckTracker::new()),
            started: AtomicBool::new(false),
            failed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pool_size(&self) -> usize {
        self.senders.len()
    }

    /// Sent but not yet confirmed mutations.
    pub fn pending(&self) -> usize {
        self.tracker.pending()
    }

    /// Worker index of a key.
    pub fn worker_of(&self, key: &str) -> usize {
        let mut hasher = FnvHasher::default();
        hasher.write(key.as_bytes());
        (hasher.finish() % self.senders.len() as u64) as usize
    }

    fn route(&self, mutation: &Mutation) -> CResult<usize> {
        if self.senders.len() == 1 {
            return Ok(0);
        }
        let key = self.key_provider.get(mutation)?;
        Ok(self.worker_of(&key))
    }

    fn lock_pool(&self) -> MutexGuard<'_, WorkerPool> {
        self.pool.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Lifecycle for PooledDestination {
    fn open(&self) -> CResult<()> {
        let mut pool = self.lock_pool();
        if self.started.load(Ordering::SeqCst) {
            debug!("destination {} is already started", self.name);
            return Ok(());
        }
        self.failed.store(false, Ordering::SeqCst);

        for id in 0..pool.receivers.len() {
            let rx = pool.receivers[id]
                .take()
                .ok_or_else(|| ReError::IllegalStateErr(format!("queue {} of destination {} is lost", id, self.name)))?;

            let worker = Worker {
                id,
                name: self.name.clone(),
                rx,
                publisher: self.publisher.clone(),
                tracker: self.tracker.clone(),
                listeners: self.listeners.clone(),
                failed: self.failed.clone(),
                max_batch_size: self.max_batch_size,
            };
            let handle = thread::Builder::new()
                .name(format!("destination-{}-{}", self.name, id))
                .spawn(move || worker.run())
                .map_err(|e| ReError::DestinationErr(format!("failed to spawn worker {} of {}: {}", id, self.name, e)))?;
            pool.handles.push((id, handle));
        }

        self.started.store(true, Ordering::SeqCst);
        info!("destination {} started with {} workers", self.name, self.senders.len());
        Ok(())
    }

    fn close(&self) -> CResult<()> {
        let mut pool = self.lock_pool();
        if pool.handles.is_empty() {
            self.started.store(false, Ordering::SeqCst);
            return Ok(());
        }
        self.started.store(false, Ordering::SeqCst);

        // 队列中已有的 mutation 先于 Stop 被处理
        for (id, _) in pool.handles.iter() {
            if self.senders[*id].blocking_send(WorkerMessage::Stop).is_err() {
                warn!("worker {} of destination {} is gone", id, self.name);
            }
        }

        let mut result = Ok(());
        let handles: Vec<_> = pool.handles.drain(..).collect();
        for (id, handle) in handles {
            match handle.join() {
                Ok(mut rx) => {
                    let mut discarded = 0;
                    while rx.try_recv().is_ok() {
                        discarded += 1;
                    }
                    if discarded > 0 {
                        warn!("destination {} worker {} discarded {} queued messages", self.name, id, discarded);
                    }
                    pool.receivers[id] = Some(rx);
                }
                Err(_) => {
                    error!("worker {} of destination {} panicked", id, self.name);
                    result = Err(ReError::DestinationErr(format!("worker {} of {} panicked", id, self.name)));
                }
            }
        }
        self.tracker.discard_pending();

        info!("destination {} stopped", self.name);
        result
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

impl Destination for PooledDestination {
    fn add_listener(&self, listener: Arc<dyn DestinationListener>) {
        self.listeners.add(listener);
    }

    fn remove_listener(&self, listener: &Arc<dyn DestinationListener>) {
        self.listeners.remove(listener);
    }

    fn send(&self, mutations: Vec<Mutation>) -> CResult<()> {
        for mutation in mutations {
            if self.failed.load(Ordering::SeqCst) {
                return Err(ReError::DestinationErr(format!("destination {} failed to publish", self.name)));
            }

            let id = self.route(&mutation)?;
            let seq = self.tracker.register(mutation.clone());
            if self.senders[id].blocking_send(WorkerMessage::Dispatch(seq, mutation)).is_err() {
                self.tracker.cancel(seq);
                return Err(ReError::DestinationErr(format!("worker {} of destination {} is gone", id, self.name)));
            }
        }
        Ok(())
    }

    fn last_published_mutation(&self) -> Option<Mutation> {
        self.tracker.last_published()
    }
}

struct Worker {
    id: usize,
    name: String,
    rx: Receiver<WorkerMessage>,
    publisher: Arc<dyn Publisher>,
    tracker: Arc<AckTracker>,
    listeners: DestinationListeners,
    failed: Arc<AtomicBool>,
    max_batch_size: usize,
}

impl Worker {
    fn run(mut self) -> Receiver<WorkerMessage> {
        debug!("destination {} worker {} started", self.name, self.id);

        let mut batch = Vec::with_capacity(self.max_batch_size);
        loop {
            let mut stop = match self.rx.blocking_recv() {
                Some(WorkerMessage::Dispatch(seq, m)) => {
                    batch.push((seq, m));
                    false
                }
                Some(WorkerMessage::Stop) | None => true,
            };

            while !stop && batch.len() < self.max_batch_size {
                match self.rx.try_recv() {
                    Ok(WorkerMessage::Dispatch(seq, m)) => batch.push((seq, m)),
                    Ok(WorkerMessage::Stop) => stop = true,
                    Err(_) => break,
                }
            }

            if !batch.is_empty() {
                self.publish(&mut batch);
            }
            if stop {
                break;
            }
        }

        debug!("destination {} worker {} exited", self.name, self.id);
        self.rx
    }

    fn publish(&self, batch: &mut Vec<(u64, Mutation)>) {
        let (seqs, mutations): (Vec<u64>, Vec<Mutation>) = batch.drain(..).unzip();
        if self.failed.load(Ordering::SeqCst) {
            debug!("destination {} worker {} discards {} mutations after failure", self.name, self.id, mutations.len());
            return;
        }

        match self.publisher.publish(&mutations) {
            Ok(()) => {
                for seq in seqs {
                    self.tracker.ack(seq);
                }
                self.listeners.on_send(&mutations);
            }
            Err(e) => {
                error!("destination {} worker {} failed to publish {} mutations: {}", self.name, self.id, mutations.len(), e);
                self.failed.store(true, Ordering::SeqCst);
                self.listeners.on_error(&e);
            }
        }
    }
}
