use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use binlog::mutation::Mutation;
use common::config::PipeConfig;
use common::err::CResult;
use common::err::decode_error::ReError;

use crate::destination::{Destination, DestinationListener};
use crate::metrics::Metrics;
use crate::source::{Source, SourceListener};

/// One source wired to one destination, started and stopped as a unit.
///
/// Mutations read by the source are handed to the destination on the source's reader
/// thread. Checkpoints save the last mutation the destination confirmed into the
/// source state, on stop and optionally on a fixed period.
pub struct Pipe {
    name: String,
    source: Arc<dyn Source>,
    destination: Arc<dyn Destination>,
    metrics: Arc<dyn Metrics>,

    source_listener: Arc<dyn SourceListener>,
    destination_listener: Arc<dyn DestinationListener>,

    checkpoint_period: Option<Duration>,
    checkpointer: Mutex<Option<Checkpointer>>,
}

impl Pipe {
    pub fn new(source: Arc<dyn Source>, destination: Arc<dyn Destination>, metrics: Arc<dyn Metrics>) -> Self {
        let name = source.name().to_string();
        let source_listener = Arc::new(PipeSourceListener {
            name: name.clone(),
            destination: destination.clone(),
            metrics: metrics.clone(),
        });
        let destination_listener = Arc::new(PipeDestinationListener {
            name: name.clone(),
            metrics: metrics.clone(),
        });

        Pipe {
            name,
            source,
            destination,
            metrics,
            source_listener,
            destination_listener,
            checkpoint_period: None,
            checkpointer: Mutex::new(None),
        }
    }

    pub fn with_checkpoint_period(mut self, period: Duration) -> Self {
        self.checkpoint_period = Some(period);
        self
    }

    /// Applies the `[pipe]` section.
    pub fn with_config(mut self, config: &PipeConfig) -> Self {
        self.checkpoint_period = config.checkpoint_period_ms.map(Duration::from_millis);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &Arc<dyn Source> {
        &self.source
    }

    pub fn destination(&self) -> &Arc<dyn Destination> {
        &self.destination
    }

    pub fn start(&self) -> CResult<()> {
        if self.is_started() {
            debug!("pipe {} is already started", self.name);
            return Ok(());
        }

        self.source.add_listener(self.source_listener.clone());
        if let Err(e) = self.source.open() {
            error!("pipe {} failed to open source: {}", self.name, e);
            self.source.remove_listener(&self.source_listener);
            return Err(e);
        }

        self.destination.add_listener(self.destination_listener.clone());
        if let Err(e) = self.destination.open() {
            error!("pipe {} failed to open destination: {}", self.name, e);
            self.destination.remove_listener(&self.destination_listener);
            self.source.remove_listener(&self.source_listener);
            if let Err(close_err) = self.source.close() {
                error!("pipe {} failed to close source: {}", self.name, close_err);
            }
            return Err(e);
        }

        self.metrics.open();

        // left over from a run whose source stopped on error
        if let Some(checkpointer) = self.lock_checkpointer().take() {
            if let Err(e) = checkpointer.stop() {
                warn!("pipe {} failed to stop previous checkpointer: {}", self.name, e);
            }
        }
        if let Some(period) = self.checkpoint_period {
            *self.lock_checkpointer() = Some(Checkpointer::start(
                &self.name, period, self.source.clone(), self.destination.clone(), self.metrics.clone())?);
        }

        info!("pipe {} started", self.name);
        Ok(())
    }

    /// Stops the pipe. Every step runs even when an earlier one fails, the first error is
    /// returned.
    pub fn stop(&self) -> CResult<()> {
        let mut result = Ok(());
        let mut keep_first = |r: CResult<()>| {
            if let Err(e) = r {
                error!("pipe {} stop: {}", self.name, e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        };

        if let Some(checkpointer) = self.lock_checkpointer().take() {
            keep_first(checkpointer.stop());
        }

        keep_first(self.checkpoint());

        self.source.remove_listener(&self.source_listener);
        keep_first(self.source.close());

        self.destination.remove_listener(&self.destination_listener);
        keep_first(self.destination.close());

        self.metrics.close();

        info!("pipe {} stopped", self.name);
        result
    }

    pub fn is_started(&self) -> bool {
        self.source.is_started() && self.destination.is_started()
    }

    /// Saves the last published mutation of the destination as the source's resume point.
    pub fn checkpoint(&self) -> CResult<()> {
        checkpoint(&self.name, self.source.as_ref(), self.destination.as_ref(), self.metrics.as_ref())
    }

    fn lock_checkpointer(&self) -> MutexGuard<'_, Option<Checkpointer>> {
        self.checkpointer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn checkpoint(name: &str, source: &dyn Source, destination: &dyn Destination, metrics: &dyn Metrics) -> CResult<()> {
    let last = destination.last_published_mutation();
    source.checkpoint(last.as_ref())?;
    if let Some(m) = last {
        debug!("pipe {} checkpoint at mutation {}", name, m.id());
        metrics.checkpoint();
    }
    Ok(())
}

struct PipeSourceListener {
    name: String,
    destination: Arc<dyn Destination>,
    metrics: Arc<dyn Metrics>,
}

impl SourceListener for PipeSourceListener {
    fn on_mutation(&self, mutations: Vec<Mutation>) -> CResult<()> {
        self.metrics.mutations_received(mutations.len());
        self.destination.send(mutations).map_err(|e| {
            self.metrics.error(&e);
            e
        })
    }

    fn on_error(&self, error: &ReError) {
        error!("pipe {} source error: {}", self.name, error);
        self.metrics.error(error);
    }
}

struct PipeDestinationListener {
    name: String,
    metrics: Arc<dyn Metrics>,
}

impl DestinationListener for PipeDestinationListener {
    fn on_send(&self, mutations: &[Mutation]) {
        self.metrics.mutations_published(mutations.len());
    }

    fn on_error(&self, error: &ReError) {
        error!("pipe {} destination error: {}", self.name, error);
        self.metrics.error(error);
    }
}

/// 周期性 checkpoint
struct Checkpointer {
    stopped: Arc<(Mutex<bool>, Condvar)>,
    handle: JoinHandle<()>,
}

impl Checkpointer {
    fn start(name: &str, period: Duration, source: Arc<dyn Source>, destination: Arc<dyn Destination>,
             metrics: Arc<dyn Metrics>) -> CResult<Self> {
        let stopped = Arc::new((Mutex::new(false), Condvar::new()));
        let signal = stopped.clone();
        let pipe_name = name.to_string();

        let handle = thread::Builder::new()
            .name(format!("checkpoint-{}", name))
            .spawn(move || {
                let (lock, cvar) = &*signal;
                loop {
                    let guard = lock.lock().unwrap_or_else(|e| e.into_inner());
                    let (guard, _) = cvar
                        .wait_timeout_while(guard, period, |stopped| !*stopped)
                        .unwrap_or_else(|e| e.into_inner());
                    if *guard {
                        break;
                    }
                    drop(guard);

                    if let Err(e) = checkpoint(&pipe_name, source.as_ref(), destination.as_ref(), metrics.as_ref()) {
                        error!("pipe {} periodic checkpoint failed: {}", pipe_name, e);
                    }
                }
            })
            .map_err(|e| ReError::String(format!("failed to spawn checkpointer of pipe {}: {}", name, e)))?;

        Ok(Checkpointer {
            stopped,
            handle,
        })
    }

    fn stop(self) -> CResult<()> {
        let (lock, cvar) = &*self.stopped;
        *lock.lock().unwrap_or_else(|e| e.into_inner()) = true;
        cvar.notify_all();

        self.handle
            .join()
            .map_err(|_| ReError::String("checkpoint thread panicked".to_string()))
    }
}
