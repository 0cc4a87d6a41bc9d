use std::cmp::Ordering as PosOrdering;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, warn};

use binlog::events::binlog_event::BinlogEvent;
use binlog::events::log_position::BinlogFilePos;
use binlog::mapper::EventMapper;
use binlog::metadata::table_cache::TableCache;
use binlog::mutation::{DataSource, Mutation};
use binlog::validator::{EventOrderValidator, MutationOrderValidator, MutationSchemaValidator, Validator};
use common::config::SourceConfig;
use common::config::config::DEFAULT_STATE_HISTORY_SIZE;
use common::err::CResult;
use common::err::decode_error::ReError;
use common::lifecycle::Lifecycle;

use crate::source::binlog_client::BinlogClient;
use crate::source::filter::{DuplicateFilter, EventFilter, TableFilter};
use crate::source::{Source, SourceListener, SourceListeners};
use crate::state::repository::{InMemoryStateHistoryRepository, InMemoryStateRepository, StateHistoryRepository,
                               StateRepository};
use crate::state::source_state::SourceState;
use crate::state::state_history::StateHistory;

const DEFAULT_INITIAL_POSITION: &str = "mysql-bin.000001:4:4";

/// Source reading a MySQL replication stream through a [`BinlogClient`].
///
/// `open` resolves the resume point (the saved state, or an older one from the history
/// after invalid position failures), connects and starts a reader thread:
///
/// client -> filters -> event order validator -> mapper -> mutation validators -> listeners
pub struct BinlogSource {
    name: String,
    data_source: DataSource,
    tables: Vec<String>,
    initial_position: BinlogFilePos,
    table_cache: TableCache,

    state_repository: Arc<dyn StateRepository>,
    history: Mutex<StateHistory>,
    /// 最后一次保存的 state
    saved_state: Mutex<Option<SourceState>>,

    listeners: SourceListeners,

    /// 未启动时持有 client, 启动后交给读线程
    client: Mutex<Option<Box<dyn BinlogClient>>>,
    reader: Mutex<Option<JoinHandle<Box<dyn BinlogClient>>>>,
    running: Arc<AtomicBool>,

    /// 连续的 invalid position 失败次数, checkpoint 成功后清零
    failures: Arc<AtomicUsize>,
    validation_failures: Arc<AtomicU64>,
}

impl BinlogSource {
    pub fn data_source(&self) -> &DataSource {
        &self.data_source
    }

    pub fn table_cache(&self) -> &TableCache {
        &self.table_cache
    }

    pub fn saved_state(&self) -> Option<SourceState> {
        lock(&self.saved_state).clone()
    }

    pub fn history(&self) -> Vec<SourceState> {
        lock(&self.history).states().iter().cloned().collect()
    }

    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    /// Number of order or schema violations reported so far.
    pub fn validation_failures(&self) -> u64 {
        self.validation_failures.load(Ordering::SeqCst)
    }

    /// 读线程已经退出时回收 client
    fn reclaim_client(&self, reader: &mut Option<JoinHandle<Box<dyn BinlogClient>>>) -> CResult<()> {
        if let Some(handle) = reader.take() {
            let client = handle
                .join()
                .map_err(|_| ReError::SourceErr(format!("reader thread of source {} panicked", self.name)))?;
            *lock(&self.client) = Some(client);
        }
        Ok(())
    }

    /// Resume point of the next attempt. After `n` invalid position failures the `n`
    /// newest states are dropped from the history.
    fn start_state(&self) -> CResult<SourceState> {
        let failures = self.failures.load(Ordering::SeqCst);
        let mut history = lock(&self.history);

        let state = if failures > 0 {
            let n = failures.min(history.len());
            let rolled_back = if n > 0 { history.remove_last(n)? } else { None };
            let state = rolled_back.unwrap_or_else(|| SourceState::initial(self.initial_position.clone()));
            warn!("source {} rolled back {} states after {} failures, resume from {}",
                self.name, n, failures, state.last_position());
            self.state_repository.save(&state)?;
            state
        } else {
            self.state_repository
                .read()?
                .unwrap_or_else(|| SourceState::initial(self.initial_position.clone()))
        };

        if history.last() != Some(&state) {
            history.add(state.clone())?;
        }
        Ok(state)
    }

    fn pipeline(&self, resumed_from: &BinlogFilePos) -> Reader {
        let counter = self.validation_failures.clone();
        let event_order = EventOrderValidator::for_events(Box::new(move |_: &BinlogEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let counter = self.validation_failures.clone();
        let mutation_order = MutationOrderValidator::for_mutations(Box::new(move |_: &Mutation| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let counter = self.validation_failures.clone();
        let schema = MutationSchemaValidator::new(Box::new(move |_: &Mutation| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        // TableFilter 需要看到全部 table map 事件, 放在最前
        let filters: Vec<Box<dyn EventFilter>> = vec![
            Box::new(TableFilter::new(&self.tables)),
            Box::new(DuplicateFilter::new(resumed_from.clone())),
        ];
        let mutation_validators: Vec<Box<dyn Validator<Mutation>>> = vec![Box::new(mutation_order), Box::new(schema)];

        Reader {
            name: self.name.clone(),
            running: self.running.clone(),
            failures: self.failures.clone(),
            listeners: self.listeners.clone(),
            filters,
            event_validator: event_order,
            mutation_validators,
            mapper: EventMapper::new(self.data_source.clone(), self.table_cache.clone()),
        }
    }
}

impl Lifecycle for BinlogSource {
    fn open(&self) -> CResult<()> {
        let mut reader = lock(&self.reader);
        if self.running.load(Ordering::SeqCst) {
            debug!("source {} is already started", self.name);
            return Ok(());
        }
        self.reclaim_client(&mut reader)?;

        let mut client = lock(&self.client)
            .take()
            .ok_or_else(|| ReError::IllegalStateErr(format!("binlog client of source {} is in use", self.name)))?;

        let state = match self.start_state() {
            Ok(s) => s,
            Err(e) => {
                *lock(&self.client) = Some(client);
                return Err(e);
            }
        };

        if let Err(e) = client.connect(state.last_position()) {
            error!("source {} failed to connect from {}: {}", self.name, state.last_position(), e);
            if e.is_invalid_position() {
                self.failures.fetch_add(1, Ordering::SeqCst);
            }
            *lock(&self.client) = Some(client);
            return Err(e);
        }
        *lock(&self.saved_state) = Some(state.clone());

        let pipeline = self.pipeline(state.last_position());
        self.running.store(true, Ordering::SeqCst);
        let handle = thread::Builder::new()
            .name(format!("source-{}", self.name))
            .spawn(move || pipeline.run(client))
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                ReError::SourceErr(format!("failed to spawn reader of source {}: {}", self.name, e))
            })?;
        *reader = Some(handle);

        info!("source {} started from {}", self.name, state.last_position());
        Ok(())
    }

    fn close(&self) -> CResult<()> {
        let mut reader = lock(&self.reader);
        self.running.store(false, Ordering::SeqCst);
        self.reclaim_client(&mut reader)?;

        info!("source {} stopped", self.name);
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Source for BinlogSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_listener(&self, listener: Arc<dyn SourceListener>) {
        self.listeners.add(listener);
    }

    fn remove_listener(&self, listener: &Arc<dyn SourceListener>) {
        self.listeners.remove(listener);
    }

    fn checkpoint(&self, mutation: Option<&Mutation>) -> CResult<()> {
        let mutation = match mutation {
            None => {
                debug!("source {} has nothing to checkpoint", self.name);
                return Ok(());
            }
            Some(Mutation::Mysql(m)) => m,
            Some(Mutation::Raw(m)) => {
                return Err(ReError::IllegalStateErr(format!(
                    "source {} cannot checkpoint mutation {} without binlog position", self.name, m.metadata.id)));
            }
        };

        let state = SourceState::from_mutation(mutation);
        let mut saved = lock(&self.saved_state);
        if let Some(s) = saved.as_ref() {
            if s == &state {
                return Ok(());
            }
            if state.last_position().compare_to(s.last_position()) == PosOrdering::Less {
                debug!("source {} skip checkpoint at {}, behind {}", self.name, state.last_position(), s.last_position());
                return Ok(());
            }
        }

        self.state_repository.save(&state)?;
        lock(&self.history).add(state.clone())?;
        debug!("source {} checkpoint at {}", self.name, state.last_position());
        *saved = Some(state);
        self.failures.store(0, Ordering::SeqCst);
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Runs on the reader thread, owns the per attempt validator and mapper state.
struct Reader {
    name: String,
    running: Arc<AtomicBool>,
    failures: Arc<AtomicUsize>,
    listeners: SourceListeners,
    filters: Vec<Box<dyn EventFilter>>,
    event_validator: EventOrderValidator,
    mutation_validators: Vec<Box<dyn Validator<Mutation>>>,
    mapper: EventMapper,
}

impl Reader {
    fn run(mut self, mut client: Box<dyn BinlogClient>) -> Box<dyn BinlogClient> {
        info!("reader of source {} started", self.name);

        while self.running.load(Ordering::SeqCst) {
            let result = match client.next_event() {
                Ok(Some(event)) => self.process(event),
                Ok(None) => Ok(()),
                Err(e) => Err(e),
            };

            if let Err(e) = result {
                error!("source {} stopped on error: {}", self.name, e);
                if e.is_invalid_position() {
                    self.failures.fetch_add(1, Ordering::SeqCst);
                }
                self.listeners.on_error(&e);
                break;
            }
        }

        self.running.store(false, Ordering::SeqCst);
        if let Err(e) = client.disconnect() {
            warn!("source {} disconnect err: {}", self.name, e);
        }
        info!("reader of source {} exited", self.name);
        client
    }

    fn process(&mut self, event: BinlogEvent) -> CResult<()> {
        for filter in self.filters.iter_mut() {
            if !filter.apply(&event) {
                return Ok(());
            }
        }

        self.event_validator.validate(&event);
        self.listeners.on_event(&event);

        let mutations = self.mapper.map(&event)?;
        if mutations.is_empty() {
            return Ok(());
        }
        for m in &mutations {
            for v in self.mutation_validators.iter_mut() {
                v.validate(m);
            }
        }

        self.listeners.on_mutation(mutations)
    }
}

pub struct BinlogSourceBuilder {
    name: String,
    client: Box<dyn BinlogClient>,
    data_source: Option<DataSource>,
    server_uuid: Option<String>,
    tables: Vec<String>,
    initial_position: Option<BinlogFilePos>,
    state_history_size: usize,
    table_cache: Option<TableCache>,
    state_repository: Option<Arc<dyn StateRepository>>,
    history_repository: Option<Arc<dyn StateHistoryRepository>>,
}

impl BinlogSourceBuilder {
    pub fn new(name: &str, client: Box<dyn BinlogClient>) -> Self {
        BinlogSourceBuilder {
            name: name.to_string(),
            client,
            data_source: None,
            server_uuid: None,
            tables: vec![],
            initial_position: None,
            state_history_size: DEFAULT_STATE_HISTORY_SIZE,
            table_cache: None,
            state_repository: None,
            history_repository: None,
        }
    }

    /// Applies the `[source]` section.
    pub fn with_config(mut self, config: &SourceConfig) -> CResult<Self> {
        self.name = config.name.clone();
        self.data_source = Some(DataSource::new(&config.host, config.port, &config.name));
        self.server_uuid = config.server_uuid.clone();
        self.state_history_size = config.state_history_size;
        self.tables = config.tables.clone();
        if let Some(pos) = &config.initial_position {
            self.initial_position = Some(BinlogFilePos::from_str(pos)?);
        }
        Ok(self)
    }

    pub fn with_data_source(mut self, data_source: DataSource) -> Self {
        self.data_source = Some(data_source);
        self
    }

    pub fn with_server_uuid(mut self, server_uuid: &str) -> Self {
        self.server_uuid = Some(server_uuid.to_string());
        self
    }

    pub fn with_tables(mut self, tables: Vec<String>) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_initial_position(mut self, position: BinlogFilePos) -> Self {
        self.initial_position = Some(position);
        self
    }

    pub fn with_state_history_size(mut self, size: usize) -> Self {
        self.state_history_size = size;
        self
    }

    pub fn with_table_cache(mut self, table_cache: TableCache) -> Self {
        self.table_cache = Some(table_cache);
        self
    }

    pub fn with_state_repository(mut self, repository: Arc<dyn StateRepository>) -> Self {
        self.state_repository = Some(repository);
        self
    }

    pub fn with_history_repository(mut self, repository: Arc<dyn StateHistoryRepository>) -> Self {
        self.history_repository = Some(repository);
        self
    }

    pub fn build(self) -> CResult<BinlogSource> {
        let initial_position = match self.initial_position {
            Some(p) => p,
            None => BinlogFilePos::from_str(DEFAULT_INITIAL_POSITION)?,
        };
        let initial_position = match &self.server_uuid {
            Some(uuid) => {
                let gtid = initial_position.get_gtid_set().cloned();
                initial_position.with_gtid(gtid, Some(uuid))
            }
            None => initial_position,
        };

        let history_repository = self
            .history_repository
            .unwrap_or_else(|| Arc::new(InMemoryStateHistoryRepository::new()));
        let history = StateHistory::load(&self.name, self.state_history_size, history_repository)?;

        Ok(BinlogSource {
            data_source: self
                .data_source
                .unwrap_or_else(|| DataSource::new("127.0.0.1", 3306, &self.name)),
            name: self.name,
            tables: self.tables,
            initial_position,
            table_cache: self.table_cache.unwrap_or_default(),
            state_repository: self
                .state_repository
                .unwrap_or_else(|| Arc::new(InMemoryStateRepository::new())),
            history: Mutex::new(history),
            saved_state: Mutex::new(None),
            listeners: SourceListeners::default(),
            client: Mutex::new(Some(self.client)),
            reader: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
            failures: Arc::new(AtomicUsize::new(0)),
            validation_failures: Arc::new(AtomicU64::new(0)),
        })
    }
}
