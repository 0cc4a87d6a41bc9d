use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use common::err::CResult;
use common::err::decode_error::ReError;
use common::file_util::{read_json, write_json};

use crate::state::source_state::SourceState;

/// Durable store of the last checkpointed state of one source.
pub trait StateRepository: Send + Sync {
    fn read(&self) -> CResult<Option<SourceState>>;

    fn save(&self, state: &SourceState) -> CResult<()>;
}

/// Durable store of the state history of one source, oldest first.
pub trait StateHistoryRepository: Send + Sync {
    fn read(&self) -> CResult<Vec<SourceState>>;

    fn save(&self, states: &VecDeque<SourceState>) -> CResult<()>;
}

fn repository_err(path: &Path, e: ReError) -> ReError {
    ReError::StateRepositoryErr(format!("{}: {}", path.display(), e))
}

#[derive(Debug, Default)]
pub struct InMemoryStateRepository {
    state: Mutex<Option<SourceState>>,
}

impl InMemoryStateRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateRepository for InMemoryStateRepository {
    fn read(&self) -> CResult<Option<SourceState>> {
        Ok(self.state.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, state: &SourceState) -> CResult<()> {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = Some(state.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStateHistoryRepository {
    states: Mutex<Vec<SourceState>>,
}

impl InMemoryStateHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateHistoryRepository for InMemoryStateHistoryRepository {
    fn read(&self) -> CResult<Vec<SourceState>> {
        Ok(self.states.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, states: &VecDeque<SourceState>) -> CResult<()> {
        *self.states.lock().unwrap_or_else(|e| e.into_inner()) = states.iter().cloned().collect();
        Ok(())
    }
}

/// 以 json 文件保存 state
#[derive(Debug, Clone)]
pub struct JsonFileStateRepository {
    path: PathBuf,
}

impl JsonFileStateRepository {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        JsonFileStateRepository {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl StateRepository for JsonFileStateRepository {
    fn read(&self) -> CResult<Option<SourceState>> {
        read_json(&self.path).map_err(|e| repository_err(&self.path, e))
    }

    fn save(&self, state: &SourceState) -> CResult<()> {
        write_json(&self.path, state).map_err(|e| repository_err(&self.path, e))
    }
}

/// 以 json 数组保存 state 历史
#[derive(Debug, Clone)]
pub struct JsonFileStateHistoryRepository {
    path: PathBuf,
}

impl JsonFileStateHistoryRepository {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        JsonFileStateHistoryRepository {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl StateHistoryRepository for JsonFileStateHistoryRepository {
    fn read(&self) -> CResult<Vec<SourceState>> {
        Ok(read_json::<Vec<SourceState>, _>(&self.path)
            .map_err(|e| repository_err(&self.path, e))?
            .unwrap_or_default())
    }

    fn save(&self, states: &VecDeque<SourceState>) -> CResult<()> {
        write_json(&self.path, states).map_err(|e| repository_err(&self.path, e))
    }
}
