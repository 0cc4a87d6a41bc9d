use std::collections::VecDeque;
use std::sync::Arc;

use tracing::debug;

use common::err::CResult;
use common::err::decode_error::ReError;

use crate::state::repository::StateHistoryRepository;
use crate::state::source_state::SourceState;

/// Bounded history of source states, oldest first. Every change is persisted.
pub struct StateHistory {
    source_name: String,
    capacity: usize,
    states: VecDeque<SourceState>,
    repository: Arc<dyn StateHistoryRepository>,
}

impl StateHistory {
    /// 从 repository 加载, 超出容量的最旧记录被丢弃
    pub fn load(source_name: &str, capacity: usize, repository: Arc<dyn StateHistoryRepository>) -> CResult<Self> {
        if capacity == 0 {
            return Err(ReError::IllegalStateErr(format!("state history of {} must keep at least one state", source_name)));
        }

        let mut states: VecDeque<SourceState> = repository.read()?.into_iter().collect();
        while states.len() > capacity {
            states.pop_front();
        }

        Ok(StateHistory {
            source_name: source_name.to_string(),
            capacity,
            states,
            repository,
        })
    }

    pub fn add(&mut self, state: SourceState) -> CResult<()> {
        self.states.push_back(state);
        while self.states.len() > self.capacity {
            self.states.pop_front();
        }
        self.save()
    }

    /// Drops the `count` newest states and returns the state now on top, `None` when the
    /// history became empty.
    pub fn remove_last(&mut self, count: usize) -> CResult<Option<SourceState>> {
        if count == 0 {
            return Err(ReError::IllegalStateErr("count should be greater than 0".to_string()));
        }
        if count > self.states.len() {
            return Err(ReError::IllegalStateErr(format!(
                "cannot remove {} states from history of {} with {} states", count, self.source_name, self.states.len())));
        }

        self.states.truncate(self.states.len() - count);
        debug!("removed {} states from history of {}", count, self.source_name);
        self.save()?;

        Ok(self.states.back().cloned())
    }

    pub fn clear(&mut self) -> CResult<()> {
        self.states.clear();
        self.save()
    }

    pub fn last(&self) -> Option<&SourceState> {
        self.states.back()
    }

    pub fn states(&self) -> &VecDeque<SourceState> {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn save(&self) -> CResult<()> {
        self.repository.save(&self.states)
    }
}
