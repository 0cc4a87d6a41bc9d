pub mod source_state;
pub mod state_history;
pub mod repository;

pub use repository::{InMemoryStateHistoryRepository, InMemoryStateRepository, JsonFileStateHistoryRepository,
                     JsonFileStateRepository, StateHistoryRepository, StateRepository};
pub use source_state::SourceState;
pub use state_history::StateHistory;
