pub mod state;
pub mod source;
pub mod destination;
pub mod metrics;
pub mod pipe;
pub mod pipe_manager;

pub use destination::{Destination, DestinationBuilder, DestinationListener, PooledDestination};
pub use metrics::{Metrics, NoopMetrics, PipeMetrics};
pub use pipe::Pipe;
pub use pipe_manager::{PipeKey, PipeManager};
pub use source::{BinlogSource, BinlogSourceBuilder, Source, SourceListener};
pub use state::SourceState;
