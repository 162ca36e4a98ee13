// Library crate - alert log ingestion, cleaned dataset and signal statistics

pub mod types;
pub mod config;
pub mod log_reader;
pub mod normalize;
pub mod dataset;
pub mod pipeline;
pub mod aggregate;
pub mod stats;
pub mod report;

// Re-export commonly used types
pub use types::*;
pub use config::TrackerConfig;
pub use aggregate::{Ranking, SymbolAggregate};
pub use stats::{NumericColumn, Subset, Summary, SummaryStats};
pub use report::{DatasetStatus, TrackerReport};
