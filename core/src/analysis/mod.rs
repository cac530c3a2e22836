//! Cross-run analysis: batch loading, summary statistics and series export.

pub mod batch;
pub mod series;
pub mod statistics;

pub use batch::{load_batch, load_batch_blocking, load_batch_with, BatchError, BatchResult};
pub use series::{series, ProcessedTable, Quantity, PROCESSED_COLUMNS};
pub use statistics::{
    generate_statistics, statistics, variations, RunFailure, RunStatistics, RunVariation,
    StatisticsReport, METRIC_LABELS,
};
