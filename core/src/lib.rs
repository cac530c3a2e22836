//! Run processing engine for pulse-count vehicle logger telemetry.
//!
//! Logger exports are decoded into RPM and speed, filtered with one of six
//! selectable filters (memoized per run), differentiated into acceleration
//! and jerk, integrated into distance and summarized across runs.

pub mod analysis;
pub mod ingest;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use analysis::{
    generate_statistics, load_batch, statistics, variations, BatchResult, RunStatistics,
    RunVariation,
};
pub use ingest::{decode, RawRun, RunTable, VehicleConstants};
pub use prelude::{DecodeError, FilterError};
pub use processing::{apply_filter, FilterConfig, FilterOutcome, FilteredRun};
