//! Filter engine: configuration, filter designs, derived quantities and the
//! per-run result cache.

pub mod cache;
pub mod config;
pub mod derived;
pub mod engine;
pub mod iir;
pub mod smoothing;

pub use cache::FilterCache;
pub use config::{FilterConfig, FilterKey, FilterKind, FilterSettings};
pub use derived::DerivedQuantities;
pub use engine::{apply_filter, compute_filtered, FilterOutcome, FilteredRun};
pub use iir::TransferFunction;

use crate::prelude::FilterError;

/// Failure channel shared by the processing stages: either a soft sample
/// shortfall or a hard filter error.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum StageError {
    #[error("insufficient samples: need {required}, have {available}")]
    InsufficientSamples { required: usize, available: usize },
    #[error(transparent)]
    Filter(#[from] FilterError),
}
