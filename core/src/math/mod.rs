pub mod calculus;
pub mod matrix;
pub mod stats;

pub use calculus::CalculusHelper;
pub use matrix::MatrixHelper;
pub use stats::StatsHelper;
