//! Raw decoder: logger CSV tables into time-stamped RPM and speed.

pub mod decoder;
pub mod table;

pub use decoder::{
    decode, RawRun, VehicleConstants, DECIMATION, RPM_PER_PULSE, SAMPLE_STEP_S,
};
pub use table::RunTable;
