//! Forecast outputs and held-out turbine data.

/// Contestant forecast arrays.
pub mod prediction;
/// Ground-truth turbine CSV reader.
pub mod test_data;

pub use prediction::Prediction;
pub use test_data::{GroundTruth, RawRecord, Readings, TestData, TestDataError, TurbineFrame};
