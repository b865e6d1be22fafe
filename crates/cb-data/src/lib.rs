//! Canonical data store for the chart bridge
//!
//! The dataset held here is the single source of truth; whatever buffer a
//! rendering context keeps is a replica rebuilt from it.

pub mod dataset;
pub mod normalize;
pub mod window;

use thiserror::Error;

use cb_core::BridgeError;

// Re-exports
pub use dataset::{Dataset, PushOutcome};
pub use normalize::{IntoSeries, NumericBuffer};
pub use window::window_range;

/// Errors that can occur while building or mutating a dataset
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("Series {index} has length {found}, expected {expected}")]
    Ragged {
        expected: usize,
        found: usize,
        index: usize,
    },

    #[error("Axis index {axis} out of range ({series} series)")]
    AxisOutOfRange { axis: usize, series: usize },

    #[error("Column '{0}' is not numeric")]
    NonNumericColumn(String),
}

impl From<DataError> for BridgeError {
    fn from(error: DataError) -> Self {
        match error {
            DataError::Ragged { expected, found, index } => {
                BridgeError::RaggedSeries { expected, found, index }
            }
            DataError::AxisOutOfRange { axis, series } => {
                BridgeError::AxisOutOfRange { axis, series }
            }
            DataError::NonNumericColumn(name) => BridgeError::UnsupportedColumn(name),
        }
    }
}
