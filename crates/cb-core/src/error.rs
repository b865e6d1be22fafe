//! Error types shared by the bridge crates

use thiserror::Error;

/// Errors surfaced synchronously to the caller of a chart operation.
///
/// Remote-side failures never show up here; they arrive on the diagnostic
/// channel instead.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The in-process plotting engine rejected an operation
    #[error(transparent)]
    Engine(#[from] anyhow::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Series {index} has length {found}, expected {expected}")]
    RaggedSeries {
        expected: usize,
        found: usize,
        index: usize,
    },

    #[error("Axis index {axis} out of range ({series} series)")]
    AxisOutOfRange { axis: usize, series: usize },

    #[error("Unsupported column '{0}'")]
    UnsupportedColumn(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type BridgeResult<T> = Result<T, BridgeError>;
