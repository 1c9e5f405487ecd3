//! Error types for Surf Match

use thiserror::Error;

/// Errors that can occur during computation
///
/// An untrained model is not an error: it is represented as `None` wherever a
/// trained model is expected.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("No swell data available at {0}")]
    NoSwellData(String),

    #[error("Series length mismatch: {field} has {actual} samples, expected {expected}")]
    SeriesLengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Series time axis goes backwards at index {0}")]
    UnorderedTime(usize),

    #[error("Hour index {index} out of range for series of {len} hours")]
    HourOutOfRange { index: usize, len: usize },

    #[error("Empty series: {0}")]
    EmptySeries(String),

    #[error("Duplicate log entry id: {0}")]
    DuplicateEntry(String),

    #[error("Unknown log entry: {0}")]
    UnknownEntry(String),

    #[error("Log entry has no recorded conditions: {0}")]
    MissingConditions(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
