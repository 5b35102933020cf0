//! Error types for dose-response curve construction
//!
//! [`CurveError`] covers problems with the input arrays themselves. These
//! are raised before any model sees the data, so a rejected curve never
//! reaches the fitting code.

use thiserror::Error;

/// Errors arising from dose-response curve construction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CurveError {
    /// No data points were supplied
    #[error("Curve '{id}' contains no data points")]
    Empty {
        /// Identifier of the offending curve
        id: String,
    },

    /// Parallel input arrays differ in length
    #[error("Array length mismatch: {description}")]
    ArrayLengthMismatch {
        /// Which arrays mismatched and their lengths
        description: String,
    },

    /// A dose, response or error value is NaN or infinite
    #[error("Non-finite {column} value at index {index}")]
    NonFinite {
        /// Column name (`x`, `y` or `stderr`)
        column: &'static str,
        /// Position in the input array
        index: usize,
    },

    /// Doses must be strictly positive to take their logarithm
    #[error("Dose at index {index} must be positive, got {value}")]
    NonPositiveDose {
        /// Position in the input array
        index: usize,
        /// The offending dose
        value: f64,
    },

    /// Doses must be strictly ascending or strictly descending
    #[error("Dose values must be strictly monotonic (violated at index {index})")]
    NotMonotonic {
        /// First index where the ordering breaks
        index: usize,
    },

    /// Two curves in one assay share an identifier
    #[error("Assay already contains a curve with id '{id}'")]
    DuplicateId {
        /// The repeated identifier
        id: String,
    },
}
