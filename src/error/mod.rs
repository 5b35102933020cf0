use thiserror::Error;

use crate::data::curve_error::CurveError;
use crate::fit::config::ConfigParseError;

/// Errors surfaced by the fitting core
///
/// Every variant carries enough context (parameter, stage, counts) for a
/// caller to render a message. A failed operation never leaves a curve or a
/// previously stored fit partially updated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssayError {
    /// The curve could not be constructed from the supplied values
    #[error(transparent)]
    InvalidCurve(#[from] CurveError),

    /// The requested polynomial degree is not supported by the data
    #[error("Degree {degree} is not supported by {points} points (need 3 <= degree < {points})")]
    InvalidDegree { degree: usize, points: usize },

    /// A regression could not be solved (singular or ill-conditioned system)
    #[error("Fit failed during {stage}: {reason}")]
    FitFailed { stage: &'static str, reason: String },

    /// Newton-Raphson did not converge
    #[error("Newton-Raphson search diverged after {iterations} iterations: {reason}")]
    DivergentSearch { iterations: usize, reason: String },

    /// A required initial estimate was not supplied
    #[error("Missing initial estimate: {what}")]
    MissingSeed { what: &'static str },

    /// An operation received an unusable numeric argument
    #[error("Invalid parameter: {param} = {value}")]
    InvalidParameter { param: &'static str, value: String },

    /// A configuration batch was rejected as a whole
    #[error(transparent)]
    ConfigParse(#[from] ConfigParseError),

    /// A four-parameter fit is already running for this curve
    #[error("A fit is already in progress for curve '{curve}'")]
    FitInProgress { curve: String },

    /// The long-running search was cancelled by the caller
    #[error("Fit cancelled during {stage} at {percent}% complete")]
    Cancelled { stage: &'static str, percent: u32 },
}

pub type Result<T> = std::result::Result<T, AssayError>;
