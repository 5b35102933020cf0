pub mod assay;
pub mod curve;
pub mod curve_error;
pub mod simulate;
pub use assay::Assay;
pub use curve::{Curve, CurveBuilder};
pub use curve_error::CurveError;
