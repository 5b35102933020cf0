//! Dose-response models
//!
//! Two independent routes to the ED50:
//!
//! - [`polynomial`]: least-squares polynomial in log-dose space, with the
//!   ED50 taken as the inflection point found by Newton-Raphson.
//! - [`four_parameter`]: four-parameter logistic, initialized by grid search
//!   and refined by Levenberg-Marquardt.

pub mod four_parameter;
pub mod polynomial;

pub use four_parameter::{FitQuality, FourParameterFit, FourParameters};
pub use polynomial::PolynomialFit;
