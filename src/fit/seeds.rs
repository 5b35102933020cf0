//! Initial ED50 estimate shared by both models
//!
//! An analyst picks a point on the log-dose axis. The polynomial model
//! starts its Newton-Raphson search there; the four-parameter model uses the
//! corresponding linear dose as the centre of its ED50 grid.

use serde::{Deserialize, Serialize};

use crate::data::Curve;
use crate::error::AssayError;
use crate::models::four_parameter::FourParameterFit;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Seeds {
    log_dose: f64,
}

impl Seeds {
    pub fn from_log_dose(log_dose: f64) -> Result<Self, AssayError> {
        if !log_dose.is_finite() {
            return Err(AssayError::InvalidParameter {
                param: "log_dose",
                value: log_dose.to_string(),
            });
        }
        Ok(Self { log_dose })
    }

    /// Seed from a linear dose
    pub fn from_dose(dose: f64) -> Result<Self, AssayError> {
        if !(dose.is_finite() && dose > 0.0) {
            return Err(AssayError::InvalidParameter {
                param: "dose",
                value: dose.to_string(),
            });
        }
        Ok(Self {
            log_dose: dose.log10(),
        })
    }

    /// Seed at a fraction of the curve's log-dose span, 0 at the lowest dose
    pub fn from_axis_fraction(curve: &Curve, fraction: f64) -> Result<Self, AssayError> {
        if curve.is_empty() {
            return Err(AssayError::MissingSeed { what: "data points" });
        }
        let (low, high) = (curve.x_min().log10(), curve.x_max().log10());
        Self::from_log_dose(low + fraction * (high - low))
    }

    /// Starting point of the polynomial inflection search
    pub fn log_dose(&self) -> f64 {
        self.log_dose
    }

    pub fn ed50(&self) -> f64 {
        10f64.powf(self.log_dose)
    }

    /// Store the ED50 seed on `fit` unless it already carries one
    pub fn seed_four_parameter(
        &self,
        fit: FourParameterFit,
    ) -> Result<FourParameterFit, AssayError> {
        if fit.c().is_some() {
            return Ok(fit);
        }
        fit.with_ed50_seed(self.ed50())
    }
}
