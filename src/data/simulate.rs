//! Synthetic dose-response data
//!
//! Responses follow the four-parameter logistic model, optionally perturbed
//! by Gaussian noise. Useful for tests, benchmarks and for checking that a
//! fit recovers known parameters.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::data::Curve;
use crate::error::AssayError;
use crate::models::four_parameter::FourParameters;

/// Doses `start, start * factor, start * factor^2, ...`
pub fn dilution_series(start: f64, factor: f64, n: usize) -> Result<Vec<f64>, AssayError> {
    if !(start.is_finite() && start > 0.0) {
        return Err(AssayError::InvalidParameter {
            param: "start",
            value: start.to_string(),
        });
    }
    if !(factor.is_finite() && factor > 0.0 && factor != 1.0) {
        return Err(AssayError::InvalidParameter {
            param: "factor",
            value: factor.to_string(),
        });
    }
    Ok((0..n).map(|i| start * factor.powi(i as i32)).collect())
}

/// Logistic responses at `doses`, with noise of standard deviation `noise_sd`
///
/// A `noise_sd` of zero gives exact model values without drawing from `rng`.
/// Negative noisy responses are clamped to zero by [`Curve::new`].
pub fn logistic_curve<R: Rng + ?Sized>(
    id: impl Into<String>,
    params: &FourParameters,
    doses: &[f64],
    noise_sd: f64,
    rng: &mut R,
) -> Result<Curve, AssayError> {
    if !(noise_sd.is_finite() && noise_sd >= 0.0) {
        return Err(AssayError::InvalidParameter {
            param: "noise_sd",
            value: noise_sd.to_string(),
        });
    }
    let noise = Normal::new(0.0, noise_sd).map_err(|_| AssayError::InvalidParameter {
        param: "noise_sd",
        value: noise_sd.to_string(),
    })?;

    let responses = doses
        .iter()
        .map(|&x| {
            let y = params.evaluate(x);
            if noise_sd == 0.0 {
                y
            } else {
                y + noise.sample(&mut *rng)
            }
        })
        .collect();
    let stderr = (noise_sd > 0.0).then(|| vec![noise_sd; doses.len()]);

    Ok(Curve::new(id, doses.to_vec(), responses, stderr)?)
}
