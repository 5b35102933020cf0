//! Four-parameter logistic dose-response model
//!
//! ```text
//! y = d + (a - d) / (1 + (x / c)^b)
//! ```
//!
//! `a` is the response as the dose goes to zero, `d` the response as it goes
//! to infinity, `b` the Hill slope and `c` the ED50.
//!
//! # Fitting
//!
//! 1. **Initial slope scan**: with the asymptotes at the observed extremes
//!    and the ED50 at the seed, try evenly spaced slopes in `[0, max_slope)`
//!    and keep the one with the smallest sum of squared residuals.
//! 2. **Grid search**: exhaustively search the Cartesian product of linear
//!    grids around both asymptotes, the ED50 seed and the best slope.
//! 3. **Refinement**: Levenberg-Marquardt from the best grid cell. If the
//!    solver fails, the grid estimate is kept and tagged as such.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::data::Curve;
use crate::error::AssayError;
use crate::fit::config::SearchConfig;
use crate::fit::monitor::FitMonitor;
use crate::optimize::levenberg_marquardt::LevenbergMarquardt;
use crate::optimize::logistic::LogisticProblem;

/// Fraction of the smallest dose used as the floor of the ED50 grid
const ED50_FLOOR_FRACTION: f64 = 1e-3;

/// Four-parameter logistic response at dose `x`
///
/// Undefined (NaN) for `ed50 == 0`; callers guard against it.
pub fn evaluate(x: f64, a: f64, d: f64, slope: f64, ed50: f64) -> f64 {
    d + (a - d) / (1.0 + (x / ed50).powf(slope))
}

/// A complete set of logistic parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FourParameters {
    /// Lower asymptote (response as dose → 0)
    pub a: f64,
    /// Hill slope
    pub b: f64,
    /// ED50
    pub c: f64,
    /// Upper asymptote (response as dose → ∞)
    pub d: f64,
}

impl FourParameters {
    pub fn new(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self { a, b, c, d }
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        evaluate(x, self.a, self.d, self.b, self.c)
    }

    pub fn to_vector(&self) -> DVector<f64> {
        DVector::from_vec(vec![self.a, self.b, self.c, self.d])
    }

    pub fn from_vector(v: &DVector<f64>) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }

    fn is_usable(&self) -> bool {
        [self.a, self.b, self.c, self.d].iter().all(|v| v.is_finite()) && self.c > 0.0
    }
}

/// Provenance of the parameters held by a [`FourParameterFit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FitQuality {
    /// No fit has run; only seeds may be present
    #[default]
    Unfit,
    /// Grid-search estimate; least-squares refinement did not converge
    GridSearchOnly,
    /// Least-squares refinement converged
    LeastSquaresConverged,
}

/// Seeds and results of the four-parameter model for one curve
///
/// Before a fit, `c` may hold the ED50 seed and `a`/`d` may hold manual
/// asymptote overrides. A fit replaces all four and tags the quality.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FourParameterFit {
    a: Option<f64>,
    b: Option<f64>,
    c: Option<f64>,
    d: Option<f64>,
    quality: FitQuality,
    predicted: Vec<f64>,
}

impl FourParameterFit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the ED50 (a linear dose) before fitting
    pub fn with_ed50_seed(mut self, ed50: f64) -> Result<Self, AssayError> {
        if !(ed50.is_finite() && ed50 > 0.0) {
            return Err(AssayError::InvalidParameter {
                param: "ed50_seed",
                value: ed50.to_string(),
            });
        }
        self.c = Some(ed50);
        Ok(self)
    }

    /// Override the asymptote estimates the grid search centres on
    pub fn with_asymptotes(mut self, a: Option<f64>, d: Option<f64>) -> Result<Self, AssayError> {
        for (param, value) in [("a", a), ("d", d)] {
            if let Some(v) = value.filter(|v| !v.is_finite()) {
                return Err(AssayError::InvalidParameter {
                    param,
                    value: v.to_string(),
                });
            }
        }
        self.a = a;
        self.d = d;
        Ok(self)
    }

    /// Fitted state from a complete parameter set
    pub fn from_parameters(params: FourParameters, quality: FitQuality, curve: &Curve) -> Self {
        Self {
            a: Some(params.a),
            b: Some(params.b),
            c: Some(params.c),
            d: Some(params.d),
            quality,
            predicted: curve.x().iter().map(|&x| params.evaluate(x)).collect(),
        }
    }

    pub fn a(&self) -> Option<f64> {
        self.a
    }

    pub fn b(&self) -> Option<f64> {
        self.b
    }

    pub fn c(&self) -> Option<f64> {
        self.c
    }

    pub fn d(&self) -> Option<f64> {
        self.d
    }

    pub fn quality(&self) -> FitQuality {
        self.quality
    }

    /// Model responses aligned with the curve's doses; empty before a fit
    pub fn predicted(&self) -> &[f64] {
        &self.predicted
    }

    /// All four parameters, once every one of them is set
    pub fn parameters(&self) -> Option<FourParameters> {
        Some(FourParameters::new(self.a?, self.b?, self.c?, self.d?))
    }

    /// Fitted ED50; `None` while only a seed is present
    pub fn ed50(&self) -> Option<f64> {
        match self.quality {
            FitQuality::Unfit => None,
            _ => self.c,
        }
    }

    /// Run the grid search using the seeds stored on this fit
    pub fn grid_search(
        &self,
        curve: &Curve,
        config: &SearchConfig,
        monitor: &FitMonitor,
    ) -> Result<FourParameterFit, AssayError> {
        grid_search_initialize(curve, self.c, self.a, self.d, config, monitor)
    }
}

/// Evenly spaced grid `lower + i * (upper - lower) / n` for `i` in `0..n`
fn linear_grid(lower: f64, upper: f64, n: usize) -> Vec<f64> {
    let step = (upper - lower) / n as f64;
    (0..n).map(|i| lower + i as f64 * step).collect()
}

/// One-dimensional slope scan with asymptotes and ED50 held fixed
fn scan_initial_slope(
    problem: &LogisticProblem,
    a: f64,
    d: f64,
    ed50: f64,
    config: &SearchConfig,
) -> f64 {
    let increment = config.max_slope / config.initial_slope_iterations as f64;
    let mut best_slope = 0.0;
    let mut best_ssr = f64::INFINITY;
    for i in 0..config.initial_slope_iterations {
        let slope = i as f64 * increment;
        let ssr = problem.ssr(&FourParameters::new(a, slope, ed50, d));
        if ssr < best_ssr {
            best_ssr = ssr;
            best_slope = slope;
        }
    }
    best_slope
}

/// Coarse exhaustive search for the four logistic parameters
///
/// `seed_a` and `seed_d` override the observed response extremes as the
/// centres of the asymptote grids. Cancellation is checked after the slope
/// scan and once per step of the outermost (upper asymptote) axis, where
/// progress is also reported.
///
/// # Errors
///
/// [`AssayError::MissingSeed`] without an ED50 seed or data points,
/// [`AssayError::InvalidParameter`] for unusable seeds, configuration errors
/// from [`SearchConfig::validate`], and [`AssayError::Cancelled`].
pub fn grid_search_initialize(
    curve: &Curve,
    seed_ed50: Option<f64>,
    seed_a: Option<f64>,
    seed_d: Option<f64>,
    config: &SearchConfig,
    monitor: &FitMonitor,
) -> Result<FourParameterFit, AssayError> {
    if curve.is_empty() {
        return Err(AssayError::MissingSeed { what: "data points" });
    }
    let seed = seed_ed50.ok_or(AssayError::MissingSeed { what: "ED50" })?;
    if !(seed.is_finite() && seed > 0.0) {
        return Err(AssayError::InvalidParameter {
            param: "ed50_seed",
            value: seed.to_string(),
        });
    }
    for (param, value) in [("a", seed_a), ("d", seed_d)] {
        if let Some(v) = value.filter(|v| !v.is_finite()) {
            return Err(AssayError::InvalidParameter {
                param,
                value: v.to_string(),
            });
        }
    }
    config.validate()?;

    let problem = LogisticProblem::new(curve);
    let y_min = seed_a.unwrap_or_else(|| curve.y_min());
    let y_max = seed_d.unwrap_or_else(|| curve.y_max());

    let y_window = config.y_search_fraction / 2.0 * (y_max - y_min);
    let x_window = config.x_search_fraction / 2.0 * (curve.x_max() - curve.x_min());

    let lower_grid = linear_grid(y_min - y_window, y_min + y_window, config.y_iterations);
    let upper_grid = linear_grid(y_max - y_window, y_max + y_window, config.y_iterations);
    let mut ed50_grid = linear_grid(seed - x_window, seed + x_window, config.ed_iterations);
    if ed50_grid[0] <= 0.0 {
        // keep the spacing, move the whole grid onto positive doses
        let floor = curve.x_min() * ED50_FLOOR_FRACTION;
        let shift = floor - ed50_grid[0];
        ed50_grid.iter_mut().for_each(|c| *c += shift);
    }

    monitor.report(0, upper_grid.len());
    let slope = scan_initial_slope(&problem, y_min, y_max, seed, config);
    tracing::debug!(curve = curve.id(), slope, "Initial slope scan");
    monitor.checkpoint("initial slope scan")?;

    let slope_window = config.y_search_fraction / 2.0 * slope;
    let slope_grid = linear_grid(
        slope - slope_window,
        slope + slope_window,
        config.slope_iterations,
    );

    let mut best: Option<(f64, FourParameters)> = None;
    for (step, &upper) in upper_grid.iter().enumerate() {
        monitor.report(step, upper_grid.len());
        monitor.checkpoint("grid search")?;
        for &lower in &lower_grid {
            for &ed50 in &ed50_grid {
                for &b in &slope_grid {
                    let candidate = FourParameters::new(lower, b, ed50, upper);
                    let ssr = problem.ssr(&candidate);
                    if ssr.is_finite() && best.map_or(true, |(best_ssr, _)| ssr < best_ssr) {
                        best = Some((ssr, candidate));
                    }
                }
            }
        }
    }
    monitor.report(upper_grid.len(), upper_grid.len());

    let (ssr, params) = best.ok_or_else(|| AssayError::FitFailed {
        stage: "grid search",
        reason: "no grid cell produced a finite sum of squares".to_string(),
    })?;
    tracing::info!(
        curve = curve.id(),
        a = params.a,
        b = params.b,
        c = params.c,
        d = params.d,
        ssr,
        "Four-parameter grid search complete"
    );
    Ok(FourParameterFit::from_parameters(
        params,
        FitQuality::GridSearchOnly,
        curve,
    ))
}

/// Refine a grid-search estimate by nonlinear least squares
pub fn refine(fit: &FourParameterFit, curve: &Curve) -> FourParameterFit {
    refine_with(fit, curve, &LevenbergMarquardt::default())
}

/// As [`refine`], with explicit solver options
///
/// Refinement never fails: when the solver does not converge, or converges
/// to an unusable point, the input is returned unchanged. A fit without a
/// complete parameter set is also returned unchanged.
pub fn refine_with(
    fit: &FourParameterFit,
    curve: &Curve,
    solver: &LevenbergMarquardt,
) -> FourParameterFit {
    let Some(start) = fit.parameters() else {
        return fit.clone();
    };

    let problem = LogisticProblem::new(curve);
    match solver.minimize(&problem, start.to_vector()) {
        Ok(report) => {
            let params = FourParameters::from_vector(&report.params);
            if !params.is_usable() {
                tracing::warn!(
                    curve = curve.id(),
                    ?params,
                    "Least-squares refinement left the valid region"
                );
                return fit.clone();
            }
            tracing::info!(
                curve = curve.id(),
                iterations = report.iterations,
                cost = report.cost,
                termination = ?report.termination,
                "Least-squares refinement converged"
            );
            FourParameterFit::from_parameters(params, FitQuality::LeastSquaresConverged, curve)
        }
        Err(error) => {
            tracing::warn!(
                curve = curve.id(),
                %error,
                "Least-squares refinement failed, keeping grid estimate"
            );
            fit.clone()
        }
    }
}
