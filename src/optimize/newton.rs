//! Newton-Raphson root finding with a bounded iteration count

use serde::Serialize;

use crate::error::AssayError;

/// One accepted Newton-Raphson update
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NewtonStep {
    /// 1-based iteration index
    pub iteration: usize,
    /// The updated estimate
    pub x: f64,
    /// Function value at the updated estimate
    pub value: f64,
}

/// Root found by [`NewtonRaphson::find_root`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NewtonSolution {
    pub root: f64,
    pub iterations: usize,
}

/// Options for the Newton-Raphson search
///
/// The search stops once `|dx| < precision * (1 + |x|)`, which acts as an
/// absolute tolerance near zero and a relative one elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NewtonRaphson {
    /// Convergence tolerance (default: 1e-6)
    pub precision: f64,
    /// Updates allowed before the search is declared divergent (default: 1000)
    pub max_iterations: usize,
}

impl Default for NewtonRaphson {
    fn default() -> Self {
        Self {
            precision: 1e-6,
            max_iterations: 1000,
        }
    }
}

impl NewtonRaphson {
    pub fn new(precision: f64) -> Self {
        Self {
            precision,
            ..Default::default()
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Find a root of `f` starting from `x0`
    ///
    /// `df` is the derivative of `f`. `observer` sees every update before the
    /// convergence test of the next one.
    pub fn find_root<F, D, O>(
        &self,
        f: F,
        df: D,
        x0: f64,
        mut observer: O,
    ) -> Result<NewtonSolution, AssayError>
    where
        F: Fn(f64) -> f64,
        D: Fn(f64) -> f64,
        O: FnMut(&NewtonStep),
    {
        if !(self.precision.is_finite() && self.precision > 0.0) {
            return Err(AssayError::InvalidParameter {
                param: "precision",
                value: self.precision.to_string(),
            });
        }
        if !x0.is_finite() {
            return Err(AssayError::InvalidParameter {
                param: "initial_guess",
                value: x0.to_string(),
            });
        }

        let mut x = x0;
        let mut value = f(x);
        let mut slope = df(x);
        let mut iterations = 0;

        loop {
            let dx = value / slope;
            if !dx.is_finite() {
                return Err(AssayError::DivergentSearch {
                    iterations,
                    reason: format!(
                        "update undefined at x = {} (f = {}, f' = {})",
                        x, value, slope
                    ),
                });
            }
            if dx.abs() < self.precision * (1.0 + x.abs()) {
                return Ok(NewtonSolution {
                    root: x - dx,
                    iterations,
                });
            }
            if iterations >= self.max_iterations {
                return Err(AssayError::DivergentSearch {
                    iterations,
                    reason: format!("no convergence within {} iterations", self.max_iterations),
                });
            }

            x -= dx;
            value = f(x);
            slope = df(x);
            iterations += 1;

            let step = NewtonStep {
                iteration: iterations,
                x,
                value,
            };
            tracing::debug!(
                iteration = step.iteration,
                x = step.x,
                value = step.value,
                "Newton-Raphson"
            );
            observer(&step);
        }
    }
}
