//! Levenberg-Marquardt for small dense nonlinear least-squares problems
//!
//! The problem supplies residuals through [`Operator`] and their Jacobian
//! through [`Jacobian`]. Each iteration solves the damped normal equations
//!
//! ```text
//! (JᵀJ + λ·diag(JᵀJ)) δ = -Jᵀr
//! ```
//!
//! by Cholesky factorisation. Steps that do not lower the sum of squares are
//! rejected and the damping is raised; accepted steps lower it again.

use argmin::core::{Jacobian, Operator};
use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use thiserror::Error;

const MAX_DAMPING: f64 = 1e16;
const MIN_DAMPING: f64 = 1e-15;

/// Reasons the solver gives up
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Problem evaluation failed: {0}")]
    Evaluation(String),

    #[error("Residuals are not finite at the starting point")]
    NonFiniteStart,

    #[error("Normal equations are singular (damping reached {damping:e})")]
    Singular { damping: f64 },

    #[error("No convergence after {iterations} iterations")]
    MaxIterations { iterations: usize },
}

/// Which convergence test stopped the solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Termination {
    /// The residuals vanished
    ZeroResidual,
    /// Relative reduction of the sum of squares fell below `ftol`
    CostTolerance,
    /// Relative step length fell below `xtol`
    StepTolerance,
    /// Largest gradient component fell below `gtol`
    GradientTolerance,
}

/// Outcome of a successful minimisation
#[derive(Debug, Clone, PartialEq)]
pub struct LmReport {
    pub params: DVector<f64>,
    /// Sum of squared residuals at `params`
    pub cost: f64,
    pub iterations: usize,
    pub termination: Termination,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevenbergMarquardt {
    /// Outer iterations allowed (default: 200)
    pub max_iterations: usize,
    /// Relative cost reduction tolerance (default: 1e-10)
    pub ftol: f64,
    /// Relative step tolerance (default: 1e-10)
    pub xtol: f64,
    /// Gradient tolerance (default: 1e-10)
    pub gtol: f64,
    /// Starting damping factor λ (default: 1e-3)
    pub initial_damping: f64,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1e-10,
            xtol: 1e-10,
            gtol: 1e-10,
            initial_damping: 1e-3,
        }
    }
}

impl LevenbergMarquardt {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerances(mut self, ftol: f64, xtol: f64, gtol: f64) -> Self {
        self.ftol = ftol;
        self.xtol = xtol;
        self.gtol = gtol;
        self
    }

    pub fn with_initial_damping(mut self, damping: f64) -> Self {
        self.initial_damping = damping;
        self
    }

    /// Minimise the sum of squared residuals starting from `initial`
    pub fn minimize<P>(&self, problem: &P, initial: DVector<f64>) -> Result<LmReport, SolverError>
    where
        P: Operator<Param = DVector<f64>, Output = DVector<f64>>
            + Jacobian<Param = DVector<f64>, Jacobian = DMatrix<f64>>,
    {
        let mut params = initial;
        let mut residuals = problem
            .apply(&params)
            .map_err(|e| SolverError::Evaluation(e.to_string()))?;
        if residuals.iter().any(|r| !r.is_finite()) {
            return Err(SolverError::NonFiniteStart);
        }
        let mut cost = residuals.norm_squared();
        let mut damping = self.initial_damping;

        let done = |params: DVector<f64>,
                    cost: f64,
                    iterations: usize,
                    termination: Termination|
         -> Result<LmReport, SolverError> {
            tracing::debug!(iterations, cost, ?termination, "Levenberg-Marquardt converged");
            Ok(LmReport {
                params,
                cost,
                iterations,
                termination,
            })
        };

        if cost == 0.0 {
            return done(params, cost, 0, Termination::ZeroResidual);
        }

        for iteration in 1..=self.max_iterations {
            let jacobian = problem
                .jacobian(&params)
                .map_err(|e| SolverError::Evaluation(e.to_string()))?;
            if jacobian.iter().any(|v| !v.is_finite()) {
                return Err(SolverError::Evaluation(
                    "Jacobian contains non-finite entries".to_string(),
                ));
            }

            let normal = jacobian.tr_mul(&jacobian);
            let gradient = jacobian.tr_mul(&residuals);
            if gradient.amax() <= self.gtol {
                return done(params, cost, iteration - 1, Termination::GradientTolerance);
            }

            let diagonal_floor = normal.diagonal().max() * f64::EPSILON;
            if diagonal_floor <= 0.0 {
                return Err(SolverError::Singular { damping });
            }

            loop {
                let mut damped = normal.clone();
                for i in 0..damped.nrows() {
                    damped[(i, i)] += damping * normal[(i, i)].max(diagonal_floor);
                }

                let Some(cholesky) = damped.cholesky() else {
                    damping *= 10.0;
                    if damping > MAX_DAMPING {
                        return Err(SolverError::Singular { damping });
                    }
                    continue;
                };
                let step = cholesky.solve(&(-&gradient));
                let step_small = step.norm() <= self.xtol * (self.xtol + params.norm());
                let candidate = &params + &step;

                let trial = problem
                    .apply(&candidate)
                    .ok()
                    .filter(|r| r.iter().all(|v| v.is_finite()));
                if let Some(trial) = trial {
                    let trial_cost = trial.norm_squared();
                    if trial_cost < cost {
                        let reduction = (cost - trial_cost) / cost;
                        params = candidate;
                        residuals = trial;
                        cost = trial_cost;
                        damping = (damping / 10.0).max(MIN_DAMPING);

                        tracing::debug!(
                            iteration,
                            cost,
                            damping,
                            "Levenberg-Marquardt step accepted"
                        );

                        if cost == 0.0 {
                            return done(params, cost, iteration, Termination::ZeroResidual);
                        }
                        if reduction <= self.ftol {
                            return done(params, cost, iteration, Termination::CostTolerance);
                        }
                        if step_small {
                            return done(params, cost, iteration, Termination::StepTolerance);
                        }
                        break;
                    }
                }

                // no improvement possible at this resolution
                if step_small {
                    return done(params, cost, iteration, Termination::StepTolerance);
                }
                damping *= 10.0;
                if damping > MAX_DAMPING {
                    return Err(SolverError::Singular { damping });
                }
            }
        }

        Err(SolverError::MaxIterations {
            iterations: self.max_iterations,
        })
    }
}
