//! Polynomial dose-response model
//!
//! A polynomial of caller-chosen degree is fitted by ordinary least squares
//! to the responses against `log10(dose)`. The ED50 estimate of this model
//! is the inflection point of the fitted curve: the root of the second
//! derivative reached by Newton-Raphson from an initial guess.
//!
//! All coefficient vectors are in ascending power order, so `a[i]` is the
//! coefficient of `x^i`.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::data::Curve;
use crate::error::AssayError;
use crate::optimize::newton::{NewtonRaphson, NewtonStep};

/// Lowest degree with a meaningful inflection point
pub const MIN_DEGREE: usize = 3;

/// Evaluate `sum(coefficients[i] * x^i)` using Horner's scheme
pub fn evaluate(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

/// Coefficients of the derivative, re-indexed to start at power 0
///
/// The derivative of a constant (or empty) polynomial is empty, which
/// evaluates to zero everywhere.
pub fn differentiate(coefficients: &[f64]) -> Vec<f64> {
    coefficients
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, &c)| i as f64 * c)
        .collect()
}

/// First, second and third derivatives of a polynomial
pub fn derivatives(coefficients: &[f64]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let first = differentiate(coefficients);
    let second = differentiate(&first);
    let third = differentiate(&second);
    (first, second, third)
}

/// One Newton-Raphson update of the inflection search
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InflectionStep {
    pub iteration: usize,
    /// Second derivative at the updated estimate
    pub curvature: f64,
    /// Updated estimate in log10-dose space
    pub log_dose: f64,
    /// Updated estimate as a linear dose
    pub dose: f64,
}

impl From<&NewtonStep> for InflectionStep {
    fn from(step: &NewtonStep) -> Self {
        Self {
            iteration: step.iteration,
            curvature: step.value,
            log_dose: step.x,
            dose: 10f64.powf(step.x),
        }
    }
}

/// A least-squares polynomial fitted in log-dose space
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolynomialFit {
    degree: usize,
    coefficients: Vec<f64>,
    first_derivative: Vec<f64>,
    second_derivative: Vec<f64>,
    third_derivative: Vec<f64>,
    inflection_estimate: Option<f64>,
    inflection: Option<f64>,
}

impl PolynomialFit {
    /// Regress `y` on `log10(x)` with a polynomial of the given degree
    ///
    /// The degree must satisfy `3 <= degree < curve.len()`. A rank-deficient
    /// design matrix is reported as [`AssayError::FitFailed`].
    pub fn fit(curve: &Curve, degree: usize) -> Result<Self, AssayError> {
        let points = curve.len();
        if degree < MIN_DEGREE || degree >= points {
            return Err(AssayError::InvalidDegree { degree, points });
        }

        let terms = degree + 1;
        let log_x = curve.log_x();
        let design = DMatrix::from_fn(points, terms, |i, j| log_x[i].powi(j as i32));
        let response = DVector::from_column_slice(curve.y());

        let svd = design.svd(true, true);
        let largest = svd.singular_values.max();
        let eps = largest * points.max(terms) as f64 * f64::EPSILON;
        if !largest.is_finite() || largest <= 0.0 {
            return Err(AssayError::FitFailed {
                stage: "polynomial regression",
                reason: "design matrix has no usable singular values".to_string(),
            });
        }
        let rank = svd.rank(eps);
        if rank < terms {
            return Err(AssayError::FitFailed {
                stage: "polynomial regression",
                reason: format!("design matrix is singular (rank {} of {})", rank, terms),
            });
        }

        let solution = svd
            .solve(&response, eps)
            .map_err(|reason| AssayError::FitFailed {
                stage: "polynomial regression",
                reason: reason.to_string(),
            })?;
        let coefficients: Vec<f64> = solution.iter().copied().collect();
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(AssayError::FitFailed {
                stage: "polynomial regression",
                reason: "non-finite coefficient".to_string(),
            });
        }

        tracing::debug!(curve = curve.id(), degree, ?coefficients, "Fitted polynomial");
        Ok(Self::from_coefficients(coefficients))
    }

    /// Wrap known coefficients (ascending power order)
    pub fn from_coefficients(coefficients: Vec<f64>) -> Self {
        let (first_derivative, second_derivative, third_derivative) = derivatives(&coefficients);
        Self {
            degree: coefficients.len().saturating_sub(1),
            coefficients,
            first_derivative,
            second_derivative,
            third_derivative,
            inflection_estimate: None,
            inflection: None,
        }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn first_derivative(&self) -> &[f64] {
        &self.first_derivative
    }

    pub fn second_derivative(&self) -> &[f64] {
        &self.second_derivative
    }

    pub fn third_derivative(&self) -> &[f64] {
        &self.third_derivative
    }

    /// The initial guess used by the last successful inflection search
    pub fn inflection_estimate(&self) -> Option<f64> {
        self.inflection_estimate
    }

    /// Solved inflection point in log10-dose space
    pub fn inflection(&self) -> Option<f64> {
        self.inflection
    }

    /// Solved inflection point as a linear dose
    pub fn ed50(&self) -> Option<f64> {
        self.inflection.map(|x| 10f64.powf(x))
    }

    /// Evaluate the fitted polynomial at a log10 dose
    pub fn evaluate(&self, log_dose: f64) -> f64 {
        evaluate(&self.coefficients, log_dose)
    }

    /// Fitted responses at every dose of the curve
    pub fn predict(&self, curve: &Curve) -> Vec<f64> {
        curve.log_x().iter().map(|&x| self.evaluate(x)).collect()
    }

    /// Solve for the inflection point from a log10-dose guess
    pub fn solve_inflection(&mut self, guess: f64, precision: f64) -> Result<f64, AssayError> {
        self.solve_inflection_with(guess, &NewtonRaphson::new(precision), |_| {})
    }

    /// As [`PolynomialFit::solve_inflection`], reporting every iteration
    pub fn solve_inflection_traced<O>(
        &mut self,
        guess: f64,
        precision: f64,
        observer: O,
    ) -> Result<f64, AssayError>
    where
        O: FnMut(&InflectionStep),
    {
        self.solve_inflection_with(guess, &NewtonRaphson::new(precision), observer)
    }

    /// Solve for the inflection point with explicit solver options
    ///
    /// On failure the previously solved inflection point is kept.
    pub fn solve_inflection_with<O>(
        &mut self,
        guess: f64,
        solver: &NewtonRaphson,
        mut observer: O,
    ) -> Result<f64, AssayError>
    where
        O: FnMut(&InflectionStep),
    {
        let second = &self.second_derivative;
        let third = &self.third_derivative;
        let solution = solver.find_root(
            |x| evaluate(second, x),
            |x| evaluate(third, x),
            guess,
            |step| observer(&InflectionStep::from(step)),
        )?;

        tracing::info!(
            log_dose = solution.root,
            ed50 = 10f64.powf(solution.root),
            iterations = solution.iterations,
            "Polynomial inflection solved"
        );
        self.inflection_estimate = Some(guess);
        self.inflection = Some(solution.root);
        Ok(solution.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Points exactly on `50 + 10t + 5t^2 - 2t^3` with `t = log10(x)`
    fn cubic_curve() -> Curve {
        let coefficients = [50.0, 10.0, 5.0, -2.0];
        let t: Vec<f64> = (0..6).map(|i| i as f64 * 0.5).collect();
        let x = t.iter().map(|t| 10f64.powf(*t)).collect();
        let y = t.iter().map(|t| evaluate(&coefficients, *t)).collect();
        Curve::new("cubic", x, y, None).unwrap()
    }

    #[test]
    fn horner_evaluation() {
        assert_eq!(evaluate(&[1.0, 2.0, 3.0], 2.0), 17.0);
        assert_eq!(evaluate(&[], 2.0), 0.0);
    }

    #[test]
    fn derivative_coefficients() {
        let (first, second, third) = derivatives(&[4.0, 3.0, 2.0, 1.0]);
        assert_eq!(first, vec![3.0, 4.0, 3.0]);
        assert_eq!(second, vec![4.0, 6.0]);
        assert_eq!(third, vec![6.0]);
        assert!(differentiate(&[7.0]).is_empty());
    }

    #[test]
    fn degree_bounds() {
        let curve = cubic_curve();
        assert_eq!(
            PolynomialFit::fit(&curve, 2),
            Err(AssayError::InvalidDegree {
                degree: 2,
                points: 6
            })
        );
        assert_eq!(
            PolynomialFit::fit(&curve, 6),
            Err(AssayError::InvalidDegree {
                degree: 6,
                points: 6
            })
        );
        assert!(PolynomialFit::fit(&curve, 5).is_ok());
    }

    #[test]
    fn recovers_exact_cubic() {
        let fit = PolynomialFit::fit(&cubic_curve(), 3).unwrap();
        assert_eq!(fit.degree(), 3);
        for (fitted, expected) in fit.coefficients().iter().zip([50.0, 10.0, 5.0, -2.0]) {
            assert_abs_diff_eq!(*fitted, expected, epsilon = 1e-8);
        }
        assert_abs_diff_eq!(fit.third_derivative()[0], -12.0, epsilon = 1e-7);
    }

    #[test]
    fn inflection_of_cubic() {
        let mut fit = PolynomialFit::fit(&cubic_curve(), 3).unwrap();
        assert_eq!(fit.inflection(), None);
        let mut trace = Vec::new();
        let root = fit
            .solve_inflection_traced(1.5, 1e-6, |step| trace.push(*step))
            .unwrap();
        // 10 - 12t = 0
        assert_abs_diff_eq!(root, 10.0 / 12.0, epsilon = 1e-6);
        assert_eq!(fit.inflection_estimate(), Some(1.5));
        assert!(!trace.is_empty());
        assert_abs_diff_eq!(trace[0].dose, 10f64.powf(trace[0].log_dose), epsilon = 1e-9);
        assert_abs_diff_eq!(fit.ed50().unwrap(), 10f64.powf(10.0 / 12.0), epsilon = 1e-4);
    }

    #[test]
    fn failed_search_keeps_previous_solution() {
        // t^4/4 - 3t^2/2: second derivative 3t^2 - 3, third derivative 6t
        let mut fit = PolynomialFit::from_coefficients(vec![0.0, 0.0, -1.5, 0.0, 0.25]);
        let root = fit.solve_inflection(2.0, 1e-6).unwrap();
        assert_abs_diff_eq!(root, 1.0, epsilon = 1e-6);

        // the third derivative vanishes at the guess
        assert!(matches!(
            fit.solve_inflection(0.0, 1e-6),
            Err(AssayError::DivergentSearch { iterations: 0, .. })
        ));
        assert_eq!(fit.inflection(), Some(root));
        assert_eq!(fit.inflection_estimate(), Some(2.0));
    }

    #[test]
    fn curvature_without_real_root_diverges() {
        // second derivative 6 - 6t + 3t^2 never crosses zero
        let mut fit = PolynomialFit::from_coefficients(vec![0.0, 0.0, 3.0, -1.0, 0.25]);
        assert!(matches!(
            fit.solve_inflection(1.0, 1e-6),
            Err(AssayError::DivergentSearch { .. })
        ));
        assert_eq!(fit.inflection(), None);
    }

    #[test]
    fn singular_design_is_reported() {
        let x: Vec<f64> = (0..5).map(|k| 1.0 + k as f64 * f64::EPSILON).collect();
        let curve = Curve::new("tight", x, vec![1.0, 2.0, 3.0, 4.0, 5.0], None).unwrap();
        assert!(matches!(
            PolynomialFit::fit(&curve, 3),
            Err(AssayError::FitFailed { .. })
        ));
    }

    #[test]
    fn predictions_follow_the_curve() {
        let curve = cubic_curve();
        let fit = PolynomialFit::fit(&curve, 3).unwrap();
        for (predicted, observed) in fit.predict(&curve).iter().zip(curve.y()) {
            assert_abs_diff_eq!(*predicted, *observed, epsilon = 1e-8);
        }
    }
}
