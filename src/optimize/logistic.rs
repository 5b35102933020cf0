//! Least-squares problem for the four-parameter logistic model
//!
//! Parameters are packed as `[a, b, c, d]`: lower asymptote, slope, ED50 and
//! upper asymptote. Residuals are `model(x_i) - y_i`.

use argmin::core::{CostFunction, Error, Jacobian, Operator};
use nalgebra::{DMatrix, DVector};

use crate::data::Curve;
use crate::models::four_parameter::{evaluate, FourParameters};

pub struct LogisticProblem<'a> {
    x: &'a [f64],
    y: &'a [f64],
}

impl<'a> LogisticProblem<'a> {
    pub fn new(curve: &'a Curve) -> Self {
        Self {
            x: curve.x(),
            y: curve.y(),
        }
    }

    /// Sum of squared residuals for one parameter set
    pub fn ssr(&self, params: &FourParameters) -> f64 {
        self.x
            .iter()
            .zip(self.y)
            .map(|(&x, &y)| {
                let residual = y - evaluate(x, params.a, params.d, params.b, params.c);
                residual * residual
            })
            .sum()
    }

    fn unpack(param: &DVector<f64>) -> Result<FourParameters, Error> {
        if param.len() != 4 {
            return Err(Error::msg(format!(
                "expected 4 logistic parameters, got {}",
                param.len()
            )));
        }
        let params = FourParameters::new(param[0], param[1], param[2], param[3]);
        if params.c.is_nan() || params.c <= 0.0 {
            return Err(Error::msg(format!("ED50 must be positive, got {}", params.c)));
        }
        Ok(params)
    }
}

impl CostFunction for LogisticProblem<'_> {
    type Param = DVector<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.ssr(&Self::unpack(param)?))
    }
}

impl Operator for LogisticProblem<'_> {
    type Param = DVector<f64>;
    type Output = DVector<f64>;

    fn apply(&self, param: &Self::Param) -> Result<Self::Output, Error> {
        let p = Self::unpack(param)?;
        Ok(DVector::from_iterator(
            self.x.len(),
            self.x
                .iter()
                .zip(self.y)
                .map(|(&x, &y)| evaluate(x, p.a, p.d, p.b, p.c) - y),
        ))
    }
}

impl Jacobian for LogisticProblem<'_> {
    type Param = DVector<f64>;
    type Jacobian = DMatrix<f64>;

    fn jacobian(&self, param: &Self::Param) -> Result<Self::Jacobian, Error> {
        let p = Self::unpack(param)?;
        let mut jacobian = DMatrix::zeros(self.x.len(), 4);
        for (i, &x) in self.x.iter().enumerate() {
            let ratio = x / p.c;
            // s stays in [0, 1] even when the power overflows
            let s = 1.0 / (1.0 + ratio.powf(p.b));
            let spread = (p.a - p.d) * s * (1.0 - s);
            jacobian[(i, 0)] = s;
            jacobian[(i, 1)] = -spread * ratio.ln();
            jacobian[(i, 2)] = spread * p.b / p.c;
            jacobian[(i, 3)] = 1.0 - s;
        }
        Ok(jacobian)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn curve() -> Curve {
        Curve::new(
            "logistic",
            vec![1.0, 3.0, 10.0, 30.0, 100.0],
            vec![5.0, 20.0, 50.0, 80.0, 95.0],
            None,
        )
        .unwrap()
    }

    #[test]
    fn analytic_jacobian_matches_finite_differences() {
        let curve = curve();
        let problem = LogisticProblem::new(&curve);
        let param = DVector::from_vec(vec![2.0, 1.3, 9.0, 97.0]);
        let jacobian = problem.jacobian(&param).unwrap();
        let base = problem.apply(&param).unwrap();

        for j in 0..4 {
            let h = 1e-6 * param[j].abs().max(1.0);
            let mut shifted = param.clone();
            shifted[j] += h;
            let moved = problem.apply(&shifted).unwrap();
            for i in 0..curve.len() {
                let numeric = (moved[i] - base[i]) / h;
                assert_relative_eq!(jacobian[(i, j)], numeric, epsilon = 1e-4, max_relative = 1e-4);
            }
        }
    }

    #[test]
    fn cost_is_sum_of_squared_residuals() {
        let curve = curve();
        let problem = LogisticProblem::new(&curve);
        let param = DVector::from_vec(vec![0.0, 1.0, 10.0, 100.0]);
        let residuals = problem.apply(&param).unwrap();
        assert_relative_eq!(
            problem.cost(&param).unwrap(),
            residuals.norm_squared(),
            max_relative = 1e-12
        );
    }

    #[test]
    fn non_positive_ed50_is_an_error() {
        let curve = curve();
        let problem = LogisticProblem::new(&curve);
        let param = DVector::from_vec(vec![0.0, 1.0, -1.0, 100.0]);
        assert!(problem.apply(&param).is_err());
        assert!(problem.jacobian(&param).is_err());
    }
}
