//! Side-by-side comparison of the two models and exportable result records

use std::fmt;

use serde::Serialize;

use crate::data::Curve;
use crate::models::four_parameter::{FitQuality, FourParameterFit, FourParameters};
use crate::models::polynomial::PolynomialFit;

/// Residual statistics of one model against the observed responses
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GoodnessOfFit {
    /// Sum of squared residuals
    pub ssr: f64,
    /// Root mean squared residual
    pub rmse: f64,
    /// Coefficient of determination; `None` when the responses are constant
    pub r_squared: Option<f64>,
}

impl GoodnessOfFit {
    pub fn new(observed: &[f64], predicted: &[f64]) -> Option<Self> {
        if observed.is_empty() || observed.len() != predicted.len() {
            return None;
        }
        let n = observed.len() as f64;
        let ssr: f64 = observed
            .iter()
            .zip(predicted)
            .map(|(o, p)| (o - p).powi(2))
            .sum();
        let mean = observed.iter().sum::<f64>() / n;
        let sst: f64 = observed.iter().map(|o| (o - mean).powi(2)).sum();
        Some(Self {
            ssr,
            rmse: (ssr / n).sqrt(),
            r_squared: (sst > 0.0).then(|| 1.0 - ssr / sst),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryRow {
    pub dose: f64,
    pub observed: f64,
    pub polynomial: Option<f64>,
    pub four_parameter: Option<f64>,
}

/// Observed and predicted responses for one curve
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitSummary {
    curve_id: String,
    rows: Vec<SummaryRow>,
    polynomial: Option<GoodnessOfFit>,
    four_parameter: Option<GoodnessOfFit>,
}

impl FitSummary {
    /// `None` when neither model has predictions for the curve
    pub fn new(
        curve: &Curve,
        polynomial: Option<&PolynomialFit>,
        four_parameter: Option<&FourParameterFit>,
    ) -> Option<Self> {
        let poly = polynomial.map(|fit| fit.predict(curve));
        let four = four_parameter
            .map(|fit| fit.predicted())
            .filter(|p| p.len() == curve.len());
        if poly.is_none() && four.is_none() {
            return None;
        }

        let rows = curve
            .points()
            .enumerate()
            .map(|(i, (dose, observed))| SummaryRow {
                dose,
                observed,
                polynomial: poly.as_ref().map(|p| p[i]),
                four_parameter: four.map(|p| p[i]),
            })
            .collect();

        Some(Self {
            curve_id: curve.id().to_string(),
            rows,
            polynomial: poly.and_then(|p| GoodnessOfFit::new(curve.y(), &p)),
            four_parameter: four.and_then(|p| GoodnessOfFit::new(curve.y(), p)),
        })
    }

    pub fn curve_id(&self) -> &str {
        &self.curve_id
    }

    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    pub fn polynomial(&self) -> Option<&GoodnessOfFit> {
        self.polynomial.as_ref()
    }

    pub fn four_parameter(&self) -> Option<&GoodnessOfFit> {
        self.four_parameter.as_ref()
    }
}

fn cell(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.4}", v))
}

impl fmt::Display for FitSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Curve: {}", self.curve_id)?;
        writeln!(
            f,
            "{:>12} {:>12} {:>12} {:>12}",
            "dose", "observed", "polynomial", "4-param"
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "{:>12.4} {:>12.4} {:>12} {:>12}",
                row.dose,
                row.observed,
                cell(row.polynomial),
                cell(row.four_parameter)
            )?;
        }
        let models = [
            ("polynomial", &self.polynomial),
            ("4-param", &self.four_parameter),
        ];
        for (label, stats) in models {
            if let Some(stats) = stats {
                writeln!(
                    f,
                    "{}: SSR = {:.4}, RMSE = {:.4}, R² = {}",
                    label,
                    stats.ssr,
                    stats.rmse,
                    cell(stats.r_squared)
                )?;
            }
        }
        Ok(())
    }
}

/// Which model produced a [`FitRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModelKind {
    /// Four-parameter logistic refined by least squares
    FourParameterFitted,
    /// Four-parameter logistic from the grid search alone
    FourParameterSearch,
    /// Polynomial inflection point
    Polynomial,
}

/// One exported ED50 result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitRecord {
    pub curve_id: String,
    pub model: ModelKind,
    pub ed50: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<FourParameters>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub coefficients: Vec<f64>,
}

impl FitRecord {
    /// Records for every model with a usable result
    ///
    /// A polynomial without a solved inflection point and an unfit
    /// four-parameter model produce nothing.
    pub fn collect(
        curve_id: &str,
        polynomial: Option<&PolynomialFit>,
        four_parameter: Option<&FourParameterFit>,
    ) -> Vec<FitRecord> {
        let mut records = Vec::new();
        if let Some(fit) = four_parameter {
            let model = match fit.quality() {
                FitQuality::Unfit => None,
                FitQuality::GridSearchOnly => Some(ModelKind::FourParameterSearch),
                FitQuality::LeastSquaresConverged => Some(ModelKind::FourParameterFitted),
            };
            if let (Some(model), Some(ed50), Some(parameters)) =
                (model, fit.ed50(), fit.parameters())
            {
                records.push(FitRecord {
                    curve_id: curve_id.to_string(),
                    model,
                    ed50,
                    parameters: Some(parameters),
                    coefficients: Vec::new(),
                });
            }
        }
        if let Some(ed50) = polynomial.and_then(PolynomialFit::ed50) {
            records.push(FitRecord {
                curve_id: curve_id.to_string(),
                model: ModelKind::Polynomial,
                ed50,
                parameters: None,
                coefficients: polynomial.map(|p| p.coefficients().to_vec()).unwrap_or_default(),
            });
        }
        records
    }
}
