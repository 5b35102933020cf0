//! Dose-response curve for one experimental condition

use rand::{distr::Alphanumeric, Rng};
use serde::Serialize;

use crate::data::curve_error::CurveError;

/// Ordered dose/response/error arrays for a single molecule or condition
///
/// Doses are always strictly ascending: input given in descending order is
/// reversed together with its responses and errors. Negative responses are
/// clamped to zero when the curve is built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Curve {
    id: String,
    x: Vec<f64>,
    log_x: Vec<f64>,
    y: Vec<f64>,
    stderr: Vec<f64>,
    clamped: usize,
}

impl Curve {
    /// Build a validated curve
    ///
    /// `stderr` is either `None` or has the same length as `x`.
    pub fn new(
        id: impl Into<String>,
        mut x: Vec<f64>,
        mut y: Vec<f64>,
        stderr: Option<Vec<f64>>,
    ) -> Result<Self, CurveError> {
        let id = id.into();
        let mut stderr = stderr.unwrap_or_default();

        if x.is_empty() {
            return Err(CurveError::Empty { id });
        }
        if x.len() != y.len() || (!stderr.is_empty() && stderr.len() != x.len()) {
            return Err(CurveError::ArrayLengthMismatch {
                description: format!(
                    "x has {} values, y has {}, stderr has {}",
                    x.len(),
                    y.len(),
                    stderr.len()
                ),
            });
        }

        for (column, values) in [("x", &x), ("y", &y), ("stderr", &stderr)] {
            if let Some(index) = values.iter().position(|v| !v.is_finite()) {
                return Err(CurveError::NonFinite { column, index });
            }
        }
        if let Some(index) = x.iter().position(|&v| v <= 0.0) {
            return Err(CurveError::NonPositiveDose {
                index,
                value: x[index],
            });
        }

        let descending = x.len() > 1 && x[0] > x[x.len() - 1];
        for (i, pair) in x.windows(2).enumerate() {
            let ordered = if descending {
                pair[0] > pair[1]
            } else {
                pair[0] < pair[1]
            };
            if !ordered {
                return Err(CurveError::NotMonotonic { index: i + 1 });
            }
        }
        if descending {
            x.reverse();
            y.reverse();
            stderr.reverse();
        }

        let mut clamped = 0;
        for (i, value) in y.iter_mut().enumerate() {
            if *value < 0.0 {
                tracing::warn!(
                    curve = %id,
                    index = i,
                    value = *value,
                    "Negative response clamped to zero"
                );
                *value = 0.0;
                clamped += 1;
            }
        }

        let log_x = x.iter().map(|v| v.log10()).collect();

        Ok(Self {
            id,
            x,
            log_x,
            y,
            stderr,
            clamped,
        })
    }

    /// Build a curve with a generated identifier
    pub fn from_values(
        x: Vec<f64>,
        y: Vec<f64>,
        stderr: Option<Vec<f64>>,
    ) -> Result<Self, CurveError> {
        let id: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(5)
            .map(char::from)
            .collect();
        Self::new(id, x, y, stderr)
    }

    pub fn builder(id: impl Into<String>) -> CurveBuilder {
        CurveBuilder {
            id: id.into(),
            x: Vec::new(),
            y: Vec::new(),
            stderr: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Doses, strictly ascending
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    /// `log10` of every dose
    pub fn log_x(&self) -> &[f64] {
        &self.log_x
    }

    /// Responses aligned with [`Curve::x`]
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Per-point error magnitudes, empty when none were supplied
    pub fn stderr(&self) -> &[f64] {
        &self.stderr
    }

    /// Number of negative responses that were clamped to zero
    pub fn clamped(&self) -> usize {
        self.clamped
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn x_min(&self) -> f64 {
        self.x[0]
    }

    pub fn x_max(&self) -> f64 {
        self.x[self.x.len() - 1]
    }

    pub fn y_min(&self) -> f64 {
        self.y.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn y_max(&self) -> f64 {
        self.y.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Iterate over `(dose, response)` pairs
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }
}

/// Incremental construction of a [`Curve`], one point at a time
pub struct CurveBuilder {
    id: String,
    x: Vec<f64>,
    y: Vec<f64>,
    stderr: Vec<f64>,
}

impl CurveBuilder {
    pub fn point(mut self, x: f64, y: f64) -> Self {
        self.x.push(x);
        self.y.push(y);
        self
    }

    /// Add a point with its error magnitude
    ///
    /// Mixing points with and without errors is rejected by [`CurveBuilder::build`].
    pub fn point_with_error(mut self, x: f64, y: f64, stderr: f64) -> Self {
        self.stderr.push(stderr);
        self.point(x, y)
    }

    pub fn build(self) -> Result<Curve, CurveError> {
        let stderr = (!self.stderr.is_empty()).then_some(self.stderr);
        Curve::new(self.id, self.x, self.y, stderr)
    }
}
