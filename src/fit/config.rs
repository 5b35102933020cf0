//! Grid-search configuration for the four-parameter model
//!
//! The search is controlled by window fractions around the initial
//! asymptote and ED50 estimates and by the grid resolution along each axis.
//! Edits arrive as text (field name, value) and are applied as one batch:
//! either every value parses and validates, or nothing changes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejection of a configuration batch
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigParseError {
    /// The field name is not a search setting
    #[error("Unknown configuration field '{field}'")]
    UnknownField { field: String },

    /// The text could not be parsed as the field's type
    #[error("Invalid value '{value}' for {field}: expected {expected}")]
    InvalidValue {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    /// The value parsed but lies outside the accepted range
    #[error("Value {value} for {field} is out of range: {expected}")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Grid resolution and search windows for the four-parameter initializer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Fractional window for the asymptote (and refined slope) grids, in (0, 1]
    pub y_search_fraction: f64,
    /// Fractional window for the ED50 grid, in (0, 1]
    pub x_search_fraction: f64,
    /// Grid points along each asymptote axis
    pub y_iterations: usize,
    /// Grid points along the ED50 axis
    pub ed_iterations: usize,
    /// Grid points along the refined slope axis
    pub slope_iterations: usize,
    /// Slope values tried by the initial one-dimensional scan
    pub initial_slope_iterations: usize,
    /// Upper bound of the initial slope scan
    pub max_slope: f64,
}

impl SearchConfig {
    pub const DEFAULT: Self = Self {
        y_search_fraction: 0.1,
        x_search_fraction: 0.1,
        y_iterations: 10,
        ed_iterations: 10,
        slope_iterations: 10,
        initial_slope_iterations: 1000,
        max_slope: 10.0,
    };

    /// Field names accepted by [`SearchConfig::apply_batch`]
    pub const FIELDS: [&'static str; 7] = [
        "y_search_fraction",
        "x_search_fraction",
        "y_iterations",
        "ed_iterations",
        "slope_iterations",
        "initial_slope_iterations",
        "max_slope",
    ];

    pub fn with_search_fractions(mut self, y: f64, x: f64) -> Self {
        self.y_search_fraction = y;
        self.x_search_fraction = x;
        self
    }

    pub fn with_grid(
        mut self,
        y_iterations: usize,
        ed_iterations: usize,
        slope_iterations: usize,
    ) -> Self {
        self.y_iterations = y_iterations;
        self.ed_iterations = ed_iterations;
        self.slope_iterations = slope_iterations;
        self
    }

    pub fn with_initial_slope_scan(mut self, iterations: usize, max_slope: f64) -> Self {
        self.initial_slope_iterations = iterations;
        self.max_slope = max_slope;
        self
    }

    /// Number of cells in the four-dimensional grid
    pub fn grid_size(&self) -> usize {
        self.y_iterations * self.y_iterations * self.ed_iterations * self.slope_iterations
    }

    /// Check every value against its accepted range
    pub fn validate(&self) -> Result<(), ConfigParseError> {
        check_fraction("y_search_fraction", self.y_search_fraction)?;
        check_fraction("x_search_fraction", self.x_search_fraction)?;
        check_count("y_iterations", self.y_iterations)?;
        check_count("ed_iterations", self.ed_iterations)?;
        check_count("slope_iterations", self.slope_iterations)?;
        check_count("initial_slope_iterations", self.initial_slope_iterations)?;
        if !(self.max_slope.is_finite() && self.max_slope > 0.0) {
            return Err(ConfigParseError::OutOfRange {
                field: "max_slope",
                value: self.max_slope.to_string(),
                expected: "a positive finite number",
            });
        }
        Ok(())
    }

    /// Parse a batch of `(field, text)` edits on top of `self`
    ///
    /// Returns the edited copy; `self` is never modified. The first bad
    /// field rejects the whole batch.
    pub fn apply_batch<I, K, V>(&self, batch: I) -> Result<SearchConfig, ConfigParseError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut edited = *self;
        for (field, value) in batch {
            let value = value.as_ref().trim();
            match field.as_ref().trim() {
                "y_search_fraction" => {
                    edited.y_search_fraction = parse_real("y_search_fraction", value)?
                }
                "x_search_fraction" => {
                    edited.x_search_fraction = parse_real("x_search_fraction", value)?
                }
                "y_iterations" => edited.y_iterations = parse_count("y_iterations", value)?,
                "ed_iterations" => edited.ed_iterations = parse_count("ed_iterations", value)?,
                "slope_iterations" => {
                    edited.slope_iterations = parse_count("slope_iterations", value)?
                }
                "initial_slope_iterations" => {
                    edited.initial_slope_iterations =
                        parse_count("initial_slope_iterations", value)?
                }
                "max_slope" => edited.max_slope = parse_real("max_slope", value)?,
                other => {
                    return Err(ConfigParseError::UnknownField {
                        field: other.to_string(),
                    })
                }
            }
        }
        edited.validate()?;
        Ok(edited)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn parse_real(field: &'static str, value: &str) -> Result<f64, ConfigParseError> {
    value.parse::<f64>().map_err(|_| ConfigParseError::InvalidValue {
        field,
        value: value.to_string(),
        expected: "a real number",
    })
}

fn parse_count(field: &'static str, value: &str) -> Result<usize, ConfigParseError> {
    value.parse::<usize>().map_err(|_| ConfigParseError::InvalidValue {
        field,
        value: value.to_string(),
        expected: "a non-negative integer",
    })
}

fn check_fraction(field: &'static str, value: f64) -> Result<(), ConfigParseError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigParseError::OutOfRange {
            field,
            value: value.to_string(),
            expected: "a fraction in (0, 1]",
        })
    }
}

fn check_count(field: &'static str, value: usize) -> Result<(), ConfigParseError> {
    if value > 0 {
        Ok(())
    } else {
        Err(ConfigParseError::OutOfRange {
            field,
            value: value.to_string(),
            expected: "at least 1",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SearchConfig::DEFAULT.validate().is_ok());
        assert_eq!(SearchConfig::default(), SearchConfig::DEFAULT);
        assert_eq!(SearchConfig::DEFAULT.grid_size(), 10_000);
    }

    #[test]
    fn batch_edits_apply_together() {
        let edited = SearchConfig::DEFAULT
            .apply_batch([
                ("y_search_fraction", "0.2"),
                ("ed_iterations", " 25 "),
                ("max_slope", "4"),
            ])
            .unwrap();
        assert_eq!(edited.y_search_fraction, 0.2);
        assert_eq!(edited.ed_iterations, 25);
        assert_eq!(edited.max_slope, 4.0);
        assert_eq!(edited.y_iterations, SearchConfig::DEFAULT.y_iterations);
    }

    #[test]
    fn one_bad_value_rejects_the_batch() {
        let result = SearchConfig::DEFAULT.apply_batch([
            ("y_search_fraction", "0.2"),
            ("x_search_fraction", "0.3"),
            ("y_iterations", "twelve"),
        ]);
        assert_eq!(
            result,
            Err(ConfigParseError::InvalidValue {
                field: "y_iterations",
                value: "twelve".to_string(),
                expected: "a non-negative integer",
            })
        );
    }

    #[test]
    fn integers_reject_fractional_text() {
        assert!(matches!(
            SearchConfig::DEFAULT.apply_batch([("slope_iterations", "2.5")]),
            Err(ConfigParseError::InvalidValue { field: "slope_iterations", .. })
        ));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(matches!(
            SearchConfig::DEFAULT.apply_batch([("x_search_fraction", "1.5")]),
            Err(ConfigParseError::OutOfRange { field: "x_search_fraction", .. })
        ));
        assert!(matches!(
            SearchConfig::DEFAULT.apply_batch([("initial_slope_iterations", "0")]),
            Err(ConfigParseError::OutOfRange { field: "initial_slope_iterations", .. })
        ));
        assert!(matches!(
            SearchConfig::DEFAULT.apply_batch([("max_slope", "NaN")]),
            Err(ConfigParseError::OutOfRange { field: "max_slope", .. })
        ));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert_eq!(
            SearchConfig::DEFAULT.apply_batch([("z_search_fraction", "0.1")]),
            Err(ConfigParseError::UnknownField {
                field: "z_search_fraction".to_string()
            })
        );
    }
}
