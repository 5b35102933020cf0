//! Long-running four-parameter fits with live configuration
//!
//! [`FitOrchestrator`] owns two search configurations: immutable defaults
//! and a live copy that callers edit in batches. Each fit snapshots the live
//! configuration when it starts, so an edit made during a fit only affects
//! later fits.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use dashmap::DashSet;
use rayon::prelude::*;

use crate::data::{Assay, Curve};
use crate::error::AssayError;
use crate::fit::config::{ConfigParseError, SearchConfig};
use crate::fit::monitor::{CancellationToken, FitMonitor};
use crate::models::four_parameter::{refine_with, FourParameterFit};
use crate::optimize::levenberg_marquardt::LevenbergMarquardt;

/// Runs four-parameter fits against a shared live configuration
///
/// Fits in flight are tracked by curve id alone, so curve ids must be unique
/// across everything one orchestrator fits at the same time. Curves with the
/// same id from different assays (or colliding ids generated by
/// [`Curve::from_values`]) are treated as the same curve and the second fit
/// fails with [`AssayError::FitInProgress`]. Use one orchestrator per assay
/// when ids may repeat.
#[derive(Debug)]
pub struct FitOrchestrator {
    defaults: SearchConfig,
    config: RwLock<SearchConfig>,
    solver: LevenbergMarquardt,
    in_flight: DashSet<String>,
}

/// Marks a curve as busy until dropped
struct InFlight<'a> {
    registry: &'a DashSet<String>,
    curve: String,
}

impl<'a> InFlight<'a> {
    fn claim(registry: &'a DashSet<String>, curve: &str) -> Result<Self, AssayError> {
        if !registry.insert(curve.to_string()) {
            return Err(AssayError::FitInProgress {
                curve: curve.to_string(),
            });
        }
        Ok(Self {
            registry,
            curve: curve.to_string(),
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.registry.remove(&self.curve);
    }
}

impl Default for FitOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl FitOrchestrator {
    pub fn new() -> Self {
        Self::with_defaults(SearchConfig::DEFAULT)
    }

    /// Use `defaults` both as the reset target and the initial live configuration
    pub fn with_defaults(defaults: SearchConfig) -> Self {
        Self {
            defaults,
            config: RwLock::new(defaults),
            solver: LevenbergMarquardt::default(),
            in_flight: DashSet::new(),
        }
    }

    pub fn with_solver(mut self, solver: LevenbergMarquardt) -> Self {
        self.solver = solver;
        self
    }

    pub fn defaults(&self) -> SearchConfig {
        self.defaults
    }

    /// Snapshot of the live configuration
    pub fn get_config(&self) -> SearchConfig {
        *self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a batch of `(field, text)` edits to the live configuration
    ///
    /// All edits are parsed and validated before anything is stored; any
    /// failure leaves the live configuration exactly as it was.
    pub fn set_config<I, K, V>(&self, batch: I) -> Result<(), ConfigParseError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut live = self.config.write().unwrap_or_else(PoisonError::into_inner);
        match live.apply_batch(batch) {
            Ok(edited) => {
                *live = edited;
                tracing::info!(config = ?edited, "Search configuration updated");
                Ok(())
            }
            Err(error) => {
                tracing::warn!(%error, "Search configuration batch rejected");
                Err(error)
            }
        }
    }

    pub fn reset_config(&self) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = self.defaults;
        tracing::info!("Search configuration reset to defaults");
    }

    /// Whether a fit for `curve_id` is currently running
    pub fn is_fitting(&self, curve_id: &str) -> bool {
        self.in_flight.contains(curve_id)
    }

    /// Grid search then least-squares refinement for one curve
    ///
    /// `seed` supplies the ED50 estimate and optional asymptote overrides and
    /// is never modified: on error (including cancellation) the caller's
    /// previous fit stays as it was.
    ///
    /// # Errors
    ///
    /// [`AssayError::FitInProgress`] if a fit for the same curve id is already
    /// running, plus everything
    /// [`grid_search_initialize`](crate::models::four_parameter::grid_search_initialize)
    /// returns.
    pub fn fit(
        &self,
        curve: &Curve,
        seed: &FourParameterFit,
        monitor: &FitMonitor,
    ) -> Result<FourParameterFit, AssayError> {
        let _guard = InFlight::claim(&self.in_flight, curve.id())?;
        let config = self.get_config();
        tracing::info!(
            curve = curve.id(),
            cells = config.grid_size(),
            "Starting four-parameter fit"
        );

        let grid = seed.grid_search(curve, &config, monitor)?;
        Ok(refine_with(&grid, curve, &self.solver))
    }

    /// Fit every curve of an assay in parallel
    ///
    /// Curves are matched to `seeds` by id; a curve without a seed fails with
    /// [`AssayError::MissingSeed`]. Results keep the assay's curve order.
    pub fn fit_assay(
        &self,
        assay: &Assay,
        seeds: &HashMap<String, FourParameterFit>,
        token: &CancellationToken,
    ) -> Vec<(String, Result<FourParameterFit, AssayError>)> {
        let unseeded = FourParameterFit::new();
        assay
            .curves()
            .par_iter()
            .map(|curve| {
                let seed = seeds.get(curve.id()).unwrap_or(&unseeded);
                let monitor = FitMonitor::with_token(token.clone());
                (curve.id().to_string(), self.fit(curve, seed, &monitor))
            })
            .collect()
    }
}
