//! Running fits: configuration, orchestration, monitoring and reporting

pub mod config;
pub mod monitor;
pub mod orchestrator;
pub mod seeds;
pub mod summary;

pub use config::{ConfigParseError, SearchConfig};
pub use monitor::{CancellationToken, FitMonitor};
pub use orchestrator::FitOrchestrator;
pub use seeds::Seeds;
pub use summary::{FitRecord, FitSummary, GoodnessOfFit, ModelKind};
