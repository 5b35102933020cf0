//! ED50 estimation from sigmoidal dose-response data
//!
//! A [`Curve`] holds the doses and responses of one molecule. Two models
//! estimate the dose giving a half-maximal response:
//!
//! - [`PolynomialFit`]: polynomial regression in log-dose space, solved for
//!   the inflection point by Newton-Raphson.
//! - [`FourParameterFit`]: four-parameter logistic, found by a coarse grid
//!   search and refined by Levenberg-Marquardt. [`FitOrchestrator`] runs
//!   this fit with a live configuration, cancellation and progress reporting.
//!
//! ```no_run
//! use assayfit::prelude::*;
//!
//! let curve = Curve::new(
//!     "mol-a",
//!     vec![1.0, 3.0, 10.0, 30.0, 100.0],
//!     vec![5.0, 20.0, 50.0, 80.0, 95.0],
//!     None,
//! )?;
//! let seeds = Seeds::from_log_dose(1.0)?;
//!
//! let mut polynomial = PolynomialFit::fit(&curve, 3)?;
//! polynomial.solve_inflection(seeds.log_dose(), 1e-6)?;
//!
//! let orchestrator = FitOrchestrator::new();
//! let seed = seeds.seed_four_parameter(FourParameterFit::new())?;
//! let logistic = orchestrator.fit(&curve, &seed, &FitMonitor::new())?;
//! println!("{:?} {:?}", polynomial.ed50(), logistic.ed50());
//! # Ok::<(), assayfit::AssayError>(())
//! ```

pub mod data;
pub mod error;
pub mod fit;
pub mod models;
pub mod optimize;

pub use crate::data::{Assay, Curve, CurveBuilder, CurveError};
pub use crate::fit::{
    CancellationToken, ConfigParseError, FitMonitor, FitOrchestrator, FitRecord, FitSummary,
    SearchConfig, Seeds,
};
pub use crate::models::{FitQuality, FourParameterFit, FourParameters, PolynomialFit};
pub use error::AssayError;

pub mod prelude {
    pub mod data {
        pub use crate::data::{simulate, Assay, Curve, CurveBuilder, CurveError};
    }
    pub mod models {
        pub use crate::models::four_parameter::{
            grid_search_initialize, refine, refine_with, FitQuality, FourParameterFit,
            FourParameters,
        };
        pub use crate::models::polynomial::{derivatives, PolynomialFit};
    }
    pub mod optimize {
        pub use crate::optimize::levenberg_marquardt::{LevenbergMarquardt, LmReport};
        pub use crate::optimize::newton::NewtonRaphson;
    }

    pub use crate::data::{Assay, Curve};
    pub use crate::fit::*;
    pub use crate::models::{FitQuality, FourParameterFit, FourParameters, PolynomialFit};
    pub use crate::AssayError;
}
