//! Error taxonomy of the engine.
//!
//! Configuration problems are reported as [`CoreError`] values and abort
//! the run at startup. Numerical non-convergence is *not* an error: the
//! solvers retain the last iterate and set a per-cell flag. Invariant
//! violations (fractions outside [0, 1], negative densities) are internal
//! bugs and abort via assertions carrying the cell index.

use thiserror::Error;

/// Fatal configuration and wiring errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Discrete source weights do not sum to 1 (sum = {sum:.12})")]
    InvalidSourceWeights { sum: f64 },

    #[error("No spectrum provided for the discrete photon sources")]
    MissingDiscreteSpectrum,

    #[error("No spectrum provided for the continuous photon source")]
    MissingContinuousSpectrum,

    #[error("Continuous spectrum has zero ionizing flux")]
    ZeroContinuousFlux,

    #[error("No photon sources configured")]
    NoSources,

    #[error("Configuration error: {0}")]
    Configuration(String),
}
