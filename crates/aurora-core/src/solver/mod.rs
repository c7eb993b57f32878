//! Per-cell equilibrium solvers.
//!
//! Two solver modes share one ionization-balance routine:
//!
//! - [`ionization::IonizationSolver`] holds the temperature fixed and
//!   solves the ionization balance of every element from the accumulated
//!   mean intensities. Used during the warm-up iterations.
//! - [`temperature::TemperatureSolver`] additionally balances heating
//!   against cooling with a bracketed root-find on T, then recomputes the
//!   ionization state at the new temperature.

pub mod ionization;
pub mod temperature;

pub use ionization::IonizationSolver;
pub use temperature::TemperatureSolver;
