//! # Aurora Core
//!
//! The engine of the Aurora photoionization framework. This crate implements
//! the iterative Monte Carlo radiative-transfer loop: photon packets are
//! ray-traced through a discretised gas volume, per-cell absorption
//! statistics are accumulated, and a non-linear equilibrium solver updates
//! the ionization state (and optionally the gas temperature) until the
//! radiation field and the gas state are mutually consistent.
//!
//! ## Architecture
//!
//! Pluggable collaborators sit behind small capability traits: density
//! grids implement [`grid::DensityGrid`], emission spectra implement
//! [`spectra::PhotonSourceSpectrum`], and atomic data providers implement
//! [`cross_sections::CrossSections`], [`rates::RecombinationRates`],
//! [`rates::ChargeTransferRates`] and [`cooling::LineCoolingData`]. The
//! [`driver::IterationDriver`] owns the outer loop and wires the modules
//! per call; there is no shared back-pointer graph.
//!
//! ## Modules
//!
//! - [`ions`] — Tracked ion enumeration and elemental abundances.
//! - [`photon`] — Photon packet value type with its cross-section cache.
//! - [`cell`] — Per-cell gas state, accumulators, reemission probabilities.
//! - [`grid`] — Density grid contract and traversal results.
//! - [`cross_sections`] — Photoionization cross sections.
//! - [`rates`] — Recombination and charge-transfer rates.
//! - [`cooling`] — Line, recombination and free–free cooling.
//! - [`spectra`] — Source and diffuse-reemission spectra.
//! - [`source`] — Photon source: budgets, sampling, reemission.
//! - [`transport`] — Single-packet propagation kernel.
//! - [`solver`] — Ionization and temperature equilibrium solvers.
//! - [`convergence`] — Photon-number and iteration convergence checkers.
//! - [`driver`] — Outer iteration loop.

pub mod cell;
pub mod constants;
pub mod convergence;
pub mod cooling;
pub mod cross_sections;
pub mod driver;
pub mod error;
pub mod grid;
pub mod ions;
pub mod photon;
pub mod rates;
pub mod solver;
pub mod source;
pub mod spectra;
pub mod transport;

pub use cell::CellValues;
pub use error::CoreError;
pub use grid::{DensityFunction, DensityGrid, ScratchAccumulators, Traversal};
pub use ions::{Abundances, Element, Ion};
pub use photon::{Photon, PhotonType, PhotonTypeCounters};
pub use source::PhotonSource;
