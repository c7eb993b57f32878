//! # Aurora Grid
//!
//! Concrete density grids for the Aurora framework. The engine in
//! `aurora-core` operates against the
//! [`DensityGrid`](aurora_core::grid::DensityGrid) contract; this crate
//! provides the regular Cartesian implementation and the density
//! functions that seed it.

pub mod cartesian;
pub mod density;

pub use cartesian::CartesianDensityGrid;
pub use density::{HomogeneousDensityFunction, SphericalCloudDensityFunction};
