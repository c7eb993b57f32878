//! Convergence checking.
//!
//! Two independent decisions are delegated to checker collaborators:
//! when to stop adding substeps *within* one outer iteration (has the
//! Monte Carlo intensity field stopped changing?), and when to stop the
//! outer iteration loop (has the ionization structure stopped changing?).

use ndarray::Array1;

use crate::grid::DensityGrid;
use crate::ions::Ion;

/// Decides substep sizing and the per-substep stop within one iteration.
pub trait PhotonNumberConvergenceChecker: Send {
    /// Forget the previous iteration's snapshots.
    fn reset(&mut self);

    /// True when the accumulated intensity field has converged.
    /// `total_shot` is the number of packets shot so far this iteration;
    /// a fresh iteration (zero packets) is never converged.
    fn is_converged(&mut self, grid: &dyn DensityGrid, total_shot: usize) -> bool;

    /// Number of packets for the next substep.
    fn next_substep(&self, current: usize, total_shot: usize) -> usize;

    /// Suggested photon budget for the next outer iteration, given the
    /// total this iteration needed to converge.
    fn suggested_photon_count(&self, last_total: usize) -> usize;
}

/// Substep convergence from the χ² of consecutive per-cell hydrogen
/// intensity snapshots, normalised per packet so the monotonic growth of
/// the accumulators drops out.
pub struct ChiSquaredPhotonNumberChecker {
    tolerance: f64,
    previous: Option<Array1<f64>>,
}

impl ChiSquaredPhotonNumberChecker {
    pub fn new(tolerance: f64) -> Self {
        assert!(tolerance > 0.0);
        Self {
            tolerance,
            previous: None,
        }
    }

    fn snapshot(grid: &dyn DensityGrid, total_shot: usize) -> Array1<f64> {
        let scale = 1.0 / total_shot as f64;
        Array1::from_iter(
            (0..grid.num_cells())
                .map(|i| grid.cell(i).mean_intensity[Ion::Hn.index()] * scale),
        )
    }
}

impl Default for ChiSquaredPhotonNumberChecker {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl PhotonNumberConvergenceChecker for ChiSquaredPhotonNumberChecker {
    fn reset(&mut self) {
        self.previous = None;
    }

    fn is_converged(&mut self, grid: &dyn DensityGrid, total_shot: usize) -> bool {
        if total_shot == 0 {
            return false;
        }
        let current = Self::snapshot(grid, total_shot);
        let converged = match &self.previous {
            None => false,
            Some(previous) => {
                let mut chi2 = 0.0;
                let mut illuminated = 0usize;
                for (new, old) in current.iter().zip(previous.iter()) {
                    if *new > 0.0 {
                        let rel = (new - old) / new;
                        chi2 += rel * rel;
                        illuminated += 1;
                    }
                }
                illuminated > 0 && chi2 / (illuminated as f64) < self.tolerance
            }
        };
        self.previous = Some(current);
        converged
    }

    fn next_substep(&self, current: usize, _total_shot: usize) -> usize {
        current
    }

    fn suggested_photon_count(&self, last_total: usize) -> usize {
        // Two substeps is the floor (the χ² needs a pair of snapshots),
        // so an iteration that converged at the floor keeps its budget;
        // iterations that needed more substeps grow it proportionally.
        (last_total / 2).max(1)
    }
}

/// Decides the outer-iteration stop and the next photon budget.
pub trait IterationConvergenceChecker: Send {
    /// True when the simulation as a whole has converged.
    fn is_converged(&mut self, grid: &dyn DensityGrid) -> bool;

    /// Photon budget for the coming iteration. Sees the grid so it can
    /// react to the population of non-converged cells.
    fn next_photon_count(&mut self, grid: &dyn DensityGrid, current: usize) -> usize;
}

/// Never converges; the run uses its full iteration budget.
#[derive(Debug, Default)]
pub struct PassiveIterationChecker;

impl IterationConvergenceChecker for PassiveIterationChecker {
    fn is_converged(&mut self, _grid: &dyn DensityGrid) -> bool {
        false
    }

    fn next_photon_count(&mut self, _grid: &dyn DensityGrid, current: usize) -> usize {
        current
    }
}

/// Converged when the per-cell neutral hydrogen fraction stops moving
/// between outer iterations. Doubles the photon budget while a
/// significant fraction of the cells carries the solver's
/// non-convergence flag.
pub struct NeutralFractionIterationChecker {
    tolerance: f64,
    /// Fraction of flagged cells above which the budget is doubled.
    flagged_threshold: f64,
    previous: Option<Array1<f64>>,
}

impl NeutralFractionIterationChecker {
    pub fn new(tolerance: f64) -> Self {
        assert!(tolerance > 0.0);
        Self {
            tolerance,
            flagged_threshold: 0.1,
            previous: None,
        }
    }

    fn snapshot(grid: &dyn DensityGrid) -> Array1<f64> {
        Array1::from_iter(
            (0..grid.num_cells()).map(|i| grid.cell(i).ionic_fraction(Ion::Hn)),
        )
    }
}

impl IterationConvergenceChecker for NeutralFractionIterationChecker {
    fn is_converged(&mut self, grid: &dyn DensityGrid) -> bool {
        let current = Self::snapshot(grid);
        let converged = match &self.previous {
            None => false,
            Some(previous) => current
                .iter()
                .zip(previous.iter())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max)
                < self.tolerance,
        };
        self.previous = Some(current);
        converged
    }

    fn next_photon_count(&mut self, grid: &dyn DensityGrid, current: usize) -> usize {
        let flagged = (0..grid.num_cells())
            .filter(|i| grid.cell(*i).non_converged)
            .count();
        if flagged as f64 > self.flagged_threshold * grid.num_cells() as f64 {
            current * 2
        } else {
            current
        }
    }
}
