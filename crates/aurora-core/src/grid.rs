//! Density grid contract.
//!
//! The transport loop, the solvers and the driver all operate against the
//! [`DensityGrid`] trait, so the concrete discretisation (regular
//! Cartesian, AMR, Voronoi) is pluggable. Only the contract lives here;
//! implementations sit in the `aurora-grid` crate.

use ndarray::{Array1, Array2};

use crate::cell::CellValues;
use crate::ions::{Abundances, Ion, NUM_IONS};
use crate::photon::Photon;

/// Outcome of an optical-depth traversal.
#[derive(Debug, Clone, PartialEq)]
pub enum Traversal {
    /// The optical-depth target was consumed inside a cell.
    Interaction {
        /// Index of the cell containing the interaction point.
        cell: usize,
        /// The interaction point (m).
        position: [f64; 3],
    },
    /// The ray left the domain through a non-periodic boundary.
    Escaped,
}

/// A half-open block of cell indices, `[first, last)`.
///
/// Multi-process runs hand each rank one block; a single-process run uses
/// `(0, num_cells)`.
pub type Block = (usize, usize);

/// Gas state returned by a density function at a single position.
#[derive(Debug, Clone, Copy)]
pub struct GasState {
    /// Total hydrogen number density (m⁻³).
    pub number_density: f64,
    /// Initial gas temperature (K).
    pub temperature: f64,
}

/// Maps positions to the initial gas state. Stateless; evaluated once per
/// cell midpoint when the grid is built.
pub trait DensityFunction: Send + Sync {
    fn at(&self, position: [f64; 3]) -> GasState;
}

/// A discretised gas volume: maps positions to cells, traces rays
/// cell-by-cell, and stores the per-cell physical state and accumulators.
pub trait DensityGrid: Send + Sync {
    /// Number of cells in the grid.
    fn num_cells(&self) -> usize;

    /// Index of the cell containing `position`, or `None` when the
    /// position is outside the (non-periodic) domain. O(1) expected.
    fn cell_of(&self, position: [f64; 3]) -> Option<usize>;

    /// Midpoint of the cell with the given index (m).
    fn midpoint(&self, index: usize) -> [f64; 3];

    /// Volume of the cell with the given index (m³).
    fn volume(&self, index: usize) -> f64;

    /// The values stored in the cell with the given index.
    fn cell(&self, index: usize) -> &CellValues;

    /// Mutable access to the cell with the given index. Reserved for the
    /// exclusive solver pass; transport writes through scratch
    /// accumulators instead.
    fn cell_mut(&mut self, index: usize) -> &mut CellValues;

    /// Elemental abundances of the gas in this grid.
    fn abundances(&self) -> &Abundances;

    /// Walk cells along the packet's ray, consuming optical depth until
    /// either `tau_target` is reached inside a cell or the ray exits the
    /// domain. Periodic axes wrap the position with the domain extent.
    ///
    /// Per-cell path contributions are written into `scratch`; the grid
    /// itself is not mutated, so traversals may run concurrently.
    fn traverse(
        &self,
        photon: &Photon,
        tau_target: f64,
        scratch: &mut ScratchAccumulators,
    ) -> Traversal;

    /// Lazily iterate the cell indices of a block partition. Restartable
    /// per outer iteration; the rank split passes its own block.
    fn cell_indices(&self, block: Block) -> std::ops::Range<usize> {
        debug_assert!(block.0 <= block.1 && block.1 <= self.num_cells());
        block.0..block.1
    }

    /// Zero every cell's mean-intensity and heating accumulators.
    fn reset_accumulators(&mut self);

    /// Set the initial ionic fractions and reemission probabilities for
    /// the cells of the given block.
    fn initialize(&mut self, block: Block);

    /// Fold one worker's scratch accumulators into the grid. Callers must
    /// apply scratches in a fixed order (ascending worker id) so the
    /// float-add order, and therefore the result, is reproducible.
    fn apply_scratch(&mut self, scratch: &ScratchAccumulators) {
        for index in 0..self.num_cells() {
            let row = scratch.mean_intensity.row(index);
            let cell = self.cell_mut(index);
            for ion in Ion::ALL {
                cell.mean_intensity[ion.index()] += row[ion.index()];
            }
            cell.heating_h += scratch.heating_h[index];
            cell.heating_he += scratch.heating_he[index];
        }
    }
}

/// Thread-local shadow of the grid accumulators.
///
/// Each transport worker owns one; the dispatcher reduces them into the
/// grid at substep end in ascending worker-id order.
#[derive(Debug, Clone)]
pub struct ScratchAccumulators {
    /// Per-cell, per-ion mean-intensity contributions (cells × ions).
    pub mean_intensity: Array2<f64>,
    /// Per-cell hydrogen heating contributions.
    pub heating_h: Array1<f64>,
    /// Per-cell helium heating contributions.
    pub heating_he: Array1<f64>,
}

impl ScratchAccumulators {
    pub fn new(num_cells: usize) -> Self {
        Self {
            mean_intensity: Array2::zeros((num_cells, NUM_IONS)),
            heating_h: Array1::zeros(num_cells),
            heating_he: Array1::zeros(num_cells),
        }
    }

    /// Zero all contributions, keeping the allocation.
    pub fn reset(&mut self) {
        self.mean_intensity.fill(0.0);
        self.heating_h.fill(0.0);
        self.heating_he.fill(0.0);
    }

    /// Add a mean-intensity contribution for one ion in one cell.
    #[inline]
    pub fn add_intensity(&mut self, cell: usize, ion: Ion, amount: f64) {
        self.mean_intensity[[cell, ion.index()]] += amount;
    }

    /// Add heating contributions for one cell.
    #[inline]
    pub fn add_heating(&mut self, cell: usize, hydrogen: f64, helium: f64) {
        self.heating_h[cell] += hydrogen;
        self.heating_he[cell] += helium;
    }

    /// Sum of the mean-intensity plane; used by zero-state checks.
    pub fn total_intensity(&self) -> f64 {
        self.mean_intensity.sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_reset_zeroes_everything() {
        let mut scratch = ScratchAccumulators::new(4);
        scratch.add_intensity(2, Ion::Hn, 1.5);
        scratch.add_heating(2, 0.5, 0.25);
        assert!(scratch.total_intensity() > 0.0);
        scratch.reset();
        assert_eq!(scratch.total_intensity(), 0.0);
        assert_eq!(scratch.heating_h[2], 0.0);
        assert_eq!(scratch.heating_he[2], 0.0);
    }
}
