//! Regular Cartesian density grid.
//!
//! Cells are an axis-aligned lattice over a box. `cell_of` is a direct
//! index computation and `traverse` is a face-to-face ray walk that
//! consumes optical depth cell by cell, writing each cell's path
//! contribution into the caller's scratch accumulators.

use aurora_core::cell::CellValues;
use aurora_core::constants::{NU_HEI, NU_HI};
use aurora_core::grid::{Block, DensityFunction, DensityGrid, ScratchAccumulators, Traversal};
use aurora_core::ions::{Abundances, Ion, NUM_IONS};
use aurora_core::photon::Photon;

/// A regular Cartesian grid over an axis-aligned box.
pub struct CartesianDensityGrid {
    anchor: [f64; 3],
    sides: [f64; 3],
    shape: [usize; 3],
    cell_widths: [f64; 3],
    periodic: [bool; 3],
    abundances: Abundances,
    /// Per-ion elemental abundance, pre-resolved for the opacity loop.
    ion_abundances: [f64; NUM_IONS],
    cell_volume: f64,
    cells: Vec<CellValues>,
}

impl CartesianDensityGrid {
    /// Build the lattice and seed every cell from the density function,
    /// evaluated at the cell midpoint.
    pub fn new(
        anchor: [f64; 3],
        sides: [f64; 3],
        shape: [usize; 3],
        periodic: [bool; 3],
        abundances: Abundances,
        density_function: &dyn DensityFunction,
    ) -> Self {
        assert!(sides.iter().all(|s| *s > 0.0), "box sides must be positive");
        assert!(shape.iter().all(|n| *n > 0), "grid shape must be non-zero");

        let cell_widths = [
            sides[0] / shape[0] as f64,
            sides[1] / shape[1] as f64,
            sides[2] / shape[2] as f64,
        ];
        let cell_volume = cell_widths[0] * cell_widths[1] * cell_widths[2];

        let mut ion_abundances = [0.0; NUM_IONS];
        for ion in Ion::ALL {
            ion_abundances[ion.index()] = abundances.abundance(ion.element());
        }

        let num_cells = shape[0] * shape[1] * shape[2];
        let mut cells = Vec::with_capacity(num_cells);
        for i in 0..shape[0] {
            for j in 0..shape[1] {
                for k in 0..shape[2] {
                    let midpoint = [
                        anchor[0] + (i as f64 + 0.5) * cell_widths[0],
                        anchor[1] + (j as f64 + 0.5) * cell_widths[1],
                        anchor[2] + (k as f64 + 0.5) * cell_widths[2],
                    ];
                    let state = density_function.at(midpoint);
                    cells.push(CellValues::new(state.number_density, state.temperature));
                }
            }
        }

        Self {
            anchor,
            sides,
            shape,
            cell_widths,
            periodic,
            abundances,
            ion_abundances,
            cell_volume,
            cells,
        }
    }

    fn flat_index(&self, indices: [i64; 3]) -> usize {
        (indices[0] as usize * self.shape[1] + indices[1] as usize) * self.shape[2]
            + indices[2] as usize
    }

    /// Resolve the starting cell of a ray, adjusting the position for
    /// periodic wrap. A ray exactly on a face belongs to the cell it is
    /// heading into; on an outer boundary heading outwards it is already
    /// outside.
    fn locate(&self, mut position: [f64; 3], direction: [f64; 3]) -> Option<([i64; 3], [f64; 3])> {
        let mut indices = [0i64; 3];
        for a in 0..3 {
            let n = self.shape[a] as i64;
            if self.periodic[a] {
                position[a] = self.anchor[a] + (position[a] - self.anchor[a]).rem_euclid(self.sides[a]);
            }
            let q = (position[a] - self.anchor[a]) / self.cell_widths[a];
            if q < 0.0 || q > self.shape[a] as f64 {
                return None;
            }
            let mut i = q.floor() as i64;
            if q == i as f64 && direction[a] < 0.0 {
                i -= 1;
            }
            if i < 0 {
                if self.periodic[a] {
                    i = n - 1;
                    position[a] = self.anchor[a] + self.sides[a];
                } else {
                    return None;
                }
            }
            if i >= n {
                return None;
            }
            indices[a] = i;
        }
        Some((indices, position))
    }

    /// Total absorption coefficient (m⁻¹) of a cell at the packet's
    /// cached cross sections.
    fn opacity(&self, cell: &CellValues, photon: &Photon) -> f64 {
        let mut chi = 0.0;
        for ion in Ion::ALL {
            let sigma = photon.cross_section(ion);
            if sigma > 0.0 {
                chi += cell.number_density
                    * self.ion_abundances[ion.index()]
                    * cell.ionic_fraction(ion)
                    * sigma;
            }
        }
        chi
    }

    /// Write one cell's path contribution into the scratch accumulators.
    fn accumulate(
        &self,
        scratch: &mut ScratchAccumulators,
        cell_index: usize,
        photon: &Photon,
        pathlength: f64,
    ) {
        if pathlength <= 0.0 {
            return;
        }
        let jfac = photon.weight / self.cell_volume;
        for ion in Ion::ALL {
            let sigma = photon.cross_section(ion);
            if sigma > 0.0 {
                scratch.add_intensity(cell_index, ion, jfac * sigma * pathlength);
            }
        }
        let sigma_h = photon.cross_section(Ion::Hn);
        let sigma_he = photon.cross_section(Ion::Hen);
        let heating_h = if sigma_h > 0.0 {
            jfac * sigma_h * pathlength * (photon.frequency - NU_HI)
        } else {
            0.0
        };
        let heating_he = if sigma_he > 0.0 {
            jfac * sigma_he * pathlength * (photon.frequency - NU_HEI)
        } else {
            0.0
        };
        if heating_h != 0.0 || heating_he != 0.0 {
            scratch.add_heating(cell_index, heating_h, heating_he);
        }
    }
}

impl DensityGrid for CartesianDensityGrid {
    fn num_cells(&self) -> usize {
        self.cells.len()
    }

    fn cell_of(&self, position: [f64; 3]) -> Option<usize> {
        let mut indices = [0i64; 3];
        for a in 0..3 {
            let mut p = position[a];
            if self.periodic[a] {
                p = self.anchor[a] + (p - self.anchor[a]).rem_euclid(self.sides[a]);
            }
            let q = (p - self.anchor[a]) / self.cell_widths[a];
            if q < 0.0 || q > self.shape[a] as f64 {
                return None;
            }
            indices[a] = (q.floor() as i64).min(self.shape[a] as i64 - 1);
        }
        Some(self.flat_index(indices))
    }

    fn midpoint(&self, index: usize) -> [f64; 3] {
        let k = index % self.shape[2];
        let j = (index / self.shape[2]) % self.shape[1];
        let i = index / (self.shape[1] * self.shape[2]);
        [
            self.anchor[0] + (i as f64 + 0.5) * self.cell_widths[0],
            self.anchor[1] + (j as f64 + 0.5) * self.cell_widths[1],
            self.anchor[2] + (k as f64 + 0.5) * self.cell_widths[2],
        ]
    }

    fn volume(&self, _index: usize) -> f64 {
        self.cell_volume
    }

    fn cell(&self, index: usize) -> &CellValues {
        &self.cells[index]
    }

    fn cell_mut(&mut self, index: usize) -> &mut CellValues {
        &mut self.cells[index]
    }

    fn abundances(&self) -> &Abundances {
        &self.abundances
    }

    fn traverse(
        &self,
        photon: &Photon,
        tau_target: f64,
        scratch: &mut ScratchAccumulators,
    ) -> Traversal {
        let (mut indices, mut position) = match self.locate(photon.position, photon.direction) {
            Some(start) => start,
            None => return Traversal::Escaped,
        };
        let direction = photon.direction;
        debug_assert!(
            direction.iter().any(|d| *d != 0.0),
            "traverse called with a zero direction"
        );

        let mut tau_remaining = tau_target;
        loop {
            let cell_index = self.flat_index(indices);

            // Distance to the nearest bounding face along the ray.
            let mut ds = f64::INFINITY;
            let mut exit_axis = 0;
            for a in 0..3 {
                let t = if direction[a] > 0.0 {
                    let face = self.anchor[a] + (indices[a] + 1) as f64 * self.cell_widths[a];
                    (face - position[a]) / direction[a]
                } else if direction[a] < 0.0 {
                    let face = self.anchor[a] + indices[a] as f64 * self.cell_widths[a];
                    (face - position[a]) / direction[a]
                } else {
                    // Parallel to these faces: advances along them.
                    continue;
                };
                if t < ds {
                    ds = t;
                    exit_axis = a;
                }
            }
            let ds = ds.max(0.0);

            let chi = self.opacity(self.cell(cell_index), photon);
            let dtau = chi * ds;

            if tau_remaining <= dtau {
                let mut interaction_length = if chi > 0.0 { tau_remaining / chi } else { 0.0 };
                // Snap to the far face when the leftover path is below
                // the float resolution of the crossing.
                if ds - interaction_length < f64::EPSILON * ds {
                    interaction_length = ds;
                }
                self.accumulate(scratch, cell_index, photon, interaction_length);
                let mut interaction_point = position;
                for a in 0..3 {
                    interaction_point[a] += interaction_length * direction[a];
                }
                return Traversal::Interaction {
                    cell: cell_index,
                    position: interaction_point,
                };
            }

            // Full crossing: accumulate, consume the cell's optical
            // depth, and step across the exit face.
            self.accumulate(scratch, cell_index, photon, ds);
            tau_remaining -= dtau;
            for a in 0..3 {
                position[a] += ds * direction[a];
            }
            let step: i64 = if direction[exit_axis] > 0.0 { 1 } else { -1 };
            position[exit_axis] = self.anchor[exit_axis]
                + (indices[exit_axis] + step.max(0)) as f64 * self.cell_widths[exit_axis];
            indices[exit_axis] += step;

            let n = self.shape[exit_axis] as i64;
            if indices[exit_axis] < 0 {
                if self.periodic[exit_axis] {
                    indices[exit_axis] = n - 1;
                    position[exit_axis] = self.anchor[exit_axis] + self.sides[exit_axis];
                } else {
                    return Traversal::Escaped;
                }
            } else if indices[exit_axis] >= n {
                if self.periodic[exit_axis] {
                    indices[exit_axis] = 0;
                    position[exit_axis] = self.anchor[exit_axis];
                } else {
                    return Traversal::Escaped;
                }
            }
        }
    }

    fn reset_accumulators(&mut self) {
        for cell in &mut self.cells {
            cell.reset_accumulators();
        }
    }

    fn initialize(&mut self, block: Block) {
        for index in block.0..block.1 {
            let temperature = self.cells[index].temperature();
            let cell = &mut self.cells[index];
            cell.reset_ionic_fractions();
            cell.set_temperature(temperature);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::HomogeneousDensityFunction;
    use approx::assert_relative_eq;

    fn unit_grid(shape: [usize; 3], periodic: [bool; 3], density: f64) -> CartesianDensityGrid {
        CartesianDensityGrid::new(
            [0.0; 3],
            [1.0; 3],
            shape,
            periodic,
            Abundances::hydrogen_only(),
            &HomogeneousDensityFunction::new(density, 8000.0),
        )
    }

    /// A photon with a hand-set hydrogen cross section so the opacity is
    /// exactly `density * sigma` (neutral gas).
    fn test_photon(position: [f64; 3], direction: [f64; 3], sigma_h: f64) -> Photon {
        let mut photon = Photon::new(position, direction, NU_HI, 1.0);
        let mut table = [0.0; NUM_IONS];
        table[Ion::Hn.index()] = sigma_h;
        photon.set_cross_sections(table, 0.0);
        photon
    }

    #[test]
    fn cell_of_maps_midpoints_back() {
        let grid = unit_grid([4, 4, 4], [false; 3], 1.0e8);
        for index in 0..grid.num_cells() {
            assert_eq!(grid.cell_of(grid.midpoint(index)), Some(index));
        }
        assert_eq!(grid.cell_of([-0.1, 0.5, 0.5]), None);
        assert_eq!(grid.cell_of([0.5, 0.5, 1.1]), None);
        assert_relative_eq!(grid.volume(0), 1.0 / 64.0);
    }

    #[test]
    fn ray_on_a_face_enters_the_cell_it_is_heading_into() {
        let grid = unit_grid([2, 1, 1], [false; 3], 1.0e8);
        let forwards = grid
            .locate([0.5, 0.5, 0.5], [1.0, 0.0, 0.0])
            .expect("inside");
        assert_eq!(forwards.0, [1, 0, 0]);
        let backwards = grid
            .locate([0.5, 0.5, 0.5], [-1.0, 0.0, 0.0])
            .expect("inside");
        assert_eq!(backwards.0, [0, 0, 0]);
    }

    #[test]
    fn zero_optical_depth_returns_the_starting_cell() {
        let grid = unit_grid([4, 4, 4], [false; 3], 1.0e8);
        let photon = test_photon([0.3, 0.6, 0.2], [1.0, 0.0, 0.0], 1.0e-8);
        let mut scratch = ScratchAccumulators::new(grid.num_cells());
        match grid.traverse(&photon, 0.0, &mut scratch) {
            Traversal::Interaction { cell, position } => {
                assert_eq!(Some(cell), grid.cell_of([0.3, 0.6, 0.2]));
                assert_eq!(position, [0.3, 0.6, 0.2]);
            }
            Traversal::Escaped => panic!("zero-tau traversal escaped"),
        }
        assert_eq!(scratch.total_intensity(), 0.0);
    }

    #[test]
    fn transparent_ray_escapes_and_leaves_the_full_path_behind() {
        // Opacity 0.1 per unit length; a τ = 10 target is never reached
        // inside the unit box, so the ray escapes after depositing a
        // path of length 0.5 (from the centre to the face).
        let grid = unit_grid([4, 4, 4], [false; 3], 0.1);
        let photon = test_photon([0.5, 0.5, 0.5], [1.0, 0.0, 0.0], 1.0);
        let mut scratch = ScratchAccumulators::new(grid.num_cells());
        assert_eq!(grid.traverse(&photon, 10.0, &mut scratch), Traversal::Escaped);
        // J accumulates w·σ·ds/V per cell: total = 1·1·0.5/V.
        let expected = 0.5 / grid.volume(0);
        assert_relative_eq!(scratch.total_intensity(), expected, max_relative = 1.0e-12);
    }

    #[test]
    fn interaction_point_honours_the_optical_depth_target() {
        // Uniform opacity χ = n·σ = 2 per unit length; τ = 0.8 puts the
        // interaction at x = 0.5 + 0.4.
        let grid = unit_grid([8, 1, 1], [false; 3], 2.0);
        let photon = test_photon([0.5, 0.5, 0.5], [1.0, 0.0, 0.0], 1.0);
        let mut scratch = ScratchAccumulators::new(grid.num_cells());
        match grid.traverse(&photon, 0.8, &mut scratch) {
            Traversal::Interaction { position, .. } => {
                assert_relative_eq!(position[0], 0.9, max_relative = 1.0e-12);
            }
            Traversal::Escaped => panic!("should interact inside the box"),
        }
    }

    #[test]
    fn periodic_axis_wraps_where_the_open_boundary_escapes() {
        // χ = 1 per unit length, start at x = 0.9 heading +x with
        // τ = 0.5: the open grid escapes after consuming τ = 0.1, the
        // periodic grid re-enters at x = 0 and interacts at x = 0.4.
        let photon = test_photon([0.9, 0.5, 0.5], [1.0, 0.0, 0.0], 1.0);

        let open = unit_grid([10, 1, 1], [false; 3], 1.0);
        let mut scratch = ScratchAccumulators::new(open.num_cells());
        assert_eq!(open.traverse(&photon, 0.5, &mut scratch), Traversal::Escaped);

        let wrapped = unit_grid([10, 1, 1], [true, false, false], 1.0);
        let mut scratch = ScratchAccumulators::new(wrapped.num_cells());
        match wrapped.traverse(&photon, 0.5, &mut scratch) {
            Traversal::Interaction { cell, position } => {
                assert_relative_eq!(position[0], 0.4, max_relative = 1.0e-9);
                assert_eq!(Some(cell), wrapped.cell_of([0.4, 0.5, 0.5]));
                // The packet itself is untouched by traversal.
                assert_eq!(photon.direction, [1.0, 0.0, 0.0]);
                assert_eq!(photon.weight, 1.0);
            }
            Traversal::Escaped => panic!("periodic ray should wrap, not escape"),
        }
    }

    #[test]
    fn initialize_resets_fractions_in_the_block() {
        let mut grid = unit_grid([2, 2, 2], [false; 3], 1.0e8);
        grid.initialize((0, 8));
        for index in 0..8 {
            assert_eq!(grid.cell(index).ionic_fraction(Ion::Hn), 1.0e-6);
            assert_eq!(grid.cell(index).p_he_em(3), 1.0);
        }
    }

    #[test]
    fn heating_accumulates_excess_energy_only() {
        // At exactly the hydrogen threshold the excess energy is zero.
        let grid = unit_grid([4, 4, 4], [false; 3], 0.1);
        let photon = test_photon([0.5, 0.5, 0.5], [0.0, 1.0, 0.0], 1.0);
        let mut scratch = ScratchAccumulators::new(grid.num_cells());
        grid.traverse(&photon, 10.0, &mut scratch);
        assert!(scratch.total_intensity() > 0.0);
        assert_eq!(scratch.heating_h.sum(), 0.0);
        assert_eq!(scratch.heating_he.sum(), 0.0);
    }
}
