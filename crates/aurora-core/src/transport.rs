//! Single-packet propagation kernel.
//!
//! Propagates one photon packet until it is absorbed or escapes the
//! domain, looping through optical-depth draws, grid traversals and
//! reemission decisions. The kernel only reads the grid and the source;
//! all accumulator writes go through the worker's scratch buffers, so it
//! is safe to run concurrently.

use rand::{Rng, RngCore};

use crate::grid::{DensityGrid, ScratchAccumulators, Traversal};
use crate::photon::{Photon, PhotonType};
use crate::source::PhotonSource;

/// Propagate a packet to its terminal state. Returns the terminal type:
/// the packet's emission type if it escaped, or
/// [`PhotonType::Absorbed`] if it was converted to a non-ionizing photon.
pub fn propagate(
    mut photon: Photon,
    grid: &dyn DensityGrid,
    source: &PhotonSource,
    rng: &mut dyn RngCore,
    scratch: &mut ScratchAccumulators,
) -> PhotonType {
    loop {
        // Draw the optical depth to the next interaction; u is folded to
        // (0, 1] so the logarithm is finite.
        let tau_target = -(1.0 - rng.gen::<f64>()).ln();

        match grid.traverse(&photon, tau_target, scratch) {
            Traversal::Escaped => return photon.photon_type,
            Traversal::Interaction { cell, position } => {
                photon.position = position;
                if !source.reemit(&mut photon, grid.cell(cell), rng) {
                    return PhotonType::Absorbed;
                }
            }
        }
    }
}

/// Anything that can shoot a batch of packets through the grid. The
/// shared-memory dispatcher in `aurora-compute` is the production
/// implementation; [`SerialShooter`] is the single-threaded reference.
pub trait PhotonShooter {
    /// Shoot `count` packets, fold their path contributions into the grid
    /// accumulators, and return the terminal-type counters.
    fn shoot(
        &mut self,
        source: &PhotonSource,
        grid: &mut dyn DensityGrid,
        count: usize,
    ) -> crate::photon::PhotonTypeCounters;
}

/// Single-threaded shooter with one persistent RNG. The reference
/// implementation for reproducibility comparisons, and the natural choice
/// inside tests.
pub struct SerialShooter {
    rng: rand::rngs::StdRng,
    scratch: Option<ScratchAccumulators>,
}

impl SerialShooter {
    pub fn new(seed: u64) -> Self {
        use rand::SeedableRng;
        Self {
            rng: rand::rngs::StdRng::seed_from_u64(seed),
            scratch: None,
        }
    }
}

impl PhotonShooter for SerialShooter {
    fn shoot(
        &mut self,
        source: &PhotonSource,
        grid: &mut dyn DensityGrid,
        count: usize,
    ) -> crate::photon::PhotonTypeCounters {
        let reusable = matches!(
            &self.scratch,
            Some(scratch) if scratch.mean_intensity.nrows() == grid.num_cells()
        );
        if !reusable {
            self.scratch = Some(ScratchAccumulators::new(grid.num_cells()));
        }
        let scratch = self.scratch.as_mut().unwrap();
        scratch.reset();

        let mut counters = crate::photon::PhotonTypeCounters::new();
        for _ in 0..count {
            let photon = source.sample(&mut self.rng);
            counters.count_launch(photon.weight);
            let weight = photon.weight;
            let terminal = propagate(photon, grid, source, &mut self.rng, scratch);
            counters.count_terminal(terminal, weight);
        }
        grid.apply_scratch(scratch);
        counters
    }
}
