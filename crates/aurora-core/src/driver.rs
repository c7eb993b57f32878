//! Outer iteration loop.
//!
//! One outer iteration is: reset the accumulators, shoot photon packets
//! in checker-guided substeps, run the equilibrium solver, emit a
//! snapshot, and test for convergence. Temperature solving is held off
//! during the warm-up iterations so the ionization field can stabilise
//! before thermal balance is enabled.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};
use serde::Serialize;

use crate::convergence::{IterationConvergenceChecker, PhotonNumberConvergenceChecker};
use crate::grid::{Block, DensityGrid};
use crate::photon::{PhotonType, PhotonTypeCounters};
use crate::solver::{IonizationSolver, TemperatureSolver};
use crate::source::PhotonSource;
use crate::transport::PhotonShooter;

/// Snapshot sink called at the end of every outer iteration. Opaque to
/// the engine; the bytes it writes are the writer's business.
pub trait DensityGridWriter {
    fn write(&self, grid: &dyn DensityGrid, iteration: usize) -> std::io::Result<()>;
}

/// Shooting statistics of one outer iteration, in a serialisable shape
/// for the optional JSON statistics dump.
#[derive(Debug, Clone, Serialize)]
pub struct IterationStatistics {
    /// Outer loop index.
    pub iteration: usize,
    /// Packets shot this iteration.
    pub photon_count: usize,
    /// Substeps the photon-number checker needed.
    pub substeps: usize,
    /// Total emitted weight (s⁻¹).
    pub total_weight: f64,
    /// Weight reemitted as non-ionizing photons.
    pub absorbed_weight: f64,
    /// Weight that escaped as diffuse hydrogen Lyman-continuum photons.
    pub diffuse_hi_weight: f64,
    /// Weight that escaped through one of the helium channels.
    pub diffuse_hei_weight: f64,
    /// Fraction of the emitted weight that escaped ionizing.
    pub escape_fraction: f64,
}

impl IterationStatistics {
    fn new(
        iteration: usize,
        photon_count: usize,
        substeps: usize,
        counters: &PhotonTypeCounters,
    ) -> Self {
        Self {
            iteration,
            photon_count,
            substeps,
            total_weight: counters.total_weight(),
            absorbed_weight: counters.weight_of(PhotonType::Absorbed),
            diffuse_hi_weight: counters.weight_of(PhotonType::DiffuseHI),
            diffuse_hei_weight: counters.weight_of(PhotonType::DiffuseHeI),
            escape_fraction: counters.escape_fraction(),
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Number of outer iterations executed.
    pub iterations: usize,
    /// Packets shot in the final iteration.
    pub final_photon_count: usize,
    /// Terminal-type counters of the final iteration.
    pub final_counters: PhotonTypeCounters,
    /// Per-iteration shooting statistics, in loop order.
    pub statistics: Vec<IterationStatistics>,
    /// Whether the iteration checker declared convergence (as opposed to
    /// exhausting the iteration budget or being stopped).
    pub converged: bool,
}

/// The outer iteration loop and its bookkeeping.
pub struct IterationDriver {
    max_iterations: usize,
    initial_photon_count: usize,
    calculate_temperature: bool,
    /// Iterations solved at fixed temperature before thermal balance.
    warmup_iterations: usize,
    /// This rank's share of each substep budget (1/R).
    rank_fraction: f64,
    /// This rank's cell block for solver passes.
    block: Block,
}

impl IterationDriver {
    pub fn new(max_iterations: usize, initial_photon_count: usize, block: Block) -> Self {
        assert!(initial_photon_count > 0);
        Self {
            max_iterations,
            initial_photon_count,
            calculate_temperature: false,
            warmup_iterations: 4,
            rank_fraction: 1.0,
            block,
        }
    }

    /// Enable the self-consistent temperature solver after warm-up.
    pub fn with_temperature_calculation(mut self, enabled: bool) -> Self {
        self.calculate_temperature = enabled;
        self
    }

    /// Override the number of fixed-temperature warm-up iterations.
    pub fn with_warmup_iterations(mut self, warmup: usize) -> Self {
        self.warmup_iterations = warmup;
        self
    }

    /// Configure the outer rank split: this rank shoots 1/R of every
    /// substep budget.
    pub fn with_rank_count(mut self, ranks: usize) -> Self {
        assert!(ranks > 0);
        self.rank_fraction = 1.0 / ranks as f64;
        self
    }

    /// Run the loop to convergence, iteration exhaustion, or host stop.
    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &self,
        grid: &mut dyn DensityGrid,
        source: &mut PhotonSource,
        shooter: &mut dyn PhotonShooter,
        ionization_solver: &IonizationSolver,
        temperature_solver: Option<&TemperatureSolver>,
        photon_checker: &mut dyn PhotonNumberConvergenceChecker,
        iteration_checker: &mut dyn IterationConvergenceChecker,
        writer: Option<&dyn DensityGridWriter>,
        stop_flag: &AtomicBool,
    ) -> std::io::Result<RunSummary> {
        let mut photon_count = self.initial_photon_count;
        let mut iterations = 0;
        let mut converged = false;
        let mut final_counters = PhotonTypeCounters::new();
        let mut final_photon_count = 0;
        let mut statistics = Vec::new();

        for loop_index in 0..self.max_iterations {
            if iteration_checker.is_converged(grid) {
                converged = true;
                break;
            }
            info!("Starting loop {}.", loop_index);
            photon_count = iteration_checker.next_photon_count(grid, photon_count);

            let budget = source.set_photon_budget(photon_count);
            grid.reset_accumulators();
            photon_checker.reset();

            let mut substep_size = budget;
            let mut total_shot = 0usize;
            let mut counters = PhotonTypeCounters::new();
            let mut substep = 0usize;
            while !photon_checker.is_converged(grid, total_shot) {
                let local = ((substep_size as f64 * self.rank_fraction).ceil() as usize).max(1);
                let batch = shooter.shoot(source, grid, local);
                counters.merge(&batch);
                total_shot += substep_size;
                substep_size = photon_checker.next_substep(substep_size, total_shot);
                substep += 1;
                if stop_flag.load(Ordering::Relaxed) {
                    break;
                }
            }
            info!(
                "Done shooting photons: {} packets in {} substeps.",
                total_shot, substep
            );
            if stop_flag.load(Ordering::Relaxed) {
                warn!("Stop requested; leaving the iteration loop early.");
                break;
            }

            let total_weight = counters.total_weight();
            self.log_shooting_statistics(&counters);
            statistics.push(IterationStatistics::new(
                loop_index,
                total_shot,
                substep,
                &counters,
            ));

            if self.calculate_temperature && loop_index >= self.warmup_iterations {
                let solver = temperature_solver
                    .expect("temperature calculation enabled without a temperature solver");
                info!("Calculating temperature after shooting {} photons...", total_shot);
                solver.solve(grid, total_weight, self.block);
            } else {
                info!(
                    "Calculating ionization state after shooting {} photons...",
                    total_shot
                );
                ionization_solver.solve(grid, total_weight, self.block);
            }

            if let Some(writer) = writer {
                writer.write(grid, loop_index)?;
            }

            final_counters = counters;
            final_photon_count = total_shot;
            photon_count = photon_checker.suggested_photon_count(total_shot);
            iterations = loop_index + 1;
        }

        if !converged && iterations == self.max_iterations {
            info!(
                "Maximum number of iterations ({}) reached, stopping.",
                self.max_iterations
            );
        }

        Ok(RunSummary {
            iterations,
            final_photon_count,
            final_counters,
            statistics,
            converged,
        })
    }

    fn log_shooting_statistics(&self, counters: &PhotonTypeCounters) {
        let total_weight = counters.total_weight();
        if total_weight == 0.0 {
            return;
        }
        let absorbed = counters.weight_of(PhotonType::Absorbed);
        let diffuse_hi = counters.weight_of(PhotonType::DiffuseHI);
        let diffuse_hei = counters.weight_of(PhotonType::DiffuseHeI);
        info!(
            "{:.2}% of photons were reemitted as non-ionizing photons.",
            100.0 * absorbed / total_weight
        );
        info!(
            "{:.2}% of photons were scattered.",
            100.0 * (diffuse_hi + diffuse_hei) / total_weight
        );
        info!("Escape fraction: {:.2}%.", 100.0 * counters.escape_fraction());
        info!(
            "Diffuse HI escape fraction: {:.2}%.",
            100.0 * diffuse_hi / total_weight
        );
        info!(
            "Diffuse HeI escape fraction: {:.2}%.",
            100.0 * diffuse_hei / total_weight
        );
    }
}
