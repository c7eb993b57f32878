//! Photon batch dispatch over a thread pool.
//!
//! A batch of K packets is split into P contiguous worker budgets
//! (remainders go to the low worker ids). Every worker owns a persistent
//! RNG seeded from (global seed, worker id, rank) and a thread-local
//! shadow of the grid accumulators; at batch end the shadows are reduced
//! into the grid in ascending worker-id order. Float addition is not
//! associative, so the fixed reduction order is what makes runs with the
//! same (seed, threads, ranks) bitwise identical.

use log::info;
use rand::rngs::StdRng;
use rayon::prelude::*;
use thiserror::Error;

use aurora_core::grid::{DensityGrid, ScratchAccumulators};
use aurora_core::photon::PhotonTypeCounters;
use aurora_core::source::PhotonSource;
use aurora_core::transport::{propagate, PhotonShooter};

use crate::rng::worker_rng;

/// Errors raised while setting up the dispatch pool.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Failed to build the worker thread pool: {0}")]
    PoolBuild(String),
}

struct WorkerState {
    rng: StdRng,
    scratch: Option<ScratchAccumulators>,
}

/// Distributes photon batches over worker threads.
pub struct WorkDistributor {
    pool: rayon::ThreadPool,
    workers: Vec<WorkerState>,
}

impl WorkDistributor {
    /// Build a dispatcher with the given thread count (`None` uses the
    /// rayon default) and deterministic seeding for this rank.
    pub fn new(
        threads: Option<usize>,
        global_seed: u64,
        rank: usize,
        num_ranks: usize,
    ) -> Result<Self, DispatchError> {
        assert!(rank < num_ranks, "rank {} outside 0..{}", rank, num_ranks);
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(threads) = threads {
            assert!(threads > 0, "thread count must be positive");
            builder = builder.num_threads(threads);
        }
        let pool = builder
            .build()
            .map_err(|e| DispatchError::PoolBuild(e.to_string()))?;
        let worker_count = pool.current_num_threads();
        let workers = (0..worker_count)
            .map(|id| WorkerState {
                rng: worker_rng(global_seed, id, rank, worker_count),
                scratch: None,
            })
            .collect();
        info!("Work distributor using {} worker threads.", worker_count);
        Ok(Self { pool, workers })
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Contiguous per-worker budgets summing to `count`; the remainder
    /// goes to the lowest worker ids.
    fn split_budget(count: usize, workers: usize) -> Vec<usize> {
        let base = count / workers;
        let remainder = count % workers;
        (0..workers)
            .map(|id| base + usize::from(id < remainder))
            .collect()
    }
}

impl PhotonShooter for WorkDistributor {
    fn shoot(
        &mut self,
        source: &PhotonSource,
        grid: &mut dyn DensityGrid,
        count: usize,
    ) -> PhotonTypeCounters {
        let num_cells = grid.num_cells();
        let budgets = Self::split_budget(count, self.workers.len());

        let worker_counters: Vec<PhotonTypeCounters> = {
            let grid_shared: &dyn DensityGrid = &*grid;
            let workers = &mut self.workers;
            self.pool.install(|| {
                workers
                    .par_iter_mut()
                    .zip(budgets.par_iter())
                    .map(|(worker, &budget)| {
                        let reusable = matches!(
                            &worker.scratch,
                            Some(scratch) if scratch.mean_intensity.nrows() == num_cells
                        );
                        if !reusable {
                            worker.scratch = Some(ScratchAccumulators::new(num_cells));
                        }
                        let scratch = worker.scratch.as_mut().unwrap();
                        scratch.reset();

                        let mut counters = PhotonTypeCounters::new();
                        for _ in 0..budget {
                            let photon = source.sample(&mut worker.rng);
                            let weight = photon.weight;
                            counters.count_launch(weight);
                            let terminal =
                                propagate(photon, grid_shared, source, &mut worker.rng, scratch);
                            counters.count_terminal(terminal, weight);
                        }
                        counters
                    })
                    .collect()
            })
        };

        // Reduction in ascending worker-id order: the float-add order is
        // fixed for a given worker count, so the sums are reproducible.
        let mut counters = PhotonTypeCounters::new();
        for (worker, batch) in self.workers.iter().zip(worker_counters.iter()) {
            if let Some(scratch) = &worker.scratch {
                grid.apply_scratch(scratch);
            }
            counters.merge(batch);
        }
        counters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budgets_cover_the_batch_exactly() {
        for (count, workers) in [(100, 8), (7, 8), (0, 4), (13, 5)] {
            let budgets = WorkDistributor::split_budget(count, workers);
            assert_eq!(budgets.len(), workers);
            assert_eq!(budgets.iter().sum::<usize>(), count);
            // Budgets differ by at most one, largest first.
            for pair in budgets.windows(2) {
                assert!(pair[0] >= pair[1] && pair[0] - pair[1] <= 1);
            }
        }
    }

    #[test]
    fn dispatcher_respects_the_thread_count() {
        let distributor = WorkDistributor::new(Some(3), 42, 0, 1).unwrap();
        assert_eq!(distributor.worker_count(), 3);
    }
}
