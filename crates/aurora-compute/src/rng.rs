//! Deterministic per-worker random-number seeding.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Seed for one worker's RNG.
///
/// Runs with identical (global seed, worker count, rank count) are
/// bitwise reproducible: every worker derives its stream from
/// `global_seed + worker_id + rank·workers`, and workers are never
/// re-seeded mid-run.
pub fn worker_seed(global_seed: u64, worker_id: usize, rank: usize, workers: usize) -> u64 {
    global_seed + worker_id as u64 + (rank * workers) as u64
}

/// Construct a worker RNG from its deterministic seed.
pub fn worker_rng(global_seed: u64, worker_id: usize, rank: usize, workers: usize) -> StdRng {
    StdRng::seed_from_u64(worker_seed(global_seed, worker_id, rank, workers))
}
