//! # Aurora Compute
//!
//! Shared-memory work dispatch for the Aurora framework. The
//! [`WorkDistributor`](dispatcher::WorkDistributor) splits a photon batch
//! over a rayon thread pool with one persistent, deterministically seeded
//! RNG per worker, and reduces the workers' shadow accumulators into the
//! grid in a fixed order so runs are bitwise reproducible for a fixed
//! (seed, thread count, rank count).

pub mod dispatcher;
pub mod rng;

pub use dispatcher::{DispatchError, WorkDistributor};
pub use rng::worker_seed;
