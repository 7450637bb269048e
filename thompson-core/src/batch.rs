//! Parallel fan-out over independent invocations.
//!
//! Neither the ridge draw nor a forward chain can be parallelized
//! internally, but separate draws and separate chains share nothing.
//! Each ridge draw gets its own ChaCha8 stream seeded from
//! `seed + draw_index`, so output does not depend on thread scheduling.

use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thompson_linalg::DenseMatrix;
use tracing::info;

use crate::error::Result;
use crate::forward::{thompson_forward, ForwardPass};
use crate::input::PrecisionBlock;
use crate::normal::RngNormalSource;
use crate::ridge::RidgePosterior;

/// Configuration for batched ridge draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of posterior draws.
    pub draws: usize,
    /// Base seed; draw `i` uses `seed + i`.
    pub seed: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            draws: 1000,
            seed: 42,
        }
    }
}

/// Draw `config.draws` independent samples from one factored posterior.
pub fn sample_ridge_batch(
    posterior: &RidgePosterior,
    config: &BatchConfig,
) -> Result<Vec<Vec<f64>>> {
    info!(
        "Drawing {} ridge posterior samples (k={}, seed={})",
        config.draws,
        posterior.dim(),
        config.seed
    );
    (0..config.draws)
        .into_par_iter()
        .map(|i| {
            let rng = rand_chacha::ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(i as u64));
            let mut normals = RngNormalSource::new(rng);
            posterior.sample(&mut normals)
        })
        .collect()
}

/// Inputs for one independent forward recursion.
#[derive(Debug, Clone)]
pub struct ForwardChain {
    pub omega_tt: Vec<PrecisionBlock>,
    pub c: Vec<Vec<f64>>,
    pub coupling: DenseMatrix,
}

/// Run many forward recursions in parallel. A failing chain does not
/// affect the others; results come back in input order.
pub fn thompson_forward_batch(chains: &[ForwardChain]) -> Vec<Result<ForwardPass>> {
    info!("Running {} forward recursions", chains.len());
    let results: Vec<Result<ForwardPass>> = chains
        .par_iter()
        .map(|chain| thompson_forward(&chain.omega_tt, &chain.c, &chain.coupling))
        .collect();
    let failed = results.iter().filter(|r| r.is_err()).count();
    info!(
        "Forward recursions finished: {} ok, {} failed",
        results.len() - failed,
        failed
    );
    results
}
