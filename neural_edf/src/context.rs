//! Per-call state: training flag and the random source.
//!
//! Every stochastic choice in a forward pass (dropout masks, stochastic depth,
//! random FPS starts) draws from the [`ForwardContext`] passed in by the
//! caller, so a fixed seed reproduces a pass exactly.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Training flag plus a seeded random source.
#[derive(Debug, Clone)]
pub struct ForwardContext {
    training: bool,
    rng: StdRng,
}

impl Default for ForwardContext {
    fn default() -> Self {
        Self::inference()
    }
}

impl ForwardContext {
    /// Evaluation mode: no dropout, no stochastic depth, seed 0.
    pub fn inference() -> Self {
        Self {
            training: false,
            rng: StdRng::seed_from_u64(0),
        }
    }

    /// Training mode seeded with `seed`.
    pub fn training(seed: u64) -> Self {
        Self {
            training: true,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Evaluation mode with an explicit seed (only FPS starts are random).
    pub fn seeded(seed: u64) -> Self {
        Self {
            training: false,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Whether stochastic regularisation is active.
    #[inline]
    pub fn is_training(&self) -> bool {
        self.training
    }

    /// The random source.
    #[inline]
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// `len` keep-multipliers: `1 / (1 - p)` with probability `1 - p`, else 0.
    pub fn keep_mask(&mut self, len: usize, p: f64) -> Vec<f32> {
        let keep = 1.0 - p;
        let scale = (1.0 / keep) as f32;
        (0..len)
            .map(|_| if self.rng.gen_bool(keep) { scale } else { 0.0 })
            .collect()
    }
}
