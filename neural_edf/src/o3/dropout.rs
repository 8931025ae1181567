//! Dropout variants that respect irrep structure and batch grouping.

use burn::prelude::*;
use edf_core::spatial::BatchSegments;
use edf_core::Irreps;

use crate::context::ForwardContext;
use crate::error::{NeuralEdfError, Result};
use crate::ops::matrix_tensor;

/// Rejects drop probabilities outside `[0, 1]`, NaN included.
pub fn check_probability(name: &str, prob: f64) -> Result<()> {
    if (0.0..=1.0).contains(&prob) {
        Ok(())
    } else {
        Err(NeuralEdfError::config(format!("{name} must lie in [0, 1], got {prob}")))
    }
}

/// Drops whole irrep copies: all `2l + 1` components of a copy share one draw.
#[derive(Debug, Clone, PartialEq)]
pub struct EquivariantDropout {
    irreps: Irreps,
    prob: f64,
}

impl EquivariantDropout {
    /// Dropout over `irreps` with drop probability `prob`.
    pub fn new(irreps: &Irreps, prob: f64) -> Result<Self> {
        check_probability("dropout probability", prob)?;
        Ok(Self {
            irreps: irreps.clone(),
            prob,
        })
    }

    /// Drop probability.
    pub fn prob(&self) -> f64 {
        self.prob
    }

    /// Forward pass; identity outside training or with `prob == 0`.
    ///
    /// Input shape: [n, irreps.dim()]
    /// Output shape: [n, irreps.dim()]
    pub fn forward<B: Backend>(&self, x: Tensor<B, 2>, ctx: &mut ForwardContext) -> Result<Tensor<B, 2>> {
        let [n, dim] = x.dims();
        if dim != self.irreps.dim() {
            return Err(NeuralEdfError::ShapeMismatch {
                expected: vec![n, self.irreps.dim()],
                got: vec![n, dim],
            });
        }
        if !ctx.is_training() || self.prob <= 0.0 {
            return Ok(x);
        }
        let copies = ctx.keep_mask(n * self.irreps.num_irreps(), self.prob);

        let mut mask = Vec::with_capacity(n * dim);
        for row in copies.chunks_exact(self.irreps.num_irreps().max(1)) {
            let mut k = 0;
            for block in self.irreps.iter() {
                for _ in 0..block.mul {
                    mask.extend(std::iter::repeat(row[k]).take(block.ir.dim()));
                    k += 1;
                }
            }
        }
        let mask = matrix_tensor::<B>(mask, n, dim, &x.device());
        Ok(x * mask)
    }
}

/// Stochastic depth applied per batch group.
///
/// Every node of a group shares one draw, so a dropped group loses the
/// whole residual branch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphDropPath {
    prob: f64,
}

impl GraphDropPath {
    /// Drop path with probability `prob`.
    pub fn new(prob: f64) -> Result<Self> {
        check_probability("drop path rate", prob)?;
        Ok(Self { prob })
    }

    /// Drop probability.
    pub fn prob(&self) -> f64 {
        self.prob
    }

    /// Forward pass; `batch` holds the host batch id of every row of `x`.
    pub fn forward<B: Backend>(&self, x: Tensor<B, 2>, batch: &[i64], ctx: &mut ForwardContext) -> Result<Tensor<B, 2>> {
        if !ctx.is_training() || self.prob <= 0.0 {
            return Ok(x);
        }
        let [n, _] = x.dims();
        if batch.len() != n {
            return Err(NeuralEdfError::ShapeMismatch {
                expected: vec![n],
                got: vec![batch.len()],
            });
        }
        let groups = BatchSegments::from_batch(batch)?;
        let keep = ctx.keep_mask(groups.len(), self.prob);

        let mut mask = vec![0.0f32; n];
        for ((_, range), k) in groups.groups().iter().zip(&keep) {
            for m in &mut mask[range.clone()] {
                *m = *k;
            }
        }
        let mask = matrix_tensor::<B>(mask, n, 1, &x.device());
        Ok(x * mask)
    }
}
