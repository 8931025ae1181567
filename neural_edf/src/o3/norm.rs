//! Equivariant layer normalisation.

use burn::module::{Module, Param};
use burn::nn::Initializer;
use burn::module::Ignored;
use burn::prelude::*;
use edf_core::{Irrep, Irreps};

use super::block_view;

/// Default variance floor.
pub const LAYER_NORM_EPS: f64 = 1e-5;

/// Per-block layer norm that commutes with rotations.
///
/// For each block of `mul` copies:
/// 1. even scalars are centred over the multiplicity axis
/// 2. the block is divided by `sqrt(mean_mul(mean_component(x^2)) + eps)`
/// 3. each copy is scaled by a learned weight; even scalars also get a bias
#[derive(Module, Debug)]
pub struct EquivariantLayerNorm<B: Backend> {
    /// One weight per irrep copy, `[num_irreps]`.
    weight: Param<Tensor<B, 1>>,
    /// One bias per even-scalar copy.
    bias: Option<Param<Tensor<B, 1>>>,
    #[module(skip)]
    irreps: Ignored<Irreps>,
    #[module(skip)]
    eps: f64,
}

impl<B: Backend> EquivariantLayerNorm<B> {
    /// Create a layer norm over `irreps`.
    pub fn new(irreps: &Irreps, device: &B::Device) -> Self {
        let num_scalars = irreps.count(Irrep::SCALAR);
        Self {
            weight: Initializer::Ones.init([irreps.num_irreps()], device),
            bias: (num_scalars > 0).then(|| Initializer::Zeros.init([num_scalars], device)),
            irreps: burn::module::Ignored(irreps.clone()),
            eps: LAYER_NORM_EPS,
        }
    }

    /// Normalised signature (same as input).
    pub fn irreps(&self) -> &Irreps {
        &self.irreps
    }

    /// Forward pass.
    ///
    /// Input shape: [n, irreps.dim()]
    /// Output shape: [n, irreps.dim()]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let [n, _] = x.dims();
        let weight = self.weight.val();
        let bias = self.bias.as_ref().map(|b| b.val());

        let mut parts = Vec::with_capacity(self.irreps.len());
        let mut iw = 0;
        let mut ib = 0;
        for (block, range) in self.irreps.iter().zip(self.irreps.slices()) {
            if block.mul == 0 {
                continue;
            }
            let d = block.ir.dim();
            let mul = block.mul;
            let mut field = block_view(&x, range, mul, d);
            let even_scalar = block.ir == Irrep::SCALAR;

            if even_scalar {
                field = field.clone() - field.mean_dim(1);
            }

            // [n, mul, d] -> [n, 1, 1]
            let norm = field.clone().powf_scalar(2.0).mean_dim(2).mean_dim(1);
            let inv = norm.add_scalar(self.eps).powf_scalar(-0.5);

            let w = weight.clone().slice([iw..iw + mul]).reshape([1, mul, 1]);
            field = field * inv * w;
            iw += mul;

            if even_scalar {
                if let Some(bias) = &bias {
                    field = field + bias.clone().slice([ib..ib + mul]).reshape([1, mul, 1]);
                    ib += mul;
                }
            }
            parts.push(field.reshape([n, mul * d]));
        }

        if parts.is_empty() {
            x
        } else {
            Tensor::cat(parts, 1)
        }
    }
}
