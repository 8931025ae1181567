//! Tensor adapters over the irrep math of `edf_core`.
//!
//! Every layer here takes and returns flat `[n, irreps.dim()]` tensors laid
//! out block by block, each block `[mul, 2l + 1]` multiplicity-major.

mod dropout;
mod gate;
mod harmonics;
mod heads;
mod linear;
mod norm;
mod tensor_product;

use std::ops::Range;

use burn::prelude::*;

pub use dropout::{check_probability, EquivariantDropout, GraphDropPath};
pub use gate::Gate;
pub use harmonics::{edge_length, SphericalHarmonics};
pub use heads::{heads_to_vec, vec_to_heads};
pub use linear::IrrepsLinear;
pub use norm::{EquivariantLayerNorm, LAYER_NORM_EPS};
pub use tensor_product::{DepthwiseTensorProduct, RadialProfile, SeparableTensorProduct};

/// View the columns `range` of `x` as `[n, mul, d]`.
pub(crate) fn block_view<B: Backend>(x: &Tensor<B, 2>, range: Range<usize>, mul: usize, d: usize) -> Tensor<B, 3> {
    let [n, _] = x.dims();
    x.clone().slice([0..n, range]).reshape([n, mul, d])
}
