//! Split irrep features into attention heads and merge them back.
//!
//! A feature of `irreps_head.scale_mul(num_heads)` stores, per block, the
//! copies of head 0 first, then head 1, and so on. Splitting regroups every
//! block per head so that each head is a contiguous `irreps_head` vector.

use burn::prelude::*;
use edf_core::Irreps;

/// `[n, H * dim_head]` (block-wise layout) to `[n, H, dim_head]`.
pub fn vec_to_heads<B: Backend>(x: Tensor<B, 2>, irreps_head: &Irreps, num_heads: usize) -> Tensor<B, 3> {
    let [n, _] = x.dims();
    let mut offset = 0;
    let mut parts = Vec::with_capacity(irreps_head.len());
    for block in irreps_head.iter() {
        let width = block.dim();
        if width == 0 {
            continue;
        }
        let span = width * num_heads;
        parts.push(
            x.clone()
                .slice([0..n, offset..offset + span])
                .reshape([n, num_heads, width]),
        );
        offset += span;
    }
    Tensor::cat(parts, 2)
}

/// Inverse of [`vec_to_heads`].
pub fn heads_to_vec<B: Backend>(x: Tensor<B, 3>, irreps_head: &Irreps) -> Tensor<B, 2> {
    let [n, num_heads, _] = x.dims();
    let mut offset = 0;
    let mut parts = Vec::with_capacity(irreps_head.len());
    for block in irreps_head.iter() {
        let width = block.dim();
        if width == 0 {
            continue;
        }
        parts.push(
            x.clone()
                .slice([0..n, 0..num_heads, offset..offset + width])
                .reshape([n, num_heads * width]),
        );
        offset += width;
    }
    Tensor::cat(parts, 1)
}
