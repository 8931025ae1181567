//! Equivariant linear map between irrep signatures.

use burn::module::{Module, Param};
use burn::nn::Initializer;
use burn::module::Ignored;
use burn::prelude::*;
use edf_core::{Irrep, Irreps};

use super::block_view;

/// One weight matrix connecting an input block to an output block of the same irrep.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LinearPath {
    input: usize,
    output: usize,
    scale: f32,
}

/// Linear layer mixing multiplicities within each irrep type.
///
/// Every output block is a weighted sum of the input blocks carrying the
/// same irrep, normalised by `1 / sqrt(fan_in)`. Even scalars may carry a
/// bias. Output blocks with no matching input are zero (plus bias).
#[derive(Module, Debug)]
pub struct IrrepsLinear<B: Backend> {
    /// One `[mul_in, mul_out]` matrix per path.
    weights: Vec<Param<Tensor<B, 2>>>,
    /// One `[mul_out]` bias per even-scalar output block.
    biases: Vec<Param<Tensor<B, 1>>>,
    #[module(skip)]
    paths: Ignored<Vec<LinearPath>>,
    #[module(skip)]
    bias_blocks: Vec<usize>,
    #[module(skip)]
    irreps_in: Ignored<Irreps>,
    #[module(skip)]
    irreps_out: Ignored<Irreps>,
}

impl<B: Backend> IrrepsLinear<B> {
    /// Create a linear map `irreps_in -> irreps_out`.
    pub fn new(irreps_in: &Irreps, irreps_out: &Irreps, bias: bool, device: &B::Device) -> Self {
        let mut paths = Vec::new();
        let mut weights = Vec::new();
        for (o, out_block) in irreps_out.iter().enumerate() {
            let fan_in: usize = irreps_in
                .iter()
                .filter(|b| b.ir == out_block.ir)
                .map(|b| b.mul)
                .sum();
            if fan_in == 0 || out_block.mul == 0 {
                continue;
            }
            let scale = 1.0 / (fan_in as f32).sqrt();
            for (i, in_block) in irreps_in.iter().enumerate() {
                if in_block.ir != out_block.ir || in_block.mul == 0 {
                    continue;
                }
                weights.push(
                    Initializer::Normal {
                        mean: 0.0,
                        std: 1.0,
                    }
                    .init([in_block.mul, out_block.mul], device),
                );
                paths.push(LinearPath {
                    input: i,
                    output: o,
                    scale,
                });
            }
        }

        let mut biases = Vec::new();
        let mut bias_blocks = Vec::new();
        if bias {
            for (o, out_block) in irreps_out.iter().enumerate() {
                if out_block.ir == Irrep::SCALAR && out_block.mul > 0 {
                    biases.push(Initializer::Zeros.init([out_block.mul], device));
                    bias_blocks.push(o);
                }
            }
        }

        Self {
            weights,
            biases,
            paths: burn::module::Ignored(paths),
            bias_blocks,
            irreps_in: burn::module::Ignored(irreps_in.clone()),
            irreps_out: burn::module::Ignored(irreps_out.clone()),
        }
    }

    #[cfg(test)]
    pub(crate) fn fill_bias(mut self, value: f32) -> Self {
        self.biases = self
            .biases
            .into_iter()
            .map(|b| Param::from_tensor(b.val().ones_like().mul_scalar(value)))
            .collect();
        self
    }

    /// Input signature.
    pub fn irreps_in(&self) -> &Irreps {
        &self.irreps_in
    }

    /// Output signature.
    pub fn irreps_out(&self) -> &Irreps {
        &self.irreps_out
    }

    /// Forward pass.
    ///
    /// Input shape: [n, irreps_in.dim()]
    /// Output shape: [n, irreps_out.dim()]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let [n, _] = x.dims();
        let device = x.device();
        let in_slices = self.irreps_in.slices();
        let in_blocks = self.irreps_in.blocks();

        let mut outputs: Vec<Option<Tensor<B, 3>>> = vec![None; self.irreps_out.len()];
        for (path, weight) in self.paths.iter().zip(&self.weights) {
            let block = in_blocks[path.input];
            let d = block.ir.dim();
            let mul_out = self.irreps_out.blocks()[path.output].mul;

            // [n, mul_in, d] -> [n * d, mul_in] @ [mul_in, mul_out] -> [n, mul_out, d]
            let x_block = block_view(&x, in_slices[path.input].clone(), block.mul, d)
                .swap_dims(1, 2)
                .reshape([n * d, block.mul]);
            let y = x_block
                .matmul(weight.val().mul_scalar(path.scale))
                .reshape([n, d, mul_out])
                .swap_dims(1, 2);

            outputs[path.output] = Some(match outputs[path.output].take() {
                Some(acc) => acc + y,
                None => y,
            });
        }

        for (b, bias) in self.bias_blocks.iter().zip(&self.biases) {
            let mul = self.irreps_out.blocks()[*b].mul;
            let bias = bias.val().reshape([1, mul, 1]);
            outputs[*b] = Some(match outputs[*b].take() {
                Some(acc) => acc + bias,
                None => Tensor::zeros([n, mul, 1], &device) + bias,
            });
        }

        let parts: Vec<Tensor<B, 2>> = outputs
            .into_iter()
            .zip(self.irreps_out.iter())
            .filter(|(_, b)| b.dim() > 0)
            .map(|(out, b)| match out {
                Some(t) => t.reshape([n, b.dim()]),
                None => Tensor::zeros([n, b.dim()], &device),
            })
            .collect();

        if parts.is_empty() {
            Tensor::zeros([n, 0], &device)
        } else {
            Tensor::cat(parts, 1)
        }
    }
}
