//! Gaussian radial basis with smooth finite cutoff.

use burn::module::{Module, Param};
use burn::prelude::*;
use burn::tensor::activation::softplus;
use edf_core::cutoff::{DEFAULT_DEGREE, DEFAULT_THRESHOLD};

use crate::config::GaussianRadialBasisConfig;
use crate::error::{NeuralEdfError, Result};

/// `sqrt(2 pi)`
const SQRT_TAU: f32 = 2.506_628_3;

impl GaussianRadialBasisConfig {
    /// Initialize the radial basis.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<GaussianRadialBasis<B>> {
        GaussianRadialBasis::new(self, device)
    }
}

/// Learned Gaussian bumps over the normalised distance, windowed to zero at the cutoff.
///
/// The normalised distance is `x = (d - offset) / (cutoff - offset)`. With
/// `soft_cutoff` the window also vanishes at `x = 0`.
#[derive(Module, Debug)]
pub struct GaussianRadialBasis<B: Backend> {
    /// Centres: [1, num_basis]
    mean: Param<Tensor<B, 2>>,
    /// Softplus pre-activation of the widths: [1, num_basis]
    std_logit: Param<Tensor<B, 2>>,
    /// Affine scale of `x`: [1, 1]
    weight: Param<Tensor<B, 2>>,
    /// Affine shift of `x`: [1, 1]
    bias: Param<Tensor<B, 2>>,
    #[module(skip)]
    num_basis: usize,
    #[module(skip)]
    cutoff: f32,
    #[module(skip)]
    offset: f32,
    #[module(skip)]
    soft_cutoff: bool,
}

impl<B: Backend> GaussianRadialBasis<B> {
    /// Create the basis from configuration.
    pub fn new(config: &GaussianRadialBasisConfig, device: &B::Device) -> Result<Self> {
        let nb = config.num_basis;
        if nb < 1 {
            return Err(NeuralEdfError::config("radial basis needs at least one channel"));
        }
        if !config.cutoff.is_finite() || !config.offset.is_finite() || config.cutoff <= config.offset {
            return Err(NeuralEdfError::config(format!(
                "radial cutoff {} must be finite and larger than offset {}",
                config.cutoff, config.offset
            )));
        }

        // interior points of linspace(0, 1, nb + 2)
        let mean: Vec<f32> = (1..=nb).map(|i| i as f32 / (nb + 1) as f32).collect();
        let std_init = ((2.0 / nb as f64).exp() - 1.0).ln() as f32;

        let constant = |values: Vec<f32>, cols: usize| {
            Param::from_tensor(Tensor::from_data(TensorData::new(values, [1, cols]), device))
        };

        Ok(Self {
            mean: constant(mean, nb),
            std_logit: constant(vec![std_init; nb], nb),
            weight: constant(vec![1.0], 1),
            bias: constant(vec![0.0], 1),
            num_basis: nb,
            cutoff: config.cutoff,
            offset: config.offset,
            soft_cutoff: config.soft_cutoff,
        })
    }

    /// Number of output channels.
    pub fn num_basis(&self) -> usize {
        self.num_basis
    }

    /// Cutoff distance.
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Encode distances.
    ///
    /// Input shape: [edges, 1]
    /// Output shape: [edges, num_basis]
    pub fn forward(&self, distance: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = distance
            .sub_scalar(self.offset)
            .div_scalar(self.cutoff - self.offset);

        let y = x.clone() * self.weight.val() + self.bias.val();
        let std = softplus(self.std_logit.val(), 1.0);
        let z = (y - self.mean.val()) / std.clone();
        let gaussian = z.powf_scalar(2.0).mul_scalar(-0.5).exp() / std.mul_scalar(SQRT_TAU);

        let window = if self.soft_cutoff {
            soft_square_window(x)
        } else {
            soft_cutoff_window(x)
        };
        gaussian * window
    }
}

/// Tensor form of `edf_core::cutoff::soft_step`.
fn soft_step<B: Backend>(x: Tensor<B, 2>, n: i32) -> Tensor<B, 2> {
    let nf = n as f32;
    let x = x.clamp(0.0, 1.0);
    let poly = x.clone().powi_scalar(n) * x.mul_scalar(-nf).add_scalar(nf + 1.0);
    poly.clamp_max(1.0)
}

/// Tensor form of `edf_core::cutoff::soft_cutoff` with default parameters.
fn soft_cutoff_window<B: Backend>(x: Tensor<B, 2>) -> Tensor<B, 2> {
    let t = x
        .sub_scalar(DEFAULT_THRESHOLD)
        .div_scalar(1.0 - DEFAULT_THRESHOLD);
    soft_step(t, DEFAULT_DEGREE).neg().add_scalar(1.0)
}

/// Tensor form of `edf_core::cutoff::soft_square_cutoff`.
fn soft_square_window<B: Backend>(x: Tensor<B, 2>) -> Tensor<B, 2> {
    let upper = x.clone().greater_elem(0.5);
    let lower_branch = soft_cutoff_window(x.clone().neg().add_scalar(1.0));
    lower_branch.mask_where(upper, soft_cutoff_window(x))
}
