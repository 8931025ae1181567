//! Depthwise tensor products between node features and edge harmonics.

use burn::module::{Module, Param};
use burn::nn::{Initializer, LayerNorm, LayerNormConfig, Linear, LinearConfig};
use burn::module::Ignored;
use burn::prelude::*;
use burn::tensor::activation::silu;
use edf_core::coupling::coupling_table;
use edf_core::{Irreps, MulIrrep};

use super::{block_view, Gate, IrrepsLinear};
use crate::config::RadialProfileConfig;
use crate::error::{NeuralEdfError, Result};

/// One coupling path `(block1, block2) -> l3`.
#[derive(Debug, Clone, PartialEq)]
struct TpPath {
    in1: usize,
    in2: usize,
    mul: usize,
    d1: usize,
    d2: usize,
    d3: usize,
    /// Position of this path's output inside the sorted output layout.
    out_order: usize,
}

/// Channel-wise ("uvu") tensor product.
///
/// Every copy of every block of `irreps_in1` is coupled with every block of
/// `irreps_in2` (which must have multiplicity 1, as spherical harmonics do)
/// into every reachable degree. Each path carries one weight per copy.
/// Outputs are ordered by degree, even parity first, and merged.
#[derive(Module, Debug)]
pub struct DepthwiseTensorProduct<B: Backend> {
    /// Coupling coefficients per path, `[d2, d1 * d3]`.
    couplings: Vec<Tensor<B, 2>>,
    /// Internal weights `[weight_numel]` when not supplied per edge.
    weight: Option<Param<Tensor<B, 1>>>,
    #[module(skip)]
    paths: Ignored<Vec<TpPath>>,
    #[module(skip)]
    irreps_in1: Ignored<Irreps>,
    #[module(skip)]
    irreps_in2: Ignored<Irreps>,
    #[module(skip)]
    irreps_out: Ignored<Irreps>,
}

impl<B: Backend> DepthwiseTensorProduct<B> {
    /// Build the product. With `internal_weights` the weights are parameters;
    /// otherwise they must be passed to [`Self::forward`].
    pub fn new(
        irreps_in1: &Irreps,
        irreps_in2: &Irreps,
        internal_weights: bool,
        device: &B::Device,
    ) -> Result<Self> {
        if irreps_in2.iter().any(|b| b.mul != 1) {
            return Err(NeuralEdfError::config(format!(
                "depthwise tensor product needs multiplicity 1 on the second input, got {}",
                irreps_in2
            )));
        }

        let table = coupling_table();
        let mut raw: Vec<(TpPath, MulIrrep, Vec<f32>)> = Vec::new();
        for (i1, b1) in irreps_in1.iter().enumerate() {
            if b1.mul == 0 {
                continue;
            }
            for (i2, b2) in irreps_in2.iter().enumerate() {
                for ir_out in b1.ir.couplings(&b2.ir) {
                    let Some(c) = table.get(b1.ir.l, b2.ir.l, ir_out.l) else {
                        continue;
                    };
                    let [d1, d2, d3] = c.dims();
                    // [d1, d2, d3] -> [d2, d1 * d3]
                    let mut permuted = vec![0.0f32; d1 * d2 * d3];
                    for i in 0..d1 {
                        for j in 0..d2 {
                            for k in 0..d3 {
                                permuted[j * d1 * d3 + i * d3 + k] = c.values[(i * d2 + j) * d3 + k];
                            }
                        }
                    }
                    raw.push((
                        TpPath {
                            in1: i1,
                            in2: i2,
                            mul: b1.mul,
                            d1,
                            d2,
                            d3,
                            out_order: 0,
                        },
                        MulIrrep {
                            mul: b1.mul,
                            ir: ir_out,
                        },
                        permuted,
                    ));
                }
            }
        }

        // stable sort of path outputs by (l, parity)
        let mut order: Vec<usize> = (0..raw.len()).collect();
        order.sort_by_key(|&i| (raw[i].1.ir.l, raw[i].1.ir.p));
        let mut out_blocks = Vec::with_capacity(raw.len());
        for (pos, &i) in order.iter().enumerate() {
            raw[i].0.out_order = pos;
            out_blocks.push(raw[i].1);
        }
        let irreps_out = Irreps::new(out_blocks).simplify();

        let mut paths = Vec::with_capacity(raw.len());
        let mut couplings = Vec::with_capacity(raw.len());
        for (path, _, values) in raw {
            couplings.push(Tensor::from_data(
                TensorData::new(values, [path.d2, path.d1 * path.d3]),
                device,
            ));
            paths.push(path);
        }

        let weight_numel: usize = paths.iter().map(|p| p.mul).sum();
        let weight = internal_weights.then(|| {
            Initializer::Normal {
                mean: 0.0,
                std: 1.0,
            }
            .init([weight_numel], device)
        });

        Ok(Self {
            couplings,
            weight,
            paths: burn::module::Ignored(paths),
            irreps_in1: burn::module::Ignored(irreps_in1.clone()),
            irreps_in2: burn::module::Ignored(irreps_in2.clone()),
            irreps_out: burn::module::Ignored(irreps_out),
        })
    }

    /// Number of weights consumed per edge.
    pub fn weight_numel(&self) -> usize {
        self.paths.iter().map(|p| p.mul).sum()
    }

    /// Output signature.
    pub fn irreps_out(&self) -> &Irreps {
        &self.irreps_out
    }

    /// Forward pass.
    ///
    /// - `x1`: [n, irreps_in1.dim()]
    /// - `x2`: [n, irreps_in2.dim()]
    /// - `weights`: [n, weight_numel] (ignored with internal weights)
    ///
    /// Output shape: [n, irreps_out.dim()]
    pub fn forward(&self, x1: Tensor<B, 2>, x2: Tensor<B, 2>, weights: Option<Tensor<B, 2>>) -> Tensor<B, 2> {
        let [n, _] = x1.dims();
        let device = x1.device();
        let s1 = self.irreps_in1.slices();
        let s2 = self.irreps_in2.slices();

        let weights = match (&self.weight, weights) {
            (Some(w), _) => w.val().reshape([1, self.weight_numel()]),
            (None, Some(w)) => w,
            (None, None) => Tensor::ones([1, self.weight_numel()], &device),
        };

        let mut outs: Vec<Option<Tensor<B, 2>>> = vec![None; self.paths.len()];
        let mut w_offset = 0;
        for (path, coupling) in self.paths.iter().zip(&self.couplings) {
            let a = block_view(&x1, s1[path.in1].clone(), path.mul, path.d1);
            let b = x2.clone().slice([0..n, s2[path.in2].clone()]);

            // M[e, i, k] = sum_j b[e, j] C[i, j, k]
            let m = b.matmul(coupling.clone()).reshape([n, path.d1, path.d3]);
            // out[e, u, k] = sum_i a[e, u, i] M[e, i, k]
            let out = a.matmul(m);

            let w = weights
                .clone()
                .slice([0..weights.dims()[0], w_offset..w_offset + path.mul])
                .reshape([weights.dims()[0], path.mul, 1]);
            w_offset += path.mul;

            let out = (out * w).mul_scalar((path.d3 as f32).sqrt());
            outs[path.out_order] = Some(out.reshape([n, path.mul * path.d3]));
        }

        let parts: Vec<Tensor<B, 2>> = outs.into_iter().flatten().collect();
        if parts.is_empty() {
            Tensor::zeros([n, 0], &device)
        } else {
            Tensor::cat(parts, 1)
        }
    }
}

impl RadialProfileConfig {
    /// Initialize the radial MLP.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<RadialProfile<B>> {
        RadialProfile::new(&self.widths, self.output_dim, device)
    }
}

/// Radial MLP producing per-edge tensor-product weights.
///
/// `Linear -> LayerNorm -> SiLU` for each hidden width, then a final linear.
#[derive(Module, Debug)]
pub struct RadialProfile<B: Backend> {
    hidden: Vec<Linear<B>>,
    norms: Vec<LayerNorm<B>>,
    output: Linear<B>,
}

impl<B: Backend> RadialProfile<B> {
    /// `widths[0]` is the radial basis size; the rest are hidden widths.
    pub fn new(widths: &[usize], output_dim: usize, device: &B::Device) -> Result<Self> {
        let Some((&input, hidden_widths)) = widths.split_first() else {
            return Err(NeuralEdfError::config("fc_neurons must not be empty"));
        };
        if widths.iter().any(|&w| w == 0) {
            return Err(NeuralEdfError::config("fc_neurons widths must be positive"));
        }

        let mut hidden = Vec::with_capacity(hidden_widths.len());
        let mut norms = Vec::with_capacity(hidden_widths.len());
        let mut in_dim = input;
        for &w in hidden_widths {
            hidden.push(LinearConfig::new(in_dim, w).init(device));
            norms.push(LayerNormConfig::new(w).init(device));
            in_dim = w;
        }
        let output = LinearConfig::new(in_dim, output_dim.max(1)).init(device);
        Ok(Self {
            hidden,
            norms,
            output,
        })
    }

    /// Forward pass.
    ///
    /// Input shape: [edges, widths[0]]
    /// Output shape: [edges, output_dim]
    pub fn forward(&self, mut x: Tensor<B, 2>) -> Tensor<B, 2> {
        for (linear, norm) in self.hidden.iter().zip(&self.norms) {
            x = silu(norm.forward(linear.forward(x)));
        }
        self.output.forward(x)
    }
}

/// Depthwise tensor product followed by a linear map and optional gate.
///
/// The depthwise weights come from a [`RadialProfile`] of the edge scalars
/// when `fc_neurons` is given, otherwise they are internal parameters.
#[derive(Module, Debug)]
pub struct SeparableTensorProduct<B: Backend> {
    dtp: DepthwiseTensorProduct<B>,
    radial: Option<RadialProfile<B>>,
    linear: IrrepsLinear<B>,
    #[module(skip)]
    gate: Ignored<Option<Gate>>,
    #[module(skip)]
    irreps_out: Ignored<Irreps>,
}

impl<B: Backend> SeparableTensorProduct<B> {
    /// Build a separable product `irreps_in x irreps_edge -> irreps_out`.
    pub fn new(
        irreps_in: &Irreps,
        irreps_edge: &Irreps,
        irreps_out: &Irreps,
        fc_neurons: Option<&[usize]>,
        activate: bool,
        device: &B::Device,
    ) -> Result<Self> {
        let dtp = DepthwiseTensorProduct::new(irreps_in, irreps_edge, fc_neurons.is_none(), device)?;
        let radial = fc_neurons
            .map(|fc| RadialProfile::new(fc, dtp.weight_numel(), device))
            .transpose()?;

        let gate = activate.then(|| Gate::for_output(irreps_out));
        let linear_out = match &gate {
            Some(g) => g.irreps_in(),
            None => irreps_out.clone(),
        };
        let linear = IrrepsLinear::new(dtp.irreps_out(), &linear_out, true, device);

        Ok(Self {
            dtp,
            radial,
            linear,
            gate: burn::module::Ignored(gate),
            irreps_out: burn::module::Ignored(irreps_out.clone()),
        })
    }

    /// Output signature.
    pub fn irreps_out(&self) -> &Irreps {
        &self.irreps_out
    }

    /// Signature of the raw depthwise product (before the linear map).
    pub fn irreps_product(&self) -> &Irreps {
        self.dtp.irreps_out()
    }

    /// Raw depthwise product, weighted by the radial profile of `edge_scalars`.
    pub fn product(&self, x: Tensor<B, 2>, edge_attr: Tensor<B, 2>, edge_scalars: Tensor<B, 2>) -> Tensor<B, 2> {
        let weights = self.radial.as_ref().map(|r| r.forward(edge_scalars));
        self.dtp.forward(x, edge_attr, weights)
    }

    /// Linear map plus optional gate applied to a raw product.
    pub fn project(&self, product: Tensor<B, 2>) -> Tensor<B, 2> {
        let y = self.linear.forward(product);
        match &*self.gate {
            Some(g) => g.forward(y),
            None => y,
        }
    }

    /// Full forward pass.
    ///
    /// Output shape: [edges, irreps_out.dim()]
    pub fn forward(&self, x: Tensor<B, 2>, edge_attr: Tensor<B, 2>, edge_scalars: Tensor<B, 2>) -> Tensor<B, 2> {
        self.project(self.product(x, edge_attr, edge_scalars))
    }
}
