//! Multi-head equivariant graph attention with MLP attention logits.

use burn::module::{Module, Param};
use burn::nn::Initializer;
use burn::module::Ignored;
use burn::prelude::*;
use burn::tensor::activation::sigmoid;
use edf_core::{Irrep, Irreps};

use crate::config::{parse_irreps, GraphAttentionConfig};
use crate::context::ForwardContext;
use crate::data::EdgeSet;
use crate::error::{NeuralEdfError, Result};
use crate::o3::{check_probability, heads_to_vec, vec_to_heads, EquivariantDropout, IrrepsLinear, SeparableTensorProduct};
use crate::ops::{matrix_tensor, scatter_softmax, scatter_sum};

/// Negative slope of the smooth leaky ReLU on attention logits.
const ALPHA_SLOPE: f32 = 0.2;

impl GraphAttentionConfig {
    /// Initialize the attention layer.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<GraphAttention<B>> {
        GraphAttention::new(self, device)
    }
}

/// Graph attention over a fixed edge set.
///
/// Per edge, the message is coupled with the edge harmonics (weighted by a
/// radial MLP of the edge scalars) and gated. One branch produces a scalar
/// logit per head, the other a value vector per head. Logits are
/// soft-maxed over the incoming edges of each destination and used to sum
/// the values.
#[derive(Module, Debug)]
pub struct GraphAttention<B: Backend> {
    sep_act: SeparableTensorProduct<B>,
    sep_alpha: IrrepsLinear<B>,
    sep_value: SeparableTensorProduct<B>,
    /// Per-head logit weights: [num_heads, mul_alpha_head]
    alpha_dot: Param<Tensor<B, 2>>,
    proj: IrrepsLinear<B>,
    #[module(skip)]
    proj_drop: Ignored<EquivariantDropout>,
    #[module(skip)]
    alpha_drop: f64,
    #[module(skip)]
    irreps_head: Ignored<Irreps>,
    #[module(skip)]
    num_heads: usize,
    #[module(skip)]
    mul_alpha_head: usize,
    #[module(skip)]
    irreps_out: Ignored<Irreps>,
}

impl<B: Backend> GraphAttention<B> {
    /// Create the layer from configuration.
    pub fn new(config: &GraphAttentionConfig, device: &B::Device) -> Result<Self> {
        let irreps_emb = parse_irreps(&config.irreps_emb)?;
        let irreps_out = parse_irreps(&config.irreps_output)?;
        let irreps_edge = parse_irreps(&config.irreps_edge_attr)?;
        let irreps_head = parse_irreps(&config.irreps_head)?.sort().simplify();
        let num_heads = config.num_heads;
        if num_heads == 0 {
            return Err(NeuralEdfError::config("attention needs at least one head"));
        }
        check_probability("alpha_drop", config.alpha_drop)?;

        let irreps_attn_heads = irreps_head.scale_mul(num_heads);
        let mul_alpha = irreps_attn_heads.count(Irrep::SCALAR);
        if mul_alpha == 0 || mul_alpha % num_heads != 0 {
            return Err(NeuralEdfError::config(format!(
                "head signature {} needs even scalars divisible across {} heads",
                irreps_head, num_heads
            )));
        }
        let mul_alpha_head = mul_alpha / num_heads;

        let sep_act = SeparableTensorProduct::new(
            &irreps_emb,
            &irreps_edge,
            &irreps_emb,
            Some(config.fc_neurons.as_slice()),
            true,
            device,
        )?;
        let sep_alpha = IrrepsLinear::new(sep_act.irreps_product(), &Irreps::scalars(mul_alpha), true, device);
        let sep_value = SeparableTensorProduct::new(&irreps_emb, &irreps_edge, &irreps_attn_heads, None, false, device)?;

        let bound = (6.0 / (num_heads + mul_alpha_head) as f64).sqrt();
        let alpha_dot = Initializer::Uniform {
            min: -bound,
            max: bound,
        }
        .init([num_heads, mul_alpha_head], device);

        // no bias: destinations without incoming edges stay exactly zero
        let proj = IrrepsLinear::new(&irreps_attn_heads, &irreps_out, false, device);

        Ok(Self {
            sep_act,
            sep_alpha,
            sep_value,
            alpha_dot,
            proj,
            proj_drop: burn::module::Ignored(EquivariantDropout::new(&irreps_out, config.proj_drop)?),
            alpha_drop: config.alpha_drop,
            irreps_head: burn::module::Ignored(irreps_head),
            num_heads,
            mul_alpha_head,
            irreps_out: burn::module::Ignored(irreps_out),
        })
    }

    /// Output signature.
    pub fn irreps_out(&self) -> &Irreps {
        &self.irreps_out
    }

    /// Attend over `edges`.
    ///
    /// - `message`: [edges, irreps_emb.dim()]
    /// - `edge_attr`: [edges, irreps_edge_attr.dim()]
    /// - `edge_scalars`: [edges, fc_neurons[0]]
    ///
    /// Output shape: [edges.num_dst, irreps_out.dim()]
    pub fn forward(
        &self,
        message: Tensor<B, 2>,
        edges: &EdgeSet<B>,
        edge_attr: Tensor<B, 2>,
        edge_scalars: Tensor<B, 2>,
        ctx: &mut ForwardContext,
    ) -> Result<Tensor<B, 2>> {
        let device = message.device();
        let num_dst = edges.num_dst;
        let e = edges.len();
        if e == 0 {
            return Ok(Tensor::zeros([num_dst, self.irreps_out.dim()], &device));
        }
        let h = self.num_heads;
        let k = self.mul_alpha_head;

        let product = self.sep_act.product(message, edge_attr.clone(), edge_scalars.clone());

        // logits: [e, h]
        let alpha = self.sep_alpha.forward(product.clone()).reshape([e, h, k]);
        let alpha = smooth_leaky_relu(alpha, ALPHA_SLOPE);
        let alpha = (alpha * self.alpha_dot.val().reshape([1, h, k]))
            .sum_dim(2)
            .reshape([e, h]);
        let mut alpha = scatter_softmax(alpha, &edges.dst, edges.dst_index.clone(), num_dst)?;
        if ctx.is_training() && self.alpha_drop > 0.0 {
            let mask = ctx.keep_mask(e * h, self.alpha_drop);
            alpha = alpha * matrix_tensor::<B>(mask, e, h, &device);
        }

        // values: [e, h, dim_head]
        let value = self.sep_act.project(product);
        let value = self.sep_value.forward(value, edge_attr, edge_scalars);
        let value = vec_to_heads(value, &self.irreps_head, h);
        let dim_head = self.irreps_head.dim();

        let attn = (value * alpha.reshape([e, h, 1])).reshape([e, h * dim_head]);
        let attn = scatter_sum(attn, edges.dst_index.clone(), num_dst).reshape([num_dst, h, dim_head]);
        let out = self.proj.forward(heads_to_vec(attn, &self.irreps_head));
        self.proj_drop.forward(out, ctx)
    }
}

/// `((1 + a) / 2) x + ((1 - a) / 2) x (2 sigmoid(x) - 1)`
fn smooth_leaky_relu<B: Backend, const D: usize>(x: Tensor<B, D>, slope: f32) -> Tensor<B, D> {
    let linear = x.clone().mul_scalar((1.0 + slope) / 2.0);
    let smooth = x.clone().mul_scalar((1.0 - slope) / 2.0) * sigmoid(x).mul_scalar(2.0).sub_scalar(1.0);
    linear + smooth
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::o3::SphericalHarmonics;
    use crate::ops::{points_tensor, to_f32_vec};
    use burn::backend::NdArray;
    use edf_core::spatial::NeighborList;
    use edf_core::Point3;

    type TestBackend = NdArray;

    fn config() -> GraphAttentionConfig {
        GraphAttentionConfig::new("4x0e+2x1o".into(), "4x0e+2x1o".into(), "2x0e+1x1o".into(), 2, vec![4, 8])
    }

    #[test]
    fn test_destination_without_edges_is_zero() {
        let device = Default::default();
        let attn = config().init::<TestBackend>(&device).unwrap();

        let neighbors = NeighborList {
            src: vec![0, 1],
            dst: vec![0, 0],
        };
        let edges = EdgeSet::from_neighbors(neighbors, 3, &device);
        let src = points_tensor::<TestBackend>(&[Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.5)], &device);
        let dst = points_tensor::<TestBackend>(&[Point3::splat(0.0); 3], &device);
        let geo = edges.geometry(&src, &dst, &SphericalHarmonics::new(2).unwrap());

        let message = Tensor::<TestBackend, 2>::ones([2, 10], &device);
        let scalars = Tensor::<TestBackend, 2>::ones([2, 4], &device);
        let out = attn
            .forward(message, &edges, geo.attr, scalars, &mut ForwardContext::inference())
            .unwrap();
        assert_eq!(out.dims(), [3, 10]);
        let out = to_f32_vec(out).unwrap();
        assert!(out[10..].iter().all(|v| *v == 0.0));
        assert!(out[..10].iter().any(|v| *v != 0.0));
    }

    #[test]
    fn test_empty_edge_set() {
        let device = Default::default();
        let attn = config().init::<TestBackend>(&device).unwrap();
        let edges = EdgeSet::from_neighbors(NeighborList::default(), 4, &device);
        let out = attn
            .forward(
                Tensor::zeros([0, 10], &device),
                &edges,
                Tensor::zeros([0, 9], &device),
                Tensor::zeros([0, 4], &device),
                &mut ForwardContext::inference(),
            )
            .unwrap();
        assert_eq!(to_f32_vec(out).unwrap(), vec![0.0; 40]);
    }

    #[test]
    fn test_rejects_head_without_scalars() {
        let device = Default::default();
        let config = GraphAttentionConfig::new("2x1o".into(), "2x1o".into(), "1x1o".into(), 2, vec![4]);
        assert!(config.init::<TestBackend>(&device).is_err());
    }

    #[test]
    fn test_rejects_dropout_outside_unit_interval() {
        let device = Default::default();
        for bad in [config().with_alpha_drop(1.5), config().with_proj_drop(-0.2), config().with_alpha_drop(f64::NAN)] {
            assert!(matches!(
                bad.init::<TestBackend>(&device),
                Err(NeuralEdfError::InvalidConfig { .. })
            ));
        }
    }

    #[test]
    fn test_smooth_leaky_relu() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 1>::from_data([-100.0f32, 0.0, 100.0], &device);
        let y = to_f32_vec(smooth_leaky_relu(x, 0.2)).unwrap();
        assert!((y[0] + 20.0).abs() < 1e-3);
        assert!(y[1].abs() < 1e-6);
        assert!((y[2] - 100.0).abs() < 1e-3);
    }
}
