//! Equiformer block: attention and feed-forward residual updates.

use std::fmt;
use std::str::FromStr;

use burn::module::Module;
use burn::module::Ignored;
use burn::prelude::*;
use edf_core::Irreps;

use crate::config::{parse_irreps, EquiformerBlockConfig, FeedForwardConfig, GraphAttentionConfig};
use crate::context::ForwardContext;
use crate::data::EdgeSet;
use crate::error::{NeuralEdfError, Result};
use crate::nn::{FeedForward, GraphAttention};
use crate::o3::{EquivariantLayerNorm, GraphDropPath, IrrepsLinear};

/// Supported attention kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttentionKind {
    /// Logits from a gated tensor-product MLP.
    Mlp,
}

impl FromStr for AttentionKind {
    type Err = NeuralEdfError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mlp" => Ok(Self::Mlp),
            other => Err(NeuralEdfError::UnknownAttentionType(other.to_string())),
        }
    }
}

impl fmt::Display for AttentionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mlp => write!(f, "mlp"),
        }
    }
}

impl EquiformerBlockConfig {
    /// Initialize the block.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<EquiformerBlock<B>> {
        EquiformerBlock::new(self, device)
    }

    /// Hidden FFN signature: explicit, or the destination signature with
    /// every multiplicity scaled by `mlp_mid_factor`, sorted and merged.
    pub fn mlp_mid_irreps(&self) -> Result<Irreps> {
        match &self.irreps_mlp_mid {
            Some(s) => parse_irreps(s),
            None => Ok(parse_irreps(&self.irreps_dst)?
                .scale_mul(self.mlp_mid_factor)
                .sort()
                .simplify()),
        }
    }
}

/// Pre-norm transformer layer over a bipartite graph.
///
/// 1. norm and project source and destination features to the embedding
/// 2. message per edge is `src[edge_src] + dst[edge_dst]`
/// 3. graph attention, stochastic depth, residual add
/// 4. norm, feed-forward, stochastic depth, residual add
///
/// The embedding signature equals the destination signature.
#[derive(Module, Debug)]
pub struct EquiformerBlock<B: Backend> {
    norm_src: EquivariantLayerNorm<B>,
    norm_dst: EquivariantLayerNorm<B>,
    linear_src: IrrepsLinear<B>,
    linear_dst: IrrepsLinear<B>,
    attention: GraphAttention<B>,
    norm_ffn: EquivariantLayerNorm<B>,
    ffn: FeedForward<B>,
    #[module(skip)]
    drop_path: Ignored<Option<GraphDropPath>>,
    #[module(skip)]
    kind: Ignored<AttentionKind>,
    #[module(skip)]
    irreps_src: Ignored<Irreps>,
    #[module(skip)]
    irreps_dst: Ignored<Irreps>,
}

impl<B: Backend> EquiformerBlock<B> {
    /// Create the block from configuration.
    pub fn new(config: &EquiformerBlockConfig, device: &B::Device) -> Result<Self> {
        let kind: AttentionKind = config.attn_type.parse()?;
        let irreps_src = parse_irreps(&config.irreps_src)?;
        let irreps_dst = parse_irreps(&config.irreps_dst)?;
        let irreps_head = parse_irreps(&config.irreps_head)?;
        let irreps_emb = irreps_dst.clone();

        if config.num_heads * irreps_head.dim() != irreps_emb.dim() {
            return Err(NeuralEdfError::config(format!(
                "{} heads of {} do not span the embedding {}",
                config.num_heads, irreps_head, irreps_emb
            )));
        }
        let irreps_mid = config.mlp_mid_irreps()?;
        let drop_path = match GraphDropPath::new(config.drop_path_rate)? {
            path if path.prob() > 0.0 => Some(path),
            _ => None,
        };

        let attention = GraphAttentionConfig::new(
            irreps_emb.to_string(),
            irreps_dst.to_string(),
            config.irreps_head.clone(),
            config.num_heads,
            config.fc_neurons.clone(),
        )
        .with_irreps_edge_attr(config.irreps_edge_attr.clone())
        .with_alpha_drop(config.alpha_drop)
        .with_proj_drop(config.proj_drop)
        .init(device)?;

        let ffn = FeedForwardConfig::new(irreps_dst.to_string(), irreps_mid.to_string(), irreps_dst.to_string())
            .with_proj_drop(config.proj_drop)
            .init(device)?;

        Ok(Self {
            norm_src: EquivariantLayerNorm::new(&irreps_src, device),
            norm_dst: EquivariantLayerNorm::new(&irreps_dst, device),
            linear_src: IrrepsLinear::new(&irreps_src, &irreps_emb, config.src_bias, device),
            linear_dst: IrrepsLinear::new(&irreps_dst, &irreps_emb, config.dst_bias, device),
            attention,
            norm_ffn: EquivariantLayerNorm::new(&irreps_dst, device),
            ffn,
            drop_path: burn::module::Ignored(drop_path),
            kind: burn::module::Ignored(kind),
            irreps_src: burn::module::Ignored(irreps_src),
            irreps_dst: burn::module::Ignored(irreps_dst),
        })
    }

    /// Attention kind.
    pub fn kind(&self) -> AttentionKind {
        *self.kind
    }

    /// Source signature.
    pub fn irreps_src(&self) -> &Irreps {
        &self.irreps_src
    }

    /// Destination (and output) signature.
    pub fn irreps_dst(&self) -> &Irreps {
        &self.irreps_dst
    }

    /// Update destination features from source features along `edges`.
    ///
    /// - `src`: [n_src, irreps_src.dim()]
    /// - `dst`: [n_dst, irreps_dst.dim()]
    /// - `dst_batch`: host batch id per destination
    ///
    /// Output shape: [n_dst, irreps_dst.dim()]
    #[allow(clippy::too_many_arguments)]
    pub fn forward(
        &self,
        src: Tensor<B, 2>,
        dst: Tensor<B, 2>,
        dst_batch: &[i64],
        edges: &EdgeSet<B>,
        edge_attr: Tensor<B, 2>,
        edge_scalars: Tensor<B, 2>,
        ctx: &mut ForwardContext,
    ) -> Result<Tensor<B, 2>> {
        let [n_src, w_src] = src.dims();
        let [n_dst, w_dst] = dst.dims();
        if w_src != self.irreps_src.dim() {
            return Err(NeuralEdfError::ShapeMismatch {
                expected: vec![n_src, self.irreps_src.dim()],
                got: vec![n_src, w_src],
            });
        }
        if w_dst != self.irreps_dst.dim() || n_dst != edges.num_dst {
            return Err(NeuralEdfError::ShapeMismatch {
                expected: vec![edges.num_dst, self.irreps_dst.dim()],
                got: vec![n_dst, w_dst],
            });
        }
        if dst_batch.len() != n_dst {
            return Err(NeuralEdfError::ShapeMismatch {
                expected: vec![n_dst],
                got: vec![dst_batch.len()],
            });
        }

        let message_src = self.linear_src.forward(self.norm_src.forward(src));
        let message_dst = self.linear_dst.forward(self.norm_dst.forward(dst.clone()));
        let message = if edges.is_empty() {
            Tensor::zeros([0, self.irreps_dst.dim()], &dst.device())
        } else {
            message_src.select(0, edges.src_index.clone()) + message_dst.select(0, edges.dst_index.clone())
        };

        let mut features = match *self.kind {
            AttentionKind::Mlp => self.attention.forward(message, edges, edge_attr, edge_scalars, ctx)?,
        };
        if let Some(drop_path) = &*self.drop_path {
            features = drop_path.forward(features, dst_batch, ctx)?;
        }
        let output = dst + features;

        let mut features = self.ffn.forward(self.norm_ffn.forward(output.clone()), ctx)?;
        if let Some(drop_path) = &*self.drop_path {
            features = drop_path.forward(features, dst_batch, ctx)?;
        }
        Ok(output + features)
    }

    #[cfg(test)]
    pub(crate) fn fill_output_bias(mut self, value: f32) -> Self {
        self.ffn = self.ffn.fill_output_bias(value);
        self
    }
}
