//! Configuration types for field extraction.

use burn::config::Config;
use edf_core::spatial::DEFAULT_MAX_NEIGHBORS;

use super::{HierarchyEncoderConfig, DEFAULT_EDGE_IRREPS};

/// Configuration for the multi-scale field extractor.
///
/// `irreps_inputs`, `fc_neurons_inputs`, `cutoffs` and `offsets` hold one
/// entry per input scale.
#[derive(Config, Debug)]
pub struct FieldExtractorConfig {
    /// Signature of each scale's node features.
    pub irreps_inputs: Vec<String>,

    /// Radial widths of each scale's block.
    pub fc_neurons_inputs: Vec<Vec<usize>>,

    /// Connection radius of each scale.
    pub cutoffs: Vec<f32>,

    /// Inner radius of each scale.
    pub offsets: Vec<f32>,

    /// Accumulator signature.
    pub irreps_emb: String,

    /// Signature of one attention head.
    pub irreps_head: String,

    /// Number of heads.
    pub num_heads: usize,

    /// Output signature; the accumulator signature when unset.
    pub irreps_output: Option<String>,

    /// Signature of the edge attributes.
    #[config(default = "DEFAULT_EDGE_IRREPS.to_string()")]
    pub irreps_edge_attr: String,

    /// Explicit hidden FFN signature.
    pub irreps_mlp_mid: Option<String>,

    /// Multiplicity factor of the hidden FFN signature.
    #[config(default = 3)]
    pub mlp_mid_factor: usize,

    /// Attention kind.
    #[config(default = "String::from(\"mlp\")")]
    pub attn_type: String,

    /// Dropout on attention weights.
    #[config(default = 0.1)]
    pub alpha_drop: f64,

    /// Equivariant dropout after attention and FFN.
    #[config(default = 0.1)]
    pub proj_drop: f64,

    /// Stochastic depth probability.
    #[config(default = 0.0)]
    pub drop_path_rate: f64,

    /// Neighbour cap per query.
    #[config(default = "DEFAULT_MAX_NEIGHBORS")]
    pub max_neighbors: usize,
}

/// Configuration for the query model.
#[derive(Config, Debug)]
pub struct QueryModelConfig {
    /// Multi-scale encoder.
    pub encoder: HierarchyEncoderConfig,

    /// Field cutoff per encoder scale.
    pub cutoff_radius: Vec<f32>,

    /// Width of the scalar feature feeding the weight head.
    pub weight_feature_dim: usize,

    /// FPS ratio selecting query points from the coarsest scale.
    pub query_downsample_ratio: f32,

    /// Inner radius of the finest scale.
    #[config(default = 0.0)]
    pub min_offset: f32,

    /// Start query FPS from the first node of each group.
    #[config(default = false)]
    pub deterministic: bool,
}

impl QueryModelConfig {
    /// Inner radius of every scale.
    ///
    /// Each scale after the first starts a fifth of the cutoff gap below the
    /// previous cutoff, so neighbouring scales overlap.
    pub fn offsets(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.cutoff_radius.len());
        if self.cutoff_radius.is_empty() {
            return out;
        }
        out.push(self.min_offset);
        for pair in self.cutoff_radius.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            out.push(self.min_offset.max(prev - 0.2 * (next - prev)));
        }
        out
    }
}
