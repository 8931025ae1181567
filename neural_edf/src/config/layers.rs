//! Layer-level configuration types.

use burn::config::Config;

/// Spherical harmonics up to degree 2, the edge signature used throughout.
pub const DEFAULT_EDGE_IRREPS: &str = "1x0e+1x1o+1x2e";

/// Configuration for the Gaussian radial basis.
#[derive(Config, Debug)]
pub struct GaussianRadialBasisConfig {
    /// Number of Gaussian channels.
    pub num_basis: usize,

    /// Distance where every channel has decayed to zero.
    pub cutoff: f32,

    /// Inner distance mapped to the start of the normalised domain.
    #[config(default = 0.0)]
    pub offset: f32,

    /// Window both ends (soft square) instead of only the outer end.
    #[config(default = true)]
    pub soft_cutoff: bool,
}

/// Configuration for the radial MLP producing tensor-product weights.
#[derive(Config, Debug)]
pub struct RadialProfileConfig {
    /// Input width followed by hidden widths.
    pub widths: Vec<usize>,

    /// Number of weights produced per edge.
    pub output_dim: usize,
}

/// Configuration for the MLP graph attention.
#[derive(Config, Debug)]
pub struct GraphAttentionConfig {
    /// Signature of the edge messages.
    pub irreps_emb: String,

    /// Signature of the per-node output.
    pub irreps_output: String,

    /// Signature of one attention head.
    pub irreps_head: String,

    /// Number of heads.
    pub num_heads: usize,

    /// Radial basis width followed by radial MLP hidden widths.
    pub fc_neurons: Vec<usize>,

    /// Signature of the edge attributes.
    #[config(default = "DEFAULT_EDGE_IRREPS.to_string()")]
    pub irreps_edge_attr: String,

    /// Dropout on normalised attention weights.
    #[config(default = 0.1)]
    pub alpha_drop: f64,

    /// Equivariant dropout on the output projection.
    #[config(default = 0.1)]
    pub proj_drop: f64,
}

/// Configuration for the gated feed-forward network.
#[derive(Config, Debug)]
pub struct FeedForwardConfig {
    /// Input signature.
    pub irreps_input: String,

    /// Hidden signature (after the gate).
    pub irreps_mid: String,

    /// Output signature.
    pub irreps_output: String,

    /// Equivariant dropout on the output.
    #[config(default = 0.1)]
    pub proj_drop: f64,
}

/// Configuration for one Equiformer block.
#[derive(Config, Debug)]
pub struct EquiformerBlockConfig {
    /// Signature of the source node features.
    pub irreps_src: String,

    /// Signature of the destination node features (and of the output).
    pub irreps_dst: String,

    /// Signature of one attention head.
    pub irreps_head: String,

    /// Number of heads.
    pub num_heads: usize,

    /// Radial basis width followed by radial MLP hidden widths.
    pub fc_neurons: Vec<usize>,

    /// Signature of the edge attributes.
    #[config(default = "DEFAULT_EDGE_IRREPS.to_string()")]
    pub irreps_edge_attr: String,

    /// Explicit hidden FFN signature; derived from `mlp_mid_factor` when unset.
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

    /// Stochastic depth probability per batch group.
    #[config(default = 0.0)]
    pub drop_path_rate: f64,

    /// Bias on the source projection.
    #[config(default = false)]
    pub src_bias: bool,

    /// Bias on the destination projection.
    #[config(default = true)]
    pub dst_bias: bool,
}

impl EquiformerBlockConfig {
    /// Same block settings with different source and destination signatures.
    pub fn for_irreps(&self, irreps_src: &str, irreps_dst: &str) -> Self {
        Self {
            irreps_src: irreps_src.to_string(),
            irreps_dst: irreps_dst.to_string(),
            ..self.clone()
        }
    }

    /// Same block settings with different radial widths.
    pub fn for_radial(&self, fc_neurons: Vec<usize>) -> Self {
        Self {
            fc_neurons,
            ..self.clone()
        }
    }
}
