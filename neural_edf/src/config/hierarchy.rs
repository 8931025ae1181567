//! Configuration types for the multi-scale blocks.

use burn::config::Config;
use edf_core::spatial::DEFAULT_MAX_NEIGHBORS;

use super::EquiformerBlockConfig;

/// Configuration for a pooling block (FPS pool + one Equiformer block).
#[derive(Config, Debug)]
pub struct PoolingBlockConfig {
    /// Block settings; source and destination signatures must be equal.
    pub block: EquiformerBlockConfig,

    /// Radius connecting the original nodes to the pooled nodes.
    pub pool_radius: f32,

    /// Fraction of nodes kept per batch group, in `(0, 1]`.
    pub pool_ratio: f32,

    /// Pooling method.
    #[config(default = "String::from(\"fps\")")]
    pub pool_method: String,

    /// Start every FPS group from its first node.
    #[config(default = false)]
    pub deterministic: bool,

    /// Neighbour cap per pooled node.
    #[config(default = "DEFAULT_MAX_NEIGHBORS")]
    pub max_neighbors: usize,
}

/// Configuration for a radius-graph block (self-connection + stacked blocks).
#[derive(Config, Debug)]
pub struct RadiusGraphBlockConfig {
    /// Block settings shared by every layer.
    pub block: EquiformerBlockConfig,

    /// Connection radius.
    pub radius: f32,

    /// Number of stacked Equiformer blocks.
    pub n_layers: usize,

    /// Neighbour cap per node.
    #[config(default = "DEFAULT_MAX_NEIGHBORS")]
    pub max_neighbors: usize,
}

/// Configuration for a down block.
///
/// Scale `s` uses radius `init_radius / sqrt(pool_ratio)^s`.
#[derive(Config, Debug)]
pub struct DownBlockConfig {
    /// Block settings; `irreps_src == irreps_dst` is the signature of every scale.
    pub block: EquiformerBlockConfig,

    /// Radius of the first scale.
    pub init_radius: f32,

    /// Pooling ratio per scale, in `(0, 1]`.
    pub pool_ratio: f32,

    /// Number of scales.
    pub n_scales: usize,

    /// Equiformer blocks per scale (including the pooling block).
    pub n_layers_per_scale: usize,

    /// Pooling method; must be unset exactly when `pool_ratio == 1`.
    pub pool_method: Option<String>,

    /// Start every FPS group from its first node.
    #[config(default = false)]
    pub deterministic: bool,

    /// Neighbour cap for every connection.
    #[config(default = "DEFAULT_MAX_NEIGHBORS")]
    pub max_neighbors: usize,
}

impl DownBlockConfig {
    /// Connection radius of every scale.
    pub fn radii(&self) -> Vec<f32> {
        let step = self.pool_ratio.sqrt();
        let mut radius = self.init_radius * step;
        (0..self.n_scales)
            .map(|_| {
                radius /= step;
                radius
            })
            .collect()
    }
}

/// Configuration for a chain of down blocks.
#[derive(Config, Debug)]
pub struct HierarchyEncoderConfig {
    /// Signature of the raw input node features.
    pub irreps_input: String,

    /// Down blocks, applied in order.
    pub stages: Vec<DownBlockConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> EquiformerBlockConfig {
        EquiformerBlockConfig::new("4x0e+2x1o".into(), "4x0e+2x1o".into(), "2x0e+1x1o".into(), 2, vec![8, 16])
    }

    #[test]
    fn test_radii_grow_by_inverse_sqrt_ratio() {
        let config = DownBlockConfig::new(block(), 0.5, 0.25, 3, 2).with_pool_method(Some("fps".into()));
        let radii = config.radii();
        assert!((radii[0] - 0.5).abs() < 1e-6);
        assert!((radii[1] - 1.0).abs() < 1e-6);
        assert!((radii[2] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_pooling_defaults() {
        let config = PoolingBlockConfig::new(block(), 1.0, 0.5);
        assert_eq!(config.pool_method, "fps");
        assert_eq!(config.max_neighbors, DEFAULT_MAX_NEIGHBORS);
        assert!(!config.deterministic);
    }
}
