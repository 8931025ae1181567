//! Configuration types for neural_edf.
//!
//! Burn-style configuration structs for the layers, the multi-scale blocks
//! and the field extractors. Irreps are carried as strings and parsed when a
//! module is initialised.

mod extractor;
mod hierarchy;
mod layers;

pub use extractor::{FieldExtractorConfig, QueryModelConfig};
pub use hierarchy::{DownBlockConfig, HierarchyEncoderConfig, PoolingBlockConfig, RadiusGraphBlockConfig};
pub use layers::{
    EquiformerBlockConfig, FeedForwardConfig, GaussianRadialBasisConfig, GraphAttentionConfig, RadialProfileConfig,
    DEFAULT_EDGE_IRREPS,
};

use edf_core::Irreps;

use crate::error::Result;

/// Parse an irreps string from a config field.
pub(crate) fn parse_irreps(s: &str) -> Result<Irreps> {
    Ok(s.parse::<Irreps>()?)
}
