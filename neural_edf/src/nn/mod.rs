//! Network modules.
//!
//! This module provides:
//! - Layers: radial basis, graph attention, gated feed-forward
//! - Graph construction: radius graphs, radius connections, FPS pooling
//! - Blocks: Equiformer block, pooling and radius-graph blocks, down blocks
//! - Readout: field extractor, hierarchy encoder and query model

pub mod attention;
pub mod block;
pub mod connectivity;
pub mod down;
pub mod encoder;
pub mod extractor;
pub mod ffn;
pub mod pooling;
pub mod query;
pub mod radial;
pub mod radius_block;
pub mod skip;

pub use attention::GraphAttention;
pub use block::{AttentionKind, EquiformerBlock};
pub use connectivity::{FpsPool, PooledGraph, RadiusConnect, RadiusGraph};
pub use down::DownBlock;
pub use encoder::HierarchyEncoder;
pub use extractor::FieldExtractor;
pub use ffn::FeedForward;
pub use pooling::{PoolMethod, PoolingBlock};
pub use query::{QueryModel, QueryOutput};
pub use radial::GaussianRadialBasis;
pub use radius_block::RadiusGraphBlock;
pub use skip::ProjectIfMismatch;
