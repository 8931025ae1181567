//! # neural_edf
//!
//! Equivariant multi-scale graph backbone over batched 3-D point clouds,
//! built with Burn.
//!
//! Node features carry an irrep signature (see [`edf_core::Irreps`]) and are
//! updated by attention layers whose messages couple features with the
//! spherical harmonics of edge displacements. Rotating the input rotates the
//! output; translating it changes nothing.
//!
//! ## Features
//!
//! - **Radial basis**: Gaussian distance embedding with smooth cutoff windows
//! - **Connectivity**: batch-aware radius graphs, radius connections and FPS pooling
//! - **Equiformer block**: normed projections, MLP graph attention, gated FFN
//! - **Hierarchy**: pooling and refinement blocks stacked into down blocks
//! - **Field extraction**: multi-scale readout at arbitrary query points
//!
//! ## Quick Start
//!
//! ```ignore
//! use neural_edf::prelude::*;
//! use burn::backend::NdArray;
//!
//! let device = Default::default();
//! let block = EquiformerBlockConfig::new(
//!     "8x0e+4x1o".into(), "8x0e+4x1o".into(), "4x0e+2x1o".into(), 2, vec![16, 32],
//! );
//! let down = DownBlockConfig::new(block, 0.1, 0.5, 3, 2)
//!     .with_pool_method(Some("fps".into()))
//!     .init::<NdArray>(&device)?;
//!
//! let nodes = PointSet::new(features, points, batch_ids, "8x0e+4x1o".parse()?)?;
//! let levels = down.forward(&nodes, &mut ForwardContext::inference())?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! edf_core (irreps, harmonics, cutoffs, radius search, FPS)
//!     │
//!     ▼
//! neural_edf::o3 (tensor adapters) ──► neural_edf::nn (blocks)
//!                                           │
//!                                           ▼
//!                            DownBlock ──► FieldExtractor
//! ```
//!
//! ## Feature Flags
//!
//! - `wgpu`: GPU backend via WebGPU

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod data;
pub mod error;
pub mod nn;
pub mod o3;
pub mod ops;

// Re-export key types for convenience
pub use config::{
    DownBlockConfig, EquiformerBlockConfig, FieldExtractorConfig, HierarchyEncoderConfig, QueryModelConfig,
};
pub use context::ForwardContext;
pub use data::{EdgeSet, PointSet, ScaleLevel};
pub use error::{NeuralEdfError, Result};
pub use nn::{DownBlock, EquiformerBlock, FieldExtractor, HierarchyEncoder, QueryModel};

pub use edf_core::{Irreps, Point3, Rotation3};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{
        DownBlockConfig, EquiformerBlockConfig, FeedForwardConfig, FieldExtractorConfig, GaussianRadialBasisConfig,
        GraphAttentionConfig, HierarchyEncoderConfig, PoolingBlockConfig, QueryModelConfig, RadialProfileConfig,
        RadiusGraphBlockConfig, DEFAULT_EDGE_IRREPS,
    };
    pub use crate::context::ForwardContext;
    pub use crate::data::{EdgeGeometry, EdgeSet, PointSet, ScaleLevel};
    pub use crate::error::{NeuralEdfError, Result};
    pub use crate::nn::{
        AttentionKind, DownBlock, EquiformerBlock, FeedForward, FieldExtractor, FpsPool, GaussianRadialBasis,
        GraphAttention, HierarchyEncoder, PoolMethod, PoolingBlock, ProjectIfMismatch, QueryModel, QueryOutput,
        RadiusConnect, RadiusGraph, RadiusGraphBlock,
    };
    pub use crate::o3::{EquivariantLayerNorm, IrrepsLinear, SphericalHarmonics};

    pub use edf_core::{Irreps, Point3, Rotation3};
}
