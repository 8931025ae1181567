//! Down-sampling layer: FPS pool followed by one Equiformer block.

use std::str::FromStr;

use burn::module::Module;
use burn::module::Ignored;
use burn::prelude::*;
use edf_core::Irreps;

use crate::config::{parse_irreps, EquiformerBlockConfig, GaussianRadialBasisConfig, PoolingBlockConfig};
use crate::context::ForwardContext;
use crate::data::{PointSet, ScaleLevel};
use crate::error::{NeuralEdfError, Result};
use crate::nn::{EquiformerBlock, FpsPool, GaussianRadialBasis};
use crate::o3::SphericalHarmonics;

/// Radial cutoffs sit just inside the connection radius.
pub(crate) const RADIAL_CUTOFF_SCALE: f32 = 0.99;

/// Supported pooling methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolMethod {
    /// Farthest-point sampling.
    Fps,
}

impl FromStr for PoolMethod {
    type Err = NeuralEdfError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fps" => Ok(Self::Fps),
            other => Err(NeuralEdfError::UnknownPoolMethod(other.to_string())),
        }
    }
}

/// Radial basis with `fc_neurons[0]` channels and the given cutoff.
pub(crate) fn block_radial<B: Backend>(
    block: &EquiformerBlockConfig,
    cutoff: f32,
    device: &B::Device,
) -> Result<GaussianRadialBasis<B>> {
    let num_basis = block
        .fc_neurons
        .first()
        .copied()
        .ok_or_else(|| NeuralEdfError::config("fc_neurons must not be empty"))?;
    GaussianRadialBasisConfig::new(num_basis, cutoff).init(device)
}

impl PoolingBlockConfig {
    /// Initialize the pooling block.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<PoolingBlock<B>> {
        PoolingBlock::new(self, device)
    }
}

/// Pools a point set and updates the pooled nodes from their neighbourhoods.
#[derive(Module, Debug)]
pub struct PoolingBlock<B: Backend> {
    block: EquiformerBlock<B>,
    radial: GaussianRadialBasis<B>,
    #[module(skip)]
    pool: Ignored<FpsPool>,
    #[module(skip)]
    sh: Ignored<SphericalHarmonics>,
    #[module(skip)]
    irreps: Ignored<Irreps>,
    #[module(skip)]
    pool_radius: f32,
}

impl<B: Backend> PoolingBlock<B> {
    /// Create the block from configuration.
    pub fn new(config: &PoolingBlockConfig, device: &B::Device) -> Result<Self> {
        let irreps = parse_irreps(&config.block.irreps_src)?;
        let irreps_dst = parse_irreps(&config.block.irreps_dst)?;
        if irreps != irreps_dst {
            return Err(NeuralEdfError::IrrepsMismatch {
                expected: irreps.to_string(),
                got: irreps_dst.to_string(),
            });
        }
        let pool = match config.pool_method.parse::<PoolMethod>()? {
            PoolMethod::Fps => FpsPool::new(config.pool_ratio, config.pool_radius, config.max_neighbors, config.deterministic)?,
        };

        Ok(Self {
            block: config.block.init(device)?,
            radial: block_radial(&config.block, RADIAL_CUTOFF_SCALE * config.pool_radius, device)?,
            pool: burn::module::Ignored(pool),
            sh: burn::module::Ignored(SphericalHarmonics::for_irreps(&parse_irreps(&config.block.irreps_edge_attr)?)?),
            irreps: burn::module::Ignored(irreps),
            pool_radius: config.pool_radius,
        })
    }

    /// Node signature.
    pub fn irreps(&self) -> &Irreps {
        &self.irreps
    }

    /// Pool `nodes` and return the pooled level.
    pub fn forward(&self, nodes: &PointSet<B>, ctx: &mut ForwardContext) -> Result<ScaleLevel<B>> {
        if nodes.irreps != *self.irreps {
            return Err(NeuralEdfError::IrrepsMismatch {
                expected: self.irreps.to_string(),
                got: nodes.irreps.to_string(),
            });
        }
        let pooled = self.pool.forward(nodes, ctx)?;
        let geometry = pooled.edges.geometry(&nodes.coords, &pooled.nodes.coords, &self.sh);
        let scalars = self.radial.forward(geometry.length.clone());

        let features = self.block.forward(
            nodes.features.clone(),
            pooled.nodes.features.clone(),
            &pooled.nodes.batch_ids,
            &pooled.edges,
            geometry.attr.clone(),
            scalars,
            ctx,
        )?;
        let out = pooled.nodes.with_features(features, self.irreps.0.clone())?;
        Ok(ScaleLevel::new(out, pooled.edges, geometry, self.pool_radius, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn block(src: &str, dst: &str) -> EquiformerBlockConfig {
        EquiformerBlockConfig::new(src.into(), dst.into(), "2x0e+1x1o".into(), 2, vec![8, 16])
    }

    #[test]
    fn test_rejects_mismatched_irreps() {
        let device = Default::default();
        let config = PoolingBlockConfig::new(block("4x0e+2x1o", "2x0e+1x1o+1x1o+2x0e"), 1.0, 0.5);
        assert!(matches!(
            config.init::<TestBackend>(&device),
            Err(NeuralEdfError::IrrepsMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_method() {
        let device = Default::default();
        let config = PoolingBlockConfig::new(block("4x0e+2x1o", "4x0e+2x1o"), 1.0, 0.5).with_pool_method("voxel".into());
        assert!(matches!(
            config.init::<TestBackend>(&device),
            Err(NeuralEdfError::UnknownPoolMethod(_))
        ));
    }
}
