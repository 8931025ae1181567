//! Same-scale refinement: radius graph shared by stacked Equiformer blocks.

use burn::module::Module;
use burn::module::Ignored;
use burn::prelude::*;
use edf_core::Irreps;

use crate::config::{parse_irreps, RadiusGraphBlockConfig};
use crate::context::ForwardContext;
use crate::data::{PointSet, ScaleLevel};
use crate::error::{NeuralEdfError, Result};
use crate::nn::pooling::{block_radial, RADIAL_CUTOFF_SCALE};
use crate::nn::{EquiformerBlock, GaussianRadialBasis, RadiusGraph};
use crate::o3::SphericalHarmonics;

impl RadiusGraphBlockConfig {
    /// Initialize the block stack.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<RadiusGraphBlock<B>> {
        RadiusGraphBlock::new(self, device)
    }
}

/// `n_layers` Equiformer blocks over one radius graph.
///
/// The graph and edge harmonics are built once; every layer has its own
/// radial basis over the shared edge lengths.
#[derive(Module, Debug)]
pub struct RadiusGraphBlock<B: Backend> {
    blocks: Vec<EquiformerBlock<B>>,
    radials: Vec<GaussianRadialBasis<B>>,
    #[module(skip)]
    graph: Ignored<RadiusGraph>,
    #[module(skip)]
    sh: Ignored<SphericalHarmonics>,
    #[module(skip)]
    irreps: Ignored<Irreps>,
}

impl<B: Backend> RadiusGraphBlock<B> {
    /// Create the stack from configuration.
    pub fn new(config: &RadiusGraphBlockConfig, device: &B::Device) -> Result<Self> {
        if config.n_layers < 1 {
            return Err(NeuralEdfError::config("radius graph block needs at least one layer"));
        }
        let irreps = parse_irreps(&config.block.irreps_src)?;
        let irreps_dst = parse_irreps(&config.block.irreps_dst)?;
        if irreps != irreps_dst {
            return Err(NeuralEdfError::IrrepsMismatch {
                expected: irreps.to_string(),
                got: irreps_dst.to_string(),
            });
        }

        let mut blocks = Vec::with_capacity(config.n_layers);
        let mut radials = Vec::with_capacity(config.n_layers);
        for _ in 0..config.n_layers {
            blocks.push(config.block.init(device)?);
            radials.push(block_radial(&config.block, RADIAL_CUTOFF_SCALE * config.radius, device)?);
        }

        Ok(Self {
            blocks,
            radials,
            graph: burn::module::Ignored(RadiusGraph::new(config.radius, config.max_neighbors)?),
            sh: burn::module::Ignored(SphericalHarmonics::for_irreps(&parse_irreps(&config.block.irreps_edge_attr)?)?),
            irreps: burn::module::Ignored(irreps),
        })
    }

    /// Number of stacked blocks.
    pub fn num_layers(&self) -> usize {
        self.blocks.len()
    }

    /// Refine `nodes` in place of their features.
    pub fn forward(&self, nodes: &PointSet<B>, ctx: &mut ForwardContext) -> Result<ScaleLevel<B>> {
        if nodes.irreps != *self.irreps {
            return Err(NeuralEdfError::IrrepsMismatch {
                expected: self.irreps.to_string(),
                got: nodes.irreps.to_string(),
            });
        }
        let edges = self.graph.forward(nodes)?;
        if edges.is_empty() && nodes.len() > 1 {
            log::warn!(
                "radius graph with r = {} connects none of {} nodes",
                self.graph.radius(),
                nodes.len()
            );
        }
        let geometry = edges.geometry(&nodes.coords, &nodes.coords, &self.sh);

        let mut features = nodes.features.clone();
        for (block, radial) in self.blocks.iter().zip(&self.radials) {
            let scalars = radial.forward(geometry.length.clone());
            features = block.forward(
                features.clone(),
                features,
                &nodes.batch_ids,
                &edges,
                geometry.attr.clone(),
                scalars,
                ctx,
            )?;
        }

        let out = nodes.with_features(features, self.irreps.0.clone())?;
        Ok(ScaleLevel::new(out, edges, geometry, self.graph.radius(), 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EquiformerBlockConfig;
    use burn::backend::NdArray;
    use edf_core::Point3;

    type TestBackend = NdArray;

    fn block() -> EquiformerBlockConfig {
        EquiformerBlockConfig::new("4x0e+2x1o".into(), "4x0e+2x1o".into(), "2x0e+1x1o".into(), 2, vec![8, 16])
    }

    #[test]
    fn test_requires_a_layer() {
        let device = Default::default();
        assert!(RadiusGraphBlockConfig::new(block(), 1.0, 0).init::<TestBackend>(&device).is_err());
    }

    #[test]
    fn test_keeps_nodes_and_reports_degree() {
        let device = Default::default();
        let stack = RadiusGraphBlockConfig::new(block(), 1.5, 2).init::<TestBackend>(&device).unwrap();
        assert_eq!(stack.num_layers(), 2);

        let points: Vec<Point3> = (0..5).map(|i| Point3::new(i as f32, 0.0, 0.0)).collect();
        let irreps: Irreps = "4x0e+2x1o".parse().unwrap();
        let features = Tensor::<TestBackend, 2>::ones([5, 10], &device);
        let nodes = PointSet::new(features, points, vec![0; 5], irreps).unwrap();

        let level = stack.forward(&nodes, &mut ForwardContext::inference()).unwrap();
        assert_eq!(level.len(), 5);
        assert_eq!(level.degree, vec![1, 2, 2, 2, 1]);
        assert_eq!(level.nodes.features.dims(), [5, 10]);
    }
}
