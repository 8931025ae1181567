//! Chain of down blocks with signature adapters between them.

use burn::module::Module;
use burn::module::Ignored;
use burn::prelude::*;
use edf_core::Irreps;

use crate::config::{parse_irreps, HierarchyEncoderConfig};
use crate::context::ForwardContext;
use crate::data::{PointSet, ScaleLevel};
use crate::error::{NeuralEdfError, Result};
use crate::nn::{DownBlock, ProjectIfMismatch};

impl HierarchyEncoderConfig {
    /// Initialize the encoder.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<HierarchyEncoder<B>> {
        HierarchyEncoder::new(self, device)
    }

    /// Total number of scales over all stages.
    pub fn num_scales(&self) -> usize {
        self.stages.iter().map(|s| s.n_scales).sum()
    }
}

/// Multi-scale encoder over a sequence of down blocks.
///
/// Stage `i` receives the last level of stage `i - 1`, projected to its own
/// signature when the signatures differ.
#[derive(Module, Debug)]
pub struct HierarchyEncoder<B: Backend> {
    skips: Vec<ProjectIfMismatch<B>>,
    stages: Vec<DownBlock<B>>,
    #[module(skip)]
    irreps_input: Ignored<Irreps>,
}

impl<B: Backend> HierarchyEncoder<B> {
    /// Create the encoder from configuration.
    pub fn new(config: &HierarchyEncoderConfig, device: &B::Device) -> Result<Self> {
        if config.stages.is_empty() {
            return Err(NeuralEdfError::config("hierarchy encoder needs at least one stage"));
        }
        let irreps_input = parse_irreps(&config.irreps_input)?;

        let mut previous = irreps_input.clone();
        let mut skips = Vec::with_capacity(config.stages.len());
        let mut stages = Vec::with_capacity(config.stages.len());
        for stage in &config.stages {
            let down = stage.init(device)?;
            skips.push(ProjectIfMismatch::new(&previous, down.irreps(), device));
            previous = down.irreps().clone();
            stages.push(down);
        }

        Ok(Self {
            skips,
            stages,
            irreps_input: burn::module::Ignored(irreps_input),
        })
    }

    /// Signature of the raw node features.
    pub fn irreps_input(&self) -> &Irreps {
        &self.irreps_input
    }

    /// Node signature of every scale, finest first.
    pub fn scale_irreps(&self) -> Vec<Irreps> {
        self.stages
            .iter()
            .flat_map(|s| std::iter::repeat(s.irreps().clone()).take(s.num_scales()))
            .collect()
    }

    /// Total number of scales.
    pub fn num_scales(&self) -> usize {
        self.stages.iter().map(DownBlock::num_scales).sum()
    }

    /// Levels of every stage, grouped by stage.
    pub fn forward_stages(&self, nodes: &PointSet<B>, ctx: &mut ForwardContext) -> Result<Vec<Vec<ScaleLevel<B>>>> {
        if nodes.irreps != *self.irreps_input {
            return Err(NeuralEdfError::IrrepsMismatch {
                expected: self.irreps_input.to_string(),
                got: nodes.irreps.to_string(),
            });
        }
        let mut out = Vec::with_capacity(self.stages.len());
        let mut current = nodes.clone();
        for (skip, stage) in self.skips.iter().zip(&self.stages) {
            let input = skip.forward_set(&current)?;
            let levels = stage.forward(&input, ctx)?;
            current = match levels.last() {
                Some(level) => level.nodes.clone(),
                None => input,
            };
            out.push(levels);
        }
        Ok(out)
    }

    /// Every level of every stage, in order.
    pub fn forward(&self, nodes: &PointSet<B>, ctx: &mut ForwardContext) -> Result<Vec<ScaleLevel<B>>> {
        Ok(self.forward_stages(nodes, ctx)?.into_iter().flatten().collect())
    }

    /// Last level of every scale of every stage, finest first.
    pub fn scale_outputs(&self, nodes: &PointSet<B>, ctx: &mut ForwardContext) -> Result<Vec<ScaleLevel<B>>> {
        Ok(self
            .forward_stages(nodes, ctx)?
            .iter()
            .flat_map(|levels| DownBlock::<B>::scale_outputs(levels))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DownBlockConfig, EquiformerBlockConfig};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn stage(irreps: &str, head: &str) -> DownBlockConfig {
        let block = EquiformerBlockConfig::new(irreps.into(), irreps.into(), head.into(), 2, vec![8]);
        DownBlockConfig::new(block, 1.0, 0.5, 1, 1).with_pool_method(Some("fps".into()))
    }

    #[test]
    fn test_requires_a_stage() {
        let device = Default::default();
        let config = HierarchyEncoderConfig::new("1x0e".into(), vec![]);
        assert!(config.init::<TestBackend>(&device).is_err());
    }

    #[test]
    fn test_scale_irreps_follow_stages() {
        let device = Default::default();
        let config = HierarchyEncoderConfig::new(
            "2x0e+2x1o".into(),
            vec![stage("2x0e+2x1o", "1x0e+1x1o"), stage("4x0e+2x1o", "2x0e+1x1o")],
        );
        assert_eq!(config.num_scales(), 2);
        let encoder = config.init::<TestBackend>(&device).unwrap();
        assert!(encoder.skips[0].is_identity());
        assert!(!encoder.skips[1].is_identity());
        let irreps: Vec<String> = encoder.scale_irreps().iter().map(|i| i.to_string()).collect();
        assert_eq!(irreps, vec!["2x0e+2x1o", "4x0e+2x1o"]);
    }
}
