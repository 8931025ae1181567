//! Multi-scale hierarchy: pooling and refinement stages per scale.

use burn::module::Module;
use burn::module::Ignored;
use burn::prelude::*;
use edf_core::Irreps;

use crate::config::{parse_irreps, DownBlockConfig, PoolingBlockConfig, RadiusGraphBlockConfig};
use crate::context::ForwardContext;
use crate::data::{PointSet, ScaleLevel};
use crate::error::{NeuralEdfError, Result};
use crate::nn::{PoolMethod, PoolingBlock, RadiusGraphBlock};

impl DownBlockConfig {
    /// Initialize the down block.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<DownBlock<B>> {
        DownBlock::new(self, device)
    }
}

/// Stack of scales, each a pooling block followed by a radius-graph block.
///
/// Scale `s` runs at `radii()[s]`. When `pool_ratio == 1` no pooling happens
/// and every layer of a scale is a self-connection.
#[derive(Module, Debug)]
pub struct DownBlock<B: Backend> {
    /// One pooling block per scale, or none at all.
    pools: Vec<PoolingBlock<B>>,
    /// Refinement per scale, absent when pooling uses the scale's only layer.
    refines: Vec<Option<RadiusGraphBlock<B>>>,
    #[module(skip)]
    radii: Vec<f32>,
    #[module(skip)]
    irreps: Ignored<Irreps>,
}

impl<B: Backend> DownBlock<B> {
    /// Create the down block from configuration.
    pub fn new(config: &DownBlockConfig, device: &B::Device) -> Result<Self> {
        let ratio = config.pool_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(NeuralEdfError::config(format!("pool_ratio must lie in (0, 1], got {ratio}")));
        }
        let method = match (&config.pool_method, ratio < 1.0) {
            (Some(m), true) => Some(m.parse::<PoolMethod>()?),
            (None, false) => None,
            (Some(m), false) => {
                return Err(NeuralEdfError::config(format!(
                    "pool_ratio 1 leaves nothing to pool, but pool_method is {m:?}"
                )))
            }
            (None, true) => {
                return Err(NeuralEdfError::config(format!(
                    "pool_ratio {ratio} needs a pool_method"
                )))
            }
        };
        if config.n_layers_per_scale < 1 {
            return Err(NeuralEdfError::config("down block needs at least one layer per scale"));
        }
        if config.n_scales < 1 {
            return Err(NeuralEdfError::config("down block needs at least one scale"));
        }

        let irreps = parse_irreps(&config.block.irreps_src)?;
        let radii = config.radii();
        let n_self = config.n_layers_per_scale - usize::from(method.is_some());

        let mut pools = Vec::new();
        let mut refines = Vec::with_capacity(radii.len());
        for &radius in &radii {
            if let Some(method) = method {
                let pool = PoolingBlockConfig::new(config.block.clone(), radius, ratio)
                    .with_pool_method(method_name(method).to_string())
                    .with_deterministic(config.deterministic)
                    .with_max_neighbors(config.max_neighbors)
                    .init(device)?;
                pools.push(pool);
            }
            let refine = if n_self >= 1 {
                let block = RadiusGraphBlockConfig::new(config.block.clone(), radius, n_self)
                    .with_max_neighbors(config.max_neighbors)
                    .init(device)?;
                Some(block)
            } else {
                None
            };
            refines.push(refine);
        }

        Ok(Self {
            pools,
            refines,
            radii,
            irreps: burn::module::Ignored(irreps),
        })
    }

    /// Node signature of every scale.
    pub fn irreps(&self) -> &Irreps {
        &self.irreps
    }

    /// Connection radius of every scale.
    pub fn radii(&self) -> &[f32] {
        &self.radii
    }

    /// Number of scales.
    pub fn num_scales(&self) -> usize {
        self.radii.len()
    }

    /// Run every stage, returning one snapshot per stage in order.
    pub fn forward(&self, nodes: &PointSet<B>, ctx: &mut ForwardContext) -> Result<Vec<ScaleLevel<B>>> {
        if nodes.is_empty() {
            log::warn!("down block called on an empty point set");
        }
        let mut levels: Vec<ScaleLevel<B>> = Vec::with_capacity(2 * self.num_scales());
        let mut current = nodes.clone();

        for (scale, refine) in self.refines.iter().enumerate() {
            if let Some(pool) = self.pools.get(scale) {
                let mut level = pool.forward(&current, ctx)?;
                level.scale = scale;
                log::debug!(
                    "scale {scale}: pooled {} -> {} nodes, {} edges",
                    current.len(),
                    level.len(),
                    level.edges.len()
                );
                current = level.nodes.clone();
                levels.push(level);
            }
            if let Some(refine) = refine {
                let mut level = refine.forward(&current, ctx)?;
                level.scale = scale;
                log::debug!("scale {scale}: refined {} nodes, {} edges", level.len(), level.edges.len());
                current = level.nodes.clone();
                levels.push(level);
            }
        }
        Ok(levels)
    }

    /// Last snapshot of every scale, in scale order.
    pub fn scale_outputs(levels: &[ScaleLevel<B>]) -> Vec<ScaleLevel<B>> {
        let mut out: Vec<ScaleLevel<B>> = Vec::new();
        for level in levels {
            match out.last_mut() {
                Some(last) if last.scale == level.scale => *last = level.clone(),
                _ => out.push(level.clone()),
            }
        }
        out
    }
}

fn method_name(method: PoolMethod) -> &'static str {
    match method {
        PoolMethod::Fps => "fps",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EquiformerBlockConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn block() -> EquiformerBlockConfig {
        EquiformerBlockConfig::new("4x0e+2x1o".into(), "4x0e+2x1o".into(), "2x0e+1x1o".into(), 2, vec![8, 16])
    }

    #[test]
    fn test_pool_method_must_match_ratio() {
        let device = Default::default();
        let with_method = DownBlockConfig::new(block(), 1.0, 1.0, 2, 2).with_pool_method(Some("fps".into()));
        assert!(with_method.init::<TestBackend>(&device).is_err());

        let without_method = DownBlockConfig::new(block(), 1.0, 0.5, 2, 2);
        assert!(without_method.init::<TestBackend>(&device).is_err());

        let unknown = DownBlockConfig::new(block(), 1.0, 0.5, 2, 2).with_pool_method(Some("grid".into()));
        assert!(matches!(
            unknown.init::<TestBackend>(&device),
            Err(NeuralEdfError::UnknownPoolMethod(_))
        ));
    }

    #[test]
    fn test_rejects_zero_layers_and_scales() {
        let device = Default::default();
        let no_layers = DownBlockConfig::new(block(), 1.0, 0.5, 2, 0).with_pool_method(Some("fps".into()));
        assert!(no_layers.init::<TestBackend>(&device).is_err());
        let no_scales = DownBlockConfig::new(block(), 1.0, 0.5, 0, 1).with_pool_method(Some("fps".into()));
        assert!(no_scales.init::<TestBackend>(&device).is_err());
        let bad_ratio = DownBlockConfig::new(block(), 1.0, 0.0, 2, 1).with_pool_method(Some("fps".into()));
        assert!(bad_ratio.init::<TestBackend>(&device).is_err());
    }

    #[test]
    fn test_stage_layout() {
        let device = Default::default();
        let pooled = DownBlockConfig::new(block(), 1.0, 0.5, 3, 1)
            .with_pool_method(Some("fps".into()))
            .init::<TestBackend>(&device)
            .unwrap();
        assert_eq!(pooled.pools.len(), 3);
        assert!(pooled.refines.iter().all(Option::is_none));

        let flat = DownBlockConfig::new(block(), 1.0, 1.0, 2, 2).init::<TestBackend>(&device).unwrap();
        assert!(flat.pools.is_empty());
        assert_eq!(flat.refines.len(), 2);
        assert_eq!(flat.refines[0].as_ref().map(|r| r.num_layers()), Some(2));
        assert_eq!(flat.radii(), &[1.0, 1.0]);
    }
}
