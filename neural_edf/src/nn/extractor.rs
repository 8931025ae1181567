//! Multi-scale field extraction at arbitrary query points.

use burn::module::Module;
use burn::module::Ignored;
use burn::prelude::*;
use edf_core::{Irreps, Point3};

use crate::config::{parse_irreps, EquiformerBlockConfig, FieldExtractorConfig, GaussianRadialBasisConfig};
use crate::context::ForwardContext;
use crate::data::PointSet;
use crate::error::{NeuralEdfError, Result};
use crate::nn::{EquiformerBlock, GaussianRadialBasis, RadiusConnect};
use crate::o3::{IrrepsLinear, SphericalHarmonics};
use crate::ops::matrix_tensor;

impl FieldExtractorConfig {
    /// Initialize the extractor.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<FieldExtractor<B>> {
        FieldExtractor::new(self, device)
    }

    /// Number of input scales.
    pub fn num_scales(&self) -> usize {
        self.irreps_inputs.len()
    }
}

/// Sums per-scale attention readouts at query points, then projects.
///
/// Every scale connects its nodes to the queries inside the ring
/// `offset <= |d| <= cutoff` and runs one Equiformer block with the queries
/// as zero-initialised destinations. A query with no node in the ring gets
/// nothing from that scale.
#[derive(Module, Debug)]
pub struct FieldExtractor<B: Backend> {
    blocks: Vec<EquiformerBlock<B>>,
    radials: Vec<GaussianRadialBasis<B>>,
    proj: IrrepsLinear<B>,
    #[module(skip)]
    connects: Ignored<Vec<RadiusConnect>>,
    #[module(skip)]
    sh: Ignored<SphericalHarmonics>,
    #[module(skip)]
    irreps_inputs: Ignored<Vec<Irreps>>,
    #[module(skip)]
    irreps_emb: Ignored<Irreps>,
    #[module(skip)]
    irreps_out: Ignored<Irreps>,
}

impl<B: Backend> FieldExtractor<B> {
    /// Create the extractor from configuration.
    pub fn new(config: &FieldExtractorConfig, device: &B::Device) -> Result<Self> {
        let n = config.num_scales();
        if n == 0 {
            return Err(NeuralEdfError::config("field extractor needs at least one scale"));
        }
        if config.fc_neurons_inputs.len() != n || config.cutoffs.len() != n || config.offsets.len() != n {
            return Err(NeuralEdfError::config(format!(
                "per-scale lists differ in length: {} irreps, {} fc_neurons, {} cutoffs, {} offsets",
                n,
                config.fc_neurons_inputs.len(),
                config.cutoffs.len(),
                config.offsets.len()
            )));
        }

        let irreps_emb = parse_irreps(&config.irreps_emb)?;
        let irreps_out = match &config.irreps_output {
            Some(s) => parse_irreps(s)?,
            None => irreps_emb.clone(),
        };
        let irreps_inputs = config
            .irreps_inputs
            .iter()
            .map(|s| parse_irreps(s))
            .collect::<Result<Vec<_>>>()?;

        let mut blocks = Vec::with_capacity(n);
        let mut radials = Vec::with_capacity(n);
        let mut connects = Vec::with_capacity(n);
        for scale in 0..n {
            let (cutoff, offset) = (config.cutoffs[scale], config.offsets[scale]);
            if !(offset >= 0.0 && offset < cutoff) {
                return Err(NeuralEdfError::config(format!(
                    "scale {scale}: offset {offset} must lie in [0, cutoff {cutoff})"
                )));
            }
            let fc = &config.fc_neurons_inputs[scale];
            let num_basis = fc
                .first()
                .copied()
                .ok_or_else(|| NeuralEdfError::config(format!("scale {scale}: fc_neurons must not be empty")))?;

            let block = EquiformerBlockConfig::new(
                config.irreps_inputs[scale].clone(),
                config.irreps_emb.clone(),
                config.irreps_head.clone(),
                config.num_heads,
                fc.clone(),
            )
            .with_irreps_edge_attr(config.irreps_edge_attr.clone())
            .with_irreps_mlp_mid(config.irreps_mlp_mid.clone())
            .with_mlp_mid_factor(config.mlp_mid_factor)
            .with_attn_type(config.attn_type.clone())
            .with_alpha_drop(config.alpha_drop)
            .with_proj_drop(config.proj_drop)
            .with_drop_path_rate(config.drop_path_rate);

            blocks.push(block.init(device)?);
            radials.push(
                GaussianRadialBasisConfig::new(num_basis, cutoff)
                    .with_offset(offset)
                    .with_soft_cutoff(true)
                    .init(device)?,
            );
            connects.push(RadiusConnect::new(cutoff, Some(offset), config.max_neighbors)?);
        }

        Ok(Self {
            blocks,
            radials,
            proj: IrrepsLinear::new(&irreps_emb, &irreps_out, true, device),
            connects: burn::module::Ignored(connects),
            sh: burn::module::Ignored(SphericalHarmonics::for_irreps(&parse_irreps(&config.irreps_edge_attr)?)?),
            irreps_inputs: burn::module::Ignored(irreps_inputs),
            irreps_emb: burn::module::Ignored(irreps_emb),
            irreps_out: burn::module::Ignored(irreps_out),
        })
    }

    /// Number of input scales.
    pub fn num_scales(&self) -> usize {
        self.blocks.len()
    }

    /// Output signature.
    pub fn irreps_out(&self) -> &Irreps {
        &self.irreps_out
    }

    /// Features at `query_points`.
    ///
    /// `scales` holds one point set per configured scale, finest first.
    ///
    /// Output shape: [query_points.len(), irreps_out.dim()]
    pub fn forward(
        &self,
        query_points: &[Point3],
        query_batch: &[i64],
        scales: &[PointSet<B>],
        ctx: &mut ForwardContext,
    ) -> Result<Tensor<B, 2>> {
        if scales.len() != self.num_scales() {
            return Err(NeuralEdfError::ScaleCountMismatch {
                expected: self.num_scales(),
                got: scales.len(),
            });
        }
        let device = scales[0].device();
        let queries = PointSet::zeros(query_points.to_vec(), query_batch.to_vec(), self.irreps_emb.0.clone(), &device)?;

        let mut field = queries.features.clone();
        for (n, nodes) in scales.iter().enumerate() {
            let width = self.irreps_inputs[n].dim();
            if nodes.features.dims()[1] != width {
                return Err(NeuralEdfError::ShapeMismatch {
                    expected: vec![nodes.len(), width],
                    got: nodes.features.dims().to_vec(),
                });
            }

            let edges = self.connects[n].forward(nodes, &queries.points, &queries.batch_ids)?;
            if edges.is_empty() && !queries.is_empty() {
                log::warn!(
                    "scale {n}: no node within r = {} of any of {} queries",
                    self.connects[n].radius(),
                    queries.len()
                );
            }
            let geometry = edges.geometry(&nodes.coords, &queries.coords, &self.sh);
            let scalars = self.radials[n].forward(geometry.length);

            let connected: Vec<f32> = edges.degree().iter().map(|&d| if d > 0 { 1.0 } else { 0.0 }).collect();
            let connected = matrix_tensor::<B>(connected, queries.len(), 1, &device);

            let readout = self.blocks[n].forward(
                nodes.features.clone(),
                queries.features.clone(),
                &queries.batch_ids,
                &edges,
                geometry.attr,
                scalars,
                ctx,
            )?;
            field = field + readout * connected;
        }
        Ok(self.proj.forward(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::to_f32_vec;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn config() -> FieldExtractorConfig {
        FieldExtractorConfig::new(
            vec!["4x0e+2x1o".into(), "2x0e+1x1o".into()],
            vec![vec![8, 16], vec![8]],
            vec![1.0, 2.0],
            vec![0.0, 0.8],
            "4x0e+2x1o".into(),
            "2x0e+1x1o".into(),
            2,
        )
    }

    fn cloud(irreps: &str, step: f32, device: &<TestBackend as Backend>::Device) -> PointSet<TestBackend> {
        let irreps: Irreps = irreps.parse().unwrap();
        let points: Vec<Point3> = (0..6).map(|i| Point3::new(i as f32 * step, 0.0, 0.0)).collect();
        let features = Tensor::ones([6, irreps.dim()], device);
        PointSet::new(features, points, vec![0; 6], irreps).unwrap()
    }

    #[test]
    fn test_list_lengths_must_agree() {
        let device = Default::default();
        let mut bad = config();
        bad.cutoffs.pop();
        assert!(bad.init::<TestBackend>(&device).is_err());

        let mut bad_offset = config();
        bad_offset.offsets[1] = 2.0;
        assert!(bad_offset.init::<TestBackend>(&device).is_err());
    }

    #[test]
    fn test_output_shape_and_scale_count() {
        let device = Default::default();
        let extractor = config()
            .with_irreps_output(Some("3x0e".into()))
            .init::<TestBackend>(&device)
            .unwrap();
        assert_eq!(extractor.irreps_out().to_string(), "3x0e");

        let scales = vec![cloud("4x0e+2x1o", 0.5, &device), cloud("2x0e+1x1o", 1.0, &device)];
        let queries = [Point3::new(0.2, 0.1, 0.0), Point3::new(1.1, -0.3, 0.2)];
        let mut ctx = ForwardContext::inference();
        let out = extractor.forward(&queries, &[0, 0], &scales, &mut ctx).unwrap();
        assert_eq!(out.dims(), [2, 3]);

        let result = extractor.forward(&queries, &[0, 0], &scales[..1], &mut ctx);
        assert!(matches!(
            result,
            Err(NeuralEdfError::ScaleCountMismatch { expected: 2, got: 1 })
        ));

        let swapped = vec![scales[1].clone(), scales[0].clone()];
        let result = extractor.forward(&queries, &[0, 0], &swapped, &mut ctx);
        assert!(matches!(result, Err(NeuralEdfError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_scale_without_nodes_in_range_adds_nothing() {
        let device = Default::default();
        let mut extractor = config().init::<TestBackend>(&device).unwrap();
        extractor.blocks = extractor.blocks.into_iter().map(|b| b.fill_output_bias(0.7)).collect();
        extractor.proj = extractor.proj.fill_bias(-0.3);

        let scales = vec![cloud("4x0e+2x1o", 0.5, &device), cloud("2x0e+1x1o", 1.0, &device)];
        // the first query sits on the cloud, the second is beyond every cutoff
        let queries = [Point3::new(1.2, 0.1, 0.0), Point3::new(40.0, 0.0, 0.0)];
        let out = extractor
            .forward(&queries, &[0, 0], &scales, &mut ForwardContext::inference())
            .unwrap();
        let out = to_f32_vec(out).unwrap();

        let empty = to_f32_vec(extractor.proj.forward(Tensor::zeros([1, 10], &device))).unwrap();
        for (a, b) in out[10..].iter().zip(&empty) {
            assert!((a - b).abs() < 1e-6);
        }
        assert!(out[..10].iter().zip(&empty).any(|(a, b)| (a - b).abs() > 1e-4));
    }
}
