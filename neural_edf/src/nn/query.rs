//! Query model: multi-scale encoding, query selection and weighted readout.

use burn::module::Module;
use burn::prelude::*;
use edf_core::spatial::{farthest_point_sampling, BatchSegments, SamplingStart};
use edf_core::{Irreps, Point3};

use crate::config::{FieldExtractorConfig, QueryModelConfig};
use crate::context::ForwardContext;
use crate::data::{PointSet, ScaleLevel};
use crate::error::{NeuralEdfError, Result};
use crate::nn::{FieldExtractor, HierarchyEncoder};
use crate::o3::{EquivariantLayerNorm, IrrepsLinear};
use crate::ops::{index_tensor, points_tensor, scatter_softmax};

impl QueryModelConfig {
    /// Initialize the query model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<QueryModel<B>> {
        QueryModel::new(self, device)
    }

    /// Extractor reading every encoder scale into `irreps_output`.
    ///
    /// Attention settings come from the last encoder stage; per-scale
    /// signatures and radial widths come from the stage owning the scale.
    pub fn extractor(&self, irreps_output: Option<String>) -> Result<FieldExtractorConfig> {
        let last = self
            .encoder
            .stages
            .last()
            .ok_or_else(|| NeuralEdfError::config("query model needs at least one encoder stage"))?;
        let (mut irreps_inputs, mut fc_neurons_inputs) = (Vec::new(), Vec::new());
        for stage in &self.encoder.stages {
            for _ in 0..stage.n_scales {
                irreps_inputs.push(stage.block.irreps_src.clone());
                fc_neurons_inputs.push(stage.block.fc_neurons.clone());
            }
        }
        let block = &last.block;

        Ok(FieldExtractorConfig::new(
            irreps_inputs,
            fc_neurons_inputs,
            self.cutoff_radius.clone(),
            self.offsets(),
            block.irreps_src.clone(),
            block.irreps_head.clone(),
            block.num_heads,
        )
        .with_irreps_output(irreps_output)
        .with_irreps_edge_attr(block.irreps_edge_attr.clone())
        .with_irreps_mlp_mid(block.irreps_mlp_mid.clone())
        .with_mlp_mid_factor(block.mlp_mid_factor)
        .with_attn_type(block.attn_type.clone())
        .with_alpha_drop(block.alpha_drop)
        .with_proj_drop(block.proj_drop)
        .with_drop_path_rate(block.drop_path_rate)
        .with_max_neighbors(last.max_neighbors))
    }
}

/// Query points with their weights and features.
#[derive(Debug, Clone)]
pub struct QueryOutput<B: Backend> {
    /// Query positions (host).
    pub points: Vec<Point3>,
    /// Batch id per query (host).
    pub batch_ids: Vec<i64>,
    /// Query positions: [q, 3]
    pub coords: Tensor<B, 2>,
    /// Softmax weight per query, summing to one inside each batch group: [q]
    pub weights: Tensor<B, 1>,
    /// Query features: [q, irreps_emb.dim()]
    pub features: Tensor<B, 2>,
    /// Last level of every encoder scale, finest first.
    pub scales: Vec<ScaleLevel<B>>,
}

impl<B: Backend> QueryOutput<B> {
    /// Number of queries.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether no query was selected.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Encoder plus two field extractors evaluated at FPS-selected queries.
#[derive(Module, Debug)]
pub struct QueryModel<B: Backend> {
    encoder: HierarchyEncoder<B>,
    weight_field: FieldExtractor<B>,
    weight_norm: EquivariantLayerNorm<B>,
    weight_linear: IrrepsLinear<B>,
    feature_field: FieldExtractor<B>,
    #[module(skip)]
    query_ratio: f32,
    #[module(skip)]
    deterministic: bool,
}

impl<B: Backend> QueryModel<B> {
    /// Create the model from configuration.
    pub fn new(config: &QueryModelConfig, device: &B::Device) -> Result<Self> {
        let encoder = config.encoder.init(device)?;
        if config.cutoff_radius.len() != encoder.num_scales() {
            return Err(NeuralEdfError::config(format!(
                "{} cutoff radii for {} encoder scales",
                config.cutoff_radius.len(),
                encoder.num_scales()
            )));
        }
        let ratio = config.query_downsample_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(NeuralEdfError::config(format!(
                "query_downsample_ratio must lie in (0, 1], got {ratio}"
            )));
        }
        if config.weight_feature_dim == 0 {
            return Err(NeuralEdfError::config("weight_feature_dim must be positive"));
        }

        let irreps_weight = Irreps::scalars(config.weight_feature_dim);
        let weight_field = config.extractor(Some(irreps_weight.to_string()))?.init(device)?;
        let feature_field = config.extractor(None)?.init(device)?;

        Ok(Self {
            encoder,
            weight_field,
            weight_norm: EquivariantLayerNorm::new(&irreps_weight, device),
            weight_linear: IrrepsLinear::new(&irreps_weight, &Irreps::scalars(1), true, device),
            feature_field,
            query_ratio: ratio,
            deterministic: config.deterministic,
        })
    }

    /// The multi-scale encoder.
    pub fn encoder(&self) -> &HierarchyEncoder<B> {
        &self.encoder
    }

    /// Query features signature.
    pub fn irreps_out(&self) -> &Irreps {
        self.feature_field.irreps_out()
    }

    /// Encode `nodes`, pick queries on the coarsest scale and read them out.
    pub fn forward(&self, nodes: &PointSet<B>, ctx: &mut ForwardContext) -> Result<QueryOutput<B>> {
        let scales = self.encoder.scale_outputs(nodes, ctx)?;
        let coarsest = scales
            .last()
            .ok_or_else(|| NeuralEdfError::config("encoder produced no scale"))?;

        let start = if self.deterministic {
            SamplingStart::First
        } else {
            SamplingStart::Random(ctx.rng())
        };
        let top = &coarsest.nodes;
        let indices = farthest_point_sampling(&top.points, &top.batch_ids, self.query_ratio, start)?;
        let points: Vec<Point3> = indices.iter().map(|&i| top.points[i]).collect();
        let batch_ids: Vec<i64> = indices.iter().map(|&i| top.batch_ids[i]).collect();
        log::debug!("query model: {} queries from {} coarse nodes", points.len(), top.len());

        let node_sets: Vec<PointSet<B>> = scales.iter().map(|level| level.nodes.clone()).collect();
        let logits = self.weight_field.forward(&points, &batch_ids, &node_sets, ctx)?;
        let logits = self.weight_linear.forward(self.weight_norm.forward(logits));
        let weights = self.batch_softmax(logits, &batch_ids)?;

        let features = self.feature_field.forward(&points, &batch_ids, &node_sets, ctx)?;
        let device = features.device();

        Ok(QueryOutput {
            coords: points_tensor(&points, &device),
            points,
            batch_ids,
            weights,
            features,
            scales,
        })
    }

    /// Softmax of `[q, 1]` logits over the queries of each batch group.
    fn batch_softmax(&self, logits: Tensor<B, 2>, batch_ids: &[i64]) -> Result<Tensor<B, 1>> {
        let [q, _] = logits.dims();
        let segments = BatchSegments::from_batch(batch_ids)?;
        let mut group = vec![0usize; q];
        for (g, (_, range)) in segments.groups().iter().enumerate() {
            group[range.clone()].fill(g);
        }
        let index = index_tensor(&group, &logits.device());
        Ok(scatter_softmax(logits, &group, index, segments.len())?.reshape([q]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DownBlockConfig, EquiformerBlockConfig, HierarchyEncoderConfig};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn config(cutoffs: Vec<f32>) -> QueryModelConfig {
        let block = EquiformerBlockConfig::new("4x0e+2x1o".into(), "4x0e+2x1o".into(), "2x0e+1x1o".into(), 2, vec![8]);
        let stage = DownBlockConfig::new(block, 0.6, 0.5, 2, 1)
            .with_pool_method(Some("fps".into()))
            .with_deterministic(true);
        let encoder = HierarchyEncoderConfig::new("4x0e+2x1o".into(), vec![stage]);
        QueryModelConfig::new(encoder, cutoffs, 4, 0.5).with_deterministic(true)
    }

    #[test]
    fn test_cutoff_count_must_match_scales() {
        let device = Default::default();
        assert!(config(vec![1.0]).init::<TestBackend>(&device).is_err());
        assert!(config(vec![1.0, 2.0]).init::<TestBackend>(&device).is_ok());
    }

    #[test]
    fn test_extractor_settings_follow_last_stage() {
        let extractor = config(vec![1.0, 2.0]).extractor(Some("3x0e".into())).unwrap();
        assert_eq!(extractor.irreps_inputs, vec!["4x0e+2x1o".to_string(); 2]);
        assert_eq!(extractor.irreps_emb, "4x0e+2x1o");
        assert_eq!(extractor.offsets.len(), 2);
        assert_eq!(extractor.irreps_output.as_deref(), Some("3x0e"));
    }

    #[test]
    fn test_weights_sum_to_one_per_batch() {
        let device = Default::default();
        let model = config(vec![1.0, 2.0]).init::<TestBackend>(&device).unwrap();

        let mut points = Vec::new();
        for i in 0..16 {
            let t = i as f32 * 0.4;
            points.push(Point3::new(t.cos(), t.sin(), 0.1 * t));
        }
        let batch_ids: Vec<i64> = [vec![0; 8], vec![1; 8]].concat();
        let irreps: Irreps = "4x0e+2x1o".parse().unwrap();
        let features = Tensor::<TestBackend, 2>::ones([16, 10], &device);
        let nodes = PointSet::new(features, points, batch_ids, irreps).unwrap();

        let out = model.forward(&nodes, &mut ForwardContext::inference()).unwrap();
        // 8 -> 4 -> 2 per batch, then half of the coarsest level
        assert_eq!(out.batch_ids, vec![0, 1]);
        assert_eq!(out.features.dims(), [2, 10]);
        assert_eq!(out.scales.len(), 2);

        let weights = crate::ops::to_f32_vec(out.weights).unwrap();
        assert!(weights.iter().all(|w| (w - 1.0).abs() < 1e-5));
    }
}
