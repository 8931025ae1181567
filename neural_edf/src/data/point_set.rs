//! Batched point set with irrep-typed features.

use burn::prelude::*;
use edf_core::spatial::BatchSegments;
use edf_core::{Irreps, Point3};

use crate::error::{NeuralEdfError, Result};
use crate::ops::{batch_tensor, index_tensor, points_tensor, to_i64_vec, to_points};

/// Nodes of one or more point clouds, concatenated along the first axis.
///
/// Coordinates and batch ids are kept both as tensors (for the network) and
/// on the host (for graph construction).
#[derive(Debug, Clone)]
pub struct PointSet<B: Backend> {
    /// Node features: [n, irreps.dim()]
    pub features: Tensor<B, 2>,
    /// Node coordinates: [n, 3]
    pub coords: Tensor<B, 2>,
    /// Batch id per node: [n]
    pub batch: Tensor<B, 1, Int>,
    /// Signature of `features`.
    pub irreps: Irreps,
    /// Host copy of `coords`.
    pub points: Vec<Point3>,
    /// Host copy of `batch`.
    pub batch_ids: Vec<i64>,
}

impl<B: Backend> PointSet<B> {
    /// Build a point set from host coordinates and batch ids.
    ///
    /// Fails when the feature width does not match `irreps`, lengths differ,
    /// or batch ids decrease.
    pub fn new(features: Tensor<B, 2>, points: Vec<Point3>, batch_ids: Vec<i64>, irreps: Irreps) -> Result<Self> {
        let [n, width] = features.dims();
        if width != irreps.dim() || n != points.len() {
            return Err(NeuralEdfError::ShapeMismatch {
                expected: vec![points.len(), irreps.dim()],
                got: vec![n, width],
            });
        }
        if batch_ids.len() != n {
            return Err(NeuralEdfError::ShapeMismatch {
                expected: vec![n],
                got: vec![batch_ids.len()],
            });
        }
        BatchSegments::from_batch(&batch_ids)?;

        let device = features.device();
        Ok(Self {
            coords: points_tensor(&points, &device),
            batch: batch_tensor(&batch_ids, &device),
            features,
            irreps,
            points,
            batch_ids,
        })
    }

    /// Build a point set from device tensors, reading coordinates and batch back.
    pub fn from_tensors(
        features: Tensor<B, 2>,
        coords: Tensor<B, 2>,
        batch: Tensor<B, 1, Int>,
        irreps: Irreps,
    ) -> Result<Self> {
        let points = to_points(coords)?;
        let batch_ids = to_i64_vec(batch)?;
        Self::new(features, points, batch_ids, irreps)
    }

    /// Zero-feature point set (used for query points).
    pub fn zeros(points: Vec<Point3>, batch_ids: Vec<i64>, irreps: Irreps, device: &B::Device) -> Result<Self> {
        let features = Tensor::zeros([points.len(), irreps.dim()], device);
        Self::new(features, points, batch_ids, irreps)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the set has no nodes.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Device of the feature tensor.
    pub fn device(&self) -> B::Device {
        self.features.device()
    }

    /// Same nodes, new features.
    pub fn with_features(&self, features: Tensor<B, 2>, irreps: Irreps) -> Result<Self> {
        let [n, width] = features.dims();
        if n != self.len() || width != irreps.dim() {
            return Err(NeuralEdfError::ShapeMismatch {
                expected: vec![self.len(), irreps.dim()],
                got: vec![n, width],
            });
        }
        Ok(Self {
            features,
            coords: self.coords.clone(),
            batch: self.batch.clone(),
            irreps,
            points: self.points.clone(),
            batch_ids: self.batch_ids.clone(),
        })
    }

    /// Subset of nodes in the given order; features are gathered too.
    pub fn select(&self, indices: &[usize]) -> Result<Self> {
        let device = self.device();
        let features = if indices.is_empty() {
            Tensor::zeros([0, self.irreps.dim()], &device)
        } else {
            self.features.clone().select(0, index_tensor(indices, &device))
        };
        let points = indices.iter().map(|&i| self.points[i]).collect();
        let batch_ids = indices.iter().map(|&i| self.batch_ids[i]).collect();
        Self::new(features, points, batch_ids, self.irreps.clone())
    }

    /// Batch groups of the nodes.
    pub fn segments(&self) -> Result<BatchSegments> {
        Ok(BatchSegments::from_batch(&self.batch_ids)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::to_f32_vec;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn points(n: usize) -> Vec<Point3> {
        (0..n).map(|i| Point3::new(i as f32, 0.0, 0.0)).collect()
    }

    #[test]
    fn test_rejects_wrong_feature_width() {
        let device = Default::default();
        let irreps: Irreps = "2x0e+1x1o".parse().unwrap();
        let features = Tensor::<TestBackend, 2>::zeros([3, 4], &device);
        let result = PointSet::new(features, points(3), vec![0, 0, 0], irreps);
        assert!(matches!(result, Err(NeuralEdfError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_rejects_decreasing_batch() {
        let device = Default::default();
        let irreps: Irreps = "1x0e".parse().unwrap();
        let features = Tensor::<TestBackend, 2>::zeros([3, 1], &device);
        let result = PointSet::new(features, points(3), vec![0, 1, 0], irreps);
        assert!(matches!(result, Err(NeuralEdfError::Core(_))));
    }

    #[test]
    fn test_select_gathers_features() {
        let device = Default::default();
        let irreps: Irreps = "1x0e".parse().unwrap();
        let features = Tensor::<TestBackend, 2>::from_data([[1.0f32], [2.0], [3.0]], &device);
        let set = PointSet::new(features, points(3), vec![0, 0, 1], irreps).unwrap();
        let sub = set.select(&[0, 2]).unwrap();
        assert_eq!(to_f32_vec(sub.features.clone()).unwrap(), vec![1.0, 3.0]);
        assert_eq!(sub.batch_ids, vec![0, 1]);
        assert!(set.select(&[2, 0]).is_err());
    }
}
