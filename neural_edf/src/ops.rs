//! Host transfer helpers and scatter reductions over edge lists.

use burn::prelude::*;
use edf_core::Point3;

use crate::error::{NeuralEdfError, Result};

/// Read a float tensor back as `f32` values (row-major).
pub fn to_f32_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| NeuralEdfError::TensorData(format!("{:?}", e)))
}

/// Read an integer tensor back as `i64` values.
pub fn to_i64_vec<B: Backend>(tensor: Tensor<B, 1, Int>) -> Result<Vec<i64>> {
    tensor
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| NeuralEdfError::TensorData(format!("{:?}", e)))
}

/// Read an `[N, 3]` tensor back as points.
pub fn to_points<B: Backend>(coords: Tensor<B, 2>) -> Result<Vec<Point3>> {
    let [_, width] = coords.dims();
    if width != 3 {
        return Err(NeuralEdfError::ShapeMismatch {
            expected: vec![coords.dims()[0], 3],
            got: coords.dims().to_vec(),
        });
    }
    let flat = to_f32_vec(coords)?;
    Ok(flat
        .chunks_exact(3)
        .map(|c| Point3::new(c[0], c[1], c[2]))
        .collect())
}

/// Index tensor from host indices.
pub fn index_tensor<B: Backend>(indices: &[usize], device: &B::Device) -> Tensor<B, 1, Int> {
    let data: Vec<i64> = indices.iter().map(|&i| i as i64).collect();
    Tensor::from_data(TensorData::new(data, [indices.len()]), device)
}

/// Batch-id tensor from host ids.
pub fn batch_tensor<B: Backend>(batch: &[i64], device: &B::Device) -> Tensor<B, 1, Int> {
    Tensor::from_data(TensorData::new(batch.to_vec(), [batch.len()]), device)
}

/// `[N, 3]` tensor from host points.
pub fn points_tensor<B: Backend>(points: &[Point3], device: &B::Device) -> Tensor<B, 2> {
    let flat: Vec<f32> = points.iter().flat_map(|p| p.as_array()).collect();
    Tensor::from_data(TensorData::new(flat, [points.len(), 3]), device)
}

/// `[rows, cols]` tensor from a host buffer.
pub fn matrix_tensor<B: Backend>(values: Vec<f32>, rows: usize, cols: usize, device: &B::Device) -> Tensor<B, 2> {
    Tensor::from_data(TensorData::new(values, [rows, cols]), device)
}

/// Sum rows of `values` into `dim_size` buckets chosen by `index`.
///
/// Buckets that receive no rows stay exactly zero.
pub fn scatter_sum<B: Backend>(values: Tensor<B, 2>, index: Tensor<B, 1, Int>, dim_size: usize) -> Tensor<B, 2> {
    let [_, cols] = values.dims();
    let device = values.device();
    Tensor::zeros([dim_size, cols], &device).select_assign(0, index, values)
}

/// Column-wise maximum of `values` (row-major `[rows, cols]`) per segment.
///
/// Segments with no rows get 0.
pub fn segment_max(values: &[f32], cols: usize, index: &[usize], dim_size: usize) -> Vec<f32> {
    let mut out = vec![f32::NEG_INFINITY; dim_size * cols];
    for (row, &seg) in values.chunks_exact(cols).zip(index) {
        for (o, v) in out[seg * cols..(seg + 1) * cols].iter_mut().zip(row) {
            if *v > *o {
                *o = *v;
            }
        }
    }
    for v in out.iter_mut() {
        if *v == f32::NEG_INFINITY {
            *v = 0.0;
        }
    }
    out
}

/// Softmax of `logits` `[E, H]` over the rows sharing the same `index`, per column.
///
/// The per-segment maximum is subtracted before exponentiating. It is
/// computed on the host and enters the graph as a constant, which leaves the
/// softmax (and its gradient) unchanged.
pub fn scatter_softmax<B: Backend>(
    logits: Tensor<B, 2>,
    index: &[usize],
    index_tensor: Tensor<B, 1, Int>,
    dim_size: usize,
) -> Result<Tensor<B, 2>> {
    let [rows, cols] = logits.dims();
    let device = logits.device();

    let host = to_f32_vec(logits.clone())?;
    let seg_max = segment_max(&host, cols, index, dim_size);
    let mut shift = Vec::with_capacity(rows * cols);
    for &seg in index {
        shift.extend_from_slice(&seg_max[seg * cols..(seg + 1) * cols]);
    }
    let shift = matrix_tensor::<B>(shift, rows, cols, &device);

    let exp = (logits - shift).exp();
    let denom = scatter_sum(exp.clone(), index_tensor.clone(), dim_size);
    let denom = denom.select(0, index_tensor);
    Ok(exp / denom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_scatter_sum_leaves_empty_buckets_zero() {
        let device = Default::default();
        let values = Tensor::<TestBackend, 2>::from_data([[1.0f32, 2.0], [3.0, 4.0], [5.0, 6.0]], &device);
        let index = index_tensor::<TestBackend>(&[0, 2, 0], &device);
        let out = to_f32_vec(scatter_sum(values, index, 4)).unwrap();
        assert_eq!(out, vec![6.0, 8.0, 0.0, 0.0, 3.0, 4.0, 0.0, 0.0]);
    }

    #[test]
    fn test_scatter_softmax_sums_to_one_per_segment() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_data([[1.0f32], [2.0], [100.0], [-3.0]], &device);
        let index = [0usize, 0, 1, 1];
        let t = index_tensor::<TestBackend>(&index, &device);
        let out = to_f32_vec(scatter_softmax(logits, &index, t, 3).unwrap()).unwrap();
        assert!((out[0] + out[1] - 1.0).abs() < 1e-6);
        assert!((out[2] + out[3] - 1.0).abs() < 1e-6);
        assert!(out[1] > out[0]);
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_segment_max() {
        let values = [1.0, -1.0, 3.0, -5.0, 2.0, 7.0];
        let out = segment_max(&values, 2, &[1, 1, 1], 3);
        assert_eq!(out, vec![0.0, 0.0, 3.0, 7.0, 0.0, 0.0]);
    }

    #[test]
    fn test_points_roundtrip() {
        let device = Default::default();
        let points = vec![Point3::new(1.0, 2.0, 3.0), Point3::new(-1.0, 0.5, 0.0)];
        let t = points_tensor::<TestBackend>(&points, &device);
        assert_eq!(to_points(t).unwrap(), points);
    }
}
