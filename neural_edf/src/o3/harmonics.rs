//! Spherical harmonics of edge vectors, computed in the tensor graph.

use burn::prelude::*;
use edf_core::harmonics::{sh_dim, NORMALIZE_EPS};
use edf_core::{Irreps, MAX_DEGREE};

use crate::error::{NeuralEdfError, Result};

/// Euclidean length of each row of an `[n, 3]` tensor, as `[n, 1]`.
pub fn edge_length<B: Backend>(vectors: Tensor<B, 2>) -> Tensor<B, 2> {
    vectors.powf_scalar(2.0).sum_dim(1).sqrt()
}

/// Stacked `Y_0 .. Y_lmax` with component normalisation.
///
/// Matches `edf_core::harmonics::spherical_harmonics` row by row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SphericalHarmonics {
    lmax: u32,
}

impl SphericalHarmonics {
    /// Harmonics up to degree `lmax`.
    pub fn new(lmax: u32) -> Result<Self> {
        if lmax > MAX_DEGREE {
            return Err(NeuralEdfError::Core(edf_core::EdfCoreError::UnsupportedDegree {
                degree: lmax,
                max: MAX_DEGREE,
            }));
        }
        Ok(Self { lmax })
    }

    /// Harmonics whose stacked signature is exactly `irreps`.
    pub fn for_irreps(irreps: &Irreps) -> Result<Self> {
        let sh = Self::new(irreps.lmax())?;
        if sh.irreps() != *irreps {
            return Err(NeuralEdfError::IrrepsMismatch {
                expected: sh.irreps().to_string(),
                got: irreps.to_string(),
            });
        }
        Ok(sh)
    }

    /// Output signature, `1x0e+1x1o+1x2e` for `lmax = 2`.
    pub fn irreps(&self) -> Irreps {
        // lmax is validated in `new`
        Irreps::spherical_harmonics(self.lmax).unwrap_or_default()
    }

    /// Output width.
    pub fn dim(&self) -> usize {
        sh_dim(self.lmax)
    }

    /// Forward pass.
    ///
    /// Input shape: [n, 3]
    /// Output shape: [n, (lmax + 1)^2]
    pub fn forward<B: Backend>(&self, vectors: Tensor<B, 2>) -> Tensor<B, 2> {
        let [n, _] = vectors.dims();
        let length = edge_length(vectors.clone()).clamp_min(NORMALIZE_EPS);
        let u = vectors / length;

        let x = u.clone().slice([0..n, 0..1]);
        let y = u.clone().slice([0..n, 1..2]);
        let z = u.clone().slice([0..n, 2..3]);

        let mut parts = vec![Tensor::ones([n, 1], &u.device())];
        if self.lmax >= 1 {
            parts.push(u.mul_scalar(3.0f32.sqrt()));
        }
        if self.lmax >= 2 {
            let s15 = 15.0f32.sqrt();
            let s5 = 5.0f32.sqrt();
            let xx = x.clone() * x.clone();
            let yy = y.clone() * y.clone();
            let zz = z.clone() * z.clone();
            parts.push((x.clone() * y.clone()).mul_scalar(s15));
            parts.push((y * z.clone()).mul_scalar(s15));
            parts.push((zz.mul_scalar(2.0) - xx.clone() - yy.clone()).mul_scalar(0.5 * s5));
            parts.push((x * z).mul_scalar(s15));
            parts.push((xx - yy).mul_scalar(0.5 * s15));
        }
        Tensor::cat(parts, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{points_tensor, to_f32_vec};
    use burn::backend::NdArray;
    use edf_core::harmonics::spherical_harmonics;
    use edf_core::Point3;

    type TestBackend = NdArray;

    #[test]
    fn test_matches_host_harmonics() {
        let device = Default::default();
        let points = vec![
            Point3::new(0.3, -0.4, 1.2),
            Point3::new(-2.0, 0.1, 0.0),
            Point3::new(0.0, 0.0, 0.0),
        ];
        let sh = SphericalHarmonics::new(2).unwrap();
        let y = to_f32_vec(sh.forward(points_tensor::<TestBackend>(&points, &device))).unwrap();
        for (row, p) in y.chunks_exact(9).zip(&points) {
            for (a, b) in row.iter().zip(spherical_harmonics(2, *p)) {
                assert!((a - b).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_rejects_high_degree() {
        assert!(SphericalHarmonics::new(3).is_err());
        assert_eq!(SphericalHarmonics::new(1).unwrap().irreps().to_string(), "1x0e+1x1o");
        assert!(SphericalHarmonics::for_irreps(&"1x0e+1x1o+1x2e".parse().unwrap()).is_ok());
        assert!(SphericalHarmonics::for_irreps(&"1x0e+1x1e".parse().unwrap()).is_err());
    }

    #[test]
    fn test_edge_length() {
        let device = Default::default();
        let v = Tensor::<TestBackend, 2>::from_data([[3.0f32, 0.0, 4.0], [0.0, 0.0, 0.0]], &device);
        assert_eq!(to_f32_vec(edge_length(v)).unwrap(), vec![5.0, 0.0]);
    }
}
