//! Signature adapter between stages with different irreps.

use burn::module::Module;
use burn::module::Ignored;
use burn::prelude::*;
use edf_core::Irreps;

use crate::data::PointSet;
use crate::error::Result;
use crate::o3::{EquivariantLayerNorm, IrrepsLinear};

/// Identity when the signatures agree, otherwise linear + layer norm.
#[derive(Module, Debug)]
pub struct ProjectIfMismatch<B: Backend> {
    linear: Option<IrrepsLinear<B>>,
    norm: Option<EquivariantLayerNorm<B>>,
    #[module(skip)]
    irreps_out: Ignored<Irreps>,
}

impl<B: Backend> ProjectIfMismatch<B> {
    /// Map features of `irreps_in` to `irreps_out`.
    pub fn new(irreps_in: &Irreps, irreps_out: &Irreps, device: &B::Device) -> Self {
        let (linear, norm) = if irreps_in == irreps_out {
            (None, None)
        } else {
            (
                Some(IrrepsLinear::new(irreps_in, irreps_out, true, device)),
                Some(EquivariantLayerNorm::new(irreps_out, device)),
            )
        };
        Self {
            linear,
            norm,
            irreps_out: burn::module::Ignored(irreps_out.clone()),
        }
    }

    /// Whether the map is the identity.
    pub fn is_identity(&self) -> bool {
        self.linear.is_none()
    }

    /// Output signature.
    pub fn irreps_out(&self) -> &Irreps {
        &self.irreps_out
    }

    /// Forward pass.
    ///
    /// Input shape: [n, irreps_in.dim()]
    /// Output shape: [n, irreps_out.dim()]
    pub fn forward(&self, mut x: Tensor<B, 2>) -> Tensor<B, 2> {
        if let Some(linear) = &self.linear {
            x = linear.forward(x);
        }
        if let Some(norm) = &self.norm {
            x = norm.forward(x);
        }
        x
    }

    /// Project the features of a point set.
    pub fn forward_set(&self, nodes: &PointSet<B>) -> Result<PointSet<B>> {
        if self.is_identity() {
            return Ok(nodes.clone());
        }
        nodes.with_features(self.forward(nodes.features.clone()), self.irreps_out.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::to_f32_vec;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_identity_when_equal() {
        let device = Default::default();
        let irreps: Irreps = "2x0e+1x1o".parse().unwrap();
        let skip = ProjectIfMismatch::<TestBackend>::new(&irreps, &irreps, &device);
        assert!(skip.is_identity());
        let x = Tensor::<TestBackend, 2>::from_data([[1.0f32, 2.0, 3.0, 4.0, 5.0]], &device);
        assert_eq!(to_f32_vec(skip.forward(x)).unwrap(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_projects_when_different() {
        let device = Default::default();
        let irreps_in: Irreps = "2x0e+1x1o".parse().unwrap();
        let irreps_out: Irreps = "4x0e+2x1o".parse().unwrap();
        let skip = ProjectIfMismatch::<TestBackend>::new(&irreps_in, &irreps_out, &device);
        assert!(!skip.is_identity());
        let y = skip.forward(Tensor::ones([3, 5], &device));
        assert_eq!(y.dims(), [3, 10]);
    }
}
