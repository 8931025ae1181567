//! Gated nonlinearity.

use burn::prelude::*;
use burn::tensor::activation::{sigmoid, silu};
use edf_core::{Irreps, Parity};

use super::block_view;

/// Gate activation.
///
/// Input layout is `scalars + gates + gated`:
/// - even scalars pass through SiLU, odd scalars through tanh
/// - each gate scalar goes through a sigmoid and scales one gated irrep copy
///
/// Output layout is `scalars + gated`.
#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
    irreps_scalars: Irreps,
    irreps_gates: Irreps,
    irreps_gated: Irreps,
}

impl Gate {
    /// Gate producing `irreps_out`: its scalar blocks are activated, the
    /// remaining blocks are gated by one sigmoid scalar per copy.
    pub fn for_output(irreps_out: &Irreps) -> Self {
        let irreps_scalars = irreps_out.filter_scalars();
        let irreps_gated = irreps_out.filter_non_scalars();
        let num_gates = irreps_gated.num_irreps();
        let irreps_gates = if num_gates > 0 {
            Irreps::scalars(num_gates)
        } else {
            Irreps::empty()
        };
        Self {
            irreps_scalars,
            irreps_gates,
            irreps_gated,
        }
    }

    /// Signature expected on input.
    pub fn irreps_in(&self) -> Irreps {
        self.irreps_scalars
            .concat(&self.irreps_gates)
            .concat(&self.irreps_gated)
    }

    /// Signature produced.
    pub fn irreps_out(&self) -> Irreps {
        self.irreps_scalars.concat(&self.irreps_gated)
    }

    /// Forward pass.
    ///
    /// Input shape: [n, irreps_in.dim()]
    /// Output shape: [n, irreps_out.dim()]
    pub fn forward<B: Backend>(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let [n, _] = x.dims();
        let device = x.device();
        let ds = self.irreps_scalars.dim();
        let dg = self.irreps_gates.dim();
        let dgated = self.irreps_gated.dim();

        let mut parts = Vec::new();

        // scalars
        let mut offset = 0;
        for block in self.irreps_scalars.iter() {
            let width = block.dim();
            if width == 0 {
                continue;
            }
            let s = x.clone().slice([0..n, offset..offset + width]);
            parts.push(match block.ir.p {
                Parity::Even => silu(s),
                Parity::Odd => s.tanh(),
            });
            offset += width;
        }

        if dgated > 0 {
            let gates = sigmoid(x.clone().slice([0..n, ds..ds + dg]));
            let gated = x.slice([0..n, ds + dg..ds + dg + dgated]);
            let mut ig = 0;
            for (block, range) in self.irreps_gated.iter().zip(self.irreps_gated.slices()) {
                if block.mul == 0 {
                    continue;
                }
                let d = block.ir.dim();
                let field = block_view(&gated, range, block.mul, d);
                let g = gates.clone().slice([0..n, ig..ig + block.mul]).reshape([n, block.mul, 1]);
                parts.push((field * g).reshape([n, block.mul * d]));
                ig += block.mul;
            }
        }

        if parts.is_empty() {
            Tensor::zeros([n, 0], &device)
        } else {
            Tensor::cat(parts, 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::to_f32_vec;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_layout() {
        let gate = Gate::for_output(&"2x0e+1x0o+2x1o+1x2e".parse().unwrap());
        assert_eq!(gate.irreps_in().to_string(), "2x0e+1x0o+3x0e+2x1o+1x2e");
        assert_eq!(gate.irreps_out().to_string(), "2x0e+1x0o+2x1o+1x2e");
    }

    #[test]
    fn test_zero_gate_input_halves_vectors() {
        let device = Default::default();
        let gate = Gate::for_output(&"1x0e+1x1o".parse().unwrap());
        // [scalar, gate, vx, vy, vz]
        let x = Tensor::<TestBackend, 2>::from_data([[0.0f32, 0.0, 2.0, -4.0, 6.0]], &device);
        let y = to_f32_vec(gate.forward(x)).unwrap();
        assert_eq!(y.len(), 4);
        assert!(y[0].abs() < 1e-6);
        assert!((y[1] - 1.0).abs() < 1e-6);
        assert!((y[2] + 2.0).abs() < 1e-6);
        assert!((y[3] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_scalars_only() {
        let device = Default::default();
        let gate = Gate::for_output(&"3x0e".parse().unwrap());
        assert_eq!(gate.irreps_in(), gate.irreps_out());
        let y = gate.forward(Tensor::<TestBackend, 2>::ones([2, 3], &device));
        assert_eq!(y.dims(), [2, 3]);
    }
}
