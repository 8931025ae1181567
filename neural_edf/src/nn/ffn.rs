//! Gated two-layer feed-forward network on irrep features.

use burn::module::Module;
use burn::module::Ignored;
use burn::prelude::*;
use edf_core::Irreps;

use crate::config::{parse_irreps, FeedForwardConfig};
use crate::context::ForwardContext;
use crate::error::Result;
use crate::o3::{EquivariantDropout, Gate, IrrepsLinear};

impl FeedForwardConfig {
    /// Initialize the feed-forward network.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<FeedForward<B>> {
        FeedForward::new(self, device)
    }
}

/// `linear -> gate -> linear -> equivariant dropout`.
///
/// Both linear maps carry a bias on even scalars.
#[derive(Module, Debug)]
pub struct FeedForward<B: Backend> {
    linear_1: IrrepsLinear<B>,
    linear_2: IrrepsLinear<B>,
    #[module(skip)]
    gate: Ignored<Gate>,
    #[module(skip)]
    proj_drop: Ignored<EquivariantDropout>,
}

impl<B: Backend> FeedForward<B> {
    /// Create the network from configuration.
    pub fn new(config: &FeedForwardConfig, device: &B::Device) -> Result<Self> {
        let irreps_in = parse_irreps(&config.irreps_input)?;
        let irreps_mid = parse_irreps(&config.irreps_mid)?;
        let irreps_out = parse_irreps(&config.irreps_output)?;

        let gate = Gate::for_output(&irreps_mid);
        Ok(Self {
            linear_1: IrrepsLinear::new(&irreps_in, &gate.irreps_in(), true, device),
            linear_2: IrrepsLinear::new(&irreps_mid, &irreps_out, true, device),
            gate: burn::module::Ignored(gate),
            proj_drop: burn::module::Ignored(EquivariantDropout::new(&irreps_out, config.proj_drop)?),
        })
    }

    /// Output signature.
    pub fn irreps_out(&self) -> &Irreps {
        self.linear_2.irreps_out()
    }

    /// Forward pass.
    ///
    /// Input shape: [n, irreps_input.dim()]
    /// Output shape: [n, irreps_output.dim()]
    pub fn forward(&self, x: Tensor<B, 2>, ctx: &mut ForwardContext) -> Result<Tensor<B, 2>> {
        let x = self.gate.forward(self.linear_1.forward(x));
        self.proj_drop.forward(self.linear_2.forward(x), ctx)
    }

    #[cfg(test)]
    pub(crate) fn fill_output_bias(mut self, value: f32) -> Self {
        self.linear_2 = self.linear_2.fill_bias(value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_shapes() {
        let device = Default::default();
        let config = FeedForwardConfig::new("4x0e+2x1o".into(), "12x0e+6x1o".into(), "4x0e+2x1o".into());
        let ffn = config.init::<TestBackend>(&device).unwrap();
        let y = ffn
            .forward(Tensor::ones([5, 10], &device), &mut ForwardContext::inference())
            .unwrap();
        assert_eq!(y.dims(), [5, 10]);
        assert_eq!(ffn.irreps_out().to_string(), "4x0e+2x1o");
    }

    #[test]
    fn test_rejects_bad_dropout() {
        let device = Default::default();
        let config = FeedForwardConfig::new("4x0e".into(), "8x0e".into(), "4x0e".into()).with_proj_drop(1.5);
        assert!(matches!(
            config.init::<TestBackend>(&device),
            Err(crate::error::NeuralEdfError::InvalidConfig { .. })
        ));
    }
}
