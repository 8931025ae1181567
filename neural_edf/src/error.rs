//! Error types for neural_edf.

use thiserror::Error;

/// Errors that can occur while building or running the network.
#[derive(Error, Debug)]
pub enum NeuralEdfError {
    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// Two irrep signatures that must agree do not.
    #[error("irreps mismatch: expected {expected}, got {got}")]
    IrrepsMismatch {
        /// Expected signature.
        expected: String,
        /// Actual signature.
        got: String,
    },

    /// Attention kind not recognised.
    #[error("unknown attention type: {0}")]
    UnknownAttentionType(String),

    /// Pooling method not recognised.
    #[error("unknown pooling method: {0}")]
    UnknownPoolMethod(String),

    /// Tensor shape mismatch.
    #[error("tensor shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape.
        expected: Vec<usize>,
        /// Actual shape.
        got: Vec<usize>,
    },

    /// Number of multi-scale inputs differs from the configured number of scales.
    #[error("expected {expected} scales, got {got}")]
    ScaleCountMismatch {
        /// Configured scale count.
        expected: usize,
        /// Provided scale count.
        got: usize,
    },

    /// Tensor data could not be read back to the host.
    #[error("tensor data error: {0}")]
    TensorData(String),

    /// Error from the math core (irreps parsing, spatial queries).
    #[error("core error: {0}")]
    Core(#[from] edf_core::EdfCoreError),
}

impl NeuralEdfError {
    /// Shorthand for [`NeuralEdfError::InvalidConfig`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Result type for neural_edf operations.
pub type Result<T> = std::result::Result<T, NeuralEdfError>;
