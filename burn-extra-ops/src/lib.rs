//! Additional operations for the Burn deep learning framework
//!
//! This crate provides the tensor operations needed to turn per-pixel class
//! logits into confidence and uncertainty maps that are not available in the
//! core Burn framework as single calls.

use burn::{prelude::*, tensor::activation::softmax};

mod entropy;
mod temperature;

// Convenient re-exports
pub use entropy::{entropy, Entropy, ENTROPY_EPSILON};
pub use temperature::softmax_with_temperature;

/// Additional operations for Burn tensors
pub trait TensorExtraOps<B: Backend, const D: usize> {
    /// Maximum softmax probability along `dim`, keeping the reduced dimension.
    fn max_softmax(self, dim: usize) -> Self;

    /// Softmax along `dim` after dividing by `temperature`.
    fn temperature_softmax(self, dim: usize, temperature: f64) -> Self;
}

impl<B: Backend, const D: usize> TensorExtraOps<B, D> for Tensor<B, D> {
    fn max_softmax(self, dim: usize) -> Self {
        softmax(self, dim).max_dim(dim)
    }

    fn temperature_softmax(self, dim: usize, temperature: f64) -> Self {
        softmax_with_temperature(self, dim, temperature)
    }
}
