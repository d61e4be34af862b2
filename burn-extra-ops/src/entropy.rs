//! # Shannon entropy
//!
//! Entropy of a probability tensor along one dimension, `-Σ p · ln(p + ε)`.
//! The additive epsilon keeps `ln(0)` finite so fully confident
//! distributions produce `0` instead of `NaN`.

use burn::prelude::*;

/// Default guard added to probabilities before taking the logarithm.
pub const ENTROPY_EPSILON: f64 = 1e-10;

/// A trait for calculating the entropy of a probability tensor.
pub trait Entropy {
    /// Calculates the entropy along `dim`, keeping the reduced dimension with size 1.
    fn entropy(self, dim: usize, epsilon: f64) -> Self;
}

impl<B: Backend, const D: usize> Entropy for Tensor<B, D> {
    fn entropy(self, dim: usize, epsilon: f64) -> Self {
        let log_probs = self.clone().add_scalar(epsilon).log();
        (self * log_probs).sum_dim(dim).neg()
    }
}

/// Convenience function for [`Entropy::entropy`] with [`ENTROPY_EPSILON`].
pub fn entropy<B: Backend, const D: usize>(probs: Tensor<B, D>, dim: usize) -> Tensor<B, D> {
    probs.entropy(dim, ENTROPY_EPSILON)
}
