//! Temperature-scaled softmax.

use burn::{prelude::*, tensor::activation::softmax};

/// Divides `logits` by `temperature` and applies softmax along `dim`.
///
/// A temperature above 1 flattens the distribution, below 1 sharpens it.
/// Callers are responsible for rejecting a zero temperature.
pub fn softmax_with_temperature<B: Backend, const D: usize>(
    logits: Tensor<B, D>,
    dim: usize,
    temperature: f64,
) -> Tensor<B, D> {
    softmax(logits.div_scalar(temperature), dim)
}
