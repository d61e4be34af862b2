//! Anomaly scoring of per-pixel class logits.
//!
//! Logit maps are `[classes, height, width]`; every method reduces the class
//! dimension and returns a `[height, width]` map where higher means more
//! anomalous.

use burn::{prelude::*, tensor::activation::softmax, tensor::backend::Backend};
use burn_extra_ops::{Entropy, TensorExtraOps, ENTROPY_EPSILON};

use crate::config::ScoringMethod;

const CLASS_DIM: usize = 0;

/// Computes the anomaly map of one image.
///
/// A non-zero `temperature` overrides `method` with temperature-scaled MSP.
/// The void method reads the last channel; callers must ensure the predictor
/// provides one.
pub fn compute_anomaly_map<B: Backend>(
    method: &ScoringMethod,
    logits: Tensor<B, 3>,
    temperature: f64,
) -> Tensor<B, 2> {
    if temperature != 0.0 {
        let confidence = logits
            .temperature_softmax(CLASS_DIM, temperature)
            .max_dim(CLASS_DIM);
        return inverted(confidence);
    }

    match method {
        ScoringMethod::Msp => inverted(logits.max_softmax(CLASS_DIM)),
        ScoringMethod::MaxLogit => logits.max_dim(CLASS_DIM).neg().squeeze::<2>(CLASS_DIM),
        ScoringMethod::MaxEntropy => softmax(logits, CLASS_DIM)
            .entropy(CLASS_DIM, ENTROPY_EPSILON)
            .squeeze::<2>(CLASS_DIM),
        ScoringMethod::Void => {
            let [classes, _, _] = logits.dims();
            softmax(logits, CLASS_DIM)
                .slice(s![classes - 1..classes, .., ..])
                .squeeze::<2>(CLASS_DIM)
        }
    }
}

/// `1 - confidence`, dropping the reduced class dimension.
fn inverted<B: Backend>(confidence: Tensor<B, 3>) -> Tensor<B, 2> {
    confidence.neg().add_scalar(1.0).squeeze::<2>(CLASS_DIM)
}
