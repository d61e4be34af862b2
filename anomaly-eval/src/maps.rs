//! Host-side per-image maps.
//!
//! Scores are copied off the device as soon as they are computed so that
//! accelerator memory does not grow with the number of evaluated images.

use burn::{prelude::*, tensor::backend::Backend};

use crate::error::{AnomalyEvalError, AnomalyEvalResult};

/// Label of an in-distribution pixel in a normalized mask.
pub const IN_DISTRIBUTION: u8 = 0;
/// Label of an out-of-distribution pixel in a normalized mask.
pub const OUT_OF_DISTRIBUTION: u8 = 1;
/// Label of a pixel excluded from evaluation.
pub const IGNORE: u8 = 255;

/// Per-pixel anomaly scores of one image, row-major `[height, width]`.
///
/// Higher values mean more anomalous.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyMap {
    scores: Vec<f32>,
    height: usize,
    width: usize,
}

impl AnomalyMap {
    /// Wraps row-major scores.
    ///
    /// # Errors
    ///
    /// Returns [`AnomalyEvalError::ShapeMismatch`] if `scores` does not hold
    /// `height * width` values.
    pub fn new(scores: Vec<f32>, height: usize, width: usize) -> AnomalyEvalResult<Self> {
        check_len(scores.len(), height, width)?;
        Ok(Self {
            scores,
            height,
            width,
        })
    }

    /// Copies a `[height, width]` score tensor into host memory, consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`AnomalyEvalError::TensorConversion`] if the tensor data cannot
    /// be read back as `f32`.
    pub fn from_tensor<B: Backend>(tensor: Tensor<B, 2>) -> AnomalyEvalResult<Self> {
        let [height, width] = tensor.dims();
        let scores = tensor
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| AnomalyEvalError::TensorConversion {
                reason: format!("{e:?}"),
            })?;
        Self::new(scores, height, width)
    }

    /// Spatial size as `[height, width]`.
    pub const fn dims(&self) -> [usize; 2] {
        [self.height, self.width]
    }

    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    pub fn into_scores(self) -> Vec<f32> {
        self.scores
    }
}

/// Ground-truth labels of one image in the benchmark's own encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMask {
    labels: Vec<u8>,
    height: usize,
    width: usize,
}

impl RawMask {
    /// Wraps row-major labels.
    ///
    /// # Errors
    ///
    /// Returns [`AnomalyEvalError::ShapeMismatch`] if `labels` does not hold
    /// `height * width` values.
    pub fn new(labels: Vec<u8>, height: usize, width: usize) -> AnomalyEvalResult<Self> {
        check_len(labels.len(), height, width)?;
        Ok(Self {
            labels,
            height,
            width,
        })
    }

    /// Spatial size as `[height, width]`.
    pub const fn dims(&self) -> [usize; 2] {
        [self.height, self.width]
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }
}

/// Ground-truth labels in the common encoding.
///
/// Values are expected to be [`IN_DISTRIBUTION`], [`OUT_OF_DISTRIBUTION`] or
/// [`IGNORE`]; anything else is left out of the metric pools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMask {
    labels: Vec<u8>,
    height: usize,
    width: usize,
}

impl NormalizedMask {
    pub(crate) const fn from_parts(labels: Vec<u8>, height: usize, width: usize) -> Self {
        Self {
            labels,
            height,
            width,
        }
    }

    /// Spatial size as `[height, width]`.
    pub const fn dims(&self) -> [usize; 2] {
        [self.height, self.width]
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    pub fn into_labels(self) -> Vec<u8> {
        self.labels
    }

    /// Whether at least one pixel is labelled out-of-distribution.
    pub fn has_ood(&self) -> bool {
        self.labels.contains(&OUT_OF_DISTRIBUTION)
    }

    /// Number of pixels whose label is outside `{0, 1, 255}`.
    pub fn unresolved_count(&self) -> usize {
        self.labels
            .iter()
            .filter(|&&v| !matches!(v, IN_DISTRIBUTION | OUT_OF_DISTRIBUTION | IGNORE))
            .count()
    }
}

fn check_len(len: usize, height: usize, width: usize) -> AnomalyEvalResult<()> {
    if len != height * width {
        return Err(AnomalyEvalError::ShapeMismatch {
            expected: format!("{height}x{width} ({} values)", height * width),
            actual: format!("{len} values"),
        });
    }
    Ok(())
}
