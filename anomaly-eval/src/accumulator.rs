//! Accumulation of accepted image results.
//!
//! The [`Accumulator`] keeps accepted `(anomaly map, normalized mask)` pairs in
//! host memory for the duration of a run and stacks them into `[N, H, W]`
//! arrays at the end.

use crate::{
    error::{AnomalyEvalError, AnomalyEvalResult},
    maps::{AnomalyMap, NormalizedMask},
};

/// Stacked scores and labels of all accepted images, row-major `[N, H, W]`.
#[derive(Debug, Clone, PartialEq)]
pub struct StackedMaps {
    scores: Vec<f32>,
    labels: Vec<u8>,
    dims: [usize; 3],
}

impl StackedMaps {
    /// Shape as `[images, height, width]`.
    pub const fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    pub fn is_empty(&self) -> bool {
        self.dims[0] == 0
    }
}

/// Collects accepted per-image results.
///
/// An image is accepted only if its mask contains at least one
/// out-of-distribution pixel; images without any are dropped entirely.
#[derive(Debug, Clone)]
pub struct Accumulator {
    target_size: [usize; 2],
    accepted: Vec<(AnomalyMap, NormalizedMask)>,
    rejected: usize,
}

impl Accumulator {
    /// Creates an empty accumulator for maps of `target_size` `[height, width]`.
    pub const fn new(target_size: [usize; 2]) -> Self {
        Self {
            target_size,
            accepted: Vec::new(),
            rejected: 0,
        }
    }

    /// Offers one image result, returning whether it was accepted.
    pub fn offer(&mut self, anomaly_map: AnomalyMap, mask: NormalizedMask) -> bool {
        if !mask.has_ood() {
            self.rejected += 1;
            return false;
        }
        self.accepted.push((anomaly_map, mask));
        true
    }

    /// Number of accepted images.
    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    /// Number of images dropped for having no out-of-distribution pixel.
    pub const fn rejected_count(&self) -> usize {
        self.rejected
    }

    /// Stacks every accepted pair into `[N, H, W]` arrays.
    ///
    /// # Errors
    ///
    /// Returns [`AnomalyEvalError::ShapeMismatch`] if an accepted map or mask
    /// does not match the target size.
    pub fn finalize(self) -> AnomalyEvalResult<StackedMaps> {
        let [height, width] = self.target_size;
        let count = self.accepted.len();
        let mut scores = Vec::with_capacity(count * height * width);
        let mut labels = Vec::with_capacity(count * height * width);

        for (index, (anomaly_map, mask)) in self.accepted.into_iter().enumerate() {
            for (what, dims) in [("anomaly map", anomaly_map.dims()), ("mask", mask.dims())] {
                if dims != self.target_size {
                    return Err(AnomalyEvalError::ShapeMismatch {
                        expected: format!("{height}x{width}"),
                        actual: format!("{}x{} ({what} of accepted image {index})", dims[0], dims[1]),
                    });
                }
            }
            scores.extend(anomaly_map.into_scores());
            labels.extend(mask.into_labels());
        }

        Ok(StackedMaps {
            scores,
            labels,
            dims: [count, height, width],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(height: usize, width: usize) -> AnomalyMap {
        AnomalyMap::new(vec![0.5; height * width], height, width).unwrap()
    }

    fn mask(labels: Vec<u8>, height: usize, width: usize) -> NormalizedMask {
        NormalizedMask::from_parts(labels, height, width)
    }

    #[test]
    fn mask_without_ood_pixel_is_rejected() {
        let mut accumulator = Accumulator::new([2, 2]);

        assert!(!accumulator.offer(map(2, 2), mask(vec![0, 0, 0, 0], 2, 2)));
        assert!(!accumulator.offer(map(2, 2), mask(vec![0, 255, 255, 0], 2, 2)));
        assert_eq!(accumulator.accepted_count(), 0);
        assert_eq!(accumulator.rejected_count(), 2);
    }

    #[test]
    fn mask_with_ood_pixel_is_accepted_and_stacked_in_order() {
        let mut accumulator = Accumulator::new([1, 2]);
        let first = AnomalyMap::new(vec![0.1, 0.2], 1, 2).unwrap();
        let second = AnomalyMap::new(vec![0.3, 0.4], 1, 2).unwrap();

        assert!(accumulator.offer(first, mask(vec![0, 1], 1, 2)));
        assert!(accumulator.offer(second, mask(vec![1, 255], 1, 2)));

        let stacked = accumulator.finalize().unwrap();
        assert_eq!(stacked.dims(), [2, 1, 2]);
        assert_eq!(stacked.scores(), &[0.1, 0.2, 0.3, 0.4]);
        assert_eq!(stacked.labels(), &[0, 1, 1, 255]);
    }

    #[test]
    fn accepted_map_with_wrong_size_fails_finalize() {
        let mut accumulator = Accumulator::new([2, 2]);
        assert!(accumulator.offer(map(2, 2), mask(vec![1, 0, 0, 0], 2, 2)));
        assert!(accumulator.offer(map(1, 4), mask(vec![1, 0, 0, 0], 1, 4)));

        match accumulator.finalize() {
            Err(AnomalyEvalError::ShapeMismatch { expected, actual }) => {
                assert_eq!(expected, "2x2");
                assert!(actual.contains("1x4"));
            }
            other => panic!("Expected ShapeMismatch error, got {other:?}"),
        }
    }

    #[test]
    fn mask_disagreeing_with_its_map_fails_finalize() {
        let mut accumulator = Accumulator::new([2, 2]);
        assert!(accumulator.offer(map(2, 2), mask(vec![1, 0], 1, 2)));
        assert!(accumulator.finalize().is_err());
    }

    #[test]
    fn rejected_images_are_not_shape_checked() {
        let mut accumulator = Accumulator::new([2, 2]);
        assert!(!accumulator.offer(map(3, 3), mask(vec![0; 9], 3, 3)));
        let stacked = accumulator.finalize().unwrap();
        assert!(stacked.is_empty());
    }
}
