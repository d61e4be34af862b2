//! Threshold-free separability metrics.
//!
//! Pixels are split by their normalized label into an in-distribution pool
//! and an out-of-distribution pool; ignored and unresolved pixels belong to
//! neither. Out-of-distribution is the positive class for both metrics.

use crate::{
    accumulator::StackedMaps,
    error::{AnomalyEvalError, AnomalyEvalResult},
    maps::{IN_DISTRIBUTION, OUT_OF_DISTRIBUTION},
    record::EvaluationRecord,
};

/// True-positive rate at which the false-positive rate is reported.
pub const TPR_TARGET: f64 = 0.95;

/// Index-aligned pooled scores and binary labels.
///
/// All in-distribution pixels come first, followed by all out-of-distribution
/// pixels, each group in stacking order.
#[derive(Debug, Clone, PartialEq)]
pub struct PooledScores {
    pub scores: Vec<f32>,
    pub labels: Vec<u8>,
}

impl PooledScores {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Pools the stacked pixels into `IND ++ OOD` order.
pub fn pool(stacked: &StackedMaps) -> PooledScores {
    let pixels = || stacked.scores().iter().zip(stacked.labels().iter());

    let mut scores: Vec<f32> = pixels()
        .filter(|&(_, &label)| label == IN_DISTRIBUTION)
        .map(|(&score, _)| score)
        .collect();
    let in_distribution = scores.len();
    scores.extend(
        pixels()
            .filter(|&(_, &label)| label == OUT_OF_DISTRIBUTION)
            .map(|(&score, _)| score),
    );

    let mut labels = vec![IN_DISTRIBUTION; in_distribution];
    labels.resize(scores.len(), OUT_OF_DISTRIBUTION);

    PooledScores { scores, labels }
}

/// Cumulative counts at one distinct score threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OperatingPoint {
    true_positives: usize,
    false_positives: usize,
}

/// Sweeps thresholds from the highest score down, one point per distinct score.
fn sweep(scores: &[f32], labels: &[u8]) -> AnomalyEvalResult<(Vec<OperatingPoint>, usize, usize)> {
    if scores.len() != labels.len() {
        return Err(AnomalyEvalError::ShapeMismatch {
            expected: format!("{} scores", labels.len()),
            actual: format!("{} scores", scores.len()),
        });
    }

    let positives = labels.iter().filter(|&&l| l == OUT_OF_DISTRIBUTION).count();
    let negatives = labels.len() - positives;
    if positives == 0 {
        return Err(AnomalyEvalError::DegeneratePool {
            reason: "no out-of-distribution pixels".to_owned(),
        });
    }

    let mut pairs: Vec<(f32, bool)> = scores
        .iter()
        .zip(labels.iter())
        .map(|(&score, &label)| (score, label == OUT_OF_DISTRIBUTION))
        .collect();
    pairs.sort_unstable_by(|a, b| b.0.total_cmp(&a.0));

    let mut points = Vec::new();
    let mut true_positives = 0;
    let mut false_positives = 0;
    let mut i = 0;
    while i < pairs.len() {
        let threshold = pairs[i].0;
        while i < pairs.len() && pairs[i].0.total_cmp(&threshold).is_eq() {
            if pairs[i].1 {
                true_positives += 1;
            } else {
                false_positives += 1;
            }
            i += 1;
        }
        points.push(OperatingPoint {
            true_positives,
            false_positives,
        });
    }

    Ok((points, positives, negatives))
}

/// Average precision with out-of-distribution as the positive class.
///
/// Computed as `Σ (R_n - R_{n-1}) · P_n` over distinct thresholds, without
/// interpolation.
///
/// # Errors
///
/// Returns [`AnomalyEvalError::DegeneratePool`] if there is no positive pixel.
pub fn average_precision(scores: &[f32], labels: &[u8]) -> AnomalyEvalResult<f64> {
    let (points, positives, _) = sweep(scores, labels)?;

    let mut previous_recall = 0.0;
    let mut area = 0.0;
    for point in points {
        let recall = point.true_positives as f64 / positives as f64;
        let precision =
            point.true_positives as f64 / (point.true_positives + point.false_positives) as f64;
        area += (recall - previous_recall) * precision;
        previous_recall = recall;
    }
    Ok(area)
}

/// Smallest false-positive rate among thresholds reaching [`TPR_TARGET`].
///
/// The value is read at an actual threshold. It is not interpolated along the
/// ROC curve at exactly 95% TPR, so it can be higher than an interpolated
/// estimate when no threshold lands on the target.
///
/// # Errors
///
/// Returns [`AnomalyEvalError::DegeneratePool`] if either pool is empty.
pub fn fpr_at_95_tpr(scores: &[f32], labels: &[u8]) -> AnomalyEvalResult<f64> {
    let (points, positives, negatives) = sweep(scores, labels)?;
    if negatives == 0 {
        return Err(AnomalyEvalError::DegeneratePool {
            reason: "no in-distribution pixels".to_owned(),
        });
    }

    points
        .iter()
        .filter(|p| p.true_positives as f64 / positives as f64 >= TPR_TARGET)
        .map(|p| p.false_positives as f64 / negatives as f64)
        .min_by(f64::total_cmp)
        .ok_or_else(|| AnomalyEvalError::DegeneratePool {
            reason: format!("true-positive rate never reaches {TPR_TARGET}"),
        })
}

/// Pools the stacked maps and computes AUPRC and FPR@95%TPR.
///
/// # Errors
///
/// Returns [`AnomalyEvalError::EmptyEvaluation`] if no image was accepted and
/// [`AnomalyEvalError::DegeneratePool`] if a pool is empty.
pub fn evaluate(stacked: &StackedMaps) -> AnomalyEvalResult<EvaluationRecord> {
    if stacked.is_empty() {
        return Err(AnomalyEvalError::EmptyEvaluation);
    }

    let pooled = pool(stacked);
    let ood = pooled
        .labels
        .iter()
        .filter(|&&l| l == OUT_OF_DISTRIBUTION)
        .count();
    tracing::info!(
        images = stacked.dims()[0],
        in_distribution = pooled.len() - ood,
        out_of_distribution = ood,
        excluded = stacked.labels().len() - pooled.len(),
        "pooled pixels"
    );

    let auprc = average_precision(&pooled.scores, &pooled.labels)?;
    let fpr = fpr_at_95_tpr(&pooled.scores, &pooled.labels)?;

    Ok(EvaluationRecord::new(pooled, auprc * 100.0, fpr * 100.0))
}
