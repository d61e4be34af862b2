//! Sequential per-image evaluation pipeline.
//!
//! For each image: predict, score, copy the anomaly map to host memory,
//! normalize the ground truth and offer both to the [`Accumulator`]. All
//! device tensors of an image are dropped before the next one is processed.

use std::marker::PhantomData;

use burn::{prelude::*, tensor::backend::Backend};

use crate::{
    accumulator::Accumulator,
    config::{EvaluationConfig, ScoringMethod},
    error::{AnomalyEvalError, AnomalyEvalResult},
    labels::LabelNormalizer,
    maps::{AnomalyMap, RawMask},
    metrics,
    predictor::Predictor,
    record::EvaluationRecord,
    scoring::compute_anomaly_map,
};

/// Image counts of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunCounts {
    /// Images processed.
    pub seen: usize,
    /// Images with at least one out-of-distribution pixel.
    pub accepted: usize,
    /// Images dropped for having none.
    pub dropped: usize,
}

/// Drives a predictor over a dataset and produces an [`EvaluationRecord`].
pub struct AnomalyEvaluator<'a, B: Backend, P: Predictor<B> + ?Sized> {
    config: &'a EvaluationConfig,
    predictor: &'a P,
    normalizer: LabelNormalizer,
    accumulator: Accumulator,
    seen: usize,
    _b: PhantomData<B>,
}

impl<'a, B: Backend, P: Predictor<B> + ?Sized> AnomalyEvaluator<'a, B, P> {
    /// Validates the configuration against the predictor and prepares an empty run.
    ///
    /// # Errors
    ///
    /// Returns [`AnomalyEvalError::InvalidConfiguration`] for invalid settings,
    /// including the void method on a predictor without a void channel.
    pub fn new(config: &'a EvaluationConfig, predictor: &'a P) -> AnomalyEvalResult<Self> {
        config.validate()?;
        if !config.uses_temperature()
            && config.method == ScoringMethod::Void
            && !predictor.has_void_channel()
        {
            return Err(AnomalyEvalError::InvalidConfiguration {
                reason: "the Void method requires a predictor with a void channel".to_owned(),
            });
        }

        tracing::info!(
            method = config.method.as_str(),
            temperature = config.temperature,
            profile = config.profile.as_str(),
            height = config.target_size[0],
            width = config.target_size[1],
            "starting evaluation"
        );

        Ok(Self {
            config,
            predictor,
            normalizer: LabelNormalizer::for_profile(&config.profile),
            accumulator: Accumulator::new(config.target_size),
            seen: 0,
            _b: PhantomData,
        })
    }

    /// Scores one image and offers it to the accumulator.
    ///
    /// Returns whether the image was accepted.
    ///
    /// # Errors
    ///
    /// Returns the predictor's error or a tensor conversion error.
    pub fn process(&mut self, image: Tensor<B, 3>, raw_mask: &RawMask) -> AnomalyEvalResult<bool> {
        let anomaly_map = {
            let logits = self.predictor.predict(image)?;
            let scores =
                compute_anomaly_map(&self.config.method, logits, self.config.temperature);
            AnomalyMap::from_tensor(scores)?
        };
        let mask = self.normalizer.normalize(raw_mask);

        self.seen += 1;
        let accepted = self.accumulator.offer(anomaly_map, mask);
        tracing::debug!(index = self.seen, accepted, "processed image");
        Ok(accepted)
    }

    /// Counts so far.
    pub fn counts(&self) -> RunCounts {
        RunCounts {
            seen: self.seen,
            accepted: self.accumulator.accepted_count(),
            dropped: self.accumulator.rejected_count(),
        }
    }

    /// Finalizes the accumulated maps and computes the metrics.
    ///
    /// # Errors
    ///
    /// Returns [`AnomalyEvalError::ShapeMismatch`] for accepted maps of the
    /// wrong size, [`AnomalyEvalError::EmptyEvaluation`] if nothing was
    /// accepted, or [`AnomalyEvalError::DegeneratePool`].
    pub fn finish(self) -> AnomalyEvalResult<(EvaluationRecord, RunCounts)> {
        let counts = self.counts();
        tracing::info!(
            seen = counts.seen,
            accepted = counts.accepted,
            dropped = counts.dropped,
            "all images processed"
        );

        let stacked = self.accumulator.finalize()?;
        let record = metrics::evaluate(&stacked)?;
        tracing::info!(
            auprc = record.auprc(),
            fpr_at_95_tpr = record.fpr_at_95_tpr(),
            "evaluation finished"
        );
        Ok((record, counts))
    }
}
