//! Out-of-distribution evaluation for semantic segmentation predictors.
//!
//! A predictor's class logits are turned into per-pixel anomaly scores,
//! dataset ground truth is normalized to `0 = in-distribution`,
//! `1 = out-of-distribution`, `255 = ignore`, and the pooled pixels of all
//! images with an anomaly are summarized as AUPRC and FPR at 95% TPR.

pub mod accumulator;
pub mod config;
#[cfg(feature = "dataset")]
pub mod dataset;
pub mod error;
pub mod evaluator;
pub mod labels;
pub mod maps;
pub mod metrics;
pub mod models;
pub mod predictor;
pub mod record;
pub mod scoring;

#[cfg(test)]
mod tests;

pub use accumulator::{Accumulator, StackedMaps};
pub use config::{DatasetProfile, EvaluationConfig, ScoringMethod};
#[cfg(feature = "dataset")]
pub use dataset::{AnomalyDataset, AnomalySample};
pub use error::{AnomalyEvalError, AnomalyEvalResult};
pub use evaluator::{AnomalyEvaluator, RunCounts};
pub use labels::{normalize, LabelNormalizer, LabelPredicate, RemapRule};
pub use maps::{AnomalyMap, NormalizedMask, RawMask, IGNORE, IN_DISTRIBUTION, OUT_OF_DISTRIBUTION};
pub use metrics::{average_precision, evaluate, fpr_at_95_tpr, pool, PooledScores, TPR_TARGET};
pub use predictor::{ModelRegistry, Predictor, PredictorConstructor, PredictorSpec};
pub use record::{EvaluationRecord, ResultsLog};
pub use scoring::compute_anomaly_map;
