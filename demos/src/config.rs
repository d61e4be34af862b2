//! Run configuration for the command line tools.
//!
//! A run can be described by a JSON file; command line options are applied on
//! top of it.

use std::{fs, path::Path, path::PathBuf};

use anomaly_eval::{
    DatasetProfile, EvaluationConfig, EvaluationRecord, PredictorSpec, RunCounts, ScoringMethod,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Dataset name that selects the profile from the input pattern.
pub const AUTO_PROFILE: &str = "auto";

/// Configuration of one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalRunConfig {
    /// Glob pattern of the images to evaluate.
    pub input: String,
    /// Scoring method name (`MSP`, `MaxLogit`, `MaxEntropy`, `Void`).
    pub method: String,
    /// Softmax temperature; non-zero overrides the method with scaled MSP.
    pub temperature: f64,
    /// Target height of images and masks.
    pub height: usize,
    /// Target width of images and masks.
    pub width: usize,
    /// Dataset profile name, or `auto` to detect it from `input`.
    pub dataset: String,
    /// Registry identifier of the predictor.
    pub model: String,
    /// Optional weights file for the predictor.
    pub weights: Option<PathBuf>,
    /// Number of in-distribution classes predicted by the model.
    pub num_classes: usize,
    /// Whether the model has an extra void channel.
    pub void_channel: bool,
    /// Append-only results log.
    pub results: PathBuf,
    /// Optional JSON summary written after a successful run.
    pub summary: Option<PathBuf>,
}

impl Default for EvalRunConfig {
    fn default() -> Self {
        Self {
            input: String::new(),
            method: ScoringMethod::Msp.as_str().to_owned(),
            temperature: 0.0,
            height: 512,
            width: 1024,
            dataset: AUTO_PROFILE.to_owned(),
            model: "linear-head".to_owned(),
            weights: None,
            num_classes: 20,
            void_channel: false,
            results: PathBuf::from("results.txt"),
            summary: None,
        }
    }
}

impl EvalRunConfig {
    /// Loads a configuration file, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str::<Self>(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Resolves the dataset profile once for the whole run.
    pub fn profile(&self) -> Result<DatasetProfile> {
        if self.dataset.eq_ignore_ascii_case(AUTO_PROFILE) {
            Ok(DatasetProfile::detect(&self.input))
        } else {
            Ok(self.dataset.parse::<DatasetProfile>()?)
        }
    }

    /// Builds the validated core configuration.
    pub fn evaluation_config(&self) -> Result<EvaluationConfig> {
        let method: ScoringMethod = self.method.parse()?;
        let config = EvaluationConfig::new()
            .with_method(method)
            .with_temperature(self.temperature)
            .with_target_size([self.height, self.width])
            .with_profile(self.profile()?);
        config.validate()?;
        Ok(config)
    }

    /// Parameters for the predictor constructor.
    pub fn predictor_spec(&self) -> PredictorSpec {
        PredictorSpec::new(self.num_classes)
            .with_void_channel(self.void_channel)
            .with_weights(self.weights.clone())
    }
}

/// Machine-readable summary of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationSummary {
    pub method: String,
    pub temperature: f64,
    pub profile: String,
    pub target_size: [usize; 2],
    pub model: String,
    pub images_seen: usize,
    pub images_accepted: usize,
    pub images_dropped: usize,
    /// AUPRC in percent.
    pub auprc: f64,
    /// FPR at 95% TPR in percent.
    pub fpr_at_95_tpr: f64,
}

impl EvaluationSummary {
    pub fn new(
        config: &EvaluationConfig,
        model: &str,
        record: &EvaluationRecord,
        counts: RunCounts,
    ) -> Self {
        Self {
            method: config.method.as_str().to_owned(),
            temperature: config.temperature,
            profile: config.profile.as_str().to_owned(),
            target_size: config.target_size,
            model: model.to_owned(),
            images_seen: counts.seen,
            images_accepted: counts.accepted,
            images_dropped: counts.dropped,
            auprc: record.auprc(),
            fpr_at_95_tpr: record.fpr_at_95_tpr(),
        }
    }

    /// Writes the summary as pretty-printed JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize summary")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write summary: {}", path.display()))
    }
}
