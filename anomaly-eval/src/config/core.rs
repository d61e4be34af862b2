//! Core evaluation configuration.

use crate::error::{AnomalyEvalError, AnomalyEvalResult};
use burn::prelude::*;

use super::enums::*;

/// Configuration consumed by the evaluation core.
///
/// Values normally come from the command line; the core only reads them.
#[derive(Config, Debug)]
pub struct EvaluationConfig {
    /// Scoring method used when `temperature` is zero.
    #[config(default = "ScoringMethod::Msp")]
    pub method: ScoringMethod,
    /// Softmax temperature. Any non-zero value overrides `method` with
    /// temperature-scaled MSP.
    #[config(default = 0.0)]
    pub temperature: f64,
    /// Spatial size `[height, width]` every logit map and mask must share.
    #[config(default = "[512, 1024]")]
    pub target_size: [usize; 2],
    /// Ground-truth encoding of the evaluated benchmark.
    #[config(default = "DatasetProfile::Default")]
    pub profile: DatasetProfile,
}

impl EvaluationConfig {
    /// Validate the configuration and return appropriate errors for invalid settings.
    ///
    /// # Errors
    ///
    /// Returns [`AnomalyEvalError::InvalidConfiguration`] for a non-finite
    /// temperature and for an empty target size. Negative temperatures are
    /// allowed and scale like any other non-zero value.
    pub fn validate(&self) -> AnomalyEvalResult<()> {
        if !self.temperature.is_finite() {
            return Err(AnomalyEvalError::InvalidConfiguration {
                reason: format!("Temperature must be finite, got {}", self.temperature),
            });
        }

        let [height, width] = self.target_size;
        if height == 0 || width == 0 {
            return Err(AnomalyEvalError::InvalidConfiguration {
                reason: format!("Target size must be non-empty, got {height}x{width}"),
            });
        }

        Ok(())
    }

    /// Whether temperature scaling replaces the configured method.
    #[must_use]
    pub fn uses_temperature(&self) -> bool {
        self.temperature != 0.0
    }
}
