//! Enumeration types for evaluation configuration.
//!
//! This module contains the scoring methods and dataset profiles that
//! select how logits become anomaly scores and how ground truth is read.

use std::str::FromStr;

use burn::prelude::*;

use crate::error::AnomalyEvalError;

/// Defines how per-pixel class logits are turned into an anomaly score.
#[derive(Config, Debug, PartialEq, Eq)]
pub enum ScoringMethod {
    /// Maximum softmax probability: `1 - max_c softmax(logits)_c`.
    Msp,
    /// Negated maximum logit: `-max_c logits_c`.
    MaxLogit,
    /// Entropy of the softmax distribution.
    MaxEntropy,
    /// Softmax probability of a dedicated trailing void channel.
    Void,
}

impl ScoringMethod {
    /// Every supported method, in the order they are documented.
    pub const ALL: [Self; 4] = [Self::Msp, Self::MaxLogit, Self::MaxEntropy, Self::Void];

    /// Returns the canonical name of the method.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Msp => "MSP",
            Self::MaxLogit => "MaxLogit",
            Self::MaxEntropy => "MaxEntropy",
            Self::Void => "Void",
        }
    }
}

impl FromStr for ScoringMethod {
    type Err = AnomalyEvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AnomalyEvalError::UnknownMethod {
                method: s.to_owned(),
            })
    }
}

/// Defines how a benchmark encodes its ground-truth masks.
#[derive(Config, Debug, PartialEq, Eq)]
pub enum DatasetProfile {
    /// RoadAnomaly: anomalies are labelled `2`.
    RoadAnomaly,
    /// LostAndFound: `0` is void, `1` is road, `2..=200` are obstacles.
    LostAndFound,
    /// StreetHazards: class `14` is the anomaly class.
    StreetHazard,
    /// Masks already use `0` for in-distribution and `1` for OOD.
    Default,
}

impl DatasetProfile {
    /// Every supported profile.
    pub const ALL: [Self; 4] = [
        Self::RoadAnomaly,
        Self::LostAndFound,
        Self::StreetHazard,
        Self::Default,
    ];

    /// Returns the canonical name of the profile.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RoadAnomaly => "RoadAnomaly",
            Self::LostAndFound => "LostAndFound",
            Self::StreetHazard => "StreetHazard",
            Self::Default => "Default",
        }
    }

    /// Detects the profile from the dataset name embedded in a path or glob pattern.
    ///
    /// Matching is case-insensitive. Paths naming no known benchmark use
    /// [`DatasetProfile::Default`].
    #[must_use]
    pub fn detect(path: &str) -> Self {
        let path = path.to_ascii_lowercase();
        if path.contains("roadanomaly") {
            Self::RoadAnomaly
        } else if path.contains("lostandfound") {
            Self::LostAndFound
        } else if path.contains("streethazard") {
            Self::StreetHazard
        } else {
            Self::Default
        }
    }
}

impl FromStr for DatasetProfile {
    type Err = AnomalyEvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|profile| profile.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AnomalyEvalError::InvalidConfiguration {
                reason: format!("unknown dataset profile: {s}"),
            })
    }
}
