//! Configuration module for anomaly evaluation.
//!
//! - `core`: the evaluation configuration consumed by the pipeline
//! - `enums`: scoring methods and dataset profiles

pub mod core;
pub mod enums;

pub use core::EvaluationConfig;
pub use enums::{DatasetProfile, ScoringMethod};
