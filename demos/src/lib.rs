//! Command line tools for anomaly segmentation evaluation.
//!
//! ## Available Tools
//!
//! - `eval_anomaly`: evaluate a registered predictor on a benchmark and append
//!   the results to a log
//! - `dataset_check`: discover a benchmark and report how its masks normalize
//!
//! ## Usage
//!
//! ```bash
//! # Evaluate with max logit scoring
//! cargo run --bin eval_anomaly -- --input "/data/RoadAnomaly/images/*.jpg" --method MaxLogit
//!
//! # Check a dataset before evaluating
//! cargo run --bin dataset_check -- --input "/data/fs_static/images/*.jpg"
//! ```

pub mod common;
pub mod config;

pub use common::{create_device, get_backend_name, init_tracing, SelectedBackend, SelectedDevice};
pub use config::{EvalRunConfig, EvaluationSummary, AUTO_PROFILE};
