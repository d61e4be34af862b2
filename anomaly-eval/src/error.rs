use std::path::PathBuf;

use thiserror::Error;

/// The error type for anomaly evaluation.
///
/// Every variant is fatal: the evaluation loop never retries or skips, and no
/// results are written once one of these has been raised.
#[derive(Error, Debug)]
pub enum AnomalyEvalError {
    /// Error for when the scoring method name is not recognised.
    #[error("Unknown scoring method: {method}")]
    UnknownMethod {
        /// The rejected method name.
        method: String,
    },

    /// Error for when no predictor is registered under the requested identifier.
    #[error("Unknown model: {model} (available: {available})")]
    UnknownModel {
        /// The requested model identifier.
        model: String,
        /// Comma separated list of registered identifiers.
        available: String,
    },

    /// Error for logically inconsistent settings, detected before any image is processed.
    #[error("Invalid evaluation configuration: {reason}")]
    InvalidConfiguration {
        /// The reason why the configuration is invalid.
        reason: String,
    },

    /// Error for when a map or mask does not have the expected spatial size.
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// The expected shape.
        expected: String,
        /// The actual shape.
        actual: String,
    },

    /// Error for when the ground-truth mask for an image does not exist.
    #[error("Missing ground truth mask: {}", path.display())]
    MissingGroundTruth {
        /// The resolved mask path.
        path: PathBuf,
    },

    /// Error for when no image was accepted, so there is nothing to score.
    #[error("No image with out-of-distribution pixels was accepted")]
    EmptyEvaluation,

    /// Error for when one of the two pixel pools is empty and a metric is undefined.
    #[error("Degenerate pixel pool: {reason}")]
    DegeneratePool {
        /// Which pool is empty.
        reason: String,
    },

    /// Error for when tensor data cannot be moved to host memory.
    #[error("Tensor conversion failed: {reason}")]
    TensorConversion {
        /// A description of the failure.
        reason: String,
    },

    /// Error for when an image or mask cannot be decoded.
    #[error("Failed to load image {}: {reason}", path.display())]
    ImageLoad {
        /// The offending file.
        path: PathBuf,
        /// The decoder message.
        reason: String,
    },

    /// Error for dataset discovery problems.
    #[error("Dataset error: {message}")]
    DatasetError {
        /// The error message.
        message: String,
    },

    /// Error for when loading predictor weights fails.
    #[error("Failed to load weights: {reason}")]
    WeightLoadingFailed {
        /// The reason for the weight loading failure.
        reason: String,
    },

    /// Error for filesystem failures, e.g. while appending to the results log.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for anomaly evaluation.
pub type AnomalyEvalResult<T> = Result<T, AnomalyEvalError>;
