//! Final evaluation record and the append-only results log.

use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use crate::{error::AnomalyEvalResult, metrics::PooledScores};

/// Result of one evaluation run.
///
/// Built once after all images are consumed and never modified afterwards.
/// Metric values are percentages.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRecord {
    pooled: PooledScores,
    auprc: f64,
    fpr_at_95_tpr: f64,
}

impl EvaluationRecord {
    pub(crate) const fn new(pooled: PooledScores, auprc: f64, fpr_at_95_tpr: f64) -> Self {
        Self {
            pooled,
            auprc,
            fpr_at_95_tpr,
        }
    }

    /// Area under the precision-recall curve, in percent.
    pub const fn auprc(&self) -> f64 {
        self.auprc
    }

    /// False-positive rate at 95% true-positive rate, in percent.
    pub const fn fpr_at_95_tpr(&self) -> f64 {
        self.fpr_at_95_tpr
    }

    /// Pooled scores, in-distribution pixels first.
    pub fn scores(&self) -> &[f32] {
        &self.pooled.scores
    }

    /// Pooled binary labels aligned with [`EvaluationRecord::scores`].
    pub fn labels(&self) -> &[u8] {
        &self.pooled.labels
    }

    /// The single results-log line for this record.
    ///
    /// Values always carry a decimal point (`100.0`, not `100`).
    pub fn log_line(&self) -> String {
        format!(
            "AUPRC score: {:?}   FPR@TPR95: {:?}",
            self.auprc, self.fpr_at_95_tpr
        )
    }
}

/// Append-only text log receiving one line per completed run.
#[derive(Debug, Clone)]
pub struct ResultsLog {
    path: PathBuf,
}

impl ResultsLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends the record's line, creating the file if needed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened or written.
    pub fn append(&self, record: &EvaluationRecord) -> AnomalyEvalResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", record.log_line())?;
        tracing::info!(path = %self.path.display(), "appended results");
        Ok(())
    }
}
