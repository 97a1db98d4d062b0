//! Core types and trait definitions for sample validation
//!
//! - `ValidationMetrics` / `ValidationResult`: one decision per accession
//! - `StageOutcome`: distinguishes a stage that never ran from one that ran
//!   and observed zero
//! - `BatchJob`: input to the orchestrator
//! - `SampleValidation`: the seam between orchestrator and validator

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Opaque sample identifier, the primary key across all artifacts
pub type Accession = String;

// ============================================================================
// Metrics
// ============================================================================

/// Metric names carried in [`ValidationMetrics`]
pub mod metric {
    pub const METADATA_COMPLETENESS: &str = "metadata_completeness";
    pub const FUNGAL_SIGNAL: &str = "fungal_signal";
    pub const HOST_CONTAMINATION: &str = "host_contamination";
    pub const READ_PAIRS: &str = "read_pairs";
    pub const MEAN_QUALITY: &str = "mean_quality";
    pub const GC_CONTENT: &str = "gc_content";
    pub const VALIDATION_TIME_SECONDS: &str = "validation_time_seconds";
    /// Set to 1.0 on results produced by the orchestrator's failure path
    pub const ERROR: &str = "error";

    /// Metrics every completed validation reports, zero when unobserved
    pub const STANDARD: [&str; 6] = [
        METADATA_COMPLETENESS,
        FUNGAL_SIGNAL,
        HOST_CONTAMINATION,
        READ_PAIRS,
        MEAN_QUALITY,
        GC_CONTENT,
    ];
}

/// Metric name → value
///
/// Reading a metric that was never set yields 0.0: an absent artifact is a
/// zero observation, not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationMetrics(BTreeMap<String, f64>);

impl ValidationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metrics with every standard metric present and zero
    pub fn with_defaults() -> Self {
        let mut metrics = Self::new();
        for name in metric::STANDARD {
            metrics.set(name, 0.0);
        }
        metrics
    }

    pub fn get(&self, name: &str) -> f64 {
        self.0.get(name).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.0.insert(name.to_string(), value);
    }

    pub fn merge(&mut self, other: ValidationMetrics) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn metadata_completeness(&self) -> f64 {
        self.get(metric::METADATA_COMPLETENESS)
    }

    pub fn fungal_signal(&self) -> f64 {
        self.get(metric::FUNGAL_SIGNAL)
    }

    pub fn host_contamination(&self) -> f64 {
        self.get(metric::HOST_CONTAMINATION)
    }

    /// Read pairs as an integer count
    pub fn read_pairs(&self) -> u64 {
        let value = self.get(metric::READ_PAIRS);
        if value.is_finite() && value > 0.0 {
            value as u64
        } else {
            0
        }
    }
}

// ============================================================================
// Stage outcomes
// ============================================================================

/// Result of an optional pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum StageOutcome<T> {
    /// Stage skipped (earlier short-circuit or validation aborted)
    NotEvaluated,
    /// Stage ran; values may legitimately be zero
    Evaluated(T),
}

impl<T> StageOutcome<T> {
    pub fn is_evaluated(&self) -> bool {
        matches!(self, StageOutcome::Evaluated(_))
    }

    pub fn as_evaluated(&self) -> Option<&T> {
        match self {
            StageOutcome::Evaluated(value) => Some(value),
            StageOutcome::NotEvaluated => None,
        }
    }
}

impl<T> Default for StageOutcome<T> {
    fn default() -> Self {
        StageOutcome::NotEvaluated
    }
}

/// Figures read from a quality-control archive
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceQualityMetrics {
    /// False when the archive was absent or unreadable
    pub artifact_present: bool,
    pub read_pairs: u64,
    pub gc_content: f64,
    pub mean_quality: f64,
}

impl SequenceQualityMetrics {
    pub fn to_metrics(&self) -> ValidationMetrics {
        let mut metrics = ValidationMetrics::new();
        metrics.set(metric::READ_PAIRS, self.read_pairs as f64);
        metrics.set(metric::GC_CONTENT, self.gc_content);
        metrics.set(metric::MEAN_QUALITY, self.mean_quality);
        metrics
    }
}

/// Figures read from the taxonomic-classification and species-abundance reports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxonomicMetrics {
    /// False when the classification report was absent or unreadable
    pub artifact_present: bool,
    pub total_reads: u64,
    pub fungal_reads: u64,
    pub host_reads: u64,
    pub fungal_signal: f64,
    pub host_contamination: f64,
    /// Top 5 species by abundance, descending
    pub dominant_species: Vec<String>,
    /// Top 10 species and their fractional abundance, descending
    pub species_abundance: Vec<(String, f64)>,
}

impl TaxonomicMetrics {
    pub fn to_metrics(&self) -> ValidationMetrics {
        let mut metrics = ValidationMetrics::new();
        metrics.set(metric::FUNGAL_SIGNAL, self.fungal_signal);
        metrics.set(metric::HOST_CONTAMINATION, self.host_contamination);
        metrics
    }
}

// ============================================================================
// Validation result
// ============================================================================

/// Final decision for one accession
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub accession: Accession,
    pub passes_all: bool,
    pub metrics: ValidationMetrics,
    /// Problems that explain a failure, in the order they were found
    pub warnings: Vec<String>,
    pub replacement_candidates: Option<Vec<Accession>>,
    pub sequence_quality: StageOutcome<SequenceQualityMetrics>,
    pub taxonomy: StageOutcome<TaxonomicMetrics>,
    /// Criteria shortfalls of evaluated stages; informational only
    pub advisories: Vec<String>,
}

impl ValidationResult {
    /// Failed result with a single warning and no evaluated stages
    pub fn failed(accession: impl Into<Accession>, metrics: ValidationMetrics, warning: String) -> Self {
        Self {
            accession: accession.into(),
            passes_all: false,
            metrics,
            warnings: vec![warning],
            replacement_candidates: None,
            sequence_quality: StageOutcome::NotEvaluated,
            taxonomy: StageOutcome::NotEvaluated,
            advisories: Vec::new(),
        }
    }

    /// Result for a validation task that errored, panicked, or timed out
    pub fn task_failure(accession: impl Into<Accession>, message: impl std::fmt::Display) -> Self {
        let mut metrics = ValidationMetrics::new();
        metrics.set(metric::ERROR, 1.0);
        Self::failed(accession, metrics, format!("Validation failed: {}", message))
    }

    pub fn status_label(&self) -> &'static str {
        if self.passes_all {
            "PASS"
        } else {
            "FAIL"
        }
    }
}

// ============================================================================
// Batch job
// ============================================================================

/// Input to the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub struct BatchJob {
    accessions: Vec<Accession>,
    batch_size: usize,
    worker_count: usize,
}

impl BatchJob {
    /// Both sizes must be at least 1; the accession list may be empty
    pub fn new(
        accessions: Vec<Accession>,
        batch_size: usize,
        worker_count: usize,
    ) -> Result<Self, BatchJobError> {
        if batch_size == 0 {
            return Err(BatchJobError::ZeroBatchSize);
        }
        if worker_count == 0 {
            return Err(BatchJobError::ZeroWorkerCount);
        }
        Ok(Self {
            accessions,
            batch_size,
            worker_count,
        })
    }

    pub fn accessions(&self) -> &[Accession] {
        &self.accessions
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn chunks(&self) -> std::slice::Chunks<'_, Accession> {
        self.accessions.chunks(self.batch_size)
    }

    pub fn total_chunks(&self) -> usize {
        self.accessions.len().div_ceil(self.batch_size)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum BatchJobError {
    #[error("batch_size must be at least 1")]
    ZeroBatchSize,
    #[error("worker_count must be at least 1")]
    ZeroWorkerCount,
}

// ============================================================================
// Validation trait
// ============================================================================

/// Produces one [`ValidationResult`] per accession
///
/// Implementations should fold sample problems into warnings themselves;
/// an `Err` is treated by the orchestrator as an unexpected task failure.
#[async_trait]
pub trait SampleValidation: Send + Sync {
    /// Validator name (for logging)
    fn name(&self) -> &'static str;

    async fn validate(&self, accession: &str) -> Result<ValidationResult, ValidationError>;
}

/// Unexpected validator failure
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_metric_reads_zero() {
        let metrics = ValidationMetrics::new();
        assert_eq!(metrics.fungal_signal(), 0.0);
        assert_eq!(metrics.read_pairs(), 0);
        assert!(!metrics.contains(metric::FUNGAL_SIGNAL));
    }

    #[test]
    fn test_with_defaults_has_standard_metrics() {
        let metrics = ValidationMetrics::with_defaults();
        assert_eq!(metrics.len(), metric::STANDARD.len());
        assert!(metric::STANDARD.iter().all(|m| metrics.contains(m)));
    }

    #[test]
    fn test_task_failure_shape() {
        let result = ValidationResult::task_failure("SRR1", "boom");
        assert!(!result.passes_all);
        assert_eq!(result.metrics.get(metric::ERROR), 1.0);
        assert_eq!(result.warnings, vec!["Validation failed: boom".to_string()]);
        assert_eq!(result.status_label(), "FAIL");
        assert!(!result.taxonomy.is_evaluated());
    }

    #[test]
    fn test_not_evaluated_differs_from_zero_observation() {
        let unrun: StageOutcome<TaxonomicMetrics> = StageOutcome::NotEvaluated;
        let zero = StageOutcome::Evaluated(TaxonomicMetrics::default());
        assert_ne!(unrun, zero);
        assert_eq!(zero.as_evaluated().map(|t| t.fungal_signal), Some(0.0));
    }

    #[test]
    fn test_batch_job_chunking() {
        let accessions: Vec<Accession> = (0..7).map(|i| format!("S{i}")).collect();
        let job = BatchJob::new(accessions, 3, 2).unwrap();
        assert_eq!(job.total_chunks(), 3);
        let sizes: Vec<usize> = job.chunks().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
    }

    #[test]
    fn test_batch_job_rejects_zero_sizes() {
        assert_eq!(
            BatchJob::new(vec![], 0, 1).unwrap_err(),
            BatchJobError::ZeroBatchSize
        );
        assert_eq!(
            BatchJob::new(vec![], 1, 0).unwrap_err(),
            BatchJobError::ZeroWorkerCount
        );
        assert_eq!(BatchJob::new(vec![], 5, 1).unwrap().total_chunks(), 0);
    }
}
