//! Report analyzers
//!
//! Each analyzer reads one kind of upstream tool output for an accession and
//! never fails: a missing artifact is a zero observation and a malformed one
//! is logged and also yields zero metrics. The reason is handed back
//! alongside the metrics so the validator can surface it.
//!
//! # Analyzers
//! 1. **taxonomic_composition** - classification and species-abundance reports
//! 2. **sequence_quality** - quality-control report archives

pub mod sequence_quality;
pub mod taxonomic_composition;

pub use sequence_quality::SequenceQualityAnalyzer;
pub use taxonomic_composition::TaxonomicCompositionAnalyzer;

use thiserror::Error;

/// Metrics from one analyzer plus why they may be incomplete
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis<T> {
    pub metrics: T,
    /// Set when an artifact was missing or could not be parsed
    pub issue: Option<String>,
}

impl<T> Analysis<T> {
    pub fn complete(metrics: T) -> Self {
        Self {
            metrics,
            issue: None,
        }
    }

    pub fn degraded(metrics: T, issue: impl Into<String>) -> Self {
        Self {
            metrics,
            issue: Some(issue.into()),
        }
    }
}

/// Failure to parse a tool report
#[derive(Debug, Error)]
pub enum ReportParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed record: {0}")]
    Record(#[from] csv::Error),

    #[error("invalid {field} value '{value}' on line {line}")]
    InvalidNumber {
        field: &'static str,
        value: String,
        line: u64,
    },

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("{0}")]
    MissingEntry(String),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
