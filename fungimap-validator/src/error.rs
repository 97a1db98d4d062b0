//! Error types for fungimap-validator
//!
//! Only run-level failures live here. Anything that goes wrong for a single
//! sample is folded into that sample's warnings and never reaches these types.

use thiserror::Error;

/// Result type for run-level operations
pub type ValidatorResult<T> = std::result::Result<T, ValidatorError>;

/// Run-level error type
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// Fatal configuration or storage failure
    #[error(transparent)]
    Common(#[from] fungimap_common::Error),

    /// Batch parameters the orchestrator cannot run with
    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    /// Report could not be serialized
    #[error("Report error: {0}")]
    Report(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
