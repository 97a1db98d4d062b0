//! fungimap-validator library interface
//!
//! Screens metagenomic samples for downstream analysis: scores metadata
//! completeness, reads quality-control and taxonomic reports, and runs the
//! per-sample validation across batches with bounded parallelism.

pub mod analyzers;
pub mod error;
pub mod services;
pub mod store;
pub mod types;
pub mod validators;

pub use crate::error::{ValidatorError, ValidatorResult};
pub use crate::services::report_generator::ValidationReport;
pub use crate::services::validation_orchestrator::{BatchOutcome, ValidationOrchestrator};
pub use crate::types::{BatchJob, SampleValidation, StageOutcome, ValidationMetrics, ValidationResult};
pub use crate::validators::SingleSampleValidator;
