//! Batch-level services

pub mod report_generator;
pub mod resource_estimator;
pub mod validation_orchestrator;

pub use report_generator::{ReportRow, ReportSummary, ValidationReport};
pub use resource_estimator::{AccessionEstimate, ResourceEstimate, ResourceEstimator};
pub use validation_orchestrator::{BatchOutcome, OrchestratorSettings, ValidationOrchestrator};
