//! Validation Orchestrator
//!
//! Runs a validator over an ordered accession list with bounded parallelism.
//!
//! # Scheduling
//! The list is split into sequential chunks of `batch_size`. A chunk is handed
//! to the [`WorkerPool`](worker_pool::WorkerPool), which runs up to
//! `worker_count` validations at once; the next chunk starts only after every
//! task of the current one has completed. At most `min(batch_size,
//! worker_count)` validations are in flight at any time.
//!
//! # Fault isolation
//! Errors, panics and chunk timeouts inside a task become a failed
//! [`ValidationResult`] for that accession (`metrics = {error: 1.0}`,
//! warning `Validation failed: <message>`). They never abort the batch.
//!
//! # Coverage
//! Every input accession has exactly one entry in the returned mapping.
//! Duplicated accessions are each validated; results are applied in input
//! order so the last occurrence wins. Duplicates are reported on the outcome.
//!
//! Only configuration and storage-root failures are fatal, and they happen
//! in [`ValidationOrchestrator::from_config`] before any sample is touched.

pub mod statistics;
pub mod worker_pool;

use crate::error::{ValidatorError, ValidatorResult};
use crate::types::{Accession, BatchJob, SampleValidation, ValidationResult};
use crate::validators::SingleSampleValidator;
use chrono::Utc;
use fungimap_common::config::{OrchestratorConfig, StorageRootInitializer, ValidatorConfig};
use fungimap_common::{ValidationEvent, ValidationEventBus};
use statistics::{batch_percent, BatchProgress, ProgressSnapshot};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;
use worker_pool::{Job, WorkerPool};

/// Scheduling parameters for a run
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    pub batch_size: usize,
    pub worker_count: usize,
    pub chunk_timeout: Duration,
}

impl From<&OrchestratorConfig> for OrchestratorSettings {
    fn from(config: &OrchestratorConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            worker_count: config.worker_count,
            chunk_timeout: config.chunk_timeout(),
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&OrchestratorConfig::default())
    }
}

/// Everything a batch run produced
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub batch_id: Uuid,
    /// One result per distinct input accession
    pub results: HashMap<Accession, ValidationResult>,
    /// Accessions that appeared more than once, in order of first appearance
    pub duplicates: Vec<Accession>,
    /// Tasks that returned a validator result
    pub processed_count: usize,
    /// Tasks converted to failures (error, panic, timeout)
    pub failed_count: usize,
    pub elapsed: Duration,
}

impl BatchOutcome {
    pub fn passed_count(&self) -> usize {
        self.results.values().filter(|r| r.passes_all).count()
    }

    pub fn progress(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total: self.processed_count + self.failed_count,
            processed: self.processed_count,
            failed: self.failed_count,
        }
    }
}

/// Batch validation orchestrator
pub struct ValidationOrchestrator {
    validator: Arc<dyn SampleValidation>,
    settings: OrchestratorSettings,
    event_bus: ValidationEventBus,
}

impl ValidationOrchestrator {
    /// Build the standard pipeline from configuration
    ///
    /// Fails if the configuration is invalid or the storage root cannot be
    /// created.
    pub fn from_config(
        config: &ValidatorConfig,
        event_bus: ValidationEventBus,
    ) -> ValidatorResult<Self> {
        config.validate()?;
        StorageRootInitializer::new(config.storage_root()).ensure_directory_exists()?;

        let validator = Arc::new(SingleSampleValidator::new(config));
        Ok(Self::with_validator(
            validator,
            OrchestratorSettings::from(&config.orchestrator),
            event_bus,
        ))
    }

    /// Use any validator implementation
    pub fn with_validator(
        validator: Arc<dyn SampleValidation>,
        settings: OrchestratorSettings,
        event_bus: ValidationEventBus,
    ) -> Self {
        Self {
            validator,
            settings,
            event_bus,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn event_bus(&self) -> &ValidationEventBus {
        &self.event_bus
    }

    /// Validate `accessions` with the configured batch size and worker count
    pub async fn validate_batch(&self, accessions: &[Accession]) -> ValidatorResult<BatchOutcome> {
        let job = BatchJob::new(
            accessions.to_vec(),
            self.settings.batch_size,
            self.settings.worker_count,
        )
        .map_err(|e| ValidatorError::InvalidBatch(e.to_string()))?;

        Ok(self.run(&job).await)
    }

    /// Run a batch job to completion
    pub async fn run(&self, job: &BatchJob) -> BatchOutcome {
        let batch_id = Uuid::new_v4();
        let started = Instant::now();
        let accessions = job.accessions();
        let total_chunks = job.total_chunks();

        let duplicates = find_duplicates(accessions);
        if !duplicates.is_empty() {
            tracing::warn!(
                batch_id = %batch_id,
                duplicates = ?duplicates,
                "Duplicate accessions in batch; last occurrence wins"
            );
        }

        tracing::info!(
            batch_id = %batch_id,
            validator = self.validator.name(),
            accessions = accessions.len(),
            batch_size = job.batch_size(),
            workers = job.worker_count(),
            total_chunks,
            "Starting batch validation"
        );
        self.event_bus.emit_lossy(ValidationEvent::BatchStarted {
            batch_id,
            total_accessions: accessions.len(),
            total_chunks,
            timestamp: Utc::now(),
        });

        let progress = Arc::new(BatchProgress::new(accessions.len()));
        let pool = WorkerPool::new(job.worker_count());
        let mut results: HashMap<Accession, ValidationResult> = HashMap::with_capacity(accessions.len());

        for (chunk_index, chunk) in job.chunks().enumerate() {
            let offset = chunk_index * job.batch_size();
            let jobs: Vec<Job> = chunk
                .iter()
                .enumerate()
                .map(|(i, accession)| (offset + i, accession.clone()))
                .collect();

            let completions = pool
                .run_chunk(
                    Arc::clone(&self.validator),
                    jobs,
                    self.settings.chunk_timeout,
                    Arc::clone(&progress),
                )
                .await;

            let mut slots: Vec<Option<ValidationResult>> = vec![None; chunk.len()];
            for completion in completions {
                self.event_bus.emit_lossy(ValidationEvent::SampleValidated {
                    batch_id,
                    accession: completion.result.accession.clone(),
                    passes_all: completion.result.passes_all,
                    warnings_count: completion.result.warnings.len(),
                    timestamp: Utc::now(),
                });
                if let Some(slot) = completion
                    .position
                    .checked_sub(offset)
                    .and_then(|i| slots.get_mut(i))
                {
                    *slot = Some(completion.result);
                }
            }

            // Input order, so a later duplicate overwrites an earlier one
            for (accession, slot) in chunk.iter().zip(slots) {
                let result = slot.unwrap_or_else(|| {
                    tracing::error!(accession = %accession, "No completion received for task");
                    progress.record_failure();
                    ValidationResult::task_failure(accession, "no result returned by worker")
                });
                results.insert(accession.clone(), result);
            }

            let chunk_number = chunk_index + 1;
            let percent_complete = batch_percent(offset + chunk.len(), accessions.len());
            let snapshot = progress.snapshot();
            tracing::info!(
                batch_id = %batch_id,
                chunk = chunk_number,
                total_chunks,
                processed = snapshot.processed,
                failed = snapshot.failed,
                "Batch {}/{} completed - {:.1}% total progress",
                chunk_number,
                total_chunks,
                percent_complete
            );
            self.event_bus.emit_lossy(ValidationEvent::ChunkCompleted {
                batch_id,
                chunk_index: chunk_number,
                total_chunks,
                percent_complete,
                processed_count: snapshot.processed,
                failed_count: snapshot.failed,
                timestamp: Utc::now(),
            });
        }

        let snapshot = progress.snapshot();
        let elapsed = started.elapsed();

        tracing::info!(
            batch_id = %batch_id,
            results = results.len(),
            processed = snapshot.processed,
            failed = snapshot.failed,
            duration_ms = elapsed.as_millis() as u64,
            "Batch validation complete: {}",
            snapshot.display_string()
        );
        self.event_bus.emit_lossy(ValidationEvent::BatchCompleted {
            batch_id,
            total_results: results.len(),
            processed_count: snapshot.processed,
            failed_count: snapshot.failed,
            duration_ms: elapsed.as_millis() as u64,
            timestamp: Utc::now(),
        });

        BatchOutcome {
            batch_id,
            results,
            duplicates,
            processed_count: snapshot.processed,
            failed_count: snapshot.failed,
            elapsed,
        }
    }
}

/// Accessions occurring more than once, in order of first appearance
fn find_duplicates(accessions: &[Accession]) -> Vec<Accession> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for accession in accessions {
        *counts.entry(accession.as_str()).or_default() += 1;
    }

    let mut duplicates = Vec::new();
    for accession in accessions {
        if let Some(count) = counts.get_mut(accession.as_str()) {
            if *count > 1 {
                duplicates.push(accession.clone());
                // Report each duplicate once
                *count = 0;
            }
        }
    }
    duplicates
}
