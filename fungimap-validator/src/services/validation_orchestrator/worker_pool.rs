//! Bounded worker pool for one chunk of accessions
//!
//! A chunk's accessions are loaded into a job queue that `min(W, chunk_len)`
//! workers drain. Each validation runs as its own task so a panic stays
//! inside it; its outcome is converted into a [`TaskCompletion`] and sent on
//! the completion channel. The pool returns once every job has a completion.
//!
//! All jobs of a chunk share one deadline. A task still running when it
//! passes is aborted, and jobs still queued at that point fail the same way.

use super::statistics::BatchProgress;
use crate::types::{Accession, SampleValidation, ValidationResult};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// One queued validation: position in the batch input and accession
pub type Job = (usize, Accession);

/// Outcome of one job
#[derive(Debug, Clone)]
pub struct TaskCompletion {
    /// Position of the accession in the batch input
    pub position: usize,
    pub result: ValidationResult,
    /// True when the result came from the failure path
    pub failed: bool,
}

/// Fixed-size pool of validation workers
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    worker_count: usize,
}

impl WorkerPool {
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count: worker_count.max(1),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Validate every job, at most `worker_count` at a time
    ///
    /// Returns exactly one completion per job, in completion order.
    pub async fn run_chunk(
        &self,
        validator: Arc<dyn SampleValidation>,
        jobs: Vec<Job>,
        timeout: Duration,
        progress: Arc<BatchProgress>,
    ) -> Vec<TaskCompletion> {
        let job_count = jobs.len();
        if job_count == 0 {
            return Vec::new();
        }

        let deadline = Instant::now() + timeout;

        let (job_tx, job_rx) = mpsc::channel::<Job>(job_count);
        for job in jobs {
            // Capacity equals job count, so this cannot block
            if job_tx.send(job).await.is_err() {
                break;
            }
        }
        drop(job_tx);

        let job_rx = Arc::new(Mutex::new(job_rx));
        let (done_tx, mut done_rx) = mpsc::channel::<TaskCompletion>(job_count);

        let workers = self.worker_count.min(job_count);
        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let job_rx = Arc::clone(&job_rx);
            let done_tx = done_tx.clone();
            let validator = Arc::clone(&validator);
            let progress = Arc::clone(&progress);

            handles.push(tokio::spawn(async move {
                loop {
                    // Lock only long enough to take one job
                    let job = job_rx.lock().await.recv().await;
                    let Some((position, accession)) = job else {
                        break;
                    };

                    debug!(worker = worker_id, accession = %accession, "Worker picked up job");
                    let completion =
                        run_task(Arc::clone(&validator), position, accession, deadline, timeout)
                            .await;

                    if completion.failed {
                        progress.record_failure();
                    } else {
                        progress.record_success();
                    }

                    if done_tx.send(completion).await.is_err() {
                        break;
                    }
                }
            }));
        }
        drop(done_tx);

        let mut completions = Vec::with_capacity(job_count);
        while let Some(completion) = done_rx.recv().await {
            completions.push(completion);
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Validation worker terminated abnormally");
            }
        }

        completions
    }
}

/// Run one validation in its own task, converting every failure into a result
async fn run_task(
    validator: Arc<dyn SampleValidation>,
    position: usize,
    accession: Accession,
    deadline: Instant,
    timeout: Duration,
) -> TaskCompletion {
    let task_accession = accession.clone();
    let mut handle =
        tokio::spawn(async move { validator.validate(&task_accession).await });

    let outcome = tokio::time::timeout_at(deadline, &mut handle).await;

    let (result, failed) = match outcome {
        Ok(Ok(Ok(mut result))) => {
            result.accession = accession.clone();
            (result, false)
        }
        Ok(Ok(Err(e))) => {
            warn!(accession = %accession, error = %e, "Validation task returned an error");
            (ValidationResult::task_failure(&accession, e), true)
        }
        Ok(Err(join_error)) => {
            let message = join_error_message(join_error);
            error!(accession = %accession, error = %message, "Validation task panicked");
            (ValidationResult::task_failure(&accession, message), true)
        }
        Err(_) => {
            handle.abort();
            warn!(
                accession = %accession,
                timeout_ms = timeout.as_millis() as u64,
                "Validation task timed out"
            );
            (
                ValidationResult::task_failure(
                    &accession,
                    format!("timed out after {timeout:?}"),
                ),
                true,
            )
        }
    };

    TaskCompletion {
        position,
        result,
        failed,
    }
}

fn join_error_message(join_error: JoinError) -> String {
    if join_error.is_panic() {
        panic_message(join_error.into_panic())
    } else {
        "task was cancelled".to_string()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic with non-string payload".to_string()
    }
}
