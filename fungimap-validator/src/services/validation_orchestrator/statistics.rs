//! Batch progress accounting
//!
//! Counters are updated by whichever worker finishes a task, so they are
//! atomics; increments are never lost under concurrent completion.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Live counters for one batch run
#[derive(Debug)]
pub struct BatchProgress {
    total: usize,
    /// Tasks that produced a result from the validator
    processed: AtomicUsize,
    /// Tasks that errored, panicked, or timed out
    failed: AtomicUsize,
}

impl BatchProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            processed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    pub fn record_success(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn processed_count(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn failed_count(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total: self.total,
            processed: self.processed_count(),
            failed: self.failed_count(),
        }
    }
}

/// Point-in-time copy of [`BatchProgress`]
///
/// Display: "N of M samples finished (F failed)"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
}

impl ProgressSnapshot {
    pub fn finished(&self) -> usize {
        self.processed + self.failed
    }

    pub fn display_string(&self) -> String {
        format!(
            "{} of {} samples finished ({} failed)",
            self.finished(),
            self.total,
            self.failed
        )
    }
}

/// Percentage of the batch's samples dispatched once `samples_done` are through
pub fn batch_percent(samples_done: usize, total_samples: usize) -> f64 {
    if total_samples == 0 {
        100.0
    } else {
        samples_done as f64 / total_samples as f64 * 100.0
    }
}
