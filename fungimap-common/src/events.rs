//! Validation progress events
//!
//! The orchestrator reports progress through a [`ValidationEventBus`] handed to
//! it at construction. There is no process-wide bus: each orchestrator owns the
//! bus it was given, so independent runs in one process never observe each
//! other's events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events emitted while a batch is validated
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ValidationEvent {
    /// Batch accepted and partitioned into chunks
    BatchStarted {
        batch_id: Uuid,
        total_accessions: usize,
        total_chunks: usize,
        timestamp: DateTime<Utc>,
    },

    /// One accession finished (successfully or not)
    SampleValidated {
        batch_id: Uuid,
        accession: String,
        passes_all: bool,
        warnings_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Every task of a chunk has completed
    ///
    /// `chunk_index` is 1-based; `percent_complete` is the share of the batch
    /// samples dispatched so far.
    ChunkCompleted {
        batch_id: Uuid,
        chunk_index: usize,
        total_chunks: usize,
        percent_complete: f64,
        processed_count: usize,
        failed_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// All chunks done; result mapping assembled
    BatchCompleted {
        batch_id: Uuid,
        total_results: usize,
        processed_count: usize,
        failed_count: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

impl ValidationEvent {
    pub fn event_type(&self) -> &str {
        match self {
            ValidationEvent::BatchStarted { .. } => "BatchStarted",
            ValidationEvent::SampleValidated { .. } => "SampleValidated",
            ValidationEvent::ChunkCompleted { .. } => "ChunkCompleted",
            ValidationEvent::BatchCompleted { .. } => "BatchCompleted",
        }
    }

    pub fn batch_id(&self) -> Uuid {
        match self {
            ValidationEvent::BatchStarted { batch_id, .. }
            | ValidationEvent::SampleValidated { batch_id, .. }
            | ValidationEvent::ChunkCompleted { batch_id, .. }
            | ValidationEvent::BatchCompleted { batch_id, .. } => *batch_id,
        }
    }
}

/// Broadcast channel for validation events
///
/// Cloning shares the underlying channel.
#[derive(Clone)]
pub struct ValidationEventBus {
    tx: broadcast::Sender<ValidationEvent>,
    capacity: usize,
}

impl ValidationEventBus {
    /// Create a bus buffering up to `capacity` events per slow subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ValidationEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    pub fn emit(
        &self,
        event: ValidationEvent,
    ) -> Result<usize, broadcast::error::SendError<ValidationEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ValidationEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ValidationEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
