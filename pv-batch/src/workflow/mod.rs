//! Batch workflow
//!
//! - **pipeline:** runs the five stages for one record
//! - **scheduler:** runs many records under a concurrency cap, isolates
//!   per-record failures and collects the `BatchResult`
//!
//! Progress is reported through an optional `BatchEvent` channel.

pub mod pipeline;
pub mod scheduler;

pub use pipeline::{RecordOutput, RecordPipeline};
pub use scheduler::{BatchScheduler, DEFAULT_CONCURRENCY, DEFAULT_SINK_TIMEOUT};

use crate::types::{FlagKind, RecordState};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Batch progress events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BatchEvent {
    /// Batch accepted, records about to be admitted
    BatchStarted {
        batch_id: Uuid,
        concurrency: usize,
        /// Unix timestamp (seconds since epoch)
        timestamp: i64,
    },

    /// A record moved to a new lifecycle state
    RecordStateChanged { record_id: i64, state: RecordState },

    /// A record completed with a profile
    RecordFinished {
        record_id: i64,
        final_confidence: f64,
        flags: Vec<FlagKind>,
    },

    /// Every record has a terminal state
    BatchCompleted {
        batch_id: Uuid,
        completed: usize,
        failed: usize,
        cancelled: bool,
    },
}
