//! pv-batch library interface
//!
//! Batch validation pipeline for provider directory records: gathers
//! evidence for each record, scores and flags it, reconciles a profile and
//! decides on outreach. Exposed as a library for the binary and for
//! integration tests.

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod fusion;
pub mod input;
pub mod output;
pub mod sink;
pub mod stages;
pub mod types;
pub mod utils;
pub mod workflow;

pub use crate::error::{BatchError, ExtractionError, PipelineError, SinkError};
pub use crate::types::{BatchResult, Profile, RawRecord, RecordOutcome, RecordState};
pub use crate::workflow::{BatchEvent, BatchScheduler, RecordPipeline};
