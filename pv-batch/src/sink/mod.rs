//! Sink Adapter
//!
//! Where finished records go. The scheduler hands every completed profile to
//! one [`ProfileSink`] and every outreach draft to one
//! [`OutreachDispatcher`]; both are shared across concurrent record tasks,
//! so implementations own whatever serialization their store needs.
//!
//! Writes for distinct record ids are independent: there is no cross-record
//! transaction and nothing already written is rolled back on cancellation.

pub mod channel;
pub mod memory;
pub mod sqlite;

pub use channel::ChannelDispatcher;
pub use memory::{MemorySink, StoredProfile};
pub use sqlite::SqliteSink;

use crate::error::SinkError;
use crate::types::{OutreachDraft, Profile};
use async_trait::async_trait;

/// Persists finished profiles
#[async_trait]
pub trait ProfileSink: Send + Sync {
    fn name(&self) -> &'static str;

    /// Upsert the profile for `record_id` together with its raw evidence.
    ///
    /// Must be idempotent for the same record id. Failures are reported to
    /// the caller, which logs them and keeps the record's outcome.
    async fn persist(
        &self,
        record_id: i64,
        profile: &Profile,
        raw_evidence: &serde_json::Value,
    ) -> Result<(), SinkError>;
}

/// Downstream consumer of outreach drafts (send queue, log table, ...)
#[async_trait]
pub trait OutreachDispatcher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn dispatch(&self, draft: &OutreachDraft) -> Result<(), SinkError>;
}
