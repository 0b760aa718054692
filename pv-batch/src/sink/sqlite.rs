//! SQLite-backed sink
//!
//! Profiles are upserted into `providers`, drafts appended to
//! `outreach_logs`. The pool hands each write its own connection; lock
//! contention is absorbed by `retry_on_lock`.

use super::{OutreachDispatcher, ProfileSink};
use crate::db::{self, ProviderRow};
use crate::error::SinkError;
use crate::types::{OutreachDraft, Profile};
use crate::utils::DEFAULT_MAX_LOCK_WAIT_MS;
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

/// Sink writing to the `providers` / `outreach_logs` tables
#[derive(Clone)]
pub struct SqliteSink {
    pool: SqlitePool,
    max_lock_wait_ms: u64,
}

impl SqliteSink {
    /// Wrap a pool whose tables are already initialized
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            max_lock_wait_ms: DEFAULT_MAX_LOCK_WAIT_MS,
        }
    }

    pub fn with_max_lock_wait_ms(mut self, max_lock_wait_ms: u64) -> Self {
        self.max_lock_wait_ms = max_lock_wait_ms;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// String field of the input record embedded in the raw evidence
fn record_field(raw_evidence: &serde_json::Value, key: &str) -> Option<String> {
    raw_evidence
        .get("record")
        .and_then(|r| r.get(key))
        .and_then(|v| v.as_str())
        .map(String::from)
}

#[async_trait]
impl ProfileSink for SqliteSink {
    fn name(&self) -> &'static str {
        "SQLite"
    }

    async fn persist(
        &self,
        record_id: i64,
        profile: &Profile,
        raw_evidence: &serde_json::Value,
    ) -> Result<(), SinkError> {
        let row = ProviderRow {
            id: None,
            source_id: record_id,
            name: profile.name.value.clone(),
            npi: record_field(raw_evidence, "npi"),
            phone: profile.phone.value.clone(),
            address: profile.address.value.clone(),
            website: record_field(raw_evidence, "website"),
            specialty: profile.specialty.value.clone(),
            source_json: raw_evidence.clone(),
            confidence: profile.final_confidence,
            flags: profile.flags.iter().map(|f| f.as_str().to_string()).collect(),
            status: profile.status().as_str().to_string(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        };

        db::upsert_provider(&self.pool, &row, self.max_lock_wait_ms).await?;
        debug!(record_id, "Provider upserted");
        Ok(())
    }
}

#[async_trait]
impl OutreachDispatcher for SqliteSink {
    fn name(&self) -> &'static str {
        "SQLite"
    }

    async fn dispatch(&self, draft: &OutreachDraft) -> Result<(), SinkError> {
        let log_id = db::log_outreach(&self.pool, draft, self.max_lock_wait_ms).await?;
        debug!(
            record_id = draft.provider_id,
            log_id,
            sendable = draft.is_sendable(),
            "Outreach logged"
        );
        Ok(())
    }
}
