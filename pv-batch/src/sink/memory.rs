//! In-memory sink for dry runs and tests

use super::{OutreachDispatcher, ProfileSink};
use crate::error::SinkError;
use crate::types::{OutreachDraft, Profile};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

/// A persisted profile with its evidence
#[derive(Debug, Clone)]
pub struct StoredProfile {
    pub profile: Profile,
    pub raw_evidence: serde_json::Value,
}

/// Upsert map keyed by record id, plus the list of dispatched drafts
#[derive(Default)]
pub struct MemorySink {
    profiles: Mutex<BTreeMap<i64, StoredProfile>>,
    drafts: Mutex<Vec<OutreachDraft>>,
    writes: Mutex<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn profile(&self, record_id: i64) -> Option<StoredProfile> {
        self.profiles.lock().await.get(&record_id).cloned()
    }

    /// Stored profiles ordered by record id
    pub async fn profiles(&self) -> Vec<StoredProfile> {
        self.profiles.lock().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.profiles.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.profiles.lock().await.is_empty()
    }

    /// Total persist calls, including overwrites
    pub async fn writes(&self) -> usize {
        *self.writes.lock().await
    }

    /// Dispatched drafts in dispatch order
    pub async fn drafts(&self) -> Vec<OutreachDraft> {
        self.drafts.lock().await.clone()
    }
}

#[async_trait]
impl ProfileSink for MemorySink {
    fn name(&self) -> &'static str {
        "Memory"
    }

    async fn persist(
        &self,
        record_id: i64,
        profile: &Profile,
        raw_evidence: &serde_json::Value,
    ) -> Result<(), SinkError> {
        self.profiles.lock().await.insert(
            record_id,
            StoredProfile {
                profile: profile.clone(),
                raw_evidence: raw_evidence.clone(),
            },
        );
        *self.writes.lock().await += 1;
        Ok(())
    }
}

#[async_trait]
impl OutreachDispatcher for MemorySink {
    fn name(&self) -> &'static str {
        "Memory"
    }

    async fn dispatch(&self, draft: &OutreachDraft) -> Result<(), SinkError> {
        self.drafts.lock().await.push(draft.clone());
        Ok(())
    }
}
