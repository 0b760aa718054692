//! Record Pipeline
//!
//! Runs Validation → QA → Enrichment → Reconciliation → Outreach-Decision
//! for a single record, strictly in that order.
//!
//! # Error Handling
//! Stages degrade instead of failing: a missing or broken evidence source
//! shows up as empty evidence and lower scores. A record with no usable
//! evidence at all still yields a profile with the worst-case scores.

use crate::extractors::Extractors;
use crate::stages::{
    ConfidencePolicy, EnrichmentLookup, EnrichmentStage, OutreachStage, QaStage,
    ReconciliationStage, ValidationOutput, ValidationStage, WebsiteEnrichment,
};
use crate::types::{Enrichment, OutreachDraft, Profile, QaResult, RawRecord};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Everything the stages produced for one record
#[derive(Debug, Clone, Serialize)]
pub struct RecordOutput {
    pub record: RawRecord,
    pub validation: ValidationOutput,
    pub qa: QaResult,
    pub enrichment: Enrichment,
    pub profile: Profile,
    pub outreach: Option<OutreachDraft>,
}

impl RecordOutput {
    /// Evidence document stored next to the profile
    pub fn raw_evidence_json(&self) -> serde_json::Value {
        serde_json::json!({
            "record": self.record,
            "validation": self.validation,
            "qa": self.qa,
            "enrichment": self.enrichment,
            "profile": self.profile,
            "outreach": self.outreach,
        })
    }
}

/// Five-stage pipeline for one record
pub struct RecordPipeline {
    validation: ValidationStage,
    qa: QaStage,
    enrichment: EnrichmentStage,
    reconciliation: ReconciliationStage,
    outreach: OutreachStage,
}

impl RecordPipeline {
    /// Pipeline with default stage settings; enrichment parses the website
    /// page validation fetched
    pub fn new(extractors: Extractors) -> Self {
        Self {
            validation: ValidationStage::new(extractors),
            qa: QaStage::new(),
            enrichment: EnrichmentStage::new(Arc::new(WebsiteEnrichment)),
            reconciliation: ReconciliationStage::default(),
            outreach: OutreachStage::default(),
        }
    }

    pub fn with_validation(mut self, validation: ValidationStage) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_enrichment(mut self, lookup: Arc<dyn EnrichmentLookup>, timeout: Duration) -> Self {
        self.enrichment = EnrichmentStage::new(lookup).with_timeout(timeout);
        self
    }

    pub fn with_confidence_policy(mut self, policy: ConfidencePolicy) -> Self {
        self.reconciliation = ReconciliationStage::new(policy);
        self
    }

    pub fn with_verification_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.outreach = OutreachStage::new(base_url);
        self
    }

    /// Run all stages for one record
    pub async fn process(&self, record: &RawRecord) -> RecordOutput {
        let validation = self.validation.run(record).await;
        let qa = self.qa.run(&validation.scores);
        let enrichment = self
            .enrichment
            .run(record, validation.web_page.as_deref())
            .await;
        let profile = self
            .reconciliation
            .run(record, &validation, &qa, &enrichment);
        let outreach = self.outreach.run(&profile);

        debug!(
            record_id = record.id,
            status = profile.status().as_str(),
            outreach = outreach.is_some(),
            "Record pipeline complete"
        );

        RecordOutput {
            record: record.clone(),
            validation,
            qa,
            enrichment,
            profile,
            outreach,
        }
    }
}
