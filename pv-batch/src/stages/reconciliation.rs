//! Reconciliation Stage
//!
//! Fuses validation, QA and enrichment output into one `Profile`.
//!
//! # Field rules
//! - **name:** most frequent non-null candidate across
//!   `[validation, enrichment, document]`, earliest source wins ties.
//!   Confidence is the share of candidates agreeing with the winner.
//! - **phone:** normalized claimed phone, else the document phone.
//!   Confidence 1.0 when valid, 0.0 otherwise.
//! - **address / specialty:** claimed value, else the document value.
//!   Confidence is `address_score` / QA confidence respectively.
//!
//! `sources` always lists every source consulted, not only the winner.
//!
//! # Final confidence
//! `ConfidencePolicy::Placeholder` keeps the provisional constant (0.9 when
//! any name candidate exists). It is not derived from the match scores and
//! may disagree with QA confidence. `ConfidencePolicy::Weighted` blends QA
//! confidence with name agreement instead.

use crate::fusion::{fuse_name, round3, NameCandidate, NameFusion, NAME_SOURCES};
use crate::stages::validation::ValidationOutput;
use crate::types::{
    Enrichment, EvidenceField, EvidenceSource, FieldValue, Profile, QaResult, RawRecord,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Provisional final confidence used by `ConfidencePolicy::Placeholder`
pub const PLACEHOLDER_CONFIDENCE: f64 = 0.9;

/// Default QA share for `ConfidencePolicy::Weighted`
pub const DEFAULT_QA_WEIGHT: f64 = 0.7;

/// Sources consulted for phone, address and specialty
const FIELD_SOURCES: [&str; 2] = ["claimed", "document"];

/// How `final_confidence` is computed
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ConfidencePolicy {
    /// 0.9 when a name candidate exists, else 0.0
    #[default]
    Placeholder,
    /// `qa_weight * qa.confidence + (1 - qa_weight) * name agreement`
    Weighted { qa_weight: f64 },
}

impl ConfidencePolicy {
    /// Build from the configured policy name; unknown names fall back to
    /// `Placeholder`
    pub fn from_config(name: Option<&str>, qa_weight: Option<f64>) -> Self {
        match name.map(|n| n.trim().to_ascii_lowercase()).as_deref() {
            Some("weighted") => ConfidencePolicy::Weighted {
                qa_weight: qa_weight
                    .filter(|w| w.is_finite())
                    .map(|w| w.clamp(0.0, 1.0))
                    .unwrap_or(DEFAULT_QA_WEIGHT),
            },
            _ => ConfidencePolicy::Placeholder,
        }
    }

    pub fn final_confidence(&self, qa: &QaResult, name: &NameFusion) -> f64 {
        match *self {
            ConfidencePolicy::Placeholder => {
                if name.candidates > 0 {
                    PLACEHOLDER_CONFIDENCE
                } else {
                    0.0
                }
            }
            ConfidencePolicy::Weighted { qa_weight } => {
                round3(qa_weight * qa.confidence + (1.0 - qa_weight) * name.agreement())
            }
        }
    }
}

/// Reconciliation stage
#[derive(Debug, Clone, Default)]
pub struct ReconciliationStage {
    policy: ConfidencePolicy,
}

impl ReconciliationStage {
    pub fn new(policy: ConfidencePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ConfidencePolicy {
        self.policy
    }

    pub fn run(
        &self,
        record: &RawRecord,
        validation: &ValidationOutput,
        qa: &QaResult,
        enrichment: &Enrichment,
    ) -> Profile {
        let claimed = |field| validation.evidence_field(EvidenceSource::Claimed, field);
        let document = |field| validation.evidence_field(EvidenceSource::Document, field);

        let candidates: Vec<NameCandidate<'_>> = NAME_SOURCES
            .into_iter()
            .zip([
                claimed(EvidenceField::Name),
                enrichment.listed_name.as_deref(),
                document(EvidenceField::Name),
            ])
            .map(|(source, value)| NameCandidate { source, value })
            .collect();
        let fused = fuse_name(&candidates);

        let name = FieldValue::new(
            fused.value.clone(),
            fused.agreement(),
            NAME_SOURCES.iter().map(|s| s.to_string()).collect(),
        );

        let phone_value = validation
            .scores
            .phone_normalized
            .clone()
            .or_else(|| document(EvidenceField::Phone).map(String::from));
        let phone = field_value(
            phone_value,
            if validation.scores.phone_valid { 1.0 } else { 0.0 },
        );

        let address = field_value(
            prefer_claimed(claimed(EvidenceField::Address), document(EvidenceField::Address)),
            validation.scores.address_score,
        );

        let specialty_value = prefer_claimed(
            claimed(EvidenceField::Specialty),
            document(EvidenceField::Specialty),
        );
        let specialty_confidence = if specialty_value.is_some() {
            qa.confidence
        } else {
            0.0
        };
        let specialty = field_value(specialty_value, specialty_confidence);

        let final_confidence = self.policy.final_confidence(qa, &fused);

        debug!(
            record_id = record.id,
            name = ?fused.value,
            votes = fused.votes,
            candidates = fused.candidates,
            final_confidence,
            "Profile reconciled"
        );

        Profile {
            provider_id: record.id,
            name,
            phone,
            address,
            specialty,
            final_confidence,
            flags: qa.flags.clone(),
            contact_email: trimmed(record.email.as_deref()),
            practice_name: trimmed(record.practice_name.as_deref()),
        }
    }
}

fn field_value(value: Option<String>, confidence: f64) -> FieldValue {
    FieldValue::new(
        value,
        confidence,
        FIELD_SOURCES.iter().map(|s| s.to_string()).collect(),
    )
}

fn prefer_claimed(claimed: Option<&str>, document: Option<&str>) -> Option<String> {
    trimmed(claimed).or_else(|| trimmed(document))
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
