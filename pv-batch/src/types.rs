//! Core data model for the validation pipeline
//!
//! One `RawRecord` flows through five stages and comes out as one `Profile`:
//! - **Validation:** evidence bundles + `MatchScores`
//! - **QA:** `QaResult` (flags, status)
//! - **Enrichment:** supplementary `Enrichment`
//! - **Reconciliation:** the fused `Profile`
//! - **Outreach-Decision:** optional `OutreachDraft`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

// ============================================================================
// Input
// ============================================================================

/// Directory record as read from the input. Immutable once read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Unique within a batch
    pub id: i64,
    pub name: Option<String>,
    pub npi: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub specialty: Option<String>,
    pub website: Option<String>,
    /// Path or handle to a scannable document
    pub document_ref: Option<String>,
    pub email: Option<String>,
    pub practice_name: Option<String>,
}

impl RawRecord {
    /// Create a record with only an id set
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}

// ============================================================================
// Evidence
// ============================================================================

/// Where a piece of evidence came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSource {
    Claimed,
    Document,
    Web,
}

/// Attribute names shared by evidence bundles and profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceField {
    Name,
    Phone,
    Address,
    Specialty,
}

impl EvidenceField {
    pub const ALL: [EvidenceField; 4] = [
        EvidenceField::Name,
        EvidenceField::Phone,
        EvidenceField::Address,
        EvidenceField::Specialty,
    ];
}

/// Per-source partial extraction. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceBundle {
    pub source: EvidenceSource,
    /// Every field in `EvidenceField::ALL` is present; `None` means not found
    pub fields: BTreeMap<EvidenceField, Option<String>>,
    /// Bounded raw-text preview, diagnostics only
    pub preview: Option<String>,
    /// Extraction error text if the source was unusable
    pub error: Option<String>,
}

impl EvidenceBundle {
    /// Bundle with every field absent
    pub fn empty(source: EvidenceSource) -> Self {
        Self {
            source,
            fields: EvidenceField::ALL.iter().map(|f| (*f, None)).collect(),
            preview: None,
            error: None,
        }
    }

    /// Bundle for a source that could not be used
    pub fn failed(source: EvidenceSource, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::empty(source)
        }
    }

    /// Bundle built from the claimed values of a record
    pub fn claimed(record: &RawRecord) -> Self {
        Self::empty(EvidenceSource::Claimed)
            .with_field(EvidenceField::Name, record.name.clone())
            .with_field(EvidenceField::Phone, record.phone.clone())
            .with_field(EvidenceField::Address, record.address.clone())
            .with_field(EvidenceField::Specialty, record.specialty.clone())
    }

    /// Builder-style field setter; blank strings are stored as absent
    pub fn with_field(mut self, field: EvidenceField, value: Option<String>) -> Self {
        let value = value.filter(|v| !v.trim().is_empty());
        self.fields.insert(field, value);
        self
    }

    pub fn with_preview(mut self, text: &str, max_chars: usize) -> Self {
        self.preview = Some(text.chars().take(max_chars).collect());
        self
    }

    pub fn field(&self, field: EvidenceField) -> Option<&str> {
        self.fields.get(&field).and_then(|v| v.as_deref())
    }

    pub fn is_usable(&self) -> bool {
        self.error.is_none()
    }
}

/// Comparison outputs for one record, derived from the record and its evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchScores {
    pub phone_valid: bool,
    pub phone_normalized: Option<String>,
    pub name_score: f64,
    pub address_score: f64,
    pub combined_score: f64,
}

// ============================================================================
// QA
// ============================================================================

/// Flags raised against a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    LowConfidence,
    InvalidPhone,
    NameMismatch,
}

impl FlagKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagKind::LowConfidence => "low_confidence",
            FlagKind::InvalidPhone => "invalid_phone",
            FlagKind::NameMismatch => "name_mismatch",
        }
    }
}

/// Review status of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QaStatus {
    Confirmed,
    ManualReview,
}

impl QaStatus {
    /// `ManualReview` iff any flag is set
    pub fn from_flags(flags: &BTreeSet<FlagKind>) -> Self {
        if flags.is_empty() {
            QaStatus::Confirmed
        } else {
            QaStatus::ManualReview
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QaStatus::Confirmed => "confirmed",
            QaStatus::ManualReview => "manual_review",
        }
    }
}

/// QA stage output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaResult {
    /// `combined_score` rounded to 3 decimals
    pub confidence: f64,
    pub flags: BTreeSet<FlagKind>,
    pub status: QaStatus,
}

// ============================================================================
// Enrichment
// ============================================================================

/// Supplementary evidence from an external profile lookup. Never scored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    /// Name as listed by the external profile (name-fusion candidate)
    pub listed_name: Option<String>,
    pub education: Option<String>,
    pub certifications: Vec<String>,
    pub hospital_affiliations: Vec<String>,
}

impl Enrichment {
    pub fn is_empty(&self) -> bool {
        self.listed_name.is_none()
            && self.education.is_none()
            && self.certifications.is_empty()
            && self.hospital_affiliations.is_empty()
    }
}

// ============================================================================
// Profile
// ============================================================================

/// A reconciled attribute with provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub value: Option<String>,
    /// Confidence score (0.0-1.0)
    pub confidence: f64,
    /// Sources consulted, in fixed priority order
    pub sources: Vec<String>,
}

impl FieldValue {
    /// Create a field value with clamped confidence (0.0-1.0)
    pub fn new(value: Option<String>, confidence: f64, sources: Vec<String>) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            value,
            confidence,
            sources,
        }
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

/// Fused output for one record; the unit handed to the sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub provider_id: i64,
    pub name: FieldValue,
    pub phone: FieldValue,
    pub address: FieldValue,
    pub specialty: FieldValue,
    pub final_confidence: f64,
    /// Superset of the QA flags for this record
    pub flags: BTreeSet<FlagKind>,
    pub contact_email: Option<String>,
    pub practice_name: Option<String>,
}

impl Profile {
    pub fn field(&self, field: EvidenceField) -> &FieldValue {
        match field {
            EvidenceField::Name => &self.name,
            EvidenceField::Phone => &self.phone,
            EvidenceField::Address => &self.address,
            EvidenceField::Specialty => &self.specialty,
        }
    }

    /// Fields as (name, value) pairs in fixed order
    pub fn fields(&self) -> impl Iterator<Item = (EvidenceField, &FieldValue)> {
        EvidenceField::ALL.into_iter().map(move |f| (f, self.field(f)))
    }

    pub fn status(&self) -> QaStatus {
        QaStatus::from_flags(&self.flags)
    }
}

// ============================================================================
// Outreach
// ============================================================================

/// Verification request for a record that needs attention.
///
/// `recipient == None` means "draft produced, not sendable".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutreachDraft {
    pub provider_id: i64,
    pub subject: String,
    pub body: String,
    pub recipient: Option<String>,
    pub verification_link: String,
}

impl OutreachDraft {
    pub fn is_sendable(&self) -> bool {
        self.recipient.is_some()
    }
}

// ============================================================================
// Batch output
// ============================================================================

/// Per-record lifecycle: `Queued → Running → {Completed | Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    Queued,
    Running,
    Completed,
    Failed,
}

/// Outcome of one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub record_id: i64,
    pub state: RecordState,
    pub profile: Option<Profile>,
    pub qa: Option<QaResult>,
    pub scores: Option<MatchScores>,
    pub outreach: Option<OutreachDraft>,
    /// Failure reason, or a sink/dispatch error for a completed record
    pub error: Option<String>,
}

impl RecordOutcome {
    pub fn failed(record_id: i64, error: impl ToString) -> Self {
        Self {
            record_id,
            state: RecordState::Failed,
            profile: None,
            qa: None,
            scores: None,
            outreach: None,
            error: Some(error.to_string()),
        }
    }
}

/// Outcomes of one batch run, in completion order. Owned by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cancelled: bool,
    pub outcomes: Vec<RecordOutcome>,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn completed(&self) -> impl Iterator<Item = &RecordOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.state == RecordState::Completed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &RecordOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.state == RecordState::Failed)
    }

    pub fn outcome(&self, record_id: i64) -> Option<&RecordOutcome> {
        self.outcomes.iter().find(|o| o.record_id == record_id)
    }
}
