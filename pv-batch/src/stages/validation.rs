//! Validation Stage
//!
//! Gathers evidence for one record and scores the claimed values against it.
//!
//! # Algorithm
//! 1. `document_ref` present → extract document fields (skipped otherwise)
//! 2. `website` present → fetch page text, keep a bounded preview (not scored)
//! 3. Region-aware phone validation/normalization of the claimed phone
//! 4. `name_score`, `address_score`: similarity of claimed vs document values
//!    (0.0 when either side is missing)
//! 5. `combined_score` from the fixed weights in `fusion::scoring`

use crate::extractors::document::{bundle_from_text, DEFAULT_PREVIEW_CHARS};
use crate::extractors::{call_with_timeout, Extractors, PhoneCheck, DEFAULT_SOURCE_TIMEOUT};
use crate::fusion::scoring::{combined_score, sanitize};
use crate::types::{EvidenceBundle, EvidenceField, EvidenceSource, MatchScores, RawRecord};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Validation output consumed by QA and Reconciliation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutput {
    pub scores: MatchScores,
    /// Claimed bundle first, then document and web when attempted
    pub evidence: Vec<EvidenceBundle>,
    /// Full website text, reused by enrichment; only the preview is stored
    #[serde(skip)]
    pub web_page: Option<String>,
}

impl ValidationOutput {
    pub fn bundle(&self, source: EvidenceSource) -> Option<&EvidenceBundle> {
        self.evidence.iter().find(|b| b.source == source)
    }

    /// Field value from a specific source's bundle
    pub fn evidence_field(&self, source: EvidenceSource, field: EvidenceField) -> Option<&str> {
        self.bundle(source).and_then(|b| b.field(field))
    }
}

/// Validation stage
pub struct ValidationStage {
    extractors: Extractors,
    region: String,
    source_timeout: Duration,
    preview_chars: usize,
}

impl ValidationStage {
    pub fn new(extractors: Extractors) -> Self {
        Self {
            extractors,
            region: "US".to_string(),
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    /// Default region for phone numbers without a country code
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    pub fn with_preview_chars(mut self, chars: usize) -> Self {
        self.preview_chars = chars;
        self
    }

    pub async fn run(&self, record: &RawRecord) -> ValidationOutput {
        let claimed = EvidenceBundle::claimed(record);
        let mut evidence = vec![claimed];

        let document = match non_blank(&record.document_ref) {
            Some(doc_ref) => {
                let bundle = self.extract_document(record.id, doc_ref).await;
                evidence.push(bundle.clone());
                Some(bundle)
            }
            None => None,
        };

        let mut web_page = None;
        if let Some(website) = non_blank(&record.website) {
            let (bundle, page) = self.fetch_website(record.id, website).await;
            evidence.push(bundle);
            web_page = page;
        }

        let phone = match non_blank(&record.phone) {
            Some(raw) => self.extractors.phone.validate(raw, &self.region),
            None => PhoneCheck::absent(),
        };

        let doc_field = |field| document.as_ref().and_then(|b| b.field(field));

        let name_score = self.similarity(
            record.id,
            "name",
            non_blank(&record.name),
            doc_field(EvidenceField::Name),
        );
        let address_score = self.similarity(
            record.id,
            "address",
            non_blank(&record.address),
            doc_field(EvidenceField::Address),
        );

        let scores = MatchScores {
            phone_valid: phone.is_valid,
            phone_normalized: phone.normalized,
            name_score,
            address_score,
            combined_score: combined_score(name_score, phone.is_valid, address_score),
        };

        debug!(
            record_id = record.id,
            name_score = scores.name_score,
            address_score = scores.address_score,
            phone_valid = scores.phone_valid,
            combined = scores.combined_score,
            "Validation scores computed"
        );

        ValidationOutput {
            scores,
            evidence,
            web_page,
        }
    }

    async fn extract_document(&self, record_id: i64, doc_ref: &str) -> EvidenceBundle {
        let extractor = &self.extractors.document;
        match call_with_timeout(self.source_timeout, extractor.extract(doc_ref)).await {
            Ok(mut bundle) => {
                bundle.source = EvidenceSource::Document;
                bundle
            }
            Err(e) => {
                warn!(
                    record_id,
                    source = extractor.name(),
                    error = %e,
                    "Document extraction failed, scoring without it"
                );
                EvidenceBundle::failed(EvidenceSource::Document, e.to_string())
            }
        }
    }

    /// Web bundle plus the full page text when the fetch succeeded
    async fn fetch_website(
        &self,
        record_id: i64,
        website: &str,
    ) -> (EvidenceBundle, Option<String>) {
        let fetcher = &self.extractors.web;
        match call_with_timeout(self.source_timeout, fetcher.fetch(website)).await {
            Ok(text) => {
                let bundle = bundle_from_text(EvidenceSource::Web, &text, self.preview_chars);
                (bundle, Some(text))
            }
            Err(e) => {
                warn!(
                    record_id,
                    source = fetcher.name(),
                    error = %e,
                    "Website fetch failed"
                );
                (EvidenceBundle::failed(EvidenceSource::Web, e.to_string()), None)
            }
        }
    }

    /// Similarity with both sides required; out-of-range results degrade to
    /// the worst case rather than failing the record
    fn similarity(&self, record_id: i64, field: &str, a: Option<&str>, b: Option<&str>) -> f64 {
        let (Some(a), Some(b)) = (a, b) else {
            return 0.0;
        };
        let raw = self.extractors.similarity.score(a, b);
        let score = sanitize(raw);
        if score != raw {
            warn!(
                record_id,
                field,
                raw_score = raw,
                "Similarity outside [0, 1], clamped"
            );
        }
        score
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
