//! Test Helper Utilities
//!
//! Canned evidence sources and record builders shared by the pv-batch
//! integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use pv_batch::extractors::{
    DocumentExtractor, Extractors, LibPhoneValidator, NormalizedLevenshtein, WebFetcher,
};
use pv_batch::types::{EvidenceBundle, EvidenceField, EvidenceSource};
use pv_batch::{ExtractionError, RawRecord};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Document extractor with canned bundles, optional delay and refs that panic
#[derive(Default)]
pub struct CannedDocuments {
    documents: HashMap<String, EvidenceBundle>,
    panic_on: HashSet<String>,
    delay: Option<Duration>,
}

impl CannedDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(mut self, doc_ref: &str, name: &str, address: &str) -> Self {
        let bundle = EvidenceBundle::empty(EvidenceSource::Document)
            .with_field(EvidenceField::Name, Some(name.to_string()))
            .with_field(EvidenceField::Address, Some(address.to_string()));
        self.documents.insert(doc_ref.to_string(), bundle);
        self
    }

    /// Extracting `doc_ref` panics inside the pipeline
    pub fn panicking(mut self, doc_ref: &str) -> Self {
        self.panic_on.insert(doc_ref.to_string());
        self
    }

    /// Every extraction sleeps first
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl DocumentExtractor for CannedDocuments {
    fn name(&self) -> &'static str {
        "CannedDocuments"
    }

    async fn extract(&self, document_ref: &str) -> Result<EvidenceBundle, ExtractionError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panic_on.contains(document_ref) {
            panic!("corrupt document {}", document_ref);
        }
        self.documents
            .get(document_ref)
            .cloned()
            .ok_or_else(|| ExtractionError::NotAvailable(document_ref.to_string()))
    }
}

/// Web fetcher with canned pages keyed by the URL as given
#[derive(Default)]
pub struct CannedWeb {
    pages: HashMap<String, String>,
}

impl CannedWeb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, text: &str) -> Self {
        self.pages.insert(url.to_string(), text.to_string());
        self
    }
}

#[async_trait]
impl WebFetcher for CannedWeb {
    fn name(&self) -> &'static str {
        "CannedWeb"
    }

    async fn fetch(&self, url: &str) -> Result<String, ExtractionError> {
        self.pages
            .get(url)
            .cloned()
            .ok_or(ExtractionError::Status(404))
    }
}

/// Canned document/web sources with the real phone validator and similarity
pub fn extractors(documents: CannedDocuments, web: CannedWeb) -> Extractors {
    Extractors {
        document: Arc::new(documents),
        web: Arc::new(web),
        phone: Arc::new(LibPhoneValidator),
        similarity: Arc::new(NormalizedLevenshtein),
    }
}

/// A well-formed record whose document `doc-{id}` agrees with the claim
pub fn good_record(id: i64) -> RawRecord {
    RawRecord {
        name: Some(format!("Dr. Provider {}", id)),
        phone: Some("(650) 253-0000".to_string()),
        address: Some(format!("{} Market St, San Francisco, CA", id)),
        specialty: Some("Cardiology".to_string()),
        document_ref: Some(format!("doc-{}", id)),
        email: Some(format!("provider{}@clinic.example", id)),
        ..RawRecord::new(id)
    }
}

/// Documents matching `good_record` for each id
pub fn documents_for(ids: impl IntoIterator<Item = i64>) -> CannedDocuments {
    ids.into_iter().fold(CannedDocuments::new(), |docs, id| {
        docs.document(
            &format!("doc-{}", id),
            &format!("Dr. Provider {}", id),
            &format!("{} Market St, San Francisco, CA", id),
        )
    })
}

/// Invalid phone, no address, no document, no website
pub fn jane_roe(id: i64) -> RawRecord {
    RawRecord {
        name: Some("Jane Roe".to_string()),
        phone: Some("not-a-number".to_string()),
        address: Some(String::new()),
        ..RawRecord::new(id)
    }
}
