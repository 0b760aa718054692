//! Evidence Extractors
//!
//! Capability interfaces consumed by the pipeline, one trait per evidence
//! source so each can be swapped or mocked independently:
//! 1. **DocumentExtractor** - document text → candidate fields
//! 2. **WebFetcher** - website → plain text
//! 3. **PhoneValidator** - region-aware phone validation/normalization
//! 4. **Similarity** - symmetric string similarity in [0, 1]
//!
//! # Degrade, don't fail
//! Network and disk bound calls go through [`call_with_timeout`]; a stalled
//! source turns into `ExtractionError::Timeout`, a panicking one into
//! `ExtractionError::Panicked`, and the stage substitutes an empty result.

pub mod document;
pub mod phone;
pub mod similarity;
pub mod web;

pub use document::{parse_provider_fields, TextDocumentExtractor};
pub use phone::{LibPhoneValidator, PhoneCheck};
pub use similarity::NormalizedLevenshtein;
pub use web::HttpWebFetcher;

use crate::error::ExtractionError;
use crate::types::EvidenceBundle;
use crate::utils::panic_message;
use async_trait::async_trait;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

/// Default per-call timeout for I/O-bound evidence sources
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Document text extraction + field parsing
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Extractor name for provenance tracking
    fn name(&self) -> &'static str;

    /// Extract candidate fields from the referenced document
    ///
    /// # Errors
    /// Returns `ExtractionError` if the document cannot be read; absent
    /// patterns are not errors and yield `None` fields.
    async fn extract(&self, document_ref: &str) -> Result<EvidenceBundle, ExtractionError>;
}

/// Web content retrieval
#[async_trait]
pub trait WebFetcher: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetch the page text behind `url`
    ///
    /// # Errors
    /// Returns `ExtractionError` on network failure or non-success status.
    async fn fetch(&self, url: &str) -> Result<String, ExtractionError>;
}

/// Phone-format validation/normalization
pub trait PhoneValidator: Send + Sync {
    fn validate(&self, raw: &str, region: &str) -> PhoneCheck;
}

/// Symmetric string similarity
pub trait Similarity: Send + Sync {
    /// Score in [0, 1]; `0.0` if either side is empty
    fn score(&self, a: &str, b: &str) -> f64;
}

/// The set of evidence sources one pipeline uses
#[derive(Clone)]
pub struct Extractors {
    pub document: Arc<dyn DocumentExtractor>,
    pub web: Arc<dyn WebFetcher>,
    pub phone: Arc<dyn PhoneValidator>,
    pub similarity: Arc<dyn Similarity>,
}

impl Extractors {
    /// Production extractors with the given HTTP timeout
    pub fn production(http_timeout: Duration) -> Result<Self, ExtractionError> {
        Ok(Self {
            document: Arc::new(TextDocumentExtractor::new()),
            web: Arc::new(HttpWebFetcher::new(http_timeout)?),
            phone: Arc::new(LibPhoneValidator),
            similarity: Arc::new(NormalizedLevenshtein),
        })
    }
}

/// Run an extractor call with a hard time bound.
///
/// A panic inside `fut` is caught and reported as an error so one broken
/// source cannot take the whole record down.
pub async fn call_with_timeout<T, F>(timeout: Duration, fut: F) -> Result<T, ExtractionError>
where
    F: Future<Output = Result<T, ExtractionError>>,
{
    match tokio::time::timeout(timeout, AssertUnwindSafe(fut).catch_unwind()).await {
        Ok(Ok(result)) => result,
        Ok(Err(panic)) => Err(ExtractionError::Panicked(panic_message(panic.as_ref()))),
        Err(_) => Err(ExtractionError::Timeout(timeout)),
    }
}

// ============================================================================
// Mock Extractors for Testing
// ============================================================================
