//! Enrichment Stage
//!
//! Best-effort lookup of supplementary profile data keyed by the record's
//! website. The page text Validation already fetched is handed to the
//! lookup, so the website is downloaded once per record. Absent website,
//! lookup failure or timeout all yield an empty `Enrichment`; this stage
//! never fails.

use crate::error::ExtractionError;
use crate::extractors::{call_with_timeout, DEFAULT_SOURCE_TIMEOUT};
use crate::types::{Enrichment, RawRecord};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

static LISTED_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:Provider\s+)?Name[:\s]+(.+?)\s*$").expect("valid name regex")
});
static EDUCATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^\s*Education[:\s]+(.+?)\s*$").expect("valid education regex"));
static CERTIFICATIONS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^\s*Certifications?[:\s]+(.+?)\s*$").expect("valid certification regex")
});
static AFFILIATIONS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^\s*Hospital\s+Affiliations?[:\s]+(.+?)\s*$").expect("valid affiliation regex")
});

/// External profile lookup
#[async_trait]
pub trait EnrichmentLookup: Send + Sync {
    fn name(&self) -> &'static str;

    /// Look up supplementary data for a provider website.
    ///
    /// `page` is the website text fetched during validation, if the fetch
    /// succeeded.
    ///
    /// # Errors
    /// Returns `ExtractionError` when the lookup cannot be performed.
    async fn lookup(&self, website: &str, page: Option<&str>)
        -> Result<Enrichment, ExtractionError>;
}

/// Lookup that never finds anything
pub struct NoEnrichment;

#[async_trait]
impl EnrichmentLookup for NoEnrichment {
    fn name(&self) -> &'static str {
        "None"
    }

    async fn lookup(
        &self,
        _website: &str,
        _page: Option<&str>,
    ) -> Result<Enrichment, ExtractionError> {
        Ok(Enrichment::default())
    }
}

/// Reads labelled profile lines (`Education:`, `Certifications:`,
/// `Hospital Affiliations:`) from the provider's own website. An
/// unfetched page yields nothing.
pub struct WebsiteEnrichment;

#[async_trait]
impl EnrichmentLookup for WebsiteEnrichment {
    fn name(&self) -> &'static str {
        "Website"
    }

    async fn lookup(
        &self,
        _website: &str,
        page: Option<&str>,
    ) -> Result<Enrichment, ExtractionError> {
        Ok(page.map(parse_enrichment).unwrap_or_default())
    }
}

/// Extract enrichment fields from page text
pub fn parse_enrichment(text: &str) -> Enrichment {
    let line = |re: &Regex| -> Option<String> {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    };
    let list = |re: &Regex| -> Vec<String> {
        line(re)
            .map(|items| {
                items
                    .split([',', ';'])
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    };

    Enrichment {
        listed_name: line(&LISTED_NAME_RE),
        education: line(&EDUCATION_RE),
        certifications: list(&CERTIFICATIONS_RE),
        hospital_affiliations: list(&AFFILIATIONS_RE),
    }
}

/// Enrichment stage
pub struct EnrichmentStage {
    lookup: Arc<dyn EnrichmentLookup>,
    timeout: Duration,
}

impl EnrichmentStage {
    pub fn new(lookup: Arc<dyn EnrichmentLookup>) -> Self {
        Self {
            lookup,
            timeout: DEFAULT_SOURCE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enrich `record`; `page` is the already fetched website text
    pub async fn run(&self, record: &RawRecord, page: Option<&str>) -> Enrichment {
        let Some(website) = record
            .website
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty())
        else {
            return Enrichment::default();
        };

        match call_with_timeout(self.timeout, self.lookup.lookup(website, page)).await {
            Ok(enrichment) => {
                debug!(
                    record_id = record.id,
                    source = self.lookup.name(),
                    empty = enrichment.is_empty(),
                    "Enrichment lookup complete"
                );
                enrichment
            }
            Err(e) => {
                warn!(
                    record_id = record.id,
                    source = self.lookup.name(),
                    error = %e,
                    "Enrichment lookup failed, continuing without it"
                );
                Enrichment::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "Welcome\n\
        Name: Dr. Jane Roe\n\
        Education: MD, Stanford University\n\
        Certifications: Board Certified; ACLS\n\
        Hospital Affiliations: City Hospital, Mercy General\n";

    /// Lookup that never answers
    struct StalledLookup;

    #[async_trait]
    impl EnrichmentLookup for StalledLookup {
        fn name(&self) -> &'static str {
            "Stalled"
        }

        async fn lookup(
            &self,
            _website: &str,
            _page: Option<&str>,
        ) -> Result<Enrichment, ExtractionError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Enrichment::default())
        }
    }

    fn with_website(id: i64, website: &str) -> RawRecord {
        RawRecord {
            website: Some(website.to_string()),
            ..RawRecord::new(id)
        }
    }

    #[test]
    fn test_parse_enrichment() {
        let enrichment = parse_enrichment(PAGE);
        assert_eq!(enrichment.listed_name.as_deref(), Some("Dr. Jane Roe"));
        assert_eq!(enrichment.education.as_deref(), Some("MD, Stanford University"));
        assert_eq!(enrichment.certifications, vec!["Board Certified", "ACLS"]);
        assert_eq!(
            enrichment.hospital_affiliations,
            vec!["City Hospital", "Mercy General"]
        );
    }

    #[test]
    fn test_parse_empty_page() {
        assert!(parse_enrichment("").is_empty());
    }

    #[tokio::test]
    async fn test_no_website_is_empty() {
        let stage = EnrichmentStage::new(Arc::new(WebsiteEnrichment));
        assert!(stage.run(&RawRecord::new(1), Some(PAGE)).await.is_empty());
    }

    #[tokio::test]
    async fn test_website_page_parsed() {
        let stage = EnrichmentStage::new(Arc::new(WebsiteEnrichment));
        let enrichment = stage.run(&with_website(2, "roe.example"), Some(PAGE)).await;
        assert_eq!(enrichment.certifications.len(), 2);
    }

    #[tokio::test]
    async fn test_unfetched_page_is_empty() {
        let stage = EnrichmentStage::new(Arc::new(WebsiteEnrichment));
        assert!(stage.run(&with_website(3, "down.example"), None).await.is_empty());
    }

    #[tokio::test]
    async fn test_stalled_lookup_is_empty() {
        let stage =
            EnrichmentStage::new(Arc::new(StalledLookup)).with_timeout(Duration::from_millis(20));
        assert!(stage.run(&with_website(4, "slow.example"), Some(PAGE)).await.is_empty());
    }
}
