//! Document Extractor
//!
//! Reads pre-extracted document text from disk and recognizes the labelled
//! fields a scanned provider form carries (`Name:`, `Phone:`, `Address:`,
//! `Specialty:`). Rasterization/OCR happens upstream; this extractor only
//! consumes its text output.

use super::DocumentExtractor;
use crate::error::ExtractionError;
use crate::types::{EvidenceBundle, EvidenceField, EvidenceSource};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Default length of the diagnostic text preview
pub const DEFAULT_PREVIEW_CHARS: usize = 800;

static NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Name[:\s]+([A-Z][a-z]+(?:[ \t][A-Z][a-z]+)+)").expect("valid name regex")
});
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Phone[:\s]+([0-9+()\-. x]+)").expect("valid phone regex"));
static EXTENSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"x\d+").expect("valid extension regex"));
static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Address[:\s]+([^\n]+?)(?:Specialty:|\n|$)").expect("valid address regex")
});
static SPECIALTY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Specialty[:\s]+([A-Za-z &]+)").expect("valid specialty regex"));

/// Parse labelled provider fields out of free text.
///
/// Fields whose pattern does not match are `None`; this never fails.
pub fn parse_provider_fields(text: &str) -> [(EvidenceField, Option<String>); 4] {
    let capture = |re: &Regex| -> Option<String> {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    };

    let phone = capture(&PHONE_RE)
        .map(|p| EXTENSION_RE.replace_all(&p, "").trim().to_string())
        .filter(|p| !p.is_empty());

    [
        (EvidenceField::Name, capture(&NAME_RE)),
        (EvidenceField::Phone, phone),
        (EvidenceField::Address, capture(&ADDRESS_RE)),
        (EvidenceField::Specialty, capture(&SPECIALTY_RE)),
    ]
}

/// Build an evidence bundle for `source` from free text
pub fn bundle_from_text(source: EvidenceSource, text: &str, preview_chars: usize) -> EvidenceBundle {
    parse_provider_fields(text)
        .into_iter()
        .fold(EvidenceBundle::empty(source), |bundle, (field, value)| {
            bundle.with_field(field, value)
        })
        .with_preview(text, preview_chars)
}

/// Reads document text from the filesystem
pub struct TextDocumentExtractor {
    preview_chars: usize,
}

impl TextDocumentExtractor {
    pub fn new() -> Self {
        Self {
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    pub fn with_preview_chars(preview_chars: usize) -> Self {
        Self { preview_chars }
    }
}

impl Default for TextDocumentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentExtractor for TextDocumentExtractor {
    fn name(&self) -> &'static str {
        "TextDocument"
    }

    async fn extract(&self, document_ref: &str) -> Result<EvidenceBundle, ExtractionError> {
        let bytes = tokio::fs::read(document_ref).await?;
        let text = String::from_utf8_lossy(&bytes);

        debug!(
            document = document_ref,
            chars = text.len(),
            "Document text loaded"
        );

        Ok(bundle_from_text(EvidenceSource::Document, &text, self.preview_chars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FORM: &str = "Provider Registration\n\
        Name: Jane Roe\n\
        Phone: (415) 555-0132 x1015\n\
        Address: 12 Market St, San Francisco CA\n\
        Specialty: Family Medicine\n";

    fn field(parsed: &[(EvidenceField, Option<String>); 4], f: EvidenceField) -> Option<String> {
        parsed.iter().find(|(k, _)| *k == f).and_then(|(_, v)| v.clone())
    }

    #[test]
    fn test_parse_all_fields() {
        let parsed = parse_provider_fields(FORM);
        assert_eq!(field(&parsed, EvidenceField::Name).as_deref(), Some("Jane Roe"));
        assert_eq!(field(&parsed, EvidenceField::Phone).as_deref(), Some("(415) 555-0132"));
        assert_eq!(
            field(&parsed, EvidenceField::Address).as_deref(),
            Some("12 Market St, San Francisco CA")
        );
        assert_eq!(
            field(&parsed, EvidenceField::Specialty).as_deref(),
            Some("Family Medicine")
        );
    }

    #[test]
    fn test_missing_patterns_are_none() {
        let parsed = parse_provider_fields("nothing useful here");
        assert!(parsed.iter().all(|(_, v)| v.is_none()));
    }

    #[test]
    fn test_address_stops_at_specialty_label() {
        let parsed = parse_provider_fields("Address: 1 Main St Specialty: Cardiology");
        assert_eq!(field(&parsed, EvidenceField::Address).as_deref(), Some("1 Main St"));
        assert_eq!(field(&parsed, EvidenceField::Specialty).as_deref(), Some("Cardiology"));
    }

    #[tokio::test]
    async fn test_extract_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FORM.as_bytes()).unwrap();

        let extractor = TextDocumentExtractor::with_preview_chars(10);
        let bundle = extractor
            .extract(file.path().to_str().unwrap())
            .await
            .unwrap();

        assert_eq!(bundle.source, EvidenceSource::Document);
        assert_eq!(bundle.field(EvidenceField::Name), Some("Jane Roe"));
        assert_eq!(bundle.preview.as_deref().map(|p| p.chars().count()), Some(10));
        assert!(bundle.is_usable());
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let extractor = TextDocumentExtractor::new();
        let result = extractor.extract("/definitely/not/here.txt").await;
        assert!(matches!(result, Err(ExtractionError::Io(_))));
    }
}
