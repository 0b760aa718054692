//! Pipeline stages
//!
//! Run in strict order for each record:
//! Validation → QA → Enrichment → Reconciliation → Outreach-Decision.
//!
//! Stages never return errors: an unusable evidence source is converted into
//! an empty/absent result at the stage boundary and lowers the scores instead.

pub mod enrichment;
pub mod outreach;
pub mod qa;
pub mod reconciliation;
pub mod validation;

pub use enrichment::{EnrichmentLookup, EnrichmentStage, NoEnrichment, WebsiteEnrichment};
pub use outreach::{OutreachStage, DEFAULT_VERIFICATION_BASE_URL, OUTREACH_CONFIDENCE_THRESHOLD};
pub use qa::QaStage;
pub use reconciliation::{ConfidencePolicy, ReconciliationStage, PLACEHOLDER_CONFIDENCE};
pub use validation::{ValidationOutput, ValidationStage};
