//! Outreach-Decision Stage
//!
//! Decides whether a reconciled profile needs a verification request and
//! renders the draft. Trigger: `final_confidence < 0.6` or any flag.
//!
//! A draft with `recipient == None` is still a draft (not sendable); `None`
//! from [`OutreachStage::run`] means no outreach is needed.

use crate::types::{OutreachDraft, Profile};
use handlebars::Handlebars;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use tracing::{debug, error};

/// Profiles below this final confidence are always contacted
pub const OUTREACH_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Verification endpoint used when none is configured
pub const DEFAULT_VERIFICATION_BASE_URL: &str = "http://localhost:8000/verify";

const SUBJECT: &str = "Please verify your provider directory info";
const FALLBACK_NAME: &str = "Provider";
const NOT_AVAILABLE: &str = "N/A";

const BODY_TEMPLATE_NAME: &str = "outreach_body";

/// Provider fields are HTML-escaped; the link is built from configuration
/// and a numeric id, so it is inserted as is
const BODY_TEMPLATE: &str = "<p>Dear {{provider_name}},</p>

<p>We are updating our records for <b>{{practice_name}}</b>.</p>

<p>Our system noticed some missing or inconsistent details.</p>

<p><b>Current Info:</b><br>
Phone: {{phone}}<br>
Address: {{address}}</p>

<p>Please confirm or update your details by clicking the link below:<br>
<a href=\"{{{verification_link}}}\">Verify Now</a></p>

<p>Thank you,<br>Provider Validation Team</p>
";

static TEMPLATES: Lazy<Handlebars<'static>> = Lazy::new(|| {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars
        .register_template_string(BODY_TEMPLATE_NAME, BODY_TEMPLATE)
        .expect("valid outreach template");
    handlebars
});

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("valid email regex")
});

/// Outreach-Decision stage
#[derive(Debug, Clone)]
pub struct OutreachStage {
    verification_base_url: String,
}

impl Default for OutreachStage {
    fn default() -> Self {
        Self::new(DEFAULT_VERIFICATION_BASE_URL)
    }
}

impl OutreachStage {
    pub fn new(verification_base_url: impl Into<String>) -> Self {
        Self {
            verification_base_url: verification_base_url.into(),
        }
    }

    /// Whether a profile needs outreach at all
    pub fn should_contact(profile: &Profile) -> bool {
        profile.final_confidence < OUTREACH_CONFIDENCE_THRESHOLD || !profile.flags.is_empty()
    }

    pub fn run(&self, profile: &Profile) -> Option<OutreachDraft> {
        if !Self::should_contact(profile) {
            return None;
        }

        let provider_name = profile.name.value().unwrap_or(FALLBACK_NAME);
        let practice_name = profile.practice_name.as_deref().unwrap_or(provider_name);
        let phone = profile.phone.value().unwrap_or(NOT_AVAILABLE);
        let address = profile.address.value().unwrap_or(NOT_AVAILABLE);
        let recipient = valid_email(profile.contact_email.as_deref());
        let verification_link = format!(
            "{}?provider_id={}",
            self.verification_base_url.trim_end_matches('?'),
            profile.provider_id
        );

        let data = json!({
            "provider_name": provider_name,
            "practice_name": practice_name,
            "phone": phone,
            "address": address,
            "verification_link": verification_link,
        });
        let body = match TEMPLATES.render(BODY_TEMPLATE_NAME, &data) {
            Ok(body) => body,
            Err(e) => {
                error!(
                    record_id = profile.provider_id,
                    error = %e,
                    "Failed to render outreach body, sending the link only"
                );
                format!("<p><a href=\"{}\">Verify Now</a></p>\n", verification_link)
            }
        };

        debug!(
            record_id = profile.provider_id,
            sendable = recipient.is_some(),
            "Outreach draft produced"
        );

        Some(OutreachDraft {
            provider_id: profile.provider_id,
            subject: SUBJECT.to_string(),
            body,
            recipient,
            verification_link,
        })
    }
}

/// Syntactic email check; anything invalid counts as absent
pub fn valid_email(email: Option<&str>) -> Option<String> {
    let email = email.map(str::trim).filter(|e| !e.is_empty())?;
    if email.len() <= 254 && EMAIL_RE.is_match(email) {
        Some(email.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldValue, FlagKind};
    use std::collections::BTreeSet;

    fn profile(final_confidence: f64, flags: &[FlagKind]) -> Profile {
        let empty = || FieldValue::new(None, 0.0, vec![]);
        Profile {
            provider_id: 42,
            name: FieldValue::new(Some("Jane Roe".to_string()), 1.0, vec![]),
            phone: empty(),
            address: empty(),
            specialty: empty(),
            final_confidence,
            flags: flags.iter().copied().collect::<BTreeSet<_>>(),
            contact_email: None,
            practice_name: None,
        }
    }

    #[test]
    fn test_trigger_threshold() {
        let stage = OutreachStage::default();
        assert!(stage.run(&profile(0.59, &[])).is_some());
        assert!(stage.run(&profile(0.6, &[])).is_none());
        assert!(stage.run(&profile(0.9, &[FlagKind::InvalidPhone])).is_some());
    }

    #[test]
    fn test_draft_without_email_is_not_sendable() {
        let draft = OutreachStage::default().run(&profile(0.1, &[])).unwrap();
        assert_eq!(draft.provider_id, 42);
        assert_eq!(draft.subject, SUBJECT);
        assert_eq!(draft.recipient, None);
        assert!(!draft.is_sendable());
        assert_eq!(draft.verification_link, "http://localhost:8000/verify?provider_id=42");
    }

    #[test]
    fn test_body_fallbacks() {
        let mut p = profile(0.1, &[]);
        p.name = FieldValue::new(None, 0.0, vec![]);
        let draft = OutreachStage::new("https://verify.example/check").run(&p).unwrap();

        assert!(draft.body.contains("Dear Provider,"));
        assert!(draft.body.contains("records for <b>Provider</b>"));
        assert!(draft.body.contains("Phone: N/A<br>"));
        assert!(draft.body.contains("Address: N/A</p>"));
        assert!(draft.body.contains("href=\"https://verify.example/check?provider_id=42\""));
    }

    #[test]
    fn test_practice_name_and_escaping() {
        let mut p = profile(0.1, &[]);
        p.practice_name = Some("Roe & Partners <Clinic>".to_string());
        p.address = FieldValue::new(Some("1 \"Main\" St".to_string()), 1.0, vec![]);
        let draft = OutreachStage::default().run(&p).unwrap();
        assert!(draft.body.contains("<b>Roe &amp; Partners &lt;Clinic&gt;</b>"));
        assert!(draft.body.contains("Address: 1 &quot;Main&quot; St</p>"));
        assert!(!draft.body.contains("<Clinic>"));
    }

    #[test]
    fn test_body_layout() {
        let draft = OutreachStage::default().run(&profile(0.1, &[])).unwrap();
        assert!(draft.body.starts_with("<p>Dear Jane Roe,</p>\n\n<p>We are updating"));
        assert!(draft.body.ends_with("<p>Thank you,<br>Provider Validation Team</p>\n"));
        assert!(draft
            .body
            .contains("<a href=\"http://localhost:8000/verify?provider_id=42\">Verify Now</a>"));
    }

    #[test]
    fn test_email_validation() {
        assert_eq!(
            valid_email(Some(" jane@example.com ")).as_deref(),
            Some("jane@example.com")
        );
        assert_eq!(valid_email(Some("not-an-email")), None);
        assert_eq!(valid_email(Some("jane@localhost")), None);
        assert_eq!(valid_email(Some("")), None);
        assert_eq!(valid_email(None), None);

        let mut p = profile(0.1, &[]);
        p.contact_email = Some("jane@example.com".to_string());
        assert!(OutreachStage::default().run(&p).unwrap().is_sendable());
    }
}
