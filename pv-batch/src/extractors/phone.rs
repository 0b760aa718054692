//! Phone validation and normalization
//!
//! Region-aware parsing via the `phonenumber` crate (libphonenumber metadata).
//! Normalized form:
//! - valid number → E.164 (`+14155550132`)
//! - parseable but invalid → international format
//! - unparseable → the original string unmodified

use super::PhoneValidator;
use phonenumber::{country, Mode};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Outcome of checking one phone string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneCheck {
    pub is_valid: bool,
    pub normalized: Option<String>,
}

impl PhoneCheck {
    pub fn absent() -> Self {
        Self {
            is_valid: false,
            normalized: None,
        }
    }
}

/// `PhoneValidator` backed by libphonenumber metadata
pub struct LibPhoneValidator;

impl PhoneValidator for LibPhoneValidator {
    fn validate(&self, raw: &str, region: &str) -> PhoneCheck {
        if raw.trim().is_empty() {
            return PhoneCheck::absent();
        }

        let region_id = region.trim().to_uppercase().parse::<country::Id>().ok();

        match phonenumber::parse(region_id, raw) {
            Ok(number) => {
                let is_valid = phonenumber::is_valid(&number);
                let mode = if is_valid { Mode::E164 } else { Mode::International };
                PhoneCheck {
                    is_valid,
                    normalized: Some(number.format().mode(mode).to_string()),
                }
            }
            Err(e) => {
                trace!(phone = raw, error = ?e, "Phone number did not parse");
                PhoneCheck {
                    is_valid: false,
                    normalized: Some(raw.to_string()),
                }
            }
        }
    }
}
