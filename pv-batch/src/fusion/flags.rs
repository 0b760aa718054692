// QA Flag Rules
//
// Each rule is evaluated independently; any number may fire.

use crate::types::{FlagKind, MatchScores};
use std::collections::BTreeSet;

/// Thresholds for the QA flag rules
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlagThresholds {
    /// `low_confidence` iff combined_score < this
    pub min_combined: f64,
    /// `name_mismatch` iff name_score < this
    pub min_name: f64,
}

impl Default for FlagThresholds {
    fn default() -> Self {
        Self {
            min_combined: 0.5,
            min_name: 0.6,
        }
    }
}

/// Evaluate all flag rules against one record's scores
pub fn evaluate_flags(scores: &MatchScores, thresholds: &FlagThresholds) -> BTreeSet<FlagKind> {
    let mut flags = BTreeSet::new();

    if scores.combined_score < thresholds.min_combined {
        flags.insert(FlagKind::LowConfidence);
    }
    if !scores.phone_valid {
        flags.insert(FlagKind::InvalidPhone);
    }
    if scores.name_score < thresholds.min_name {
        flags.insert(FlagKind::NameMismatch);
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(combined: f64, phone_valid: bool, name: f64) -> MatchScores {
        MatchScores {
            phone_valid,
            phone_normalized: None,
            name_score: name,
            address_score: 0.0,
            combined_score: combined,
        }
    }

    #[test]
    fn test_low_confidence_boundary() {
        let t = FlagThresholds::default();
        assert!(!evaluate_flags(&scores(0.5, true, 1.0), &t).contains(&FlagKind::LowConfidence));
        assert!(evaluate_flags(&scores(0.4999, true, 1.0), &t).contains(&FlagKind::LowConfidence));
    }

    #[test]
    fn test_name_mismatch_boundary() {
        let t = FlagThresholds::default();
        assert!(!evaluate_flags(&scores(1.0, true, 0.6), &t).contains(&FlagKind::NameMismatch));
        assert!(evaluate_flags(&scores(1.0, true, 0.59), &t).contains(&FlagKind::NameMismatch));
    }

    #[test]
    fn test_rules_are_independent() {
        let t = FlagThresholds::default();
        assert!(evaluate_flags(&scores(0.9, true, 0.9), &t).is_empty());

        let only_phone = evaluate_flags(&scores(0.9, false, 0.9), &t);
        assert_eq!(only_phone.into_iter().collect::<Vec<_>>(), vec![FlagKind::InvalidPhone]);

        let all = evaluate_flags(&scores(0.0, false, 0.0), &t);
        assert_eq!(all.len(), 3);
    }
}
