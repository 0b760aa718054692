//! QA Stage
//!
//! Deterministic threshold rules over the validation scores:
//! - `low_confidence` iff combined_score < 0.5
//! - `invalid_phone` iff phone is not valid
//! - `name_mismatch` iff name_score < 0.6
//!
//! `manual_review` iff any flag fired; confidence is combined_score rounded
//! to 3 decimals.

use crate::fusion::{evaluate_flags, round3, FlagThresholds};
use crate::types::{MatchScores, QaResult, QaStatus};

/// QA stage
#[derive(Debug, Clone, Default)]
pub struct QaStage {
    thresholds: FlagThresholds,
}

impl QaStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: FlagThresholds) -> Self {
        Self { thresholds }
    }

    pub fn run(&self, scores: &MatchScores) -> QaResult {
        let flags = evaluate_flags(scores, &self.thresholds);
        let status = QaStatus::from_flags(&flags);
        QaResult {
            confidence: round3(scores.combined_score),
            flags,
            status,
        }
    }
}
