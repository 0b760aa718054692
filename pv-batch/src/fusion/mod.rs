//! Score Fusion
//!
//! Pure scoring functions shared by the Validation, QA and Reconciliation
//! stages:
//! - **scoring** - fixed-weight combined score and 3-decimal rounding
//! - **flags** - threshold rules producing `FlagKind`s
//! - **name_fuser** - deterministic most-frequent-candidate selection

pub mod flags;
pub mod name_fuser;
pub mod scoring;

pub use flags::{evaluate_flags, FlagThresholds};
pub use name_fuser::{fuse_name, NameCandidate, NameFusion, NAME_SOURCES};
pub use scoring::{combined_score, round3, ADDRESS_WEIGHT, NAME_WEIGHT, PHONE_WEIGHT};
