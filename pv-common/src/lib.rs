//! # Provider Validator Common Library
//!
//! Shared code for the provider validation workspace:
//! - Error type for configuration and I/O
//! - TOML configuration loading and root folder resolution
//! - Logging initialization

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
