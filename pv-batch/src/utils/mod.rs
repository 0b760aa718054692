//! Shared helpers

pub mod db_retry;
pub mod panic;

pub use db_retry::{retry_on_lock, DEFAULT_MAX_LOCK_WAIT_MS};
pub use panic::panic_message;
