//! Database Retry Logic
//!
//! Exponential backoff for transient `database is locked` errors. Concurrent
//! record tasks write independently; SQLite serializes them, so a writer
//! may briefly see the lock and should wait rather than fail the record.

use crate::error::SinkError;
use std::time::{Duration, Instant};

/// Default bound on total retry time
pub const DEFAULT_MAX_LOCK_WAIT_MS: u64 = 5000;

const INITIAL_BACKOFF_MS: u64 = 10;
const MAX_BACKOFF_MS: u64 = 1000;

/// Run `operation` until it stops failing with a lock error or `max_wait_ms`
/// has passed.
///
/// Non-lock errors are returned as-is on the first occurrence. Sleeps start
/// at 10ms, double each time and never exceed 1000ms or the remaining budget.
pub async fn retry_on_lock<F, Fut, T>(
    op: &str,
    max_wait_ms: u64,
    mut operation: F,
) -> Result<T, SinkError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, SinkError>>,
{
    let started = Instant::now();
    let budget = Duration::from_millis(max_wait_ms);
    let mut backoff = Duration::from_millis(INITIAL_BACKOFF_MS);
    let mut tries = 0u32;

    loop {
        tries += 1;
        let err = match operation().await {
            Ok(value) => {
                if tries > 1 {
                    tracing::debug!(op, tries, waited_ms = started.elapsed().as_millis(), "Lock cleared");
                }
                return Ok(value);
            }
            Err(err) if is_lock_error(&err) => err,
            Err(err) => return Err(err),
        };

        let waited = started.elapsed();
        let Some(remaining) = budget.checked_sub(waited).filter(|r| !r.is_zero()) else {
            tracing::error!(op, tries, waited_ms = waited.as_millis(), error = %err, "Giving up on locked database");
            return Err(SinkError::Locked(format!(
                "{} still locked after {} tries in {} ms",
                op,
                tries,
                waited.as_millis()
            )));
        };

        let pause = backoff.min(remaining).max(Duration::from_millis(1));
        tracing::warn!(op, tries, pause_ms = pause.as_millis(), "Database locked, backing off");
        tokio::time::sleep(pause).await;
        backoff = (backoff * 2).min(Duration::from_millis(MAX_BACKOFF_MS));
    }
}

fn is_lock_error(err: &SinkError) -> bool {
    matches!(err, SinkError::Database(e) if e.to_string().contains("database is locked"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn locked() -> SinkError {
        SinkError::Database(sqlx::Error::Protocol("database is locked".to_string()))
    }

    #[tokio::test]
    async fn test_no_retry_when_unlocked() {
        let result = retry_on_lock("upsert", 5000, || async { Ok::<i32, SinkError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_lock_clears_on_third_try() {
        let attempts = AtomicU32::new(0);

        let result = retry_on_lock("upsert", 5000, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(locked())
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let result = retry_on_lock("upsert", 50, || async { Err::<i32, SinkError>(locked()) }).await;
        assert!(matches!(result, Err(SinkError::Locked(_))));
    }

    #[tokio::test]
    async fn test_other_errors_not_retried() {
        let attempts = AtomicU32::new(0);

        let result = retry_on_lock("upsert", 5000, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async move { Err::<i32, SinkError>(SinkError::Closed("gone".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(SinkError::Closed(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
