//! Outreach log rows
//!
//! Every dispatched draft is appended here. `send_status` starts as
//! `queued` (or `no_valid_email` for drafts without a recipient) and is
//! moved to `verified` when the provider confirms their details.

use crate::error::SinkError;
use crate::types::OutreachDraft;
use crate::utils::retry_on_lock;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

pub const STATUS_QUEUED: &str = "queued";
pub const STATUS_NO_VALID_EMAIL: &str = "no_valid_email";
pub const STATUS_VERIFIED: &str = "verified";

/// Row of the `outreach_logs` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutreachLogRow {
    pub id: i64,
    pub provider_id: i64,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub recipient_email: Option<String>,
    pub send_status: String,
    pub provider_response_id: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// Append a draft to the log, returning the new row id
pub async fn log_outreach(
    pool: &SqlitePool,
    draft: &OutreachDraft,
    max_wait_ms: u64,
) -> Result<i64, SinkError> {
    let status = if draft.is_sendable() {
        STATUS_QUEUED
    } else {
        STATUS_NO_VALID_EMAIL
    };
    let now = chrono::Utc::now().to_rfc3339();

    retry_on_lock("log_outreach", max_wait_ms, || async {
        let result = sqlx::query(
            r#"
            INSERT INTO outreach_logs (
                provider_id, subject, body, recipient_email, send_status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(draft.provider_id)
        .bind(&draft.subject)
        .bind(&draft.body)
        .bind(&draft.recipient)
        .bind(status)
        .bind(&now)
        .execute(pool)
        .await?;
        Ok::<i64, SinkError>(result.last_insert_rowid())
    })
    .await
}

/// Mark the latest outreach for a provider as verified.
///
/// Returns `false` if the provider has no outreach on record.
pub async fn mark_provider_verified(
    pool: &SqlitePool,
    provider_id: i64,
    source: &str,
) -> Result<bool, SinkError> {
    let result = sqlx::query(
        r#"
        UPDATE outreach_logs
        SET send_status = ?, provider_response_id = ?, updated_at = ?
        WHERE id = (
            SELECT id FROM outreach_logs WHERE provider_id = ? ORDER BY id DESC LIMIT 1
        )
        "#,
    )
    .bind(STATUS_VERIFIED)
    .bind(source)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(provider_id)
    .execute(pool)
    .await?;

    let updated = result.rows_affected() > 0;
    if updated {
        tracing::info!(provider_id, source, "Provider marked verified");
    }
    Ok(updated)
}

/// All outreach rows for a provider, oldest first
pub async fn fetch_for_provider(
    pool: &SqlitePool,
    provider_id: i64,
) -> Result<Vec<OutreachLogRow>, SinkError> {
    let rows = sqlx::query(
        r#"
        SELECT id, provider_id, subject, body, recipient_email, send_status,
               provider_response_id, created_at, updated_at
        FROM outreach_logs
        WHERE provider_id = ?
        ORDER BY id
        "#,
    )
    .bind(provider_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| -> Result<OutreachLogRow, SinkError> {
            Ok(OutreachLogRow {
                id: row.try_get("id")?,
                provider_id: row.try_get("provider_id")?,
                subject: row.try_get("subject")?,
                body: row.try_get("body")?,
                recipient_email: row.try_get("recipient_email")?,
                send_status: row.try_get("send_status")?,
                provider_response_id: row.try_get("provider_response_id")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            })
        })
        .collect()
}
