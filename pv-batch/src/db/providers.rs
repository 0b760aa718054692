//! Reconciled provider rows
//!
//! One row per input record, keyed by `source_id` (the record id). Writes
//! are upserts so re-running a batch, or retrying one record, overwrites
//! the previous result instead of duplicating it.

use crate::error::SinkError;
use crate::utils::retry_on_lock;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Row of the `providers` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRow {
    /// Database rowid; `None` before the first insert
    pub id: Option<i64>,
    pub source_id: i64,
    pub name: Option<String>,
    pub npi: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub specialty: Option<String>,
    /// Raw evidence for the record
    pub source_json: serde_json::Value,
    pub confidence: f64,
    pub flags: Vec<String>,
    pub status: String,
    pub updated_at: String,
}

const SELECT_COLUMNS: &str = "SELECT id, source_id, name, npi, phone, address, website, specialty, \
     source_json, confidence, flags, status, updated_at FROM providers";

/// Insert or update a provider by `source_id`
pub async fn upsert_provider(
    pool: &SqlitePool,
    row: &ProviderRow,
    max_wait_ms: u64,
) -> Result<(), SinkError> {
    let source_json = serde_json::to_string(&row.source_json)?;
    let flags = serde_json::to_string(&row.flags)?;

    retry_on_lock("upsert_provider", max_wait_ms, || async {
        sqlx::query(
            r#"
            INSERT INTO providers (
                source_id, name, npi, phone, address, website, specialty,
                source_json, confidence, flags, status, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(source_id) DO UPDATE SET
                name = excluded.name,
                npi = excluded.npi,
                phone = excluded.phone,
                address = excluded.address,
                website = excluded.website,
                specialty = excluded.specialty,
                source_json = excluded.source_json,
                confidence = excluded.confidence,
                flags = excluded.flags,
                status = excluded.status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(row.source_id)
        .bind(&row.name)
        .bind(&row.npi)
        .bind(&row.phone)
        .bind(&row.address)
        .bind(&row.website)
        .bind(&row.specialty)
        .bind(&source_json)
        .bind(row.confidence)
        .bind(&flags)
        .bind(&row.status)
        .bind(&row.updated_at)
        .execute(pool)
        .await?;
        Ok::<(), SinkError>(())
    })
    .await
}

/// Load a provider by its input record id
pub async fn fetch_by_source_id(
    pool: &SqlitePool,
    source_id: i64,
) -> Result<Option<ProviderRow>, SinkError> {
    let row = sqlx::query(&format!("{} WHERE source_id = ?", SELECT_COLUMNS))
        .bind(source_id)
        .fetch_optional(pool)
        .await?;

    row.map(|r| from_row(&r)).transpose()
}

/// Load up to `limit` providers ordered by source id
pub async fn fetch_all(pool: &SqlitePool, limit: i64) -> Result<Vec<ProviderRow>, SinkError> {
    let rows = sqlx::query(&format!("{} ORDER BY source_id LIMIT ?", SELECT_COLUMNS))
        .bind(limit)
        .fetch_all(pool)
        .await?;

    rows.iter().map(from_row).collect()
}

/// Providers whose specialty contains `specialty` (case-insensitive for ASCII)
pub async fn fetch_by_specialty(
    pool: &SqlitePool,
    specialty: &str,
) -> Result<Vec<ProviderRow>, SinkError> {
    let rows = sqlx::query(&format!(
        "{} WHERE specialty LIKE ? ORDER BY source_id",
        SELECT_COLUMNS
    ))
    .bind(format!("%{}%", specialty))
    .fetch_all(pool)
    .await?;

    rows.iter().map(from_row).collect()
}

fn from_row(row: &SqliteRow) -> Result<ProviderRow, SinkError> {
    let source_json: String = row.try_get("source_json")?;
    let flags: String = row.try_get("flags")?;

    Ok(ProviderRow {
        id: row.try_get("id")?,
        source_id: row.try_get("source_id")?,
        name: row.try_get("name")?,
        npi: row.try_get("npi")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        website: row.try_get("website")?,
        specialty: row.try_get("specialty")?,
        source_json: serde_json::from_str(&source_json)?,
        confidence: row.try_get("confidence")?,
        flags: serde_json::from_str(&flags)?,
        status: row.try_get("status")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use crate::utils::DEFAULT_MAX_LOCK_WAIT_MS;

    fn row(source_id: i64, name: &str, specialty: &str) -> ProviderRow {
        ProviderRow {
            id: None,
            source_id,
            name: Some(name.to_string()),
            npi: None,
            phone: Some("+16502530000".to_string()),
            address: None,
            website: None,
            specialty: Some(specialty.to_string()),
            source_json: serde_json::json!({"record_id": source_id}),
            confidence: 0.9,
            flags: vec!["invalid_phone".to_string()],
            status: "manual_review".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let pool = memory_pool().await;

        upsert_provider(&pool, &row(1, "Jane Roe", "Cardiology"), DEFAULT_MAX_LOCK_WAIT_MS)
            .await
            .unwrap();
        upsert_provider(&pool, &row(1, "Jane Q. Roe", "Cardiology"), DEFAULT_MAX_LOCK_WAIT_MS)
            .await
            .unwrap();

        let all = fetch_all(&pool, 100).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name.as_deref(), Some("Jane Q. Roe"));
        assert_eq!(all[0].flags, vec!["invalid_phone"]);
        assert_eq!(all[0].source_json["record_id"], 1);
    }

    #[tokio::test]
    async fn test_fetch_helpers() {
        let pool = memory_pool().await;
        for (id, specialty) in [(1, "Cardiology"), (2, "Pediatric Cardiology"), (3, "Dermatology")] {
            upsert_provider(&pool, &row(id, "Dr. X", specialty), DEFAULT_MAX_LOCK_WAIT_MS)
                .await
                .unwrap();
        }

        assert!(fetch_by_source_id(&pool, 3).await.unwrap().is_some());
        assert!(fetch_by_source_id(&pool, 99).await.unwrap().is_none());
        assert_eq!(fetch_by_specialty(&pool, "cardio").await.unwrap().len(), 2);
        assert_eq!(fetch_all(&pool, 2).await.unwrap().len(), 2);
    }
}
