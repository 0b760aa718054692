//! SQLite storage for reconciled providers and outreach logs

pub mod outreach_logs;
pub mod providers;

pub use outreach_logs::{
    fetch_for_provider, log_outreach, mark_provider_verified, OutreachLogRow, STATUS_NO_VALID_EMAIL,
    STATUS_QUEUED, STATUS_VERIFIED,
};
pub use providers::{
    fetch_all, fetch_by_source_id, fetch_by_specialty, upsert_provider, ProviderRow,
};

use crate::error::SinkError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Initialize database connection pool and create tables
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool, SinkError> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SinkError::Database(sqlx::Error::Io(e)))?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let options = SqliteConnectOptions::from_str(&db_url)?
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(250));

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create `providers` and `outreach_logs` if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<(), SinkError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS providers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_id INTEGER NOT NULL UNIQUE,
            name TEXT,
            npi TEXT,
            phone TEXT,
            address TEXT,
            website TEXT,
            specialty TEXT,
            source_json TEXT NOT NULL DEFAULT '{}',
            confidence REAL NOT NULL DEFAULT 0.0,
            flags TEXT NOT NULL DEFAULT '[]',
            status TEXT NOT NULL DEFAULT 'pending',
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS outreach_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            provider_id INTEGER NOT NULL,
            subject TEXT,
            body TEXT,
            recipient_email TEXT,
            send_status TEXT NOT NULL,
            provider_response_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_outreach_logs_provider ON outreach_logs(provider_id)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (providers, outreach_logs)");

    Ok(())
}

/// Single-connection in-memory pool with tables created
#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    // every in-memory connection is its own database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    init_tables(&pool).await.expect("tables");
    pool
}
