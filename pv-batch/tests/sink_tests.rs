//! Integration tests for persistence and batch files
//!
//! Runs batches against a SQLite database file in a temp directory and
//! drives the CSV input/output path end to end.

mod helpers;

use helpers::{documents_for, extractors, good_record, jane_roe, CannedWeb};
use pv_batch::db::{self, STATUS_NO_VALID_EMAIL, STATUS_VERIFIED};
use pv_batch::sink::{OutreachDispatcher, SqliteSink};
use pv_batch::{input, output, BatchScheduler, RawRecord, RecordPipeline};
use std::sync::Arc;
use tempfile::TempDir;

async fn sqlite_scheduler(dir: &TempDir) -> (BatchScheduler, SqliteSink) {
    let pool = db::init_database_pool(&dir.path().join("data").join("providers.db"))
        .await
        .unwrap();
    let sink = SqliteSink::new(pool);
    let shared = Arc::new(sink.clone());

    let pipeline = RecordPipeline::new(extractors(documents_for(1..=3), CannedWeb::new()));
    let scheduler = BatchScheduler::new(pipeline, shared.clone())
        .with_outreach(shared as Arc<dyn OutreachDispatcher>);
    (scheduler, sink)
}

fn batch() -> Vec<RawRecord> {
    vec![
        good_record(1),
        good_record(2),
        good_record(3),
        RawRecord {
            npi: Some("1234567890".to_string()),
            website: Some("roe.example".to_string()),
            ..jane_roe(4)
        },
    ]
}

#[tokio::test]
async fn test_rerun_updates_providers_in_place() {
    let dir = TempDir::new().unwrap();
    let (scheduler, sink) = sqlite_scheduler(&dir).await;

    let first = scheduler.run_batch(batch(), 4, None).await.unwrap();
    assert_eq!(first.completed().count(), 4);
    assert!(first.outcomes.iter().all(|o| o.error.is_none()));

    let second = scheduler.run_batch(batch(), 2, None).await.unwrap();
    assert_eq!(second.completed().count(), 4);

    let rows = db::fetch_all(sink.pool(), 100).await.unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(
        rows.iter().map(|r| r.source_id).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );

    let roe = db::fetch_by_source_id(sink.pool(), 4).await.unwrap().unwrap();
    assert_eq!(roe.name.as_deref(), Some("Jane Roe"));
    assert_eq!(roe.npi.as_deref(), Some("1234567890"));
    assert_eq!(roe.website.as_deref(), Some("roe.example"));
    assert_eq!(roe.status, "manual_review");
    assert!(roe.flags.contains(&"invalid_phone".to_string()));
    assert_eq!(roe.source_json["qa"]["status"], "manual_review");

    let confirmed = db::fetch_by_source_id(sink.pool(), 1).await.unwrap().unwrap();
    assert_eq!(confirmed.status, "confirmed");
    assert!(confirmed.flags.is_empty());

    let cardiology = db::fetch_by_specialty(sink.pool(), "cardio").await.unwrap();
    assert_eq!(cardiology.len(), 3);
}

#[tokio::test]
async fn test_outreach_log_appends_per_run() {
    let dir = TempDir::new().unwrap();
    let (scheduler, sink) = sqlite_scheduler(&dir).await;

    scheduler.run_batch(batch(), 4, None).await.unwrap();
    scheduler.run_batch(batch(), 4, None).await.unwrap();

    let logs = db::fetch_for_provider(sink.pool(), 4).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|l| l.send_status == STATUS_NO_VALID_EMAIL));
    assert!(logs[0]
        .body
        .as_deref()
        .unwrap()
        .contains("provider_id=4"));

    // confirmed records are never contacted
    assert!(db::fetch_for_provider(sink.pool(), 1).await.unwrap().is_empty());

    assert!(db::mark_provider_verified(sink.pool(), 4, "web-form").await.unwrap());
    let logs = db::fetch_for_provider(sink.pool(), 4).await.unwrap();
    assert_eq!(logs[0].send_status, STATUS_NO_VALID_EMAIL);
    assert_eq!(logs[1].send_status, STATUS_VERIFIED);
    assert_eq!(logs[1].provider_response_id.as_deref(), Some("web-form"));

    assert!(!db::mark_provider_verified(sink.pool(), 1, "web-form").await.unwrap());
}

#[tokio::test]
async fn test_csv_in_csv_out() {
    let dir = TempDir::new().unwrap();
    let input_path = dir.path().join("providers.csv");
    std::fs::write(
        &input_path,
        "id,name,phone,address,specialty,scanned_pdf,email\n\
         1,Dr. Provider 1,(650) 253-0000,\"1 Market St, San Francisco, CA\",Cardiology,doc-1,provider1@clinic.example\n\
         4,Jane Roe,not-a-number,,,,\n",
    )
    .unwrap();

    let records = input::load_records(&input_path).unwrap();
    assert_eq!(records.len(), 2);

    let pool = db::init_database_pool(&dir.path().join("providers.db"))
        .await
        .unwrap();
    let pipeline = RecordPipeline::new(extractors(documents_for([1]), CannedWeb::new()));
    let result = BatchScheduler::new(pipeline, Arc::new(SqliteSink::new(pool)))
        .run_batch(records, 2, None)
        .await
        .unwrap();

    let output_path = dir.path().join("results.csv");
    output::write_csv(&output_path, &result).unwrap();
    let text = std::fs::read_to_string(&output_path).unwrap();

    let mut lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("id,state,name,"));
    lines[1..].sort();
    assert!(lines[1].starts_with("1,completed,Dr. Provider 1,+16502530000,"));
    assert!(lines[1].contains(",confirmed,false,"));
    assert!(lines[2].starts_with("4,completed,Jane Roe,not-a-number,"));
    assert!(lines[2].contains("low_confidence;invalid_phone;name_mismatch,manual_review,true,"));

    let json_path = dir.path().join("results.json");
    output::write_json(&json_path, &result).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(value["outcomes"].as_array().unwrap().len(), 2);
}
