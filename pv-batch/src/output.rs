//! Batch output files
//!
//! - CSV: one flat row per outcome, for spreadsheets and review queues
//! - JSON: the full `BatchResult`, including scores and drafts

use crate::error::BatchError;
use crate::types::{BatchResult, RecordOutcome, RecordState};
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

#[derive(Debug, Serialize)]
struct CsvOutcome<'a> {
    id: i64,
    state: &'static str,
    name: Option<&'a str>,
    phone: Option<&'a str>,
    address: Option<&'a str>,
    specialty: Option<&'a str>,
    final_confidence: Option<f64>,
    flags: String,
    status: Option<&'static str>,
    outreach: bool,
    recipient: Option<&'a str>,
    error: Option<&'a str>,
}

impl<'a> From<&'a RecordOutcome> for CsvOutcome<'a> {
    fn from(outcome: &'a RecordOutcome) -> Self {
        let profile = outcome.profile.as_ref();
        Self {
            id: outcome.record_id,
            state: match outcome.state {
                RecordState::Queued => "queued",
                RecordState::Running => "running",
                RecordState::Completed => "completed",
                RecordState::Failed => "failed",
            },
            name: profile.and_then(|p| p.name.value()),
            phone: profile.and_then(|p| p.phone.value()),
            address: profile.and_then(|p| p.address.value()),
            specialty: profile.and_then(|p| p.specialty.value()),
            final_confidence: profile.map(|p| p.final_confidence),
            flags: profile
                .map(|p| {
                    p.flags
                        .iter()
                        .map(|f| f.as_str())
                        .collect::<Vec<_>>()
                        .join(";")
                })
                .unwrap_or_default(),
            status: profile.map(|p| p.status().as_str()),
            outreach: outcome.outreach.is_some(),
            recipient: outcome
                .outreach
                .as_ref()
                .and_then(|d| d.recipient.as_deref()),
            error: outcome.error.as_deref(),
        }
    }
}

/// Write one CSV row per outcome
pub fn write_csv(path: &Path, result: &BatchResult) -> Result<(), BatchError> {
    let file = std::fs::File::create(path)?;
    write_csv_to(file, result)?;
    info!(path = %path.display(), rows = result.len(), "Wrote CSV results");
    Ok(())
}

pub fn write_csv_to<W: Write>(writer: W, result: &BatchResult) -> Result<(), BatchError> {
    let mut writer = csv::Writer::from_writer(writer);
    for outcome in &result.outcomes {
        writer.serialize(CsvOutcome::from(outcome))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the full batch result as pretty-printed JSON
pub fn write_json(path: &Path, result: &BatchResult) -> Result<(), BatchError> {
    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, result)?;
    writer.flush()?;
    info!(path = %path.display(), outcomes = result.len(), "Wrote JSON results");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldValue, FlagKind, OutreachDraft, Profile};
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn result() -> BatchResult {
        let empty = || FieldValue::new(None, 0.0, vec![]);
        let profile = Profile {
            provider_id: 1,
            name: FieldValue::new(Some("Jane Roe".to_string()), 1.0, vec![]),
            phone: FieldValue::new(Some("not-a-number".to_string()), 0.0, vec![]),
            address: empty(),
            specialty: empty(),
            final_confidence: 0.9,
            flags: BTreeSet::from([FlagKind::LowConfidence, FlagKind::InvalidPhone]),
            contact_email: None,
            practice_name: None,
        };
        let completed = RecordOutcome {
            record_id: 1,
            state: RecordState::Completed,
            profile: Some(profile),
            qa: None,
            scores: None,
            outreach: Some(OutreachDraft {
                provider_id: 1,
                subject: "s".to_string(),
                body: "b".to_string(),
                recipient: None,
                verification_link: "l".to_string(),
            }),
            error: None,
        };
        let now = chrono::Utc::now();
        BatchResult {
            batch_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            cancelled: false,
            outcomes: vec![completed, RecordOutcome::failed(2, "Stage panicked: boom")],
        }
    }

    #[test]
    fn test_csv_rows() {
        let mut buf = Vec::new();
        write_csv_to(&mut buf, &result()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "id,state,name,phone,address,specialty,final_confidence,flags,status,outreach,recipient,error"
        );
        assert_eq!(
            lines[1],
            "1,completed,Jane Roe,not-a-number,,,0.9,low_confidence;invalid_phone,manual_review,true,,"
        );
        assert_eq!(lines[2], "2,failed,,,,,,,,false,,Stage panicked: boom");
    }

    #[test]
    fn test_json_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("results.json");
        write_json(&path, &result()).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["outcomes"].as_array().unwrap().len(), 2);
        assert_eq!(value["outcomes"][1]["state"], "failed");
    }
}
