//! CSV batch input
//!
//! One record per row with a header line. Recognized columns:
//! `id, name, npi, phone, address, specialty, website, document_ref, email,
//! practice_name`; `scanned_pdf` is accepted for `document_ref`. Other
//! columns are ignored, empty cells are absent and a missing `id` defaults
//! to the 1-based row number.

use crate::error::BatchError;
use crate::types::RawRecord;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    npi: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    specialty: Option<String>,
    #[serde(default)]
    website: Option<String>,
    #[serde(default, alias = "scanned_pdf")]
    document_ref: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    practice_name: Option<String>,
}

/// Load every record from a CSV file
pub fn load_records(path: &Path) -> Result<Vec<RawRecord>, BatchError> {
    let file = std::fs::File::open(path)?;
    let records = read_records(file)?;
    info!(path = %path.display(), records = records.len(), "Loaded input records");
    Ok(records)
}

/// Load every record from CSV text
pub fn read_records<R: Read>(reader: R) -> Result<Vec<RawRecord>, BatchError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for (index, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = row?;
        let row_number = index + 1;
        let id = match present(row.id) {
            Some(raw) => raw.parse::<i64>().map_err(|_| BatchError::InvalidRow {
                row: row_number,
                message: format!("id {:?} is not an integer", raw),
            })?,
            None => row_number as i64,
        };

        records.push(RawRecord {
            id,
            name: present(row.name),
            npi: present(row.npi),
            phone: present(row.phone),
            address: present(row.address),
            specialty: present(row.specialty),
            website: present(row.website),
            document_ref: present(row.document_ref),
            email: present(row.email),
            practice_name: present(row.practice_name),
        });
    }

    Ok(records)
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
