//! CSV-backed result store
//!
//! Column layout: the configured layout labels in order, any additional
//! field names found on the records, then `revealed_value` and `dispatched`.
//! The downstream notifier reads and rewrites the same file.

use crate::record::Record;
use crate::storage::{Store, StorageResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Column holding the resolved hidden field
pub const REVEALED_COLUMN: &str = "revealed_value";

/// Column set by the notifier once a row has been mailed
pub const DISPATCHED_COLUMN: &str = "dispatched";

/// Result store persisted as a CSV file
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
    labels: Vec<String>,
}

impl CsvStore {
    /// Creates a store for `path` with `labels` as the leading columns
    pub fn new(path: impl Into<PathBuf>, labels: Vec<String>) -> Self {
        Self {
            path: path.into(),
            labels,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Field columns for `records`: labels first, then extras in first-seen order
    fn field_columns(&self, records: &[Record]) -> Vec<String> {
        let mut columns = self.labels.clone();
        for record in records {
            for (name, _) in record.fields() {
                if !columns.contains(name) {
                    columns.push(name.clone());
                }
            }
        }
        columns
    }

    fn read_records(&self) -> StorageResult<Vec<Record>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)?;
        let headers = reader.headers()?.clone();

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let mut record = Record::default();
            for (name, value) in headers.iter().zip(row.iter()) {
                match name {
                    REVEALED_COLUMN => {
                        if !value.is_empty() {
                            record.set_revealed(value);
                        }
                    }
                    DISPATCHED_COLUMN => record.dispatched = parse_flag(value),
                    _ => {
                        if !value.is_empty() {
                            record.set_field(name, value);
                        }
                    }
                }
            }
            records.push(record);
        }
        Ok(records)
    }

    fn write_records(&self, target: &Path, records: &[Record]) -> StorageResult<()> {
        let columns = self.field_columns(records);
        let mut writer = csv::Writer::from_path(target)?;

        let mut header: Vec<&str> = columns.iter().map(String::as_str).collect();
        header.push(REVEALED_COLUMN);
        header.push(DISPATCHED_COLUMN);
        writer.write_record(&header)?;

        for record in records {
            let mut row: Vec<&str> = columns
                .iter()
                .map(|column| record.field(column).unwrap_or(""))
                .collect();
            row.push(record.revealed_value().unwrap_or(""));
            row.push(if record.dispatched { "true" } else { "false" });
            writer.write_record(&row)?;
        }

        writer.flush()?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Store for CsvStore {
    fn load(&self) -> Vec<Record> {
        if !self.path.exists() {
            tracing::info!(
                "No result file at {}, starting fresh",
                self.path.display()
            );
            return Vec::new();
        }

        match self.read_records() {
            Ok(records) => {
                tracing::info!(
                    "Loaded {} records from {}",
                    records.len(),
                    self.path.display()
                );
                records
            }
            Err(e) => {
                tracing::warn!(
                    "Could not read result file {}: {}. Starting fresh.",
                    self.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    fn save(&self, records: &[Record]) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Write beside the target and rename so readers never see a half-written file
        let temp = self.temp_path();
        self.write_records(&temp, records)?;
        fs::rename(&temp, &self.path)?;

        tracing::debug!("Saved {} records to {}", records.len(), self.path.display());
        Ok(())
    }
}

/// Parses the boolean-like `dispatched` marker
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "y"
    )
}
