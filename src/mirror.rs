//! Arrow IPC tabular mirror of the patient ledger.
//!
//! The mirror keeps the same rows as the CSV ledger in a columnar file that
//! analysis tools can open directly. Its schema is the header: one field per
//! ledger column, in ledger order. Each append loads whatever batches exist,
//! adds a one-row batch, and rewrites the whole file through a temp file and
//! rename. The full rewrite is an accepted cost, bounded by total patient
//! count.
//!
//! The mirror is the best-effort half of the dual-sink design: callers log
//! append failures and keep going, and no attempt is made to detect or
//! reconcile drift against the CSV ledger.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use arrow::array::{ArrayRef, StringBuilder, UInt64Builder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::ipc::reader::FileReader;
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;

use crate::error::{AppResult, RelayError};
use crate::record::{PatientRecord, LEDGER_COLUMNS};

/// Rewriting tabular sink for patient records.
pub struct ArrowMirror {
    path: PathBuf,
    schema: Arc<Schema>,
}

impl ArrowMirror {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            schema: Arc::new(mirror_schema()),
        }
    }

    /// Append one record and rewrite the sink.
    pub fn append(&self, record: &PatientRecord) -> AppResult<()> {
        let mut batches = self.read_existing()?;
        batches.push(self.single_row_batch(record)?);

        let tmp = self.path.with_extension("arrow.tmp");
        let file = File::create(&tmp).map_err(storage)?;
        let mut writer = FileWriter::try_new(file, &self.schema).map_err(storage)?;
        for batch in &batches {
            writer.write(batch).map_err(storage)?;
        }
        writer.finish().map_err(storage)?;
        std::fs::rename(&tmp, &self.path).map_err(storage)?;
        Ok(())
    }

    /// Number of data rows currently mirrored.
    pub fn row_count(&self) -> AppResult<usize> {
        Ok(self.read_existing()?.iter().map(RecordBatch::num_rows).sum())
    }

    fn read_existing(&self) -> AppResult<Vec<RecordBatch>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.path).map_err(storage)?;
        let reader = FileReader::try_new(file, None).map_err(storage)?;
        reader
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RelayError::Storage(format!("mirror read: {e}")))
    }

    fn single_row_batch(&self, record: &PatientRecord) -> AppResult<RecordBatch> {
        let row = record.to_row();

        let mut number = UInt64Builder::new();
        number.append_value(record.patient_number);
        let mut columns: Vec<ArrayRef> = vec![Arc::new(number.finish())];
        for cell in row.iter().skip(1) {
            let mut builder = StringBuilder::new();
            builder.append_value(cell);
            columns.push(Arc::new(builder.finish()));
        }

        RecordBatch::try_new(self.schema.clone(), columns).map_err(storage)
    }
}

/// PatientNumber is a 64-bit integer column; every other ledger column is a
/// nullable string, matching how the CSV renders them.
fn mirror_schema() -> Schema {
    let mut fields = vec![Field::new(LEDGER_COLUMNS[0], DataType::UInt64, false)];
    fields.extend(
        LEDGER_COLUMNS
            .iter()
            .skip(1)
            .map(|name| Field::new(*name, DataType::Utf8, true)),
    );
    Schema::new(fields)
}

fn storage(err: impl std::fmt::Display) -> RelayError {
    RelayError::Storage(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Demographics;
    use crate::snapshot::DeviceSnapshot;
    use tempfile::TempDir;

    fn record(patient_number: u64) -> PatientRecord {
        PatientRecord::new(
            patient_number,
            Demographics {
                name: "Alice".to_string(),
                age: "30".to_string(),
                gender: "F".to_string(),
            },
            "d1".to_string(),
            DeviceSnapshot::default(),
        )
    }

    #[test]
    fn creates_file_on_first_append() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("patients.arrow");
        let mirror = ArrowMirror::new(&path);

        mirror.append(&record(1)).unwrap();

        assert!(path.exists());
        assert_eq!(mirror.row_count().unwrap(), 1);
    }

    #[test]
    fn appends_preserve_existing_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("patients.arrow");

        let mirror = ArrowMirror::new(&path);
        mirror.append(&record(1)).unwrap();
        mirror.append(&record(2)).unwrap();

        // A fresh handle sees both rows: state lives in the file, not in the
        // mirror value.
        let reopened = ArrowMirror::new(&path);
        assert_eq!(reopened.row_count().unwrap(), 2);

        let batches = reopened.read_existing().unwrap();
        let first = &batches[0];
        assert_eq!(first.schema().field(0).name(), "PatientNumber");
        assert_eq!(first.num_columns(), LEDGER_COLUMNS.len());
    }

    #[test]
    fn append_fails_cleanly_when_directory_missing() {
        let dir = TempDir::new().unwrap();
        let mirror = ArrowMirror::new(dir.path().join("missing").join("patients.arrow"));
        assert!(matches!(
            mirror.append(&record(1)),
            Err(RelayError::Storage(_))
        ));
    }
}
