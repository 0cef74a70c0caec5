//! Durable patient ledger: counter assignment plus dual-sink append.
//!
//! A save runs "assign identifier, persist counter, append CSV row, append
//! mirror row" as one critical section on the blocking pool, so concurrent
//! saves never share a patient number and ledger rows land in the same order
//! as the identifiers were assigned. The CSV row ledger is the canonical
//! record: a failure there fails the save (the already-committed counter
//! increment is not rolled back, an accepted at-least-once gap). The Arrow
//! mirror is best-effort: a failure there is logged and the save still
//! succeeds, so the two sinks may drift.
//!
//! Ingestion and query traffic never takes the ledger lock; a save only reads
//! the device store once, before entering the critical section.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::config::StorageConfig;
use crate::counter::PersistentCounter;
use crate::error::{AppResult, RelayError};
use crate::mirror::ArrowMirror;
use crate::record::{Demographics, PatientRecord, LEDGER_COLUMNS};
use crate::store::DeviceStateStore;

struct LedgerInner {
    counter: PersistentCounter,
    ledger_path: PathBuf,
    mirror: ArrowMirror,
}

/// Append-only dual-sink writer for patient records.
pub struct RecordLedger {
    inner: Arc<Mutex<LedgerInner>>,
}

impl RecordLedger {
    /// Open the ledger under the configured data directory, creating the
    /// directory if needed and loading the persisted counter.
    pub fn open(storage: &StorageConfig) -> AppResult<Self> {
        fs::create_dir_all(&storage.data_dir)
            .map_err(|e| RelayError::Storage(format!("data dir create: {e}")))?;
        Ok(Self {
            inner: Arc::new(Mutex::new(LedgerInner {
                counter: PersistentCounter::open(storage.counter_path()),
                ledger_path: storage.ledger_path(),
                mirror: ArrowMirror::new(storage.mirror_path()),
            })),
        })
    }

    /// Save one clinical encounter and return the assigned patient number.
    ///
    /// Validation happens before any state is touched. The device may never
    /// have reported; the record is then saved with unknown vitals. If the
    /// counter cannot be persisted the whole save aborts and nothing is
    /// written.
    pub async fn save(
        &self,
        demographics: Demographics,
        device_id: String,
        store: &DeviceStateStore,
    ) -> AppResult<u64> {
        if device_id.trim().is_empty() {
            return Err(RelayError::Validation("device_id required".to_string()));
        }
        if demographics.name.trim().is_empty() {
            return Err(RelayError::Validation("name required".to_string()));
        }
        if demographics.age.trim().is_empty() {
            return Err(RelayError::Validation("age required".to_string()));
        }

        // Deep copy taken at the moment of save; later mutation of the live
        // snapshot cannot alter the record.
        let snapshot = store.get(&device_id).unwrap_or_default();

        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || -> AppResult<u64> {
            let mut guard = inner
                .lock()
                .map_err(|_| RelayError::Storage("ledger lock poisoned".to_string()))?;

            let patient_number = guard.counter.next()?;
            let record = PatientRecord::new(patient_number, demographics, device_id, snapshot);

            guard.append_csv(&record)?;
            if let Err(err) = guard.mirror.append(&record) {
                tracing::warn!(
                    patient_number,
                    error = %err,
                    "tabular mirror append failed; row ledger is unaffected"
                );
            }

            tracing::info!(
                patient_number,
                device_id = %record.device_id,
                "patient record saved"
            );
            Ok(patient_number)
        })
        .await
        .map_err(|e| RelayError::Storage(format!("ledger task join: {e}")))?
    }

    /// Highest patient number issued so far.
    pub fn last_patient_number(&self) -> u64 {
        self.inner.lock().map(|guard| guard.counter.current()).unwrap_or(0)
    }
}

impl LedgerInner {
    /// Header exactly once on first save, then one escaped row per save.
    fn append_csv(&self, record: &PatientRecord) -> AppResult<()> {
        let write_header = !self.ledger_path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.ledger_path)
            .map_err(|e| RelayError::Storage(format!("ledger open: {e}")))?;

        let mut writer = csv::Writer::from_writer(file);
        if write_header {
            writer
                .write_record(LEDGER_COLUMNS)
                .map_err(|e| RelayError::Storage(format!("ledger header: {e}")))?;
        }
        writer
            .write_record(&record.to_row())
            .map_err(|e| RelayError::Storage(format!("ledger row: {e}")))?;
        writer
            .flush()
            .map_err(|e| RelayError::Storage(format!("ledger flush: {e}")))?;
        Ok(())
    }
}
