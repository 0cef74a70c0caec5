//! Restart continuity: the patient counter and both sinks survive a process
//! restart, and the next save continues numbering where the last one left off.

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;
use vitals_relay::config::StorageConfig;
use vitals_relay::ledger::RecordLedger;
use vitals_relay::mirror::ArrowMirror;
use vitals_relay::record::Demographics;
use vitals_relay::snapshot::SnapshotPatch;
use vitals_relay::store::DeviceStateStore;

fn storage_config(dir: &TempDir) -> StorageConfig {
    StorageConfig {
        data_dir: dir.path().to_path_buf(),
        ..StorageConfig::default()
    }
}

fn demographics(name: &str) -> Demographics {
    Demographics {
        name: name.to_string(),
        age: "30".to_string(),
        gender: "F".to_string(),
    }
}

fn populated_store() -> Arc<DeviceStateStore> {
    let store = Arc::new(DeviceStateStore::new());
    store
        .upsert(&SnapshotPatch {
            device_id: "d1".to_string(),
            heart_rate: Some(72.0.into()),
            temperature: Some(36.6.into()),
            ..SnapshotPatch::default()
        })
        .unwrap();
    store
}

#[tokio::test]
async fn counter_survives_restart_and_numbering_continues() {
    let dir = TempDir::new().unwrap();
    let storage = storage_config(&dir);
    let store = populated_store();

    {
        let ledger = RecordLedger::open(&storage).unwrap();
        for i in 0..3 {
            let number = ledger
                .save(demographics(&format!("P{i}")), "d1".to_string(), &store)
                .await
                .unwrap();
            assert_eq!(number, i + 1);
        }
    }

    // "Restart": a fresh ledger over the same data directory.
    let reopened = RecordLedger::open(&storage).unwrap();
    assert_eq!(reopened.last_patient_number(), 3);

    let number = reopened
        .save(demographics("After"), "d1".to_string(), &store)
        .await
        .unwrap();
    assert_eq!(number, 4);
}

#[tokio::test]
async fn sinks_and_counter_agree_after_k_saves() {
    let dir = TempDir::new().unwrap();
    let storage = storage_config(&dir);
    let store = populated_store();
    let ledger = RecordLedger::open(&storage).unwrap();

    for i in 0..5 {
        ledger
            .save(demographics(&format!("P{i}")), "d1".to_string(), &store)
            .await
            .unwrap();
    }

    // Row ledger: exactly one header plus five data rows.
    let body = fs::read_to_string(storage.ledger_path()).unwrap();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 6);
    assert!(lines[0].starts_with("PatientNumber,"));
    assert_eq!(
        lines
            .iter()
            .filter(|line| line.starts_with("PatientNumber,"))
            .count(),
        1
    );

    // Tabular mirror mirrors the same row count.
    assert_eq!(ArrowMirror::new(storage.mirror_path()).row_count().unwrap(), 5);

    // Persisted counter equals the highest number issued.
    let counter: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(storage.counter_path()).unwrap()).unwrap();
    assert_eq!(counter["counter"], 5);
}

#[tokio::test]
async fn recorded_snapshot_is_a_copy_not_a_reference() {
    let dir = TempDir::new().unwrap();
    let storage = storage_config(&dir);
    let store = populated_store();
    let ledger = RecordLedger::open(&storage).unwrap();

    ledger
        .save(demographics("Alice"), "d1".to_string(), &store)
        .await
        .unwrap();

    // Mutate the live snapshot after the save.
    store
        .upsert(&SnapshotPatch {
            device_id: "d1".to_string(),
            heart_rate: Some(150.0.into()),
            ..SnapshotPatch::default()
        })
        .unwrap();

    let body = fs::read_to_string(storage.ledger_path()).unwrap();
    let row = body.lines().nth(1).unwrap();
    assert!(row.contains(",72,"));
    assert!(!row.contains(",150,"));
}
