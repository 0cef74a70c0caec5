//! Immutable patient record and its ledger row shape.

use serde::{Deserialize, Serialize};

use crate::snapshot::{DeviceSnapshot, Reading};

/// Caller-supplied patient demographics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Demographics {
    pub name: String,
    pub age: String,
    pub gender: String,
}

/// Column order shared by the CSV ledger header and the mirror schema.
pub const LEDGER_COLUMNS: [&str; 17] = [
    "PatientNumber",
    "Name",
    "Age",
    "Gender",
    "DeviceID",
    "Timestamp",
    "Seq",
    "HeartRate",
    "SpO2",
    "Temperature",
    "ECG",
    "Sugar_Glucose",
    "BP_SYS",
    "BP_DIA",
    "BP",
    "GSR",
    "LungCapacity",
];

/// A durable clinical encounter: demographics plus a deep copy of the device
/// snapshot taken at save time, under the assigned patient number.
///
/// Created once by the record ledger and never mutated; later updates to the
/// live snapshot do not alter it.
#[derive(Debug, Clone, Serialize)]
pub struct PatientRecord {
    pub patient_number: u64,
    pub name: String,
    pub age: String,
    pub gender: String,
    pub device_id: String,
    pub snapshot: DeviceSnapshot,
}

impl PatientRecord {
    pub fn new(patient_number: u64, demographics: Demographics, device_id: String, snapshot: DeviceSnapshot) -> Self {
        Self {
            patient_number,
            name: demographics.name,
            age: demographics.age,
            gender: demographics.gender,
            device_id,
            snapshot,
        }
    }

    /// One ledger row in [`LEDGER_COLUMNS`] order. Unknown readings render as
    /// empty cells.
    pub fn to_row(&self) -> [String; 17] {
        fn cell(reading: &Option<Reading>) -> String {
            reading.as_ref().map(Reading::to_string).unwrap_or_default()
        }

        [
            self.patient_number.to_string(),
            self.name.clone(),
            self.age.clone(),
            self.gender.clone(),
            self.device_id.clone(),
            self.snapshot.timestamp.clone(),
            self.snapshot.seq.map(|s| s.to_string()).unwrap_or_default(),
            cell(&self.snapshot.heart_rate),
            cell(&self.snapshot.spo2),
            cell(&self.snapshot.temperature),
            cell(&self.snapshot.ecg),
            cell(&self.snapshot.glucose),
            cell(&self.snapshot.bp_sys),
            cell(&self.snapshot.bp_dia),
            cell(&self.snapshot.bp),
            cell(&self.snapshot.gsr),
            cell(&self.snapshot.spiro),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_matches_column_order() {
        let mut snapshot = DeviceSnapshot {
            device_id: "d1".to_string(),
            timestamp: "2026-01-02T03:04:05Z".to_string(),
            seq: Some(7),
            ..DeviceSnapshot::default()
        };
        snapshot.heart_rate = Some(72.0.into());
        snapshot.bp = Some("120/80".into());

        let record = PatientRecord::new(
            3,
            Demographics {
                name: "Alice".to_string(),
                age: "30".to_string(),
                gender: "F".to_string(),
            },
            "d1".to_string(),
            snapshot,
        );

        let row = record.to_row();
        assert_eq!(row.len(), LEDGER_COLUMNS.len());
        assert_eq!(row[0], "3");
        assert_eq!(row[1], "Alice");
        assert_eq!(row[4], "d1");
        assert_eq!(row[6], "7");
        assert_eq!(row[7], "72");
        assert_eq!(row[14], "120/80");
        // Readings the device never reported stay empty, not zero.
        assert_eq!(row[9], "");
    }
}
