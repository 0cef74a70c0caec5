//! Latest-known telemetry state for a single device.
//!
//! A [`DeviceSnapshot`] holds the most recent value of every vital-sign field a
//! device has ever reported. Updates arrive as a [`SnapshotPatch`] carrying
//! only the fields present in one ingestion; applying a patch overwrites
//! exactly those fields and preserves the rest (merge, not replace). A field
//! that was never reported stays absent, meaning "unknown", not zero.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A single scalar reading as reported by a device.
///
/// Devices send most vitals as JSON numbers, but some arrive as strings
/// (blood pressure in particular, e.g. `"120/80"`). The untagged
/// representation accepts either form and round-trips it unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Number(f64),
    Text(String),
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reading::Number(n) => write!(f, "{n}"),
            Reading::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Reading {
    fn from(value: f64) -> Self {
        Reading::Number(value)
    }
}

impl From<&str> for Reading {
    fn from(value: &str) -> Self {
        Reading::Text(value.to_string())
    }
}

/// The latest known set of vital-sign readings for one device.
///
/// Exactly one snapshot exists per known `device_id`, owned by the
/// [`DeviceStateStore`](crate::store::DeviceStateStore). Snapshots are created
/// on first ingestion and live for the rest of the process; they are never
/// deleted. The default (all fields absent) serializes to `{}`, which is what
/// a query for an unknown device returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    /// Stable device key. Empty only in the "unknown device" snapshot.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub device_id: String,
    /// ISO-8601 time of the last accepted update (device-supplied, or arrival
    /// time when the device omitted it).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub timestamp: String,
    /// Device-local sequence counter, advisory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    #[serde(rename = "heartRate", default, skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<Reading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spo2: Option<Reading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Reading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecg: Option<Reading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glucose: Option<Reading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bp_sys: Option<Reading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bp_dia: Option<Reading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bp: Option<Reading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gsr: Option<Reading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spiro: Option<Reading>,
}

/// One ingestion worth of fields, canonical names only.
///
/// Alias normalization (`hr`, `sugar`) happens at the HTTP boundary; the store
/// and everything below it only understand these names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotPatch {
    #[serde(default)]
    pub device_id: String,
    pub timestamp: Option<String>,
    pub seq: Option<u64>,
    #[serde(rename = "heartRate")]
    pub heart_rate: Option<Reading>,
    pub spo2: Option<Reading>,
    pub temperature: Option<Reading>,
    pub ecg: Option<Reading>,
    pub glucose: Option<Reading>,
    pub bp_sys: Option<Reading>,
    pub bp_dia: Option<Reading>,
    pub bp: Option<Reading>,
    pub gsr: Option<Reading>,
    pub spiro: Option<Reading>,
}

impl DeviceSnapshot {
    /// Apply one ingestion. Fields present in the patch overwrite the stored
    /// value; absent fields are untouched. The timestamp always refreshes,
    /// either to the device-supplied value or to the arrival time.
    pub fn apply(&mut self, patch: &SnapshotPatch) {
        self.device_id.clone_from(&patch.device_id);
        self.timestamp = patch.timestamp.clone().unwrap_or_else(now_rfc3339);
        if patch.seq.is_some() {
            self.seq = patch.seq;
        }
        merge(&mut self.heart_rate, &patch.heart_rate);
        merge(&mut self.spo2, &patch.spo2);
        merge(&mut self.temperature, &patch.temperature);
        merge(&mut self.ecg, &patch.ecg);
        merge(&mut self.glucose, &patch.glucose);
        merge(&mut self.bp_sys, &patch.bp_sys);
        merge(&mut self.bp_dia, &patch.bp_dia);
        merge(&mut self.bp, &patch.bp);
        merge(&mut self.gsr, &patch.gsr);
        merge(&mut self.spiro, &patch.spiro);
    }
}

fn merge(slot: &mut Option<Reading>, incoming: &Option<Reading>) {
    if let Some(value) = incoming {
        *slot = Some(value.clone());
    }
}

/// Arrival timestamp in RFC 3339 with millisecond precision.
pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patch_overwrites_present_fields_and_preserves_absent_ones() {
        let mut snapshot = DeviceSnapshot::default();
        snapshot.apply(&SnapshotPatch {
            device_id: "d1".to_string(),
            heart_rate: Some(72.0.into()),
            ..SnapshotPatch::default()
        });
        snapshot.apply(&SnapshotPatch {
            device_id: "d1".to_string(),
            temperature: Some(36.6.into()),
            ..SnapshotPatch::default()
        });

        assert_eq!(snapshot.heart_rate, Some(Reading::Number(72.0)));
        assert_eq!(snapshot.temperature, Some(Reading::Number(36.6)));
        assert_eq!(snapshot.spo2, None);
    }

    #[test]
    fn timestamp_defaults_to_arrival_time() {
        let mut snapshot = DeviceSnapshot::default();
        snapshot.apply(&SnapshotPatch {
            device_id: "d1".to_string(),
            ..SnapshotPatch::default()
        });
        assert!(!snapshot.timestamp.is_empty());

        snapshot.apply(&SnapshotPatch {
            device_id: "d1".to_string(),
            timestamp: Some("2026-01-02T03:04:05Z".to_string()),
            ..SnapshotPatch::default()
        });
        assert_eq!(snapshot.timestamp, "2026-01-02T03:04:05Z");
    }

    #[test]
    fn readings_accept_numbers_and_strings() {
        let patch: SnapshotPatch = serde_json::from_value(json!({
            "device_id": "d1",
            "heartRate": 72,
            "bp": "120/80"
        }))
        .unwrap();

        assert_eq!(patch.heart_rate, Some(Reading::Number(72.0)));
        assert_eq!(patch.bp, Some(Reading::Text("120/80".to_string())));
        assert_eq!(patch.bp.unwrap().to_string(), "120/80");
    }

    #[test]
    fn empty_snapshot_serializes_to_empty_object() {
        let rendered = serde_json::to_value(DeviceSnapshot::default()).unwrap();
        assert_eq!(rendered, json!({}));
    }
}
