//! Concurrency-safe latest-state cache, one snapshot per device.
//!
//! The store maps `device_id` to its [`DeviceSnapshot`] behind a [`DashMap`],
//! so merges for the same device are serialized through the entry guard while
//! writes to different devices proceed on independent shards. Queries clone
//! the snapshot out; an unknown device yields `None`, never an error.

use dashmap::DashMap;

use crate::error::{AppResult, RelayError};
use crate::snapshot::{DeviceSnapshot, SnapshotPatch};

/// Process-lifetime cache of the latest snapshot per device.
///
/// Constructed once at startup and shared by reference with the ingestion and
/// query handlers; there is no ambient global instance. Snapshots are never
/// deleted.
#[derive(Debug, Default)]
pub struct DeviceStateStore {
    devices: DashMap<String, DeviceSnapshot>,
}

impl DeviceStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one ingestion into the device's snapshot, creating it on first
    /// sight. Fails with a validation error, without touching any state, when
    /// `device_id` is missing.
    ///
    /// When both the stored snapshot and the patch carry a `seq`, a patch
    /// older than the stored one is dropped (returning `Ok`) to guard against
    /// out-of-order delivery. Ingestion is at-least-once: replaying the same
    /// patch simply overwrites the same fields again.
    pub fn upsert(&self, patch: &SnapshotPatch) -> AppResult<()> {
        if patch.device_id.trim().is_empty() {
            return Err(RelayError::Validation("device_id required".to_string()));
        }

        // The entry guard holds the shard lock, so the merge is an atomic
        // field-set relative to other writers for the same device.
        let mut entry = self.devices.entry(patch.device_id.clone()).or_default();
        if let (Some(stored), Some(incoming)) = (entry.seq, patch.seq) {
            if incoming < stored {
                tracing::debug!(
                    device_id = %patch.device_id,
                    stored_seq = stored,
                    incoming_seq = incoming,
                    "dropping out-of-order telemetry update"
                );
                return Ok(());
            }
        }
        entry.apply(patch);
        Ok(())
    }

    /// Current snapshot for a device, or `None` if it has never reported.
    pub fn get(&self, device_id: &str) -> Option<DeviceSnapshot> {
        self.devices.get(device_id).map(|entry| entry.value().clone())
    }

    /// Number of devices that have ever reported.
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}
