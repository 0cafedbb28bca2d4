//! Device state table — latest telemetry per device.

use std::collections::HashMap;

use rulehub_domain::device::DeviceData;
use rulehub_domain::id::DeviceId;
use rulehub_domain::time::Timestamp;

/// Authoritative latest record for every device seen so far.
#[derive(Debug, Default, Clone)]
pub struct DeviceTable {
    devices: HashMap<DeviceId, DeviceData>,
}

impl DeviceTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored record, stamping it with `at`.
    ///
    /// Returns the stored copy.
    pub fn upsert(&mut self, mut data: DeviceData, at: Timestamp) -> DeviceData {
        data.timestamp = at;
        self.devices.insert(data.device_id.clone(), data.clone());
        data
    }

    /// Flag a known device offline, stamping it with `at`.
    ///
    /// Returns the updated record, or `None` for an unknown device.
    pub fn mark_offline(&mut self, device_id: &DeviceId, at: Timestamp) -> Option<DeviceData> {
        let data = self.devices.get_mut(device_id)?;
        data.online = false;
        data.timestamp = at;
        Some(data.clone())
    }

    #[must_use]
    pub fn get(&self, device_id: &DeviceId) -> Option<&DeviceData> {
        self.devices.get(device_id)
    }

    /// Owned copy of the whole table.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<DeviceId, DeviceData> {
        self.devices.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    #[must_use]
    pub fn online_count(&self) -> usize {
        self.devices.values().filter(|d| d.online).count()
    }
}
