//! Telemetry port — ingress for device updates.

use std::sync::Arc;

use rulehub_domain::device::DeviceData;
use rulehub_domain::id::DeviceId;

/// Accepts telemetry from an ingestion collaborator (simulator, protocol
/// decoder, …). Neither method reports failure: the engine never rejects
/// an update.
pub trait TelemetrySink: Send + Sync {
    /// Replace the device's latest record and evaluate rules against it.
    fn update_device_data(&self, data: DeviceData);

    /// Flag a known device as offline and evaluate rules. Unknown devices
    /// are ignored.
    fn mark_device_offline(&self, device_id: &DeviceId);
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for Arc<T> {
    fn update_device_data(&self, data: DeviceData) {
        (**self).update_device_data(data);
    }

    fn mark_device_offline(&self, device_id: &DeviceId) {
        (**self).mark_device_offline(device_id);
    }
}
