//! # rulehub-adapter-virtual
//!
//! A deterministic simulated home that feeds telemetry into the engine and
//! applies `device_command` actions.
//!
//! ## Provided devices
//!
//! | Device id | Type | Room | Behaviour |
//! |-----------|------|------|-----------|
//! | `living-room-motion` | `motion_sensor` | `living_room` | `{"motion": bool}`, active two steps out of six |
//! | `living-room-light` | `light` | `living_room` | Responds to `{"state", "brightness"}` commands |
//! | `bedroom-temperature` | `temperature_sensor` | `bedroom` | `{"temperature", "humidity"}`, peaks above 30 |
//! | `hallway-door` | `door_sensor` | `hallway` | `{"open": bool}`, opens one step out of ten |
//! | `hallway-light` | `light` | `hallway` | Responds to `{"state", "brightness"}` commands |
//! | `kitchen-power` | `power_meter` | `kitchen` | `{"load", "power"}`, load peaks above 80% |
//!
//! ## Dependency rule
//!
//! Depends on `rulehub-app` (port traits) and `rulehub-domain` only.

mod devices;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::Value;
use tokio::time::MissedTickBehavior;

use rulehub_app::ports::TelemetrySink;
use rulehub_domain::device::DeviceData;
use rulehub_domain::error::{NotFoundError, RuleHubError};
use rulehub_domain::id::DeviceId;

pub use devices::{SensorKind, VirtualDevice, VirtualLight, VirtualSensor};

/// Simulated home made of virtual devices.
#[derive(Debug)]
pub struct VirtualHome {
    devices: Vec<VirtualDevice>,
    step: AtomicU64,
}

impl Default for VirtualHome {
    fn default() -> Self {
        Self::new(vec![
            VirtualDevice::Sensor(VirtualSensor::new(
                "living-room-motion",
                SensorKind::Motion,
                "living_room",
                "Living Room Motion",
            )),
            VirtualDevice::Light(VirtualLight::new(
                "living-room-light",
                "living_room",
                "Living Room Light",
            )),
            VirtualDevice::Sensor(VirtualSensor::new(
                "bedroom-temperature",
                SensorKind::Temperature,
                "bedroom",
                "Bedroom Thermometer",
            )),
            VirtualDevice::Sensor(VirtualSensor::new(
                "hallway-door",
                SensorKind::Door,
                "hallway",
                "Front Door",
            )),
            VirtualDevice::Light(VirtualLight::new(
                "hallway-light",
                "hallway",
                "Hallway Light",
            )),
            VirtualDevice::Sensor(VirtualSensor::new(
                "kitchen-power",
                SensorKind::PowerMeter,
                "kitchen",
                "Kitchen Power Meter",
            )),
        ])
    }
}

impl VirtualHome {
    #[must_use]
    pub fn new(devices: Vec<VirtualDevice>) -> Self {
        Self {
            devices,
            step: AtomicU64::new(0),
        }
    }

    /// Current record of every device.
    #[must_use]
    pub fn devices(&self) -> Vec<DeviceData> {
        self.devices.iter().map(VirtualDevice::record).collect()
    }

    #[must_use]
    pub fn owns_device(&self, device_id: &DeviceId) -> bool {
        self.find(device_id).is_some()
    }

    /// Simulation steps taken so far.
    #[must_use]
    pub fn step(&self) -> u64 {
        self.step.load(Ordering::SeqCst)
    }

    /// Advance the simulation by one step.
    ///
    /// Returns the records of the devices whose reading changed.
    pub fn tick(&self) -> Vec<DeviceData> {
        let step = self.step.fetch_add(1, Ordering::SeqCst) + 1;
        let changed: Vec<DeviceData> = self
            .devices
            .iter()
            .filter_map(|device| device.advance(step))
            .collect();
        tracing::trace!(step, changed = changed.len(), "simulation tick");
        changed
    }

    /// Apply `command` to a device.
    ///
    /// # Errors
    ///
    /// Returns [`RuleHubError::NotFound`] for an unknown device and
    /// [`RuleHubError::Validation`] when the device can't take the command.
    #[tracing::instrument(skip(self, command))]
    pub fn handle_command(
        &self,
        device_id: &DeviceId,
        command: &Value,
    ) -> Result<DeviceData, RuleHubError> {
        let device = self.find(device_id).ok_or_else(|| NotFoundError {
            entity: "Device",
            id: device_id.to_string(),
        })?;
        device.handle_command(command)
    }

    /// Publish every device once, then push changed readings every `period`.
    ///
    /// Never returns; drop the future to stop.
    pub async fn run(&self, sink: &impl TelemetrySink, period: Duration) {
        for record in self.devices() {
            sink.update_device_data(record);
        }
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            for record in self.tick() {
                sink.update_device_data(record);
            }
        }
    }

    fn find(&self, device_id: &DeviceId) -> Option<&VirtualDevice> {
        self.devices.iter().find(|d| d.device_id() == device_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use rulehub_domain::error::ValidationError;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingSink {
        updates: Mutex<Vec<DeviceData>>,
    }

    impl TelemetrySink for RecordingSink {
        fn update_device_data(&self, data: DeviceData) {
            self.updates.lock().unwrap().push(data);
        }

        fn mark_device_offline(&self, _device_id: &DeviceId) {}
    }

    #[test]
    fn should_provide_six_devices() {
        let home = VirtualHome::default();
        let devices = home.devices();
        assert_eq!(devices.len(), 6);
        assert!(devices.iter().all(|d| d.online));
        assert_eq!(
            devices.iter().filter(|d| d.device_type == "light").count(),
            2
        );
    }

    #[test]
    fn should_own_known_devices_only() {
        let home = VirtualHome::default();
        assert!(home.owns_device(&DeviceId::new("hallway-door")));
        assert!(!home.owns_device(&DeviceId::new("garage-door")));
    }

    #[test]
    fn should_report_changed_readings_on_tick() {
        let home = VirtualHome::default();
        let changed = home.tick();
        assert_eq!(home.step(), 1);
        let ids: Vec<&str> = changed.iter().map(|d| d.device_id.as_str()).collect();
        // motion and door hold their step 0 reading on step 1
        assert_eq!(ids, vec!["bedroom-temperature", "kitchen-power"]);
    }

    #[test]
    fn should_open_front_door_on_fourth_step() {
        let home = VirtualHome::default();
        let door = (0..4)
            .flat_map(|_| home.tick())
            .find(|d| d.device_id.as_str() == "hallway-door")
            .unwrap();
        assert_eq!(door.value, json!({"open": true}));
    }

    #[test]
    fn should_apply_command_to_light() {
        let home = VirtualHome::default();
        let record = home
            .handle_command(&DeviceId::new("hallway-light"), &json!({"state": "on"}))
            .unwrap();
        assert_eq!(record.value["state"], "on");
        let stored = home
            .devices()
            .into_iter()
            .find(|d| d.device_id.as_str() == "hallway-light")
            .unwrap();
        assert_eq!(stored.value["brightness"], 100);
    }

    #[test]
    fn should_return_not_found_for_unknown_device() {
        let home = VirtualHome::default();
        let result = home.handle_command(&DeviceId::new("ghost"), &json!({"state": "on"}));
        assert!(matches!(result, Err(RuleHubError::NotFound(_))));
    }

    #[test]
    fn should_reject_command_for_sensor() {
        let home = VirtualHome::default();
        let result = home.handle_command(&DeviceId::new("kitchen-power"), &json!({"state": "on"}));
        assert!(matches!(
            result,
            Err(RuleHubError::Validation(ValidationError::NotCommandable { .. }))
        ));
    }

    #[tokio::test]
    async fn should_publish_devices_then_ticks() {
        let home = VirtualHome::default();
        let sink = RecordingSink::default();

        let outcome =
            tokio::time::timeout(Duration::from_millis(60), home.run(&sink, Duration::from_millis(5)))
                .await;

        assert!(outcome.is_err());
        assert!(home.step() >= 1);
        let updates = sink.updates.lock().unwrap();
        assert!(updates.len() > 6);
        assert_eq!(updates[0].device_id.as_str(), "living-room-motion");
    }
}
