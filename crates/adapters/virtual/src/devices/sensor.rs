//! Virtual sensors — deterministic readings driven by the simulation step.

use std::sync::{Mutex, PoisonError};

use serde_json::{Value, json};

use rulehub_domain::device::DeviceData;
use rulehub_domain::id::DeviceId;
use rulehub_domain::time::now;

const TEMPERATURES: [f64; 8] = [22.5, 24.0, 26.5, 29.0, 31.5, 33.0, 30.5, 27.0];
const LOADS: [u64; 8] = [35, 48, 62, 85, 91, 70, 52, 40];
/// Rated capacity of the metered circuit, in watts.
const CAPACITY_WATTS: u64 = 5_000;

/// What a sensor measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Motion,
    Temperature,
    Door,
    PowerMeter,
}

impl SensorKind {
    #[must_use]
    pub fn device_type(self) -> &'static str {
        match self {
            Self::Motion => "motion_sensor",
            Self::Temperature => "temperature_sensor",
            Self::Door => "door_sensor",
            Self::PowerMeter => "power_meter",
        }
    }

    /// Reading at simulation `step`.
    #[must_use]
    pub fn reading(self, step: u64) -> Value {
        // step % 8 always fits
        #[allow(clippy::cast_possible_truncation)]
        let cycle = (step % 8) as usize;
        match self {
            // motion for the last two steps out of six
            Self::Motion => json!({"motion": step % 6 >= 4}),
            Self::Temperature => json!({"temperature": TEMPERATURES[cycle], "humidity": 45}),
            // open for one step out of ten
            Self::Door => json!({"open": step % 10 == 4}),
            Self::PowerMeter => json!({
                "load": LOADS[cycle],
                "power": LOADS[cycle] * CAPACITY_WATTS / 100,
            }),
        }
    }
}

/// A read-only simulated sensor.
#[derive(Debug)]
pub struct VirtualSensor {
    device_id: DeviceId,
    kind: SensorKind,
    room: &'static str,
    name: &'static str,
    last: Mutex<Value>,
}

impl VirtualSensor {
    pub fn new(device_id: &str, kind: SensorKind, room: &'static str, name: &'static str) -> Self {
        Self {
            device_id: DeviceId::new(device_id),
            kind,
            room,
            name,
            last: Mutex::new(kind.reading(0)),
        }
    }

    #[must_use]
    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    #[must_use]
    pub fn record(&self) -> DeviceData {
        let value = self
            .last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        self.record_for(value)
    }

    /// Move to `step`, returning a record only when the reading changed.
    pub fn advance(&self, step: u64) -> Option<DeviceData> {
        let reading = self.kind.reading(step);
        {
            let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
            if *last == reading {
                return None;
            }
            last.clone_from(&reading);
        }
        Some(self.record_for(reading))
    }

    fn record_for(&self, value: Value) -> DeviceData {
        let device_type = self.kind.device_type();
        DeviceData {
            device_id: self.device_id.clone(),
            device_type: device_type.to_string(),
            room: self.room.to_string(),
            name: self.name.to_string(),
            topic: format!("home/{}/{device_type}", self.room),
            value,
            timestamp: now(),
            online: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_start_from_step_zero_reading() {
        let sensor = VirtualSensor::new("m1", SensorKind::Motion, "den", "Den Motion");
        let record = sensor.record();
        assert_eq!(record.value, json!({"motion": false}));
        assert_eq!(record.device_type, "motion_sensor");
        assert_eq!(record.topic, "home/den/motion_sensor");
    }

    #[test]
    fn should_only_report_changed_readings() {
        let sensor = VirtualSensor::new("m1", SensorKind::Motion, "den", "Den Motion");
        assert!(sensor.advance(1).is_none());
        let record = sensor.advance(4).unwrap();
        assert_eq!(record.value["motion"], true);
        assert!(sensor.advance(5).is_none());
        assert_eq!(sensor.advance(6).unwrap().value["motion"], false);
    }

    #[test]
    fn should_open_door_once_per_cycle() {
        let opened: Vec<u64> = (0..20)
            .filter(|step| SensorKind::Door.reading(*step)["open"] == true)
            .collect();
        assert_eq!(opened, vec![4, 14]);
    }

    #[test]
    fn should_derive_power_from_load() {
        let reading = SensorKind::PowerMeter.reading(4);
        assert_eq!(reading["load"], 91);
        assert_eq!(reading["power"], 4550);
    }

    #[test]
    fn should_cross_temperature_threshold_during_cycle() {
        let hot = (0..8)
            .filter(|step| {
                SensorKind::Temperature.reading(*step)["temperature"]
                    .as_f64()
                    .is_some_and(|t| t > 30.0)
            })
            .count();
        assert_eq!(hot, 3);
    }
}
