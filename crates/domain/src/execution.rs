//! Execution context — the immutable snapshot handed to handlers on a firing.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::device::DeviceData;
use crate::id::{DeviceId, RuleId};
use crate::rule::Rule;
use crate::time::Timestamp;

/// Read-only copy of the device table at the moment a rule fired.
pub type DeviceSnapshot = Arc<HashMap<DeviceId, DeviceData>>;

/// Everything a handler needs to act on a rule firing.
///
/// Built fresh for every firing and never persisted. The device snapshot is
/// shared between all handlers of the same firing and cannot be mutated.
#[derive(Debug, Clone)]
pub struct RuleExecutionContext {
    pub rule: Rule,
    pub trigger_device: DeviceData,
    pub all_devices: DeviceSnapshot,
    pub timestamp: Timestamp,
}

impl RuleExecutionContext {
    /// Look up a device in the snapshot.
    #[must_use]
    pub fn device(&self, device_id: &DeviceId) -> Option<&DeviceData> {
        self.all_devices.get(device_id)
    }

    /// Devices in the same room as the trigger device, excluding the trigger
    /// itself, optionally filtered by `device_type`.
    ///
    /// Handy for "turn on the light where motion was seen" style actions.
    pub fn room_devices<'a>(&'a self, device_type: Option<&'a str>) -> impl Iterator<Item = &'a DeviceData> {
        self.all_devices.values().filter(move |d| {
            d.room == self.trigger_device.room
                && d.device_id != self.trigger_device.device_id
                && device_type.is_none_or(|t| d.device_type == t)
        })
    }
}

/// One rule firing, as reported by statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentExecution {
    pub rule_id: RuleId,
    pub timestamp: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str, device_type: &str, room: &str) -> DeviceData {
        DeviceData::builder()
            .device_id(id)
            .device_type(device_type)
            .room(room)
            .build()
            .unwrap()
    }

    fn context() -> RuleExecutionContext {
        let motion = device("m1", "motion_sensor", "living_room");
        let devices: HashMap<_, _> = [
            motion.clone(),
            device("l1", "light", "living_room"),
            device("l2", "light", "bedroom"),
            device("p1", "power_meter", "living_room"),
        ]
        .into_iter()
        .map(|d| (d.device_id.clone(), d))
        .collect();
        RuleExecutionContext {
            rule: Rule::builder().name("Motion").build().unwrap(),
            trigger_device: motion,
            all_devices: Arc::new(devices),
            timestamp: crate::time::now(),
        }
    }

    #[test]
    fn should_find_devices_in_trigger_room() {
        let ctx = context();
        let mut ids: Vec<_> = ctx.room_devices(None).map(|d| d.device_id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["l1", "p1"]);
    }

    #[test]
    fn should_filter_room_devices_by_type() {
        let ctx = context();
        let lights: Vec<_> = ctx.room_devices(Some("light")).collect();
        assert_eq!(lights.len(), 1);
        assert_eq!(lights[0].device_id.as_str(), "l1");
    }

    #[test]
    fn should_look_up_device_in_snapshot() {
        let ctx = context();
        assert!(ctx.device(&DeviceId::new("l2")).is_some());
        assert!(ctx.device(&DeviceId::new("ghost")).is_none());
    }
}
