//! Virtual light — accepts `{"state": "on"|"off", "brightness": 0..=100}`.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::{Value, json};

use rulehub_domain::device::DeviceData;
use rulehub_domain::error::{RuleHubError, ValidationError};
use rulehub_domain::id::DeviceId;
use rulehub_domain::time::now;

const MAX_BRIGHTNESS: u64 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct LightState {
    on: bool,
    brightness: u64,
}

/// A simulated dimmable light.
#[derive(Debug)]
pub struct VirtualLight {
    device_id: DeviceId,
    room: &'static str,
    name: &'static str,
    state: Mutex<LightState>,
}

impl VirtualLight {
    pub fn new(device_id: &str, room: &'static str, name: &'static str) -> Self {
        Self {
            device_id: DeviceId::new(device_id),
            room,
            name,
            state: Mutex::new(LightState::default()),
        }
    }

    #[must_use]
    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    /// Current record of this light.
    #[must_use]
    pub fn record(&self) -> DeviceData {
        let state = *self.lock_state();
        self.record_for(state)
    }

    /// Apply a command and return the resulting record.
    ///
    /// Switching on a dark light brings it to full brightness; switching off
    /// drops brightness to zero. A brightness-only command leaves the on/off
    /// state alone.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCommand`] when the payload is not an
    /// object, `state` is neither `"on"` nor `"off"`, or `brightness` is not
    /// an integer in `0..=100`. The light is left untouched in that case.
    pub fn handle_command(&self, command: &Value) -> Result<DeviceData, RuleHubError> {
        let Some(fields) = command.as_object() else {
            return Err(ValidationError::InvalidCommand(command.to_string()).into());
        };
        let switch = match fields.get("state") {
            None => None,
            Some(Value::String(s)) if s == "on" => Some(true),
            Some(Value::String(s)) if s == "off" => Some(false),
            Some(other) => {
                return Err(ValidationError::InvalidCommand(format!("state {other}")).into());
            }
        };
        let brightness = match fields.get("brightness") {
            None => None,
            Some(value) => match value.as_u64() {
                Some(level) if level <= MAX_BRIGHTNESS => Some(level),
                _ => {
                    return Err(
                        ValidationError::InvalidCommand(format!("brightness {value}")).into(),
                    );
                }
            },
        };

        let next = {
            let mut state = self.lock_state();
            match switch {
                Some(true) => {
                    state.on = true;
                    state.brightness = brightness
                        .unwrap_or(if state.brightness == 0 { MAX_BRIGHTNESS } else { state.brightness });
                }
                Some(false) => {
                    state.on = false;
                    state.brightness = 0;
                }
                None => {
                    if let Some(level) = brightness {
                        state.brightness = level;
                    }
                }
            }
            *state
        };
        tracing::debug!(device_id = %self.device_id, on = next.on, brightness = next.brightness, "light changed");
        Ok(self.record_for(next))
    }

    fn record_for(&self, state: LightState) -> DeviceData {
        DeviceData {
            device_id: self.device_id.clone(),
            device_type: "light".to_string(),
            room: self.room.to_string(),
            name: self.name.to_string(),
            topic: format!("home/{}/light", self.room),
            value: json!({
                "state": if state.on { "on" } else { "off" },
                "brightness": state.brightness,
            }),
            timestamp: now(),
            online: true,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, LightState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light() -> VirtualLight {
        VirtualLight::new("lamp", "office", "Desk Lamp")
    }

    #[test]
    fn should_default_to_off() {
        let record = light().record();
        assert_eq!(record.value, json!({"state": "off", "brightness": 0}));
        assert_eq!(record.device_type, "light");
        assert_eq!(record.room, "office");
        assert_eq!(record.topic, "home/office/light");
    }

    #[test]
    fn should_turn_on_at_full_brightness() {
        let record = light().handle_command(&json!({"state": "on"})).unwrap();
        assert_eq!(record.value, json!({"state": "on", "brightness": 100}));
    }

    #[test]
    fn should_turn_on_at_requested_brightness() {
        let record = light()
            .handle_command(&json!({"state": "on", "brightness": 40}))
            .unwrap();
        assert_eq!(record.value["brightness"], 40);
    }

    #[test]
    fn should_turn_off_and_reset_brightness() {
        let light = light();
        light.handle_command(&json!({"state": "on"})).unwrap();
        let record = light.handle_command(&json!({"state": "off"})).unwrap();
        assert_eq!(record.value, json!({"state": "off", "brightness": 0}));
    }

    #[test]
    fn should_dim_without_switching() {
        let light = light();
        light.handle_command(&json!({"state": "on"})).unwrap();
        let record = light.handle_command(&json!({"brightness": 50})).unwrap();
        assert_eq!(record.value, json!({"state": "on", "brightness": 50}));
    }

    #[test]
    fn should_reject_invalid_commands() {
        let light = light();
        for command in [
            json!("on"),
            json!({"state": "dim"}),
            json!({"brightness": 101}),
            json!({"brightness": -1}),
        ] {
            let err = light.handle_command(&command).unwrap_err();
            assert!(matches!(
                err,
                RuleHubError::Validation(ValidationError::InvalidCommand(_))
            ));
        }
        assert_eq!(light.record().value["state"], "off");
    }
}
