//! Virtual device implementations — lights and sensors.
//!
//! Each virtual device holds a fixed [`DeviceId`](rulehub_domain::id::DeviceId)
//! so rules can refer to it across restarts.

mod light;
mod sensor;

pub use light::VirtualLight;
pub use sensor::{SensorKind, VirtualSensor};

use serde_json::Value;

use rulehub_domain::device::DeviceData;
use rulehub_domain::error::{RuleHubError, ValidationError};
use rulehub_domain::id::DeviceId;

/// Wrapper enum for the concrete virtual device types.
#[derive(Debug)]
pub enum VirtualDevice {
    Light(VirtualLight),
    Sensor(VirtualSensor),
}

impl VirtualDevice {
    #[must_use]
    pub fn device_id(&self) -> &DeviceId {
        match self {
            Self::Light(d) => d.device_id(),
            Self::Sensor(d) => d.device_id(),
        }
    }

    #[must_use]
    pub fn record(&self) -> DeviceData {
        match self {
            Self::Light(d) => d.record(),
            Self::Sensor(d) => d.record(),
        }
    }

    /// Advance to `step`. Lights only change on command.
    pub fn advance(&self, step: u64) -> Option<DeviceData> {
        match self {
            Self::Light(_) => None,
            Self::Sensor(d) => d.advance(step),
        }
    }

    /// Apply a command, returning the resulting record.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NotCommandable`] for sensors, or the
    /// light's own validation error for a malformed command.
    pub fn handle_command(&self, command: &Value) -> Result<DeviceData, RuleHubError> {
        match self {
            Self::Light(d) => d.handle_command(command),
            Self::Sensor(d) => Err(ValidationError::NotCommandable {
                device_id: d.device_id().to_string(),
            }
            .into()),
        }
    }
}
