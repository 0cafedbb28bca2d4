//! Device telemetry — the latest known record reported by a device.
//!
//! A record is replaced wholesale on every telemetry update; there is no
//! field-level merge.

use serde::{Deserialize, Serialize};

use crate::error::{RuleHubError, ValidationError};
use crate::id::DeviceId;
use crate::time::{self, Timestamp};

/// Latest telemetry reported by a single device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceData {
    pub device_id: DeviceId,
    /// Free-form kind, e.g. `"motion_sensor"`, `"light"`, `"power_meter"`.
    pub device_type: String,
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub name: String,
    /// Transport topic the record arrived on, kept for consumers.
    #[serde(default)]
    pub topic: String,
    /// Arbitrary structured payload (`{"motion": true}`, `{"temperature": 21.5}`, …).
    pub value: serde_json::Value,
    /// Overwritten with the engine clock on ingestion.
    #[serde(default = "time::now")]
    pub timestamp: Timestamp,
    #[serde(default = "default_online")]
    pub online: bool,
}

fn default_online() -> bool {
    true
}

impl DeviceData {
    /// Create a builder for constructing a [`DeviceData`].
    #[must_use]
    pub fn builder() -> DeviceDataBuilder {
        DeviceDataBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`RuleHubError::Validation`] when `device_id` is empty.
    pub fn validate(&self) -> Result<(), RuleHubError> {
        if self.device_id.is_empty() {
            return Err(ValidationError::EmptyId.into());
        }
        Ok(())
    }

    /// Render the record as JSON with camelCase keys, the root that
    /// condition property paths are resolved against.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "deviceId": self.device_id,
            "deviceType": self.device_type,
            "room": self.room,
            "name": self.name,
            "topic": self.topic,
            "value": self.value,
            "timestamp": self.timestamp,
            "online": self.online,
        })
    }
}

/// Step-by-step builder for [`DeviceData`].
#[derive(Debug, Default)]
pub struct DeviceDataBuilder {
    device_id: Option<DeviceId>,
    device_type: Option<String>,
    room: Option<String>,
    name: Option<String>,
    topic: Option<String>,
    value: Option<serde_json::Value>,
    timestamp: Option<Timestamp>,
    online: Option<bool>,
}

impl DeviceDataBuilder {
    #[must_use]
    pub fn device_id(mut self, device_id: impl Into<DeviceId>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    #[must_use]
    pub fn device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = Some(device_type.into());
        self
    }

    #[must_use]
    pub fn room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    #[must_use]
    pub fn value(mut self, value: serde_json::Value) -> Self {
        self.value = Some(value);
        self
    }

    #[must_use]
    pub fn timestamp(mut self, ts: Timestamp) -> Self {
        self.timestamp = Some(ts);
        self
    }

    #[must_use]
    pub fn online(mut self, online: bool) -> Self {
        self.online = Some(online);
        self
    }

    /// Consume the builder, validate, and return a [`DeviceData`].
    ///
    /// Unset fields default to empty strings, a `null` payload, the
    /// current time, and `online = true`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleHubError::Validation`] if the device id is missing or empty.
    pub fn build(self) -> Result<DeviceData, RuleHubError> {
        let data = DeviceData {
            device_id: self.device_id.ok_or(ValidationError::EmptyId)?,
            device_type: self.device_type.unwrap_or_default(),
            room: self.room.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            topic: self.topic.unwrap_or_default(),
            value: self.value.unwrap_or(serde_json::Value::Null),
            timestamp: self.timestamp.unwrap_or_else(time::now),
            online: self.online.unwrap_or(true),
        };
        data.validate()?;
        Ok(data)
    }
}
