//! Action — an effect requested when a rule fires.
//!
//! The engine never performs actions; it hands the ordered list to the
//! registered execution handlers, which interpret each variant.

use serde::{Deserialize, Serialize};

use crate::id::DeviceId;

/// How loudly a notification should be raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => f.write_str("info"),
            Self::Warning => f.write_str("warning"),
            Self::Critical => f.write_str("critical"),
        }
    }
}

/// An operation to request when a rule's condition chain matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Action {
    /// Send a command payload to a device, e.g. `{"state": "on"}`.
    DeviceCommand {
        device_id: DeviceId,
        command: serde_json::Value,
    },
    /// Raise a user-facing notification.
    Notification {
        message: String,
        #[serde(default)]
        severity: Severity,
    },
    /// Write a line to the automation log.
    Log { message: String },
    /// Wait before continuing with the next action.
    Delay { delay_ms: u64 },
    /// Call an external webhook.
    Webhook {
        webhook_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<serde_json::Value>,
    },
    /// Any action tag this version does not recognise.
    #[serde(other)]
    Unknown,
}

impl Action {
    /// Shorthand for a [`DeviceCommand`](Self::DeviceCommand).
    #[must_use]
    pub fn command(device_id: impl Into<DeviceId>, command: serde_json::Value) -> Self {
        Self::DeviceCommand {
            device_id: device_id.into(),
            command,
        }
    }

    /// Shorthand for a [`Notification`](Self::Notification).
    #[must_use]
    pub fn notify(message: impl Into<String>, severity: Severity) -> Self {
        Self::Notification {
            message: message.into(),
            severity,
        }
    }

    /// Shorthand for a [`Log`](Self::Log).
    #[must_use]
    pub fn log(message: impl Into<String>) -> Self {
        Self::Log {
            message: message.into(),
        }
    }

    /// Shorthand for a [`Delay`](Self::Delay).
    #[must_use]
    pub fn delay(delay_ms: u64) -> Self {
        Self::Delay { delay_ms }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeviceCommand { device_id, command } => {
                write!(f, "device_command({device_id}, {command})")
            }
            Self::Notification { severity, .. } => write!(f, "notification({severity})"),
            Self::Log { .. } => f.write_str("log"),
            Self::Delay { delay_ms } => write!(f, "delay({delay_ms}ms)"),
            Self::Webhook { webhook_url, .. } => write!(f, "webhook({webhook_url})"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}
