//! Typed identifier newtypes.
//!
//! Rule and device identifiers are human-chosen strings (`"motion-light-on"`,
//! `"living-room-light"`), so they wrap a `String` rather than a UUID.
//! [`generate`](RuleId::generate) falls back to a random UUID for callers
//! that don't care about the name.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Generate a new random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Access the inner string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the identifier is the empty string.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.is_empty() {
                    return Err(ValidationError::EmptyId);
                }
                Ok(Self(s.to_string()))
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Unique identifier for a [`Rule`](crate::rule::Rule).
    RuleId
);

define_id!(
    /// Unique identifier for a device, as reported in its telemetry.
    DeviceId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_generate_unique_ids_when_called_twice() {
        let a = RuleId::generate();
        let b = RuleId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn should_roundtrip_through_display_and_from_str() {
        let id = DeviceId::new("kitchen-meter");
        let parsed: DeviceId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn should_serialize_as_plain_string() {
        let id = RuleId::new("motion-light-on");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"motion-light-on\"");
    }

    #[test]
    fn should_return_error_when_parsing_empty_string() {
        let result = RuleId::from_str("");
        assert_eq!(result, Err(ValidationError::EmptyId));
    }
}
