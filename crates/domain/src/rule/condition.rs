//! Condition — one link of a rule's condition chain.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::DeviceId;
use crate::value::{coerce_number, coerce_string, strict_eq};

/// What a condition inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    /// A property of the target device's latest record.
    DeviceState,
    /// A sensor reading, possibly from a device other than the trigger.
    SensorValue,
    /// Wall-clock time: `hour`, `time` (`"HH:MM"`), or `dayOfWeek`.
    Time,
    /// The target device is unknown or reported offline.
    DeviceOffline,
    /// Multi-device combination. Not supported yet; never matches.
    Composite,
    /// Any tag this version does not recognise, or no tag at all. Never
    /// matches.
    #[default]
    #[serde(other)]
    Unknown,
}

/// Comparison applied between the extracted and the expected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "between")]
    Between,
    #[serde(rename = "in")]
    In,
    #[serde(other)]
    Unknown,
}

impl Operator {
    /// Compare `actual` against `expected` (and `second` for
    /// [`Between`](Self::Between)).
    ///
    /// Undefined (`None`) operands never match except under
    /// [`Ne`](Self::Ne). Unknown operators never match.
    #[must_use]
    pub fn compare(self, actual: Option<&Value>, expected: Option<&Value>, second: Option<&Value>) -> bool {
        match self {
            Self::Eq => strict_eq(actual, expected),
            Self::Ne => !strict_eq(actual, expected),
            Self::Gt => coerce_number(actual) > coerce_number(expected),
            Self::Lt => coerce_number(actual) < coerce_number(expected),
            Self::Ge => coerce_number(actual) >= coerce_number(expected),
            Self::Le => coerce_number(actual) <= coerce_number(expected),
            Self::Contains => {
                actual.is_some() && coerce_string(actual).contains(&coerce_string(expected))
            }
            Self::Between => {
                let value = coerce_number(actual);
                value >= coerce_number(expected) && value <= coerce_number(second)
            }
            Self::In => match expected {
                Some(Value::Array(items)) => items.iter().any(|item| strict_eq(actual, Some(item))),
                _ => false,
            },
            Self::Unknown => false,
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Contains => "contains",
            Self::Between => "between",
            Self::In => "in",
            Self::Unknown => "?",
        })
    }
}

/// How a condition combines with the one that follows it in the chain.
///
/// Anything other than `"OR"` reads as AND.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    Or,
    #[default]
    #[serde(other)]
    And,
}

impl LogicalOperator {
    /// Fold `next` into the running result.
    #[must_use]
    pub fn combine(self, running: bool, next: bool) -> bool {
        match self {
            Self::And => running && next,
            Self::Or => running || next,
        }
    }
}

/// A single predicate in a rule's condition chain.
///
/// `logical_operator` belongs to *this* condition and says how it combines
/// with the *next* one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type", default)]
    pub kind: ConditionKind,
    /// Target device; the triggering device when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<DeviceId>,
    /// Dotted path into the device record, e.g. `"value.temperature"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Upper bound, only meaningful for [`Operator::Between`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_operator: Option<LogicalOperator>,
}

impl Condition {
    /// Start a condition of the given kind with every other field unset.
    #[must_use]
    pub fn new(kind: ConditionKind) -> Self {
        Self {
            kind,
            device_id: None,
            property: None,
            operator: None,
            value: None,
            second_value: None,
            logical_operator: None,
        }
    }

    /// `sensor_value` comparison against the triggering device.
    #[must_use]
    pub fn sensor(property: impl Into<String>, operator: Operator, value: Value) -> Self {
        Self::new(ConditionKind::SensorValue).compare(property, operator, value)
    }

    /// `device_state` comparison against the triggering device.
    #[must_use]
    pub fn state(property: impl Into<String>, operator: Operator, value: Value) -> Self {
        Self::new(ConditionKind::DeviceState).compare(property, operator, value)
    }

    /// `time` comparison on `hour`, `time` or `dayOfWeek`.
    #[must_use]
    pub fn time(property: impl Into<String>, operator: Operator, value: Value) -> Self {
        Self::new(ConditionKind::Time).compare(property, operator, value)
    }

    /// `device_offline` check for the given device (or the trigger when `None`).
    #[must_use]
    pub fn offline(device_id: Option<DeviceId>) -> Self {
        Self {
            device_id,
            ..Self::new(ConditionKind::DeviceOffline)
        }
    }

    #[must_use]
    pub fn compare(mut self, property: impl Into<String>, operator: Operator, value: Value) -> Self {
        self.property = Some(property.into());
        self.operator = Some(operator);
        self.value = Some(value);
        self
    }

    #[must_use]
    pub fn device(mut self, device_id: impl Into<DeviceId>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    #[must_use]
    pub fn second_value(mut self, value: Value) -> Self {
        self.second_value = Some(value);
        self
    }

    #[must_use]
    pub fn and(mut self) -> Self {
        self.logical_operator = Some(LogicalOperator::And);
        self
    }

    #[must_use]
    pub fn or(mut self) -> Self {
        self.logical_operator = Some(LogicalOperator::Or);
        self
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = serde_json::to_value(self.kind)
            .ok()
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_default();
        write!(f, "{kind}(")?;
        if let Some(device_id) = &self.device_id {
            write!(f, "{device_id}:")?;
        }
        if let Some(property) = &self.property {
            f.write_str(property)?;
        }
        if let Some(operator) = self.operator {
            write!(f, " {operator}")?;
        }
        if let Some(value) = &self.value {
            write!(f, " {value}")?;
        }
        if let Some(second) = &self.second_value {
            write!(f, "..{second}")?;
        }
        f.write_str(")")
    }
}
