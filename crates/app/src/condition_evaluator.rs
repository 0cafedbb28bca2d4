//! Condition evaluator — single conditions and left-folded condition chains.
//!
//! Evaluation never fails: malformed or unsupported conditions are logged at
//! `debug` and count as "not satisfied".

use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use serde_json::Value;

use rulehub_domain::device::DeviceData;
use rulehub_domain::rule::{Condition, ConditionKind};
use rulehub_domain::time::parse_minutes_of_day;
use rulehub_domain::value::extract;

use crate::device_table::DeviceTable;

/// What a condition can observe while one trigger is being evaluated.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationScope<'a> {
    /// The device whose update started this pass.
    pub trigger: &'a DeviceData,
    /// Device table, already containing the trigger's new record.
    pub devices: &'a DeviceTable,
    /// Wall-clock time in the engine's configured timezone.
    pub now: DateTime<FixedOffset>,
}

/// Evaluate an ordered chain of conditions.
///
/// The running result starts at condition 0. Each following condition `i`
/// is folded in with the logical operator attached to condition `i - 1`
/// (AND when unset). An empty chain never matches.
#[must_use]
pub fn evaluate_chain(conditions: &[Condition], scope: &EvaluationScope<'_>) -> bool {
    let Some(first) = conditions.first() else {
        return false;
    };
    conditions
        .windows(2)
        .fold(evaluate(first, scope), |running, pair| {
            let combinator = pair[0].logical_operator.unwrap_or_default();
            combinator.combine(running, evaluate(&pair[1], scope))
        })
}

/// Evaluate a single condition.
#[must_use]
pub fn evaluate(condition: &Condition, scope: &EvaluationScope<'_>) -> bool {
    match condition.kind {
        ConditionKind::DeviceState | ConditionKind::SensorValue => {
            evaluate_device_value(condition, scope)
        }
        ConditionKind::Time => evaluate_time(condition, scope),
        ConditionKind::DeviceOffline => evaluate_device_offline(condition, scope),
        ConditionKind::Composite => {
            tracing::debug!(%condition, "composite conditions are not supported");
            false
        }
        ConditionKind::Unknown => {
            tracing::debug!(%condition, "unknown condition type");
            false
        }
    }
}

fn evaluate_device_value(condition: &Condition, scope: &EvaluationScope<'_>) -> bool {
    let target = match &condition.device_id {
        Some(id) if *id != scope.trigger.device_id => match scope.devices.get(id) {
            Some(device) => device,
            None => return false,
        },
        _ => scope.trigger,
    };
    let Some(operator) = condition.operator else {
        tracing::debug!(%condition, "condition has no operator");
        return false;
    };

    let root = target.to_json();
    let actual = match condition.property.as_deref() {
        Some(path) => extract(&root, path),
        None => Some(&target.value),
    };
    operator.compare(
        actual,
        condition.value.as_ref(),
        condition.second_value.as_ref(),
    )
}

fn evaluate_time(condition: &Condition, scope: &EvaluationScope<'_>) -> bool {
    let Some(operator) = condition.operator else {
        tracing::debug!(%condition, "condition has no operator");
        return false;
    };
    let now = scope.now;
    match condition.property.as_deref() {
        Some("hour") => operator.compare(
            Some(&Value::from(now.hour())),
            condition.value.as_ref(),
            condition.second_value.as_ref(),
        ),
        Some("time") => {
            let current = Value::from(now.hour() * 60 + now.minute());
            let expected = time_operand(condition.value.as_ref());
            let second = time_operand(condition.second_value.as_ref());
            operator.compare(Some(&current), expected.as_ref(), second.as_ref())
        }
        Some("dayOfWeek") => operator.compare(
            Some(&Value::from(now.weekday().num_days_from_sunday())),
            condition.value.as_ref(),
            condition.second_value.as_ref(),
        ),
        _ => {
            tracing::debug!(%condition, "unsupported time property");
            false
        }
    }
}

/// Encode `"HH:MM"` strings (or lists of them) as minutes since midnight.
/// Unparsable strings become undefined.
fn time_operand(value: Option<&Value>) -> Option<Value> {
    match value? {
        Value::String(text) => parse_minutes_of_day(text).map(Value::from),
        Value::Array(items) => Some(Value::Array(
            items.iter().filter_map(|item| time_operand(Some(item))).collect(),
        )),
        other => Some(other.clone()),
    }
}

fn evaluate_device_offline(condition: &Condition, scope: &EvaluationScope<'_>) -> bool {
    let device_id = condition
        .device_id
        .as_ref()
        .unwrap_or(&scope.trigger.device_id);
    scope.devices.get(device_id).is_none_or(|device| !device.online)
}
