//! Starter automations seeded into a fresh engine.
//!
//! Device commands in these rules address devices indirectly, since the
//! rules can't know device ids up front:
//! - `room:<type>` targets devices of `<type>` in the trigger device's room
//! - `all:<type>` targets every device of `<type>`
//!
//! Execution handlers resolve these targets from the context's device
//! snapshot.

use serde_json::{Value, json};

use rulehub_domain::id::RuleId;
use rulehub_domain::rule::{Action, Condition, Operator, Rule, Severity};

/// Prefix for a command target resolved within the trigger's room.
pub const ROOM_TARGET_PREFIX: &str = "room:";
/// Prefix for a command target resolved across the whole home.
pub const ALL_TARGET_PREFIX: &str = "all:";

fn is_type(device_type: &str) -> Condition {
    Condition::state("deviceType", Operator::Eq, json!(device_type))
}

fn rule(
    id: &str,
    name: &str,
    description: &str,
    priority: i64,
    cooldown_ms: Option<u64>,
    conditions: Vec<Condition>,
    actions: Vec<Action>,
) -> Rule {
    Rule {
        id: RuleId::new(id),
        name: name.to_string(),
        description: description.to_string(),
        enabled: true,
        priority,
        conditions,
        actions,
        cooldown_ms,
    }
}

fn light(target: &str, command: Value) -> Action {
    Action::command(target, command)
}

/// The six starter automations.
#[must_use]
pub fn default_rules() -> Vec<Rule> {
    vec![
        rule(
            "motion-light-on",
            "Motion turns on the light",
            "Switch on the lights of a room as soon as motion is detected there.",
            100,
            Some(2_000),
            vec![
                is_type("motion_sensor"),
                Condition::sensor("value.motion", Operator::Eq, json!(true)),
            ],
            vec![
                light("room:light", json!({"state": "on", "brightness": 100})),
                Action::log("Motion detected, lights on"),
            ],
        ),
        rule(
            "motion-light-off",
            "Motion clear turns off the light",
            "Switch the lights of a room off a while after motion stops.",
            90,
            None,
            vec![
                is_type("motion_sensor"),
                Condition::sensor("value.motion", Operator::Eq, json!(false)),
            ],
            vec![
                Action::delay(120_000),
                light("room:light", json!({"state": "off"})),
            ],
        ),
        rule(
            "high-temperature-alert",
            "High temperature alert",
            "Warn when a room gets hotter than 30 degrees.",
            80,
            Some(300_000),
            vec![
                is_type("temperature_sensor"),
                Condition::sensor("value.temperature", Operator::Gt, json!(30)),
            ],
            vec![Action::notify("High temperature detected", Severity::Warning)],
        ),
        rule(
            "night-door-alert",
            "Door opened at night",
            "Raise a critical alert when a door opens between 22:00 and 06:00.",
            120,
            Some(60_000),
            vec![
                Condition::time("time", Operator::Ge, json!("22:00")).or(),
                Condition::time("time", Operator::Lt, json!("06:00")).and(),
                is_type("door_sensor"),
                Condition::sensor("value.open", Operator::Eq, json!(true)),
            ],
            vec![
                Action::notify("Door opened during the night", Severity::Critical),
                Action::log("Night door alert raised"),
            ],
        ),
        rule(
            "high-load-dimming",
            "Dim lights under high load",
            "Dim every light when the power load goes above 80%.",
            70,
            Some(600_000),
            vec![
                is_type("power_meter"),
                Condition::sensor("value.load", Operator::Gt, json!(80)),
            ],
            vec![
                light("all:light", json!({"brightness": 50})),
                Action::notify("High power load, dimming lights", Severity::Warning),
            ],
        ),
        rule(
            "welcome-home",
            "Welcome home",
            "Light up the house when the front door opens in the evening.",
            60,
            Some(1_800_000),
            vec![
                is_type("door_sensor"),
                Condition::state("room", Operator::Eq, json!("hallway")),
                Condition::sensor("value.open", Operator::Eq, json!(true)),
                Condition::time("hour", Operator::Between, json!(17)).second_value(json!(21)),
            ],
            vec![
                light("room:light", json!({"state": "on", "brightness": 100})),
                Action::delay(1_000),
                light("all:light", json!({"state": "on", "brightness": 70})),
                Action::notify("Welcome home!", Severity::Info),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn should_provide_six_valid_rules_with_unique_ids() {
        let rules = default_rules();
        assert_eq!(rules.len(), 6);
        let ids: HashSet<_> = rules.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids.len(), 6);
        for rule in &rules {
            assert!(rule.validate().is_ok(), "{} should be valid", rule.id);
            assert!(!rule.conditions.is_empty());
            assert!(!rule.actions.is_empty());
        }
    }

    #[test]
    fn should_use_known_target_prefixes_for_indirect_commands() {
        for rule in default_rules() {
            for action in &rule.actions {
                if let Action::DeviceCommand { device_id, .. } = action {
                    let id = device_id.as_str();
                    assert!(
                        id.starts_with(ROOM_TARGET_PREFIX) || id.starts_with(ALL_TARGET_PREFIX),
                        "unexpected target {id}"
                    );
                }
            }
        }
    }
}
