//! Action executor — turns rule firings into effects.
//!
//! The engine calls handlers synchronously, so the executor resolves its
//! targets from the firing's snapshot and then hands the actions to a tokio
//! task. Delays therefore never hold up dispatch.

use std::sync::{Arc, Weak};
use std::time::Duration;

use serde_json::Value;
use tokio::runtime::Handle;

use rulehub_adapter_virtual::VirtualHome;
use rulehub_app::default_rules::{ALL_TARGET_PREFIX, ROOM_TARGET_PREFIX};
use rulehub_app::ports::{HandlerError, RuleExecutionHandler, TelemetrySink};
use rulehub_domain::execution::RuleExecutionContext;
use rulehub_domain::id::{DeviceId, RuleId};
use rulehub_domain::rule::{Action, Severity};

/// One action, with indirect command targets already resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Command {
        targets: Vec<DeviceId>,
        command: Value,
    },
    Notify {
        message: String,
        severity: Severity,
    },
    Log(String),
    Delay(Duration),
    Webhook {
        url: String,
        payload: Option<Value>,
    },
    Skip,
}

/// Resolve the actions of a firing into executable steps.
///
/// Command targets of the form `room:<type>` and `all:<type>` are expanded
/// against the firing's device snapshot, in device id order.
#[must_use]
pub fn plan(context: &RuleExecutionContext, actions: &[Action]) -> Vec<Step> {
    actions
        .iter()
        .map(|action| match action {
            Action::DeviceCommand { device_id, command } => Step::Command {
                targets: resolve_targets(context, device_id),
                command: command.clone(),
            },
            Action::Notification { message, severity } => Step::Notify {
                message: message.clone(),
                severity: *severity,
            },
            Action::Log { message } => Step::Log(message.clone()),
            Action::Delay { delay_ms } => Step::Delay(Duration::from_millis(*delay_ms)),
            Action::Webhook {
                webhook_url,
                payload,
            } => Step::Webhook {
                url: webhook_url.clone(),
                payload: payload.clone(),
            },
            Action::Unknown => Step::Skip,
        })
        .collect()
}

fn resolve_targets(context: &RuleExecutionContext, target: &DeviceId) -> Vec<DeviceId> {
    let mut targets: Vec<DeviceId> =
        if let Some(device_type) = target.as_str().strip_prefix(ROOM_TARGET_PREFIX) {
            context
                .room_devices(Some(device_type))
                .map(|d| d.device_id.clone())
                .collect()
        } else if let Some(device_type) = target.as_str().strip_prefix(ALL_TARGET_PREFIX) {
            context
                .all_devices
                .values()
                .filter(|d| d.device_type == device_type)
                .map(|d| d.device_id.clone())
                .collect()
        } else {
            return vec![target.clone()];
        };
    targets.sort();
    targets
}

/// Executes rule actions against the virtual home.
///
/// Device commands go to the home; the resulting records are fed back
/// through the telemetry sink so rules can react to them.
#[derive(Clone)]
pub struct ActionExecutor {
    home: Arc<VirtualHome>,
    sink: Weak<dyn TelemetrySink>,
    runtime: Handle,
}

impl ActionExecutor {
    #[must_use]
    pub fn new(home: Arc<VirtualHome>, sink: Weak<dyn TelemetrySink>, runtime: Handle) -> Self {
        Self {
            home,
            sink,
            runtime,
        }
    }

    /// Run `steps` in order. A failing step is logged and the rest still run.
    pub async fn execute(&self, rule_id: RuleId, steps: Vec<Step>) {
        for step in steps {
            match step {
                Step::Command { targets, command } => {
                    if targets.is_empty() {
                        tracing::debug!(%rule_id, "device command matched no device");
                    }
                    for target in targets {
                        self.send_command(&rule_id, &target, &command);
                    }
                }
                Step::Notify { message, severity } => match severity {
                    Severity::Info => tracing::info!(%rule_id, %severity, "{message}"),
                    Severity::Warning => tracing::warn!(%rule_id, %severity, "{message}"),
                    Severity::Critical => tracing::error!(%rule_id, %severity, "{message}"),
                },
                Step::Log(message) => tracing::info!(%rule_id, "{message}"),
                Step::Delay(duration) => tokio::time::sleep(duration).await,
                Step::Webhook { url, payload } => {
                    tracing::info!(%rule_id, %url, ?payload, "webhook not delivered, no transport configured");
                }
                Step::Skip => tracing::debug!(%rule_id, "skipping unknown action"),
            }
        }
    }

    fn send_command(&self, rule_id: &RuleId, target: &DeviceId, command: &Value) {
        if !self.home.owns_device(target) {
            tracing::debug!(%rule_id, device_id = %target, "device not managed by the virtual home");
            return;
        }
        match self.home.handle_command(target, command) {
            Ok(record) => match self.sink.upgrade() {
                Some(sink) => sink.update_device_data(record),
                None => tracing::debug!(%rule_id, device_id = %target, "telemetry sink gone"),
            },
            Err(error) => {
                tracing::warn!(%rule_id, device_id = %target, %error, "device command failed");
            }
        }
    }
}

impl RuleExecutionHandler for ActionExecutor {
    fn handle(
        &self,
        context: &RuleExecutionContext,
        actions: &[Action],
    ) -> Result<(), HandlerError> {
        let steps = plan(context, actions);
        let executor = self.clone();
        let rule_id = context.rule.id.clone();
        self.runtime
            .spawn(async move { executor.execute(rule_id, steps).await });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use serde_json::json;

    use rulehub_domain::device::DeviceData;
    use rulehub_domain::rule::Rule;

    #[derive(Default)]
    struct RecordingSink {
        updates: Mutex<Vec<DeviceData>>,
    }

    impl TelemetrySink for RecordingSink {
        fn update_device_data(&self, data: DeviceData) {
            self.updates.lock().unwrap().push(data);
        }

        fn mark_device_offline(&self, _device_id: &DeviceId) {}
    }

    fn context_for(trigger_id: &str, actions: Vec<Action>) -> RuleExecutionContext {
        let home = VirtualHome::default();
        let all: HashMap<DeviceId, DeviceData> = home
            .devices()
            .into_iter()
            .map(|d| (d.device_id.clone(), d))
            .collect();
        let mut rule = Rule::builder().id("r").name("r").build().unwrap();
        rule.actions = actions;
        RuleExecutionContext {
            rule,
            trigger_device: all[&DeviceId::new(trigger_id)].clone(),
            all_devices: Arc::new(all),
            timestamp: rulehub_domain::time::now(),
        }
    }

    #[test]
    fn should_resolve_room_target_to_lights_in_trigger_room() {
        let actions = vec![Action::command("room:light", json!({"state": "on"}))];
        let context = context_for("hallway-door", actions.clone());
        let steps = plan(&context, &actions);
        assert_eq!(
            steps,
            vec![Step::Command {
                targets: vec![DeviceId::new("hallway-light")],
                command: json!({"state": "on"}),
            }]
        );
    }

    #[test]
    fn should_resolve_all_target_to_every_light() {
        let actions = vec![Action::command("all:light", json!({"brightness": 50}))];
        let context = context_for("kitchen-power", actions.clone());
        let Step::Command { targets, .. } = &plan(&context, &actions)[0] else {
            panic!("expected a command step");
        };
        assert_eq!(
            targets,
            &vec![DeviceId::new("hallway-light"), DeviceId::new("living-room-light")]
        );
    }

    #[test]
    fn should_keep_literal_target() {
        let actions = vec![Action::command("hallway-light", json!({"state": "off"}))];
        let context = context_for("kitchen-power", actions.clone());
        let Step::Command { targets, .. } = &plan(&context, &actions)[0] else {
            panic!("expected a command step");
        };
        assert_eq!(targets, &vec![DeviceId::new("hallway-light")]);
    }

    #[test]
    fn should_plan_every_action_kind() {
        let actions = vec![
            Action::notify("hot", Severity::Warning),
            Action::log("note"),
            Action::delay(250),
            Action::Webhook {
                webhook_url: "http://example.invalid/hook".to_string(),
                payload: None,
            },
            Action::Unknown,
        ];
        let context = context_for("kitchen-power", actions.clone());
        let steps = plan(&context, &actions);
        assert_eq!(
            steps,
            vec![
                Step::Notify {
                    message: "hot".to_string(),
                    severity: Severity::Warning,
                },
                Step::Log("note".to_string()),
                Step::Delay(Duration::from_millis(250)),
                Step::Webhook {
                    url: "http://example.invalid/hook".to_string(),
                    payload: None,
                },
                Step::Skip,
            ]
        );
    }

    #[tokio::test]
    async fn should_apply_commands_and_push_telemetry() {
        let home = Arc::new(VirtualHome::default());
        let sink = Arc::new(RecordingSink::default());
        let weak: Weak<dyn TelemetrySink> = Arc::downgrade(&sink) as Weak<dyn TelemetrySink>;
        let executor = ActionExecutor::new(home.clone(), weak, Handle::current());

        executor
            .execute(
                RuleId::new("r"),
                vec![
                    Step::Command {
                        targets: vec![DeviceId::new("hallway-light"), DeviceId::new("ghost")],
                        command: json!({"state": "on", "brightness": 30}),
                    },
                    Step::Delay(Duration::from_millis(1)),
                    Step::Command {
                        targets: vec![DeviceId::new("living-room-light")],
                        command: json!({"state": "on"}),
                    },
                ],
            )
            .await;

        let updates = sink.updates.lock().unwrap();
        let ids: Vec<&str> = updates.iter().map(|d| d.device_id.as_str()).collect();
        assert_eq!(ids, vec!["hallway-light", "living-room-light"]);
        assert_eq!(updates[0].value, json!({"state": "on", "brightness": 30}));
    }

    #[tokio::test]
    async fn should_skip_foreign_and_uncommandable_targets() {
        let home = Arc::new(VirtualHome::default());
        let sink = Arc::new(RecordingSink::default());
        let weak: Weak<dyn TelemetrySink> = Arc::downgrade(&sink) as Weak<dyn TelemetrySink>;
        let executor = ActionExecutor::new(home.clone(), weak, Handle::current());

        executor
            .execute(
                RuleId::new("r"),
                vec![Step::Command {
                    targets: vec![DeviceId::new("garage-opener"), DeviceId::new("hallway-door")],
                    command: json!({"state": "on"}),
                }],
            )
            .await;

        assert!(sink.updates.lock().unwrap().is_empty());
        assert!(!home.owns_device(&DeviceId::new("garage-opener")));
    }

    #[tokio::test]
    async fn should_run_actions_in_background_when_handling_firing() {
        let home = Arc::new(VirtualHome::default());
        let sink = Arc::new(RecordingSink::default());
        let weak: Weak<dyn TelemetrySink> = Arc::downgrade(&sink) as Weak<dyn TelemetrySink>;
        let executor = ActionExecutor::new(home, weak, Handle::current());
        let actions = vec![Action::command("room:light", json!({"state": "on"}))];
        let context = context_for("living-room-motion", actions.clone());

        executor.handle(&context, &actions).unwrap();
        assert!(sink.updates.lock().unwrap().is_empty());

        for _ in 0..50 {
            if !sink.updates.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let updates = sink.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].device_id.as_str(), "living-room-light");
    }
}
