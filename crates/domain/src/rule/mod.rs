//! Rule — a prioritized condition chain paired with an ordered action list.
//!
//! Rules are evaluated on every telemetry update. When the [`Condition`]
//! chain matches and the rule is not cooling down, its [`Action`]s are
//! handed to the execution handlers. Rules with a higher `priority` are
//! evaluated and fire first.

mod action;
mod condition;

pub use action::{Action, Severity};
pub use condition::{Condition, ConditionKind, LogicalOperator, Operator};

use serde::{Deserialize, Serialize};

use crate::error::{RuleHubError, ValidationError};
use crate::id::RuleId;

/// A named, prioritized automation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: RuleId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Higher fires first. Not unique; ties keep insertion order.
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Minimum milliseconds between two firings. `None` never throttles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_ms: Option<u64>,
}

fn default_enabled() -> bool {
    true
}

impl Rule {
    /// Create a builder for constructing a [`Rule`].
    #[must_use]
    pub fn builder() -> RuleBuilder {
        RuleBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// An empty condition list is valid; such a rule simply never fires.
    ///
    /// # Errors
    ///
    /// Returns [`RuleHubError::Validation`] when:
    /// - `id` is empty ([`ValidationError::EmptyId`])
    /// - `name` is empty ([`ValidationError::EmptyName`])
    pub fn validate(&self) -> Result<(), RuleHubError> {
        if self.id.is_empty() {
            return Err(ValidationError::EmptyId.into());
        }
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(())
    }

    /// Shallow-merge the supplied fields of `patch` into this rule.
    ///
    /// The id is never touched.
    pub fn apply(&mut self, patch: RulePatch) {
        let RulePatch {
            name,
            description,
            enabled,
            priority,
            conditions,
            actions,
            cooldown_ms,
        } = patch;
        if let Some(name) = name {
            self.name = name;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(enabled) = enabled {
            self.enabled = enabled;
        }
        if let Some(priority) = priority {
            self.priority = priority;
        }
        if let Some(conditions) = conditions {
            self.conditions = conditions;
        }
        if let Some(actions) = actions {
            self.actions = actions;
        }
        if let Some(cooldown_ms) = cooldown_ms {
            self.cooldown_ms = cooldown_ms;
        }
    }
}

/// A partial update: only `Some` fields replace the stored values.
///
/// `cooldown_ms` is doubly optional so a patch can clear the cooldown
/// (`Some(None)`) as well as leave it alone (`None`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RulePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub enabled: Option<bool>,
    pub priority: Option<i64>,
    pub conditions: Option<Vec<Condition>>,
    pub actions: Option<Vec<Action>>,
    #[serde(with = "double_option", skip_serializing_if = "Option::is_none")]
    pub cooldown_ms: Option<Option<u64>>,
}

impl RulePatch {
    /// Patch that only flips `enabled`.
    #[must_use]
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Self::default()
        }
    }
}

mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[allow(clippy::ref_option, clippy::option_option)]
    pub fn serialize<S: Serializer>(value: &Option<Option<u64>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    #[allow(clippy::option_option)]
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Option<u64>>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(Some)
    }
}

/// Step-by-step builder for [`Rule`].
#[derive(Debug, Default)]
pub struct RuleBuilder {
    id: Option<RuleId>,
    name: Option<String>,
    description: Option<String>,
    enabled: Option<bool>,
    priority: Option<i64>,
    conditions: Vec<Condition>,
    actions: Vec<Action>,
    cooldown_ms: Option<u64>,
}

impl RuleBuilder {
    #[must_use]
    pub fn id(mut self, id: impl Into<RuleId>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    #[must_use]
    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    #[must_use]
    pub fn cooldown_ms(mut self, cooldown_ms: u64) -> Self {
        self.cooldown_ms = Some(cooldown_ms);
        self
    }

    /// Consume the builder, validate, and return a [`Rule`].
    ///
    /// A missing id is replaced by a generated one.
    ///
    /// # Errors
    ///
    /// Returns [`RuleHubError::Validation`] if the name is missing or empty,
    /// or if an explicit id is empty.
    pub fn build(self) -> Result<Rule, RuleHubError> {
        let rule = Rule {
            id: self.id.unwrap_or_else(RuleId::generate),
            name: self.name.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            enabled: self.enabled.unwrap_or(true),
            priority: self.priority.unwrap_or_default(),
            conditions: self.conditions,
            actions: self.actions,
            cooldown_ms: self.cooldown_ms,
        };
        rule.validate()?;
        Ok(rule)
    }
}
