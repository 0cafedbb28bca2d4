//! Rule store — in-memory CRUD over the rule set.
//!
//! Rules keep the position they were first added at, so sorting by
//! priority (a stable sort) breaks ties by insertion order. Overwriting an
//! existing id keeps its original position.

use rulehub_domain::id::RuleId;
use rulehub_domain::rule::{Rule, RulePatch};

/// Insertion-ordered collection of rules keyed by id.
#[derive(Debug, Default, Clone)]
pub struct RuleStore {
    rules: Vec<Rule>,
}

impl RuleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, id: &RuleId) -> Option<usize> {
        self.rules.iter().position(|r| &r.id == id)
    }

    /// Insert `rule`, replacing any rule with the same id in place.
    ///
    /// Returns the replaced rule, if any.
    pub fn add(&mut self, rule: Rule) -> Option<Rule> {
        match self.position(&rule.id) {
            Some(index) => Some(std::mem::replace(&mut self.rules[index], rule)),
            None => {
                self.rules.push(rule);
                None
            }
        }
    }

    #[must_use]
    pub fn get(&self, id: &RuleId) -> Option<&Rule> {
        self.rules.iter().find(|r| &r.id == id)
    }

    /// All rules, priority descending, ties in insertion order.
    #[must_use]
    pub fn all(&self) -> Vec<Rule> {
        let mut rules = self.rules.clone();
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        rules
    }

    /// Enabled rules, priority descending, ties in insertion order.
    #[must_use]
    pub fn enabled(&self) -> Vec<Rule> {
        let mut rules: Vec<Rule> = self.rules.iter().filter(|r| r.enabled).cloned().collect();
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        rules
    }

    /// Shallow-merge `patch` into the stored rule.
    ///
    /// Returns the updated rule, or `None` when `id` is unknown.
    pub fn update(&mut self, id: &RuleId, patch: RulePatch) -> Option<Rule> {
        let index = self.position(id)?;
        let rule = &mut self.rules[index];
        rule.apply(patch);
        Some(rule.clone())
    }

    /// Returns `false` when `id` is unknown.
    pub fn set_enabled(&mut self, id: &RuleId, enabled: bool) -> bool {
        self.update(id, RulePatch::enabled(enabled)).is_some()
    }

    /// Returns `false` when `id` is unknown.
    pub fn remove(&mut self, id: &RuleId) -> bool {
        match self.position(id) {
            Some(index) => {
                self.rules.remove(index);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Number of enabled rules.
    #[must_use]
    pub fn enabled_count(&self) -> usize {
        self.rules.iter().filter(|r| r.enabled).count()
    }
}
