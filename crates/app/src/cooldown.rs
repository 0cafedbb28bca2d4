//! Cooldown tracker — per-rule last firing time.

use std::collections::HashMap;

use rulehub_domain::execution::RecentExecution;
use rulehub_domain::id::RuleId;
use rulehub_domain::rule::Rule;
use rulehub_domain::time::Timestamp;

/// Remembers when each rule last fired.
#[derive(Debug, Default, Clone)]
pub struct CooldownTracker {
    last_execution: HashMap<RuleId, Timestamp>,
}

impl CooldownTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `rule` fired less than `cooldown_ms` ago.
    ///
    /// Rules without a cooldown, and rules that never fired, are never
    /// cooling down.
    #[must_use]
    pub fn is_in_cooldown(&self, rule: &Rule, now: Timestamp) -> bool {
        let Some(cooldown_ms) = rule.cooldown_ms else {
            return false;
        };
        let Some(last) = self.last_execution.get(&rule.id) else {
            return false;
        };
        let elapsed_ms = (now - *last).num_milliseconds();
        i128::from(elapsed_ms) < i128::from(cooldown_ms)
    }

    /// Record a firing of `rule_id` at `at`.
    pub fn mark(&mut self, rule_id: &RuleId, at: Timestamp) {
        self.last_execution.insert(rule_id.clone(), at);
    }

    #[must_use]
    pub fn last_execution(&self, rule_id: &RuleId) -> Option<Timestamp> {
        self.last_execution.get(rule_id).copied()
    }

    /// Drop what we know about `rule_id`.
    pub fn forget(&mut self, rule_id: &RuleId) {
        self.last_execution.remove(rule_id);
    }

    /// Up to `limit` latest firings, newest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<RecentExecution> {
        let mut recent: Vec<RecentExecution> = self
            .last_execution
            .iter()
            .map(|(rule_id, timestamp)| RecentExecution {
                rule_id: rule_id.clone(),
                timestamp: *timestamp,
            })
            .collect();
        // rule id as tie-breaker keeps the listing deterministic
        recent.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| a.rule_id.cmp(&b.rule_id))
        });
        recent.truncate(limit);
        recent
    }
}
