//! Statistics — read-only aggregate view of the engine.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use rulehub_domain::execution::RecentExecution;

use crate::cooldown::CooldownTracker;
use crate::device_table::DeviceTable;
use crate::rule_store::RuleStore;

/// How many firings [`EngineStats::recent_executions`] lists.
pub const RECENT_EXECUTIONS_LIMIT: usize = 10;

/// Point-in-time counts, computed on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub total_rules: usize,
    pub enabled_rules: usize,
    pub disabled_rules: usize,
    pub total_devices: usize,
    pub online_devices: usize,
    /// Latest firing of each rule, newest first.
    pub recent_executions: Vec<RecentExecution>,
    pub dispatch: DispatchCounters,
}

impl EngineStats {
    pub(crate) fn collect(
        rules: &RuleStore,
        devices: &DeviceTable,
        cooldowns: &CooldownTracker,
        dispatch: DispatchCounters,
    ) -> Self {
        let enabled_rules = rules.enabled_count();
        Self {
            total_rules: rules.len(),
            enabled_rules,
            disabled_rules: rules.len() - enabled_rules,
            total_devices: devices.len(),
            online_devices: devices.online_count(),
            recent_executions: cooldowns.recent(RECENT_EXECUTIONS_LIMIT),
            dispatch,
        }
    }
}

/// Totals since the engine was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchCounters {
    pub triggers_processed: u64,
    pub rules_fired: u64,
    pub handler_failures: u64,
    pub cascades_dropped: u64,
}

/// Lock-free counterpart of [`DispatchCounters`] updated during dispatch.
#[derive(Debug, Default)]
pub(crate) struct AtomicCounters {
    pub triggers_processed: AtomicU64,
    pub rules_fired: AtomicU64,
    pub handler_failures: AtomicU64,
    pub cascades_dropped: AtomicU64,
}

impl AtomicCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn load(&self) -> DispatchCounters {
        DispatchCounters {
            triggers_processed: self.triggers_processed.load(Ordering::Relaxed),
            rules_fired: self.rules_fired.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            cascades_dropped: self.cascades_dropped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulehub_domain::device::DeviceData;
    use rulehub_domain::rule::Rule;

    #[test]
    fn should_count_rules_and_devices() {
        let mut rules = RuleStore::new();
        rules.add(Rule::builder().id("a").name("A").build().unwrap());
        rules.add(Rule::builder().id("b").name("B").enabled(false).build().unwrap());

        let mut devices = DeviceTable::new();
        let now = rulehub_domain::time::now();
        devices.upsert(DeviceData::builder().device_id("d1").build().unwrap(), now);
        devices.upsert(
            DeviceData::builder().device_id("d2").online(false).build().unwrap(),
            now,
        );

        let mut cooldowns = CooldownTracker::new();
        cooldowns.mark(&"a".into(), now);

        let stats = EngineStats::collect(&rules, &devices, &cooldowns, DispatchCounters::default());
        assert_eq!(stats.total_rules, 2);
        assert_eq!(stats.enabled_rules, 1);
        assert_eq!(stats.disabled_rules, 1);
        assert_eq!(stats.total_devices, 2);
        assert_eq!(stats.online_devices, 1);
        assert_eq!(stats.recent_executions.len(), 1);
        assert_eq!(stats.recent_executions[0].timestamp, now);
    }

    #[test]
    fn should_snapshot_atomic_counters() {
        let counters = AtomicCounters::default();
        AtomicCounters::bump(&counters.rules_fired);
        AtomicCounters::bump(&counters.rules_fired);
        AtomicCounters::bump(&counters.handler_failures);
        let snapshot = counters.load();
        assert_eq!(snapshot.rules_fired, 2);
        assert_eq!(snapshot.handler_failures, 1);
        assert_eq!(snapshot.triggers_processed, 0);
    }
}
