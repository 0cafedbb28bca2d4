//! Rule engine — the façade that ties the rule store, the device table and the
//! cooldown tracker to condition evaluation and handler dispatch.
//!
//! Every trigger (a device update or an offline transition) runs one
//! evaluation pass. The pass itself runs under a single lock so two concurrent
//! triggers can never both slip past the same cooldown. Handlers are invoked
//! afterwards, with the lock released, so they may call back into the engine.
//!
//! Triggers submitted while a pass is in flight are queued and drained in FIFO
//! order by the thread that owns the pass. A trigger submitted from inside a
//! handler is one cascade level deeper than the pass that produced it; levels
//! beyond [`EngineConfig::max_cascade_depth`] are dropped.

use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, ThreadId};

use chrono::{FixedOffset, Local, Offset};

use rulehub_domain::device::DeviceData;
use rulehub_domain::execution::{DeviceSnapshot, RuleExecutionContext};
use rulehub_domain::id::{DeviceId, RuleId};
use rulehub_domain::rule::{Rule, RulePatch};

use crate::condition_evaluator::{EvaluationScope, evaluate_chain};
use crate::cooldown::CooldownTracker;
use crate::default_rules::default_rules;
use crate::device_table::DeviceTable;
use crate::ports::{Clock, RuleExecutionHandler, SystemClock, TelemetrySink};
use crate::rule_store::RuleStore;
use crate::stats::{AtomicCounters, EngineStats};

/// Cascade levels a handler may trigger before further triggers are dropped.
pub const DEFAULT_MAX_CASCADE_DEPTH: usize = 8;

/// Engine tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Seed the starter automations on construction.
    pub seed_default_rules: bool,
    /// Deepest accepted cascade level for triggers raised by handlers.
    pub max_cascade_depth: usize,
    /// Offset that `time` conditions are evaluated in.
    pub timezone: FixedOffset,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed_default_rules: true,
            max_cascade_depth: DEFAULT_MAX_CASCADE_DEPTH,
            timezone: Local::now().offset().fix(),
        }
    }
}

#[derive(Debug, Default)]
struct EngineState {
    rules: RuleStore,
    devices: DeviceTable,
    cooldowns: CooldownTracker,
}

#[derive(Debug)]
enum Trigger {
    Update(DeviceData),
    Offline(DeviceId),
}

#[derive(Debug)]
struct QueuedTrigger {
    trigger: Trigger,
    depth: usize,
}

#[derive(Debug, Default)]
struct DispatchQueue {
    pending: VecDeque<QueuedTrigger>,
    /// Thread currently running passes, if any.
    drainer: Option<ThreadId>,
    /// Cascade depth of the pass in flight.
    depth: usize,
}

/// In-memory rule engine.
///
/// Shareable across threads; wrap it in an [`Arc`] to hand it to producers
/// and handlers.
pub struct RuleEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<EngineState>,
    handlers: RwLock<Vec<Arc<dyn RuleExecutionHandler>>>,
    queue: Mutex<DispatchQueue>,
    counters: AtomicCounters,
    stopped: AtomicBool,
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field("config", &self.config)
            .field("stopped", &self.stopped.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resets the dispatch queue if a pass unwinds, so later triggers are not
/// stuck behind a drainer that no longer exists.
struct DrainGuard<'a> {
    queue: &'a Mutex<DispatchQueue>,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            let mut queue = lock(self.queue);
            queue.pending.clear();
            queue.drainer = None;
            queue.depth = 0;
        }
    }
}

impl RuleEngine {
    /// Create an engine on the system clock.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    /// Create an engine reading time from `clock`.
    #[must_use]
    pub fn with_clock(config: EngineConfig, clock: impl Clock + 'static) -> Self {
        let mut state = EngineState::default();
        if config.seed_default_rules {
            for rule in default_rules() {
                state.rules.add(rule);
            }
            tracing::debug!(count = state.rules.len(), "seeded default rules");
        }
        Self {
            config,
            clock: Arc::new(clock),
            state: Mutex::new(state),
            handlers: RwLock::new(Vec::new()),
            queue: Mutex::new(DispatchQueue::default()),
            counters: AtomicCounters::default(),
            stopped: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a consumer of rule firings.
    ///
    /// Handlers are invoked in registration order.
    pub fn on_rule_execution(&self, handler: impl RuleExecutionHandler + 'static) {
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        handlers.push(Arc::new(handler));
        tracing::debug!(count = handlers.len(), "registered rule execution handler");
    }

    /// Store the device's latest record and evaluate rules against it.
    pub fn update_device_data(&self, data: DeviceData) {
        self.submit(Trigger::Update(data));
    }

    /// Flag a known device offline and evaluate rules against it.
    ///
    /// Unknown devices are ignored.
    pub fn mark_device_offline(&self, device_id: &DeviceId) {
        self.submit(Trigger::Offline(device_id.clone()));
    }

    /// Insert a rule, replacing any rule with the same id.
    ///
    /// Returns the replaced rule.
    #[tracing::instrument(skip(self, rule), fields(rule_id = %rule.id, rule_name = %rule.name))]
    pub fn add_rule(&self, rule: Rule) -> Option<Rule> {
        let replaced = lock(&self.state).rules.add(rule);
        tracing::info!(replaced = replaced.is_some(), "rule added");
        replaced
    }

    #[must_use]
    pub fn get_rule(&self, rule_id: &RuleId) -> Option<Rule> {
        lock(&self.state).rules.get(rule_id).cloned()
    }

    /// Every rule, highest priority first.
    #[must_use]
    pub fn get_all_rules(&self) -> Vec<Rule> {
        lock(&self.state).rules.all()
    }

    /// Merge `patch` into an existing rule.
    ///
    /// Returns the updated rule, or `None` when the id is unknown.
    #[tracing::instrument(skip(self, patch))]
    pub fn update_rule(&self, rule_id: &RuleId, patch: RulePatch) -> Option<Rule> {
        let updated = lock(&self.state).rules.update(rule_id, patch);
        match &updated {
            Some(_) => tracing::info!("rule updated"),
            None => tracing::debug!("rule not found"),
        }
        updated
    }

    #[tracing::instrument(skip(self))]
    pub fn enable_rule(&self, rule_id: &RuleId) -> bool {
        lock(&self.state).rules.set_enabled(rule_id, true)
    }

    #[tracing::instrument(skip(self))]
    pub fn disable_rule(&self, rule_id: &RuleId) -> bool {
        lock(&self.state).rules.set_enabled(rule_id, false)
    }

    /// Delete a rule and its cooldown history.
    #[tracing::instrument(skip(self))]
    pub fn remove_rule(&self, rule_id: &RuleId) -> bool {
        let mut state = lock(&self.state);
        let removed = state.rules.remove(rule_id);
        if removed {
            state.cooldowns.forget(rule_id);
            tracing::info!("rule removed");
        }
        removed
    }

    #[must_use]
    pub fn get_stats(&self) -> EngineStats {
        let state = lock(&self.state);
        EngineStats::collect(
            &state.rules,
            &state.devices,
            &state.cooldowns,
            self.counters.load(),
        )
    }

    /// Owned copy of the device table.
    #[must_use]
    pub fn get_devices(&self) -> HashMap<DeviceId, DeviceData> {
        lock(&self.state).devices.snapshot()
    }

    /// Stop accepting triggers. Queued triggers are discarded.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let discarded = {
            let mut queue = lock(&self.queue);
            let discarded = queue.pending.len();
            queue.pending.clear();
            discarded
        };
        tracing::info!(discarded, "rule engine stopped");
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn submit(&self, trigger: Trigger) {
        if self.is_stopped() {
            tracing::debug!(?trigger, "engine stopped, ignoring trigger");
            return;
        }

        let current = thread::current().id();
        {
            let mut queue = lock(&self.queue);
            match queue.drainer {
                Some(drainer) if drainer == current => {
                    let depth = queue.depth + 1;
                    if depth > self.config.max_cascade_depth {
                        AtomicCounters::bump(&self.counters.cascades_dropped);
                        tracing::warn!(
                            depth,
                            max_depth = self.config.max_cascade_depth,
                            ?trigger,
                            "cascade too deep, dropping trigger"
                        );
                    } else {
                        queue.pending.push_back(QueuedTrigger { trigger, depth });
                    }
                    return;
                }
                Some(_) => {
                    queue.pending.push_back(QueuedTrigger { trigger, depth: 0 });
                    return;
                }
                None => {
                    queue.drainer = Some(current);
                    queue.pending.push_back(QueuedTrigger { trigger, depth: 0 });
                }
            }
        }

        self.drain();
    }

    fn drain(&self) {
        let _guard = DrainGuard { queue: &self.queue };
        loop {
            let next = {
                let mut queue = lock(&self.queue);
                match queue.pending.pop_front() {
                    Some(next) if !self.is_stopped() => {
                        queue.depth = next.depth;
                        next
                    }
                    _ => {
                        queue.pending.clear();
                        queue.drainer = None;
                        queue.depth = 0;
                        return;
                    }
                }
            };
            let firings = self.evaluate(next.trigger);
            self.dispatch(&firings);
        }
    }

    /// Run one evaluation pass under the state lock and return the firings.
    fn evaluate(&self, trigger: Trigger) -> Vec<RuleExecutionContext> {
        let now = self.clock.now();
        let mut guard = lock(&self.state);
        let state = &mut *guard;

        let trigger_device = match trigger {
            Trigger::Update(data) => state.devices.upsert(data, now),
            Trigger::Offline(device_id) => match state.devices.mark_offline(&device_id, now) {
                Some(data) => data,
                None => {
                    tracing::debug!(%device_id, "unknown device cannot go offline");
                    return Vec::new();
                }
            },
        };
        AtomicCounters::bump(&self.counters.triggers_processed);

        let local_now = now.with_timezone(&self.config.timezone);
        let mut snapshot: Option<DeviceSnapshot> = None;
        let mut firings = Vec::new();

        for rule in state.rules.enabled() {
            if state.cooldowns.is_in_cooldown(&rule, now) {
                tracing::trace!(rule_id = %rule.id, "rule in cooldown");
                continue;
            }
            let scope = EvaluationScope {
                trigger: &trigger_device,
                devices: &state.devices,
                now: local_now,
            };
            if !evaluate_chain(&rule.conditions, &scope) {
                continue;
            }
            state.cooldowns.mark(&rule.id, now);
            let all_devices = snapshot
                .get_or_insert_with(|| Arc::new(state.devices.snapshot()))
                .clone();
            firings.push(RuleExecutionContext {
                rule,
                trigger_device: trigger_device.clone(),
                all_devices,
                timestamp: now,
            });
        }

        tracing::debug!(
            device_id = %trigger_device.device_id,
            fired = firings.len(),
            "evaluated trigger"
        );
        firings
    }

    fn dispatch(&self, firings: &[RuleExecutionContext]) {
        if firings.is_empty() {
            return;
        }
        let handlers: Vec<Arc<dyn RuleExecutionHandler>> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for context in firings {
            AtomicCounters::bump(&self.counters.rules_fired);
            tracing::info!(
                rule_id = %context.rule.id,
                rule_name = %context.rule.name,
                device_id = %context.trigger_device.device_id,
                "rule fired"
            );
            for (index, handler) in handlers.iter().enumerate() {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    handler.handle(context, &context.rule.actions)
                }));
                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(error)) => {
                        AtomicCounters::bump(&self.counters.handler_failures);
                        tracing::error!(
                            rule_id = %context.rule.id,
                            handler = index,
                            %error,
                            "rule execution handler failed"
                        );
                    }
                    Err(_) => {
                        AtomicCounters::bump(&self.counters.handler_failures);
                        tracing::error!(
                            rule_id = %context.rule.id,
                            handler = index,
                            "rule execution handler panicked"
                        );
                    }
                }
            }
        }
    }
}

impl TelemetrySink for RuleEngine {
    fn update_device_data(&self, data: DeviceData) {
        RuleEngine::update_device_data(self, data);
    }

    fn mark_device_offline(&self, device_id: &DeviceId) {
        RuleEngine::mark_device_offline(self, device_id);
    }
}
