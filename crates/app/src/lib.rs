//! # rulehub-app
//!
//! Application layer — the rule engine and its **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** at the engine's boundaries:
//!   - `TelemetrySink` — ingress of device updates and offline transitions
//!   - `RuleExecutionHandler` — egress of rule firings
//!   - `Clock` — source of "now" for cooldowns, time conditions and stamping
//! - Keep the in-memory state: rules (`RuleStore`), latest device records
//!   (`DeviceTable`) and per-rule last firings (`CooldownTracker`)
//! - Evaluate condition chains and dispatch firings (`RuleEngine`)
//! - Report aggregate statistics (`EngineStats`)
//!
//! ## Dependency rule
//! Depends on `rulehub-domain` only. Never imports adapter crates. Adapters
//! depend on *this* crate, not the reverse.

pub mod condition_evaluator;
pub mod cooldown;
pub mod default_rules;
pub mod device_table;
pub mod ports;
pub mod rule_engine;
pub mod rule_store;
pub mod stats;

pub use rule_engine::{EngineConfig, RuleEngine};
pub use stats::{DispatchCounters, EngineStats};
