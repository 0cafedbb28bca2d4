//! # rulehubd — rulehub daemon
//!
//! Composition root that wires the rule engine, the virtual home and the
//! action executor together.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialise logging
//! - Construct the engine, seed it and load extra rules
//! - Register the action executor as the engine's execution handler
//! - Run the simulator until shutdown (SIGTERM/SIGINT), then stop the engine
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no rule logic belongs here.

pub mod actions;
pub mod config;
