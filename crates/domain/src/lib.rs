//! # rulehub-domain
//!
//! Pure domain model for the rulehub automation rule engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Device telemetry records** (latest known state of a device)
//! - Define **Rules** (prioritized condition chain → ordered action list)
//! - Define the **Value extractor** and coercions the operator table relies on
//! - Define the **Execution context** handed to rule execution handlers
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod device;
pub mod execution;
pub mod rule;
pub mod value;
