//! Port definitions — traits at the engine's boundaries.
//!
//! Ports are the boundaries between the engine and the outside world. They
//! are defined here (in `app`) so that the engine and the adapters can both
//! depend on them without creating circular dependencies.

pub mod clock;
pub mod execution;
pub mod telemetry;

pub use clock::{Clock, SystemClock};
pub use execution::{HandlerError, RuleExecutionHandler, handler_fn};
pub use telemetry::TelemetrySink;
