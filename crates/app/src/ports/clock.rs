//! Clock port — the engine's source of "now".

use std::sync::Arc;

use rulehub_domain::time::{self, Timestamp};

/// Supplies the current instant to cooldown checks, time conditions, and
/// update stamping.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock backed by [`chrono::Utc::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        time::now()
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
