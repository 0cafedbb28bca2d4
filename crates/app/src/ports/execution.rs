//! Execution port — consumers of rule firings.

use rulehub_domain::execution::RuleExecutionContext;
use rulehub_domain::rule::Action;

/// Error a handler may report back to the engine.
///
/// The engine only logs and counts it; it never propagates.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Receives every rule firing, in rule order then registration order.
///
/// Handlers run synchronously on the dispatching thread. Anything slow
/// (delays, network calls) must be deferred by the handler itself.
pub trait RuleExecutionHandler: Send + Sync {
    /// Handle one firing.
    ///
    /// # Errors
    ///
    /// Any error is logged and isolated; remaining handlers and rules
    /// still run.
    fn handle(&self, context: &RuleExecutionContext, actions: &[Action]) -> Result<(), HandlerError>;
}

impl<F> RuleExecutionHandler for F
where
    F: Fn(&RuleExecutionContext, &[Action]) -> Result<(), HandlerError> + Send + Sync,
{
    fn handle(&self, context: &RuleExecutionContext, actions: &[Action]) -> Result<(), HandlerError> {
        self(context, actions)
    }
}

/// Pin a closure's signature so it can be registered as a handler.
///
/// Closures passed straight to a generic `impl RuleExecutionHandler`
/// parameter can't have their argument lifetimes inferred; routing them
/// through this function fixes the signature.
pub fn handler_fn<F>(f: F) -> F
where
    F: Fn(&RuleExecutionContext, &[Action]) -> Result<(), HandlerError> + Send + Sync,
{
    f
}
