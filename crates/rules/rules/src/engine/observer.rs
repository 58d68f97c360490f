use tracing::{debug, info};

use crate::ir::rule::RuleId;

/// What happened at one step of a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepEvent<'a> {
    /// The rule that was just evaluated.
    pub rule_id: &'a RuleId,
    /// Its display label.
    pub title: &'a str,
    /// Coerced predicate outcome.
    pub outcome: bool,
    /// The successor selected by the outcome, if any.
    pub next: Option<&'a RuleId>,
    /// Whether `next` was already visited, so the walk ends here.
    pub cycle: bool,
}

/// Receives one event per evaluated rule. Has no say over control flow.
pub trait StepObserver: Send + Sync {
    /// Called after the rule's outcome is recorded and before the walk moves on.
    fn on_step(&self, event: &StepEvent<'_>);
}

/// Emits each step as a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl StepObserver for TracingObserver {
    fn on_step(&self, event: &StepEvent<'_>) {
        let next = event.next.map(ToString::to_string);
        if event.cycle {
            info!(
                rule = %event.rule_id,
                title = event.title,
                outcome = event.outcome,
                next = next.as_deref(),
                cycle = true,
                "cycle detected, stopping traversal"
            );
        } else {
            debug!(
                rule = %event.rule_id,
                title = event.title,
                outcome = event.outcome,
                next = next.as_deref(),
                cycle = false,
                "rule evaluated"
            );
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl StepObserver for NoopObserver {
    fn on_step(&self, _event: &StepEvent<'_>) {}
}
