use std::sync::Arc;

use tracing::{debug, instrument};

use crate::engine::observer::{StepEvent, StepObserver, TracingObserver};
use crate::engine::registry::RuleRegistry;
use crate::engine::trace::ExecutionTrace;
use crate::engine::value::Value;
use crate::error::RuleError;
use crate::ir::rule::RuleId;

/// Walks a [`RuleRegistry`] from an entry rule, one predicate at a time.
///
/// Each visited rule's predicate is applied to the record, and its coerced
/// outcome picks the successor. The walk ends when a successor is missing,
/// refers to no registered rule, or was already visited. A rule is never
/// evaluated twice in one traversal, so a walk takes at most
/// `registry.len()` steps.
///
/// The engine holds no per-run state and can be shared across threads.
#[derive(Clone)]
pub struct ExecutionEngine {
    registry: Arc<RuleRegistry>,
    observer: Arc<dyn StepObserver>,
    default_entry: RuleId,
}

impl ExecutionEngine {
    /// Create an engine over `registry` with a [`TracingObserver`].
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        Self {
            registry,
            observer: Arc::new(TracingObserver),
            default_entry: RuleId::default(),
        }
    }

    /// Replace the step observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn StepObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Set the entry used by [`run_default`](Self::run_default).
    #[must_use]
    pub fn with_default_entry(mut self, entry: impl Into<RuleId>) -> Self {
        self.default_entry = entry.into();
        self
    }

    /// The registry being walked.
    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    /// The entry used by [`run_default`](Self::run_default).
    pub fn default_entry(&self) -> &RuleId {
        &self.default_entry
    }

    /// Walk the graph from `entry` and return the outcome of every visited rule.
    ///
    /// An unknown entry yields an empty trace.
    pub fn run(&self, entry: &RuleId, record: &Value) -> Result<ExecutionTrace, RuleError> {
        let mut trace = ExecutionTrace::new();
        self.run_with_trace(entry, record, &mut trace)?;
        Ok(trace)
    }

    /// Walk the graph from the configured default entry.
    pub fn run_default(&self, record: &Value) -> Result<ExecutionTrace, RuleError> {
        self.run(&self.default_entry, record)
    }

    /// Walk the graph recording outcomes into a caller-owned trace.
    ///
    /// Ids already present in `trace` count as visited. When a predicate
    /// fails, `trace` keeps every outcome recorded before the failing rule.
    #[instrument(skip_all, fields(entry = %entry, rules_count = self.registry.len()))]
    pub fn run_with_trace(
        &self,
        entry: &RuleId,
        record: &Value,
        trace: &mut ExecutionTrace,
    ) -> Result<(), RuleError> {
        let mut current = entry.clone();
        loop {
            if trace.contains(&current) {
                debug!(rule = %current, "rule already visited");
                return Ok(());
            }
            let Some(rule) = self.registry.get(&current) else {
                debug!(rule = %current, "no rule registered under id, stopping");
                return Ok(());
            };

            let outcome = rule
                .predicate
                .evaluate(record)
                .map_err(|e| RuleError::RuleEvaluation {
                    rule: current.clone(),
                    source: Box::new(e),
                })?
                .is_truthy();
            trace.record(current.clone(), outcome);

            let next = rule.next_for(outcome);
            self.observer.on_step(&StepEvent {
                rule_id: &rule.id,
                title: &rule.title,
                outcome,
                next,
                cycle: next.is_some_and(|id| trace.contains(id)),
            });

            match next {
                Some(id) => current = id.clone(),
                None => return Ok(()),
            }
        }
    }
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("rules", &self.registry.len())
            .field("default_entry", &self.default_entry)
            .finish_non_exhaustive()
    }
}
