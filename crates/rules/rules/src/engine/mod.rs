pub mod builtins;
pub mod context;
pub mod eval;
pub mod executor;
pub mod observer;
pub mod predicate;
pub mod registry;
pub mod trace;
pub mod value;

pub use context::EvalContext;
pub use executor::ExecutionEngine;
pub use observer::{NoopObserver, StepEvent, StepObserver, TracingObserver};
pub use predicate::{ExprPredicate, FnPredicate, Predicate, PredicateCompiler};
pub use registry::{CompiledRule, RuleRegistry};
pub use trace::ExecutionTrace;
pub use value::Value;
