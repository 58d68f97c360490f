pub mod engine;
pub mod error;
pub mod frontend;
pub mod ir;

pub use engine::{
    CompiledRule, EvalContext, ExecutionEngine, ExecutionTrace, ExprPredicate, FnPredicate,
    NoopObserver, Predicate, PredicateCompiler, RuleRegistry, StepEvent, StepObserver,
    TracingObserver, Value,
};
pub use error::RuleError;
pub use frontend::{RuleFrontend, load_file};
pub use ir::expr::Expr;
pub use ir::rule::{RuleDefinition, RuleId};
