use std::fmt;
use std::sync::Arc;

use crate::engine::context::EvalContext;
use crate::engine::eval::eval;
use crate::engine::value::Value;
use crate::error::RuleError;
use crate::ir::expr::Expr;

/// A compiled, invocable predicate over a record.
///
/// Implementations return the raw value of the computation. Callers decide
/// how to coerce it; the execution engine uses [`Value::is_truthy`].
pub trait Predicate: Send + Sync + fmt::Debug {
    /// Apply the predicate to `record`.
    fn evaluate(&self, record: &Value) -> Result<Value, RuleError>;
}

/// Turns predicate source text into an invocable [`Predicate`].
///
/// Compilation must not evaluate anything; it only checks and prepares the
/// source.
pub trait PredicateCompiler: Send + Sync {
    /// Compile `source` into a predicate.
    fn compile(&self, source: &str) -> Result<Arc<dyn Predicate>, RuleError>;
}

/// A predicate backed by an expression tree.
#[derive(Debug, Clone)]
pub struct ExprPredicate {
    expr: Expr,
    param: String,
}

impl ExprPredicate {
    /// Bind `expr` to the record under the name `param`.
    pub fn new(expr: Expr, param: impl Into<String>) -> Self {
        Self {
            expr,
            param: param.into(),
        }
    }

    /// The expression this predicate evaluates.
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// The name the record is bound to.
    pub fn param(&self) -> &str {
        &self.param
    }
}

impl Predicate for ExprPredicate {
    fn evaluate(&self, record: &Value) -> Result<Value, RuleError> {
        let ctx = EvalContext::new(record, &self.param);
        eval(&self.expr, &ctx)
    }
}

type PredicateFn = dyn Fn(&Value) -> Result<Value, RuleError> + Send + Sync;

/// A predicate backed by a Rust closure, for rules built in code.
#[derive(Clone)]
pub struct FnPredicate {
    name: String,
    func: Arc<PredicateFn>,
}

impl FnPredicate {
    /// Wrap a closure that returns a raw value.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, RuleError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Wrap an infallible boolean closure.
    pub fn boolean<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::new(name, move |record| Ok(Value::Bool(func(record))))
    }
}

impl fmt::Debug for FnPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPredicate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Predicate for FnPredicate {
    fn evaluate(&self, record: &Value) -> Result<Value, RuleError> {
        (self.func)(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::context::DEFAULT_PARAM;
    use crate::ir::expr::BinaryOp;

    fn color_is_red() -> Expr {
        Expr::Binary(
            BinaryOp::Eq,
            Box::new(Expr::Field(
                Box::new(Expr::Ident("obj".into())),
                "color".into(),
            )),
            Box::new(Expr::String("red".into())),
        )
    }

    #[test]
    fn expr_predicate_binds_param() {
        let predicate = ExprPredicate::new(color_is_red(), "obj");
        let red = Value::from_json(serde_json::json!({"color": "red"}));
        let blue = Value::from_json(serde_json::json!({"color": "blue"}));
        assert_eq!(predicate.evaluate(&red).unwrap(), Value::Bool(true));
        assert_eq!(predicate.evaluate(&blue).unwrap(), Value::Bool(false));
        assert_eq!(predicate.param(), "obj");
    }

    #[test]
    fn expr_predicate_default_param_does_not_see_other_names() {
        let predicate = ExprPredicate::new(color_is_red(), DEFAULT_PARAM);
        let red = Value::from_json(serde_json::json!({"color": "red"}));
        assert!(matches!(
            predicate.evaluate(&red),
            Err(RuleError::UndefinedVariable(name)) if name == "obj"
        ));
    }

    #[test]
    fn fn_predicate_returns_raw_value() {
        let predicate = FnPredicate::new("size", |record| record.field("size"));
        let record = Value::from_json(serde_json::json!({"size": 3}));
        assert_eq!(predicate.evaluate(&record).unwrap(), Value::Int(3));
    }

    #[test]
    fn fn_predicate_boolean_adapter() {
        let predicate = FnPredicate::boolean("is-map", |record| matches!(record, Value::Map(_)));
        assert_eq!(predicate.evaluate(&Value::Null).unwrap(), Value::Bool(false));
        assert!(format!("{predicate:?}").contains("is-map"));
    }
}
