use std::sync::Arc;

use tracing::{debug, trace};

use rulechain_rules::engine::context::DEFAULT_PARAM;
use rulechain_rules::ir::optimize::optimize;
use rulechain_rules::{Expr, ExprPredicate, Predicate, PredicateCompiler, RuleError};

use crate::parser::{has_return, parse_cel_expr};

/// Compiles CEL-style predicate bodies into [`ExprPredicate`]s.
///
/// Compilation parses and optimizes the source; it never evaluates it, so
/// identifiers are only resolved once a record is supplied.
///
/// By default a body is an expression, and `return` is optional. With
/// [`with_statement_bodies`](Self::with_statement_bodies) a body is read as
/// a function body instead: only `return` produces a value, so a body
/// without it yields `null` and the rule fails.
#[derive(Debug, Clone)]
pub struct CelCompiler {
    param: String,
    optimize: bool,
    statement_bodies: bool,
}

impl Default for CelCompiler {
    fn default() -> Self {
        Self {
            param: DEFAULT_PARAM.to_owned(),
            optimize: true,
            statement_bodies: false,
        }
    }
}

impl CelCompiler {
    /// Create a compiler that binds the record to `record`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the record to `param` instead, e.g. `obj`.
    #[must_use]
    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = param.into();
        self
    }

    /// Skip the optimizer and keep the parsed tree as written.
    #[must_use]
    pub fn without_optimizer(mut self) -> Self {
        self.optimize = false;
        self
    }

    /// Read bodies as function bodies that must `return` their value.
    #[must_use]
    pub fn with_statement_bodies(mut self, enabled: bool) -> Self {
        self.statement_bodies = enabled;
        self
    }

    /// The name the record is bound to.
    pub fn param(&self) -> &str {
        &self.param
    }

    /// Whether a body without `return` compiles to `null`.
    pub fn statement_bodies(&self) -> bool {
        self.statement_bodies
    }

    /// Parse (and optimize) `source` into an expression tree.
    ///
    /// The body is always parsed, so syntax errors surface in either mode.
    pub fn compile_expr(&self, source: &str) -> Result<Expr, RuleError> {
        let parsed = parse_cel_expr(source)?;
        if self.statement_bodies && !has_return(source) {
            debug!(source, "body has no return, compiled to null");
            return Ok(Expr::Null);
        }
        if !self.optimize {
            return Ok(parsed);
        }
        let optimized = optimize(parsed);
        trace!(source, optimized = %optimized.to_source(), "predicate compiled");
        Ok(optimized)
    }
}

impl PredicateCompiler for CelCompiler {
    fn compile(&self, source: &str) -> Result<Arc<dyn Predicate>, RuleError> {
        let expr = self.compile_expr(source)?;
        Ok(Arc::new(ExprPredicate::new(expr, self.param.clone())))
    }
}
