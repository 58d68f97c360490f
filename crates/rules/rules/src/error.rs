use thiserror::Error;

use crate::ir::rule::RuleId;

/// Errors that can occur while compiling predicates or walking a rule graph.
#[derive(Debug, Error)]
pub enum RuleError {
    /// A type mismatch occurred during expression evaluation.
    #[error("type error: {0}")]
    TypeError(String),

    /// A referenced variable was not found in the evaluation context.
    #[error("undefined variable: {0}")]
    UndefinedVariable(String),

    /// A called function is not registered as a builtin.
    #[error("undefined function: {0}")]
    UndefinedFunction(String),

    /// A general evaluation error that does not fit other categories.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// A parse error in predicate source or in a flow document.
    #[error("parse error: {0}")]
    Parse(String),

    /// An invalid regular expression was supplied to a match operation.
    #[error("invalid regex: {0}")]
    InvalidRegex(String),

    /// A rule's predicate source could not be compiled.
    ///
    /// Raised while building a registry; the registry is not constructed.
    #[error("rule {rule}: predicate does not compile: {reason}")]
    Compilation {
        /// Id of the rule whose predicate failed.
        rule: RuleId,
        /// Compiler diagnostic.
        reason: String,
    },

    /// A rule's predicate failed while being invoked against a record.
    #[error("rule {rule}: predicate evaluation failed: {source}")]
    RuleEvaluation {
        /// Id of the rule whose predicate failed.
        rule: RuleId,
        /// The underlying expression error.
        #[source]
        source: Box<RuleError>,
    },
}

impl RuleError {
    /// Id of the rule this error is tied to, if any.
    pub fn rule_id(&self) -> Option<&RuleId> {
        match self {
            Self::Compilation { rule, .. } | Self::RuleEvaluation { rule, .. } => Some(rule),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = RuleError::TypeError("expected bool, got int".into());
        assert_eq!(err.to_string(), "type error: expected bool, got int");

        let err = RuleError::UndefinedVariable("foo".into());
        assert_eq!(err.to_string(), "undefined variable: foo");

        let err = RuleError::UndefinedFunction("bar".into());
        assert_eq!(err.to_string(), "undefined function: bar");

        let err = RuleError::Evaluation("division by zero".into());
        assert_eq!(err.to_string(), "evaluation error: division by zero");

        let err = RuleError::Parse("unexpected token".into());
        assert_eq!(err.to_string(), "parse error: unexpected token");

        let err = RuleError::InvalidRegex("unclosed group".into());
        assert_eq!(err.to_string(), "invalid regex: unclosed group");
    }

    #[test]
    fn rule_scoped_errors_carry_the_rule_id() {
        let err = RuleError::Compilation {
            rule: RuleId::Int(3),
            reason: "unexpected trailing input".into(),
        };
        assert_eq!(
            err.to_string(),
            "rule 3: predicate does not compile: unexpected trailing input"
        );
        assert_eq!(err.rule_id(), Some(&RuleId::Int(3)));

        let err = RuleError::RuleEvaluation {
            rule: RuleId::Name("intake".into()),
            source: Box::new(RuleError::TypeError("cannot access field 'color' on int".into())),
        };
        assert_eq!(
            err.to_string(),
            "rule intake: predicate evaluation failed: type error: cannot access field 'color' on int"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn expression_errors_have_no_rule_id() {
        assert!(RuleError::Parse("x".into()).rule_id().is_none());
    }
}
