//! CEL-style predicate language for rulechain flows.
//!
//! This crate provides a [`CelCompiler`] that turns predicate source text
//! into the `Expr` IR defined in `rulechain-rules`, and a [`CelFrontend`]
//! that loads YAML/JSON flow documents into rule definitions.

pub mod compiler;
pub mod frontend;
pub mod parser;

pub use compiler::CelCompiler;
pub use frontend::CelFrontend;
pub use parser::parse_cel_expr;
