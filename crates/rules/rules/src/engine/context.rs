use crate::engine::value::Value;

/// Name the record is bound to when a compiler is not told otherwise.
pub const DEFAULT_PARAM: &str = "record";

/// The evaluation context supplied to an expression.
///
/// A predicate receives exactly one argument, the input record. Inside the
/// expression the record is reachable under `param`; top-level keys of a map
/// record are also reachable as bare identifiers.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// The record being evaluated.
    pub record: &'a Value,
    /// The identifier bound to the record.
    pub param: &'a str,
}

impl<'a> EvalContext<'a> {
    /// Create a context binding `record` to `param`.
    pub fn new(record: &'a Value, param: &'a str) -> Self {
        Self { record, param }
    }
}
