use std::cmp::Ordering;
use std::collections::HashMap;

use regex::Regex;

use crate::engine::builtins::call_builtin;
use crate::engine::context::EvalContext;
use crate::engine::value::Value;
use crate::error::RuleError;
use crate::ir::expr::{BinaryOp, Expr, UnaryOp};

/// Recursively evaluate an expression against the provided context.
pub fn eval(expr: &Expr, ctx: &EvalContext<'_>) -> Result<Value, RuleError> {
    match expr {
        Expr::Null => Ok(Value::Null),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Float(f) => Ok(Value::Float(*f)),
        Expr::String(s) => Ok(Value::String(s.clone())),

        Expr::List(items) => items
            .iter()
            .map(|item| eval(item, ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),

        Expr::Map(entries) => {
            let mut result = HashMap::with_capacity(entries.len());
            for (key, value) in entries {
                result.insert(key.clone(), eval(value, ctx)?);
            }
            Ok(Value::Map(result))
        }

        Expr::Ident(name) => resolve_ident(name, ctx).cloned(),

        Expr::Field(base, field) => {
            // Borrow straight out of the record for `obj.field` so the whole
            // record is not cloned per access.
            if let Expr::Ident(name) = base.as_ref() {
                return resolve_ident(name, ctx)?.field(field);
            }
            eval(base, ctx)?.field(field)
        }

        Expr::Index(base, index) => {
            let base_val = eval(base, ctx)?;
            let index_val = eval(index, ctx)?;
            base_val.index(&index_val)
        }

        Expr::Unary(op, inner) => {
            let val = eval(inner, ctx)?;
            eval_unary(*op, &val)
        }

        Expr::Binary(op, lhs, rhs) => eval_binary(*op, lhs, rhs, ctx),

        Expr::Ternary(cond, then_branch, else_branch) => {
            if eval(cond, ctx)?.is_truthy() {
                eval(then_branch, ctx)
            } else {
                eval(else_branch, ctx)
            }
        }

        Expr::Call(name, args) => {
            let evaluated = args
                .iter()
                .map(|arg| eval(arg, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            call_builtin(name, &evaluated)
        }
    }
}

/// Resolve a top-level identifier against the record.
///
/// The bound parameter name yields the record itself. Any other name is
/// looked up as a top-level key of the record.
pub(crate) fn resolve_ident<'a>(name: &str, ctx: &EvalContext<'a>) -> Result<&'a Value, RuleError> {
    if name == ctx.param {
        return Ok(ctx.record);
    }
    ctx.record
        .get(name)
        .ok_or_else(|| RuleError::UndefinedVariable(name.to_owned()))
}

/// Evaluate a unary operation on a value.
pub(crate) fn eval_unary(op: UnaryOp, val: &Value) -> Result<Value, RuleError> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!val.is_truthy())),
        UnaryOp::Neg => match val {
            Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
            Value::Float(f) => Ok(Value::Float(-f)),
            _ => Err(RuleError::TypeError(format!(
                "cannot negate {}",
                val.type_name()
            ))),
        },
    }
}

/// Evaluate a binary operation with short-circuit semantics for And/Or.
pub(crate) fn eval_binary(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    ctx: &EvalContext<'_>,
) -> Result<Value, RuleError> {
    match op {
        BinaryOp::And => {
            if !eval(lhs, ctx)?.is_truthy() {
                return Ok(Value::Bool(false));
            }
            return Ok(Value::Bool(eval(rhs, ctx)?.is_truthy()));
        }
        BinaryOp::Or => {
            if eval(lhs, ctx)?.is_truthy() {
                return Ok(Value::Bool(true));
            }
            return Ok(Value::Bool(eval(rhs, ctx)?.is_truthy()));
        }
        _ => {}
    }

    let left = eval(lhs, ctx)?;
    let right = eval(rhs, ctx)?;

    match op {
        // Arithmetic
        BinaryOp::Add => eval_add(&left, &right),
        BinaryOp::Sub => eval_arithmetic(
            &left,
            &right,
            i64::wrapping_sub,
            |a, b| a - b,
            "subtract",
        ),
        BinaryOp::Mul => eval_arithmetic(
            &left,
            &right,
            i64::wrapping_mul,
            |a, b| a * b,
            "multiply",
        ),
        BinaryOp::Div => eval_div(&left, &right),
        BinaryOp::Mod => eval_mod(&left, &right),

        // Comparison
        BinaryOp::Eq => Ok(Value::Bool(values_equal(&left, &right))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(&left, &right))),
        BinaryOp::Lt => eval_compare(&left, &right, Ordering::is_lt),
        BinaryOp::Le => eval_compare(&left, &right, Ordering::is_le),
        BinaryOp::Gt => eval_compare(&left, &right, Ordering::is_gt),
        BinaryOp::Ge => eval_compare(&left, &right, Ordering::is_ge),

        // String operations
        BinaryOp::Contains => call_builtin("contains", &[left, right]),
        BinaryOp::StartsWith => call_builtin("starts_with", &[left, right]),
        BinaryOp::EndsWith => call_builtin("ends_with", &[left, right]),
        BinaryOp::Matches => eval_matches(&left, &right),
        BinaryOp::In => eval_in(&left, &right),

        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuited above"),
    }
}

/// Add two values (supports int, float, and string concatenation).
#[allow(clippy::cast_precision_loss)]
fn eval_add(left: &Value, right: &Value) -> Result<Value, RuleError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(*b))),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(*a as f64 + b)),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a + *b as f64)),
        (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
        _ => Err(RuleError::TypeError(format!(
            "cannot add {} and {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

/// Generic arithmetic on two numeric values.
#[allow(clippy::cast_precision_loss)]
fn eval_arithmetic(
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> i64,
    float_op: fn(f64, f64) -> f64,
    op_name: &str,
) -> Result<Value, RuleError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(int_op(*a, *b))),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(float_op(*a, *b))),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(float_op(*a as f64, *b))),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(float_op(*a, *b as f64))),
        _ => Err(RuleError::TypeError(format!(
            "cannot {op_name} {} and {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

/// Division with zero-check.
#[allow(clippy::cast_precision_loss)]
fn eval_div(left: &Value, right: &Value) -> Result<Value, RuleError> {
    match (left, right) {
        (Value::Int(_) | Value::Float(_), Value::Int(0)) => {
            Err(RuleError::Evaluation("division by zero".into()))
        }
        (Value::Int(_) | Value::Float(_), Value::Float(f)) if *f == 0.0 => {
            Err(RuleError::Evaluation("division by zero".into()))
        }
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_div(*b))),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a / b)),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(*a as f64 / b)),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a / *b as f64)),
        _ => Err(RuleError::TypeError(format!(
            "cannot divide {} by {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

/// Modulo with zero-check.
#[allow(clippy::cast_precision_loss)]
fn eval_mod(left: &Value, right: &Value) -> Result<Value, RuleError> {
    match (left, right) {
        (Value::Int(_), Value::Int(0)) => Err(RuleError::Evaluation("modulo by zero".into())),
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_rem(*b))),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a % b)),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(*a as f64 % b)),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a % *b as f64)),
        _ => Err(RuleError::TypeError(format!(
            "cannot modulo {} by {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

/// Check equality of two values, with type coercion for int/float.
#[allow(clippy::cast_precision_loss)]
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
            (*a as f64 - b).abs() < f64::EPSILON
        }
        (Value::Float(a), Value::Float(b)) => (a - b).abs() < f64::EPSILON,
        _ => left == right,
    }
}

/// Ordered comparison of numbers or strings.
#[allow(clippy::cast_precision_loss)]
fn eval_compare(
    left: &Value,
    right: &Value,
    predicate: fn(Ordering) -> bool,
) -> Result<Value, RuleError> {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => {
            return Err(RuleError::TypeError(format!(
                "cannot compare {} and {}",
                left.type_name(),
                right.type_name()
            )));
        }
    };
    // NaN compares false against everything.
    Ok(Value::Bool(ordering.is_some_and(predicate)))
}

/// Regex matches check.
fn eval_matches(left: &Value, right: &Value) -> Result<Value, RuleError> {
    match (left, right) {
        (Value::String(s), Value::String(pattern)) => {
            let re = Regex::new(pattern).map_err(|e| RuleError::InvalidRegex(e.to_string()))?;
            Ok(Value::Bool(re.is_match(s)))
        }
        _ => Err(RuleError::TypeError(format!(
            "matches: unsupported types {} and {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

/// Membership test: `value in collection`.
fn eval_in(left: &Value, right: &Value) -> Result<Value, RuleError> {
    match right {
        Value::List(list) => Ok(Value::Bool(list.iter().any(|v| values_equal(left, v)))),
        Value::Map(map) => match left {
            Value::String(key) => Ok(Value::Bool(map.contains_key(key))),
            _ => Err(RuleError::TypeError(format!(
                "in: map key must be string, got {}",
                left.type_name()
            ))),
        },
        Value::String(s) => match left {
            Value::String(sub) => Ok(Value::Bool(s.contains(sub.as_str()))),
            _ => Err(RuleError::TypeError(format!(
                "in: cannot check {} membership in string",
                left.type_name()
            ))),
        },
        _ => Err(RuleError::TypeError(format!(
            "in: right-hand side must be list, map, or string, got {}",
            right.type_name()
        ))),
    }
}
