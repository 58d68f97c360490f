//! Optimizer passes run over a predicate once it has been parsed.
//!
//! Supported transformations:
//! - Constant folding for arithmetic, comparison and string tests on literals.
//! - Dead branch elimination for ternary expressions with constant conditions.
//! - Double negation removal (`!!x` -> `x`), only where the value is consumed
//!   for its truthiness.
//!
//! A predicate's result is always coerced to a boolean, so the root of the
//! tree is a boolean position. Everywhere else the passes preserve the exact
//! runtime value, not just its truthiness.

use super::expr::{BinaryOp, Expr, UnaryOp};

/// Run all optimization passes on a predicate expression.
pub fn optimize(expr: Expr) -> Expr {
    let expr = fold_constants(expr);
    let expr = eliminate_dead_branches(expr);
    remove_double_negation(expr, true)
}

/// Truthiness of a literal, or `None` if the expression is not a literal.
fn constant_truthiness(expr: &Expr) -> Option<bool> {
    match expr {
        Expr::Null => Some(false),
        Expr::Bool(b) => Some(*b),
        Expr::Int(n) => Some(*n != 0),
        Expr::Float(f) => Some(*f != 0.0 && !f.is_nan()),
        Expr::String(s) => Some(!s.is_empty()),
        _ => None,
    }
}

/// `!!expr`, the boolean coercion of `expr`.
fn coerce(expr: Expr) -> Expr {
    Expr::Unary(
        UnaryOp::Not,
        Box::new(Expr::Unary(UnaryOp::Not, Box::new(expr))),
    )
}

/// Constant folding: evaluate operations on literal values at compile time.
fn fold_constants(expr: Expr) -> Expr {
    match expr {
        Expr::Unary(op, inner) => {
            let inner = fold_constants(*inner);
            match (op, &inner) {
                (UnaryOp::Not, lit) if lit.is_constant() => {
                    Expr::Bool(!constant_truthiness(lit).unwrap_or(false))
                }
                (UnaryOp::Neg, Expr::Int(n)) => Expr::Int(n.wrapping_neg()),
                (UnaryOp::Neg, Expr::Float(f)) => Expr::Float(-f),
                _ => Expr::Unary(op, Box::new(inner)),
            }
        }
        Expr::Binary(op, lhs, rhs) => {
            let lhs = fold_constants(*lhs);
            let rhs = fold_constants(*rhs);
            fold_binary(op, lhs, rhs)
        }
        Expr::Ternary(cond, then_branch, else_branch) => Expr::Ternary(
            Box::new(fold_constants(*cond)),
            Box::new(fold_constants(*then_branch)),
            Box::new(fold_constants(*else_branch)),
        ),
        Expr::Call(name, args) => Expr::Call(name, args.into_iter().map(fold_constants).collect()),
        Expr::List(items) => Expr::List(items.into_iter().map(fold_constants).collect()),
        Expr::Map(entries) => Expr::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k, fold_constants(v)))
                .collect(),
        ),
        Expr::Field(inner, field) => Expr::Field(Box::new(fold_constants(*inner)), field),
        Expr::Index(base, index) => Expr::Index(
            Box::new(fold_constants(*base)),
            Box::new(fold_constants(*index)),
        ),
        other => other,
    }
}

/// Attempt to fold a binary operation on constant operands.
fn fold_binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    match (op, &lhs, &rhs) {
        // Integer arithmetic
        (BinaryOp::Add, Expr::Int(a), Expr::Int(b)) => Expr::Int(a.wrapping_add(*b)),
        (BinaryOp::Sub, Expr::Int(a), Expr::Int(b)) => Expr::Int(a.wrapping_sub(*b)),
        (BinaryOp::Mul, Expr::Int(a), Expr::Int(b)) => Expr::Int(a.wrapping_mul(*b)),
        (BinaryOp::Div, Expr::Int(a), Expr::Int(b)) if *b != 0 => Expr::Int(a.wrapping_div(*b)),
        (BinaryOp::Mod, Expr::Int(a), Expr::Int(b)) if *b != 0 => Expr::Int(a.wrapping_rem(*b)),

        // Float arithmetic
        (BinaryOp::Add, Expr::Float(a), Expr::Float(b)) => Expr::Float(a + b),
        (BinaryOp::Sub, Expr::Float(a), Expr::Float(b)) => Expr::Float(a - b),
        (BinaryOp::Mul, Expr::Float(a), Expr::Float(b)) => Expr::Float(a * b),
        (BinaryOp::Div, Expr::Float(a), Expr::Float(b)) if *b != 0.0 => Expr::Float(a / b),

        // Integer comparison
        (BinaryOp::Eq, Expr::Int(a), Expr::Int(b)) => Expr::Bool(a == b),
        (BinaryOp::Ne, Expr::Int(a), Expr::Int(b)) => Expr::Bool(a != b),
        (BinaryOp::Lt, Expr::Int(a), Expr::Int(b)) => Expr::Bool(a < b),
        (BinaryOp::Le, Expr::Int(a), Expr::Int(b)) => Expr::Bool(a <= b),
        (BinaryOp::Gt, Expr::Int(a), Expr::Int(b)) => Expr::Bool(a > b),
        (BinaryOp::Ge, Expr::Int(a), Expr::Int(b)) => Expr::Bool(a >= b),

        // String comparison
        (BinaryOp::Eq, Expr::String(a), Expr::String(b)) => Expr::Bool(a == b),
        (BinaryOp::Ne, Expr::String(a), Expr::String(b)) => Expr::Bool(a != b),

        // Logic on a constant left operand. `&&` and `||` always yield a
        // boolean, so an identity rewrite keeps the coercion of the right side.
        (BinaryOp::And, l, _) if l.is_constant() => {
            if constant_truthiness(l).unwrap_or(false) {
                fold_coercion(rhs)
            } else {
                Expr::Bool(false)
            }
        }
        (BinaryOp::Or, l, _) if l.is_constant() => {
            if constant_truthiness(l).unwrap_or(false) {
                Expr::Bool(true)
            } else {
                fold_coercion(rhs)
            }
        }

        // String operations on constants
        (BinaryOp::Contains, Expr::String(haystack), Expr::String(needle)) => {
            Expr::Bool(haystack.contains(needle.as_str()))
        }
        (BinaryOp::StartsWith, Expr::String(haystack), Expr::String(prefix)) => {
            Expr::Bool(haystack.starts_with(prefix.as_str()))
        }
        (BinaryOp::EndsWith, Expr::String(haystack), Expr::String(suffix)) => {
            Expr::Bool(haystack.ends_with(suffix.as_str()))
        }

        _ => Expr::Binary(op, Box::new(lhs), Box::new(rhs)),
    }
}

/// Coerce an operand to a boolean, folding it when it is a literal.
fn fold_coercion(expr: Expr) -> Expr {
    match constant_truthiness(&expr) {
        Some(b) => Expr::Bool(b),
        None => coerce(expr),
    }
}

/// Dead branch elimination: replace ternary expressions whose condition
/// is a known constant with the appropriate branch.
fn eliminate_dead_branches(expr: Expr) -> Expr {
    match expr {
        Expr::Ternary(cond, then_branch, else_branch) => {
            let cond = eliminate_dead_branches(*cond);
            let then_branch = eliminate_dead_branches(*then_branch);
            let else_branch = eliminate_dead_branches(*else_branch);

            match constant_truthiness(&cond) {
                Some(true) => then_branch,
                Some(false) => else_branch,
                None => Expr::Ternary(Box::new(cond), Box::new(then_branch), Box::new(else_branch)),
            }
        }
        Expr::Unary(op, inner) => Expr::Unary(op, Box::new(eliminate_dead_branches(*inner))),
        Expr::Binary(op, lhs, rhs) => Expr::Binary(
            op,
            Box::new(eliminate_dead_branches(*lhs)),
            Box::new(eliminate_dead_branches(*rhs)),
        ),
        Expr::Call(name, args) => {
            Expr::Call(name, args.into_iter().map(eliminate_dead_branches).collect())
        }
        Expr::List(items) => Expr::List(items.into_iter().map(eliminate_dead_branches).collect()),
        Expr::Map(entries) => Expr::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k, eliminate_dead_branches(v)))
                .collect(),
        ),
        Expr::Field(inner, field) => Expr::Field(Box::new(eliminate_dead_branches(*inner)), field),
        Expr::Index(base, index) => Expr::Index(
            Box::new(eliminate_dead_branches(*base)),
            Box::new(eliminate_dead_branches(*index)),
        ),
        other => other,
    }
}

/// Remove double negations in positions where only truthiness matters.
///
/// `boolean` is true when the value of `expr` is consumed as a boolean: the
/// predicate root, a ternary condition, and operands of `!`, `&&` and `||`.
fn remove_double_negation(expr: Expr, boolean: bool) -> Expr {
    match expr {
        Expr::Unary(UnaryOp::Not, inner) => {
            let inner = remove_double_negation(*inner, true);
            match inner {
                Expr::Unary(UnaryOp::Not, double_inner) if boolean => *double_inner,
                other => Expr::Unary(UnaryOp::Not, Box::new(other)),
            }
        }
        Expr::Unary(op, inner) => Expr::Unary(op, Box::new(remove_double_negation(*inner, false))),
        Expr::Binary(op @ (BinaryOp::And | BinaryOp::Or), lhs, rhs) => Expr::Binary(
            op,
            Box::new(remove_double_negation(*lhs, true)),
            Box::new(remove_double_negation(*rhs, true)),
        ),
        Expr::Binary(op, lhs, rhs) => Expr::Binary(
            op,
            Box::new(remove_double_negation(*lhs, false)),
            Box::new(remove_double_negation(*rhs, false)),
        ),
        Expr::Ternary(cond, then_branch, else_branch) => Expr::Ternary(
            Box::new(remove_double_negation(*cond, true)),
            Box::new(remove_double_negation(*then_branch, boolean)),
            Box::new(remove_double_negation(*else_branch, boolean)),
        ),
        Expr::Call(name, args) => Expr::Call(
            name,
            args.into_iter()
                .map(|e| remove_double_negation(e, false))
                .collect(),
        ),
        Expr::List(items) => Expr::List(
            items
                .into_iter()
                .map(|e| remove_double_negation(e, false))
                .collect(),
        ),
        Expr::Map(entries) => Expr::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k, remove_double_negation(v, false)))
                .collect(),
        ),
        Expr::Field(inner, field) => {
            Expr::Field(Box::new(remove_double_negation(*inner, false)), field)
        }
        Expr::Index(base, index) => Expr::Index(
            Box::new(remove_double_negation(*base, false)),
            Box::new(remove_double_negation(*index, false)),
        ),
        other => other,
    }
}
