use serde::{Deserialize, Serialize};

/// Unary operators supported in predicate expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Logical negation (`!expr`).
    Not,
    /// Arithmetic negation (`-expr`).
    Neg,
}

/// Binary operators supported in predicate expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
    /// Modulo.
    Mod,

    // Comparison
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,

    // Logical
    /// Logical AND (short-circuit).
    And,
    /// Logical OR (short-circuit).
    Or,

    // String operations
    /// String contains.
    Contains,
    /// String starts with.
    StartsWith,
    /// String ends with.
    EndsWith,
    /// Regex match.
    Matches,
    /// Membership test (value in collection).
    In,
}

impl BinaryOp {
    /// The operator as written in source.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::Matches => "matches",
            Self::In => "in",
        }
    }
}

/// The expression AST a predicate compiles to.
///
/// Expressions are evaluated recursively against an `EvalContext` holding the
/// input record and produce a runtime `Value`. The tree is serializable so a
/// compiled predicate can be inspected or cached as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// The null literal.
    Null,
    /// A boolean literal.
    Bool(bool),
    /// A 64-bit signed integer literal.
    Int(i64),
    /// A 64-bit floating-point literal.
    Float(f64),
    /// A string literal.
    String(String),
    /// A list of expressions.
    List(Vec<Expr>),
    /// A map of string keys to expressions.
    Map(Vec<(String, Expr)>),
    /// A variable reference by name.
    Ident(String),
    /// Field access: `expr.field`.
    Field(Box<Expr>, String),
    /// Index access: `expr[index]`.
    Index(Box<Expr>, Box<Expr>),
    /// A unary operation.
    Unary(UnaryOp, Box<Expr>),
    /// A binary operation.
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// A ternary (conditional) expression: `condition ? then : else`.
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    /// A function call: `name(args...)`.
    Call(String, Vec<Expr>),
}

impl Expr {
    /// Returns a human-readable pseudo-code representation of the expression.
    pub fn to_source(&self) -> String {
        match self {
            Self::Null => "null".to_owned(),
            Self::Bool(b) => b.to_string(),
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => format!("\"{}\"", s.replace('"', "\\\"")),
            Self::List(items) => {
                let inner = items
                    .iter()
                    .map(Self::to_source)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("[{inner}]")
            }
            Self::Map(entries) => {
                let inner = entries
                    .iter()
                    .map(|(k, v)| format!("\"{}\": {}", k.replace('"', "\\\""), v.to_source()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{inner}}}")
            }
            Self::Ident(name) => name.clone(),
            Self::Field(base, field) => format!("{}.{}", base.to_source(), field),
            Self::Index(base, index) => format!("{}[{}]", base.to_source(), index.to_source()),
            Self::Unary(op, expr) => {
                let symbol = match op {
                    UnaryOp::Not => "!",
                    UnaryOp::Neg => "-",
                };
                format!("{}{}", symbol, expr.to_source())
            }
            Self::Binary(op, lhs, rhs) => {
                format!("({} {} {})", lhs.to_source(), op.symbol(), rhs.to_source())
            }
            Self::Ternary(cond, then, els) => format!(
                "({} ? {} : {})",
                cond.to_source(),
                then.to_source(),
                els.to_source()
            ),
            Self::Call(name, args) => {
                let inner = args
                    .iter()
                    .map(Self::to_source)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{name}({inner})")
            }
        }
    }

    /// Returns `true` if this expression is a constant (literal) value.
    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            Self::Null | Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::String(_)
        )
    }

    /// Height of the tree: 1 for a leaf.
    ///
    /// Walks with an explicit stack, so it is safe on trees of any shape.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((expr, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            let next = depth + 1;
            match expr {
                Self::Field(inner, _) | Self::Unary(_, inner) => stack.push((&**inner, next)),
                Self::Index(lhs, rhs) | Self::Binary(_, lhs, rhs) => {
                    stack.push((&**lhs, next));
                    stack.push((&**rhs, next));
                }
                Self::Ternary(cond, then, els) => {
                    stack.push((&**cond, next));
                    stack.push((&**then, next));
                    stack.push((&**els, next));
                }
                Self::List(items) | Self::Call(_, items) => {
                    stack.extend(items.iter().map(|e| (e, next)));
                }
                Self::Map(entries) => stack.extend(entries.iter().map(|(_, e)| (e, next))),
                Self::Null
                | Self::Bool(_)
                | Self::Int(_)
                | Self::Float(_)
                | Self::String(_)
                | Self::Ident(_) => {}
            }
        }
        deepest
    }
}
