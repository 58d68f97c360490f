//! Recursive descent parser for the CEL-style predicate dialect.
//!
//! `nom` recognises the tokens; binary operators are handled by precedence
//! climbing over [`BINARY_LEVELS`]. The output is the [`Expr`] IR defined in
//! `rulechain-rules`.
//!
//! Statement-style bodies are accepted too: a leading `return` and a
//! trailing `;` are stripped before parsing, and `===` / `!==` read as
//! `==` / `!=`.
//!
//! Nesting is bounded so hostile input fails with [`RuleError::Parse`]
//! instead of exhausting the stack.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{map, opt, recognize, value},
    error::ErrorKind,
    multi::separated_list0,
    sequence::{delimited, pair, separated_pair},
};

use rulechain_rules::RuleError;
use rulechain_rules::ir::expr::{BinaryOp, Expr, UnaryOp};

/// Binary operators from loosest to tightest binding.
///
/// Within a level, longer symbols must come before their prefixes.
const BINARY_LEVELS: &[&[(&str, BinaryOp)]] = &[
    &[("||", BinaryOp::Or)],
    &[("&&", BinaryOp::And)],
    &[
        ("===", BinaryOp::Eq),
        ("!==", BinaryOp::Ne),
        ("==", BinaryOp::Eq),
        ("!=", BinaryOp::Ne),
    ],
    &[
        ("<=", BinaryOp::Le),
        (">=", BinaryOp::Ge),
        ("<", BinaryOp::Lt),
        (">", BinaryOp::Gt),
        ("in", BinaryOp::In),
    ],
    &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
    &[("*", BinaryOp::Mul), ("/", BinaryOp::Div), ("%", BinaryOp::Mod)],
];

/// Deepest bracket or ternary nesting the parser descends into.
pub const MAX_NESTING: usize = 32;

/// Deepest expression tree a predicate may compile to.
pub const MAX_DEPTH: usize = 128;

/// Parse a complete predicate body into an [`Expr`].
///
/// Returns a [`RuleError::Parse`] if the input cannot be parsed, has
/// trailing tokens, or nests too deeply.
pub fn parse_cel_expr(input: &str) -> Result<Expr, RuleError> {
    let (body, _) = strip_statement(input);
    if body.is_empty() {
        return Err(RuleError::Parse("empty expression".to_owned()));
    }
    check_nesting(body)?;
    let (rest, expr) =
        parse_ternary(body).map_err(|e| RuleError::Parse(format!("CEL parse error: {e}")))?;
    let rest = rest.trim();
    if !rest.is_empty() {
        return Err(RuleError::Parse(format!(
            "unexpected trailing input: {rest:?}"
        )));
    }
    let depth = expr.depth();
    if depth > MAX_DEPTH {
        return Err(RuleError::Parse(format!(
            "expression is {depth} levels deep, the limit is {MAX_DEPTH}"
        )));
    }
    Ok(expr)
}

/// Whether `source` is introduced by a `return` keyword.
pub fn has_return(source: &str) -> bool {
    strip_statement(source).1
}

/// Drop an optional leading `return` keyword and trailing `;`, reporting
/// whether `return` was present.
fn strip_statement(source: &str) -> (&str, bool) {
    let mut body = source.trim();
    if let Some(rest) = body.strip_suffix(';') {
        body = rest.trim_end();
    }
    if let Some(rest) = body.strip_prefix("return")
        && !rest.starts_with(is_ident_char)
    {
        return (rest.trim_start(), true);
    }
    (body, false)
}

/// Reject bodies whose brackets and ternaries nest past [`MAX_NESTING`].
///
/// String literals are skipped.
fn check_nesting(body: &str) -> Result<(), RuleError> {
    let mut depth = 0usize;
    let mut ternaries = 0usize;
    let mut quote = None;
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(_), '\\') => {
                chars.next();
            }
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[' | '{') => depth += 1,
            (None, ')' | ']' | '}') => depth = depth.saturating_sub(1),
            (None, '?') => ternaries += 1,
            (None, _) => {}
        }
        if depth + ternaries > MAX_NESTING {
            return Err(RuleError::Parse(format!(
                "expression nests deeper than {MAX_NESTING} levels"
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn fail<T>(input: &str, kind: ErrorKind) -> IResult<&str, T> {
    Err(nom::Err::Error(nom::error::Error::new(input, kind)))
}

/// Consume optional whitespace around a parser.
fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Match `word` only when it is not the prefix of a longer identifier.
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    move |input: &'a str| {
        let (rest, matched) = tag(word)(input)?;
        if rest.starts_with(is_ident_char) {
            return fail(input, ErrorKind::Tag);
        }
        Ok((rest, matched))
    }
}

/// Parse a parenthesised, comma separated argument list.
fn parse_args(input: &str) -> IResult<&str, Vec<Expr>> {
    delimited(
        pair(char('('), multispace0),
        separated_list0(ws(char(',')), parse_ternary),
        pair(multispace0, char(')')),
    )(input)
}

// ---------------------------------------------------------------------------
// Atoms
// ---------------------------------------------------------------------------

/// Parse an atom: literal, identifier, call, parenthesised expression, list, or map.
fn parse_atom(input: &str) -> IResult<&str, Expr> {
    let (input, _) = multispace0(input)?;
    alt((
        value(Expr::Null, keyword("null")),
        value(Expr::Null, keyword("undefined")),
        value(Expr::Bool(true), keyword("true")),
        value(Expr::Bool(false), keyword("false")),
        parse_number,
        map(parse_string_literal, Expr::String),
        parse_list,
        parse_map,
        delimited(pair(char('('), multispace0), parse_ternary, pair(multispace0, char(')'))),
        parse_ident_or_call,
    ))(input)
}

/// Parse an unsigned integer or decimal literal. Signs are unary operators.
fn parse_number(input: &str) -> IResult<&str, Expr> {
    let (rest, text) = recognize(pair(digit1, opt(pair(char('.'), digit1))))(input)?;
    if text.contains('.') {
        match text.parse() {
            Ok(f) => Ok((rest, Expr::Float(f))),
            Err(_) => fail(input, ErrorKind::Float),
        }
    } else {
        match text.parse() {
            Ok(n) => Ok((rest, Expr::Int(n))),
            Err(_) => fail(input, ErrorKind::Digit),
        }
    }
}

/// Parse a single- or double-quoted string literal.
fn parse_string_literal(input: &str) -> IResult<&str, String> {
    let quote = match input.chars().next() {
        Some(q @ ('"' | '\'')) => q,
        _ => return fail(input, ErrorKind::Char),
    };
    let body = &input[1..];
    let mut result = String::new();
    let mut chars = body.char_indices();
    while let Some((pos, c)) = chars.next() {
        match c {
            c if c == quote => return Ok((&body[pos + 1..], result)),
            '\\' => match chars.next() {
                Some((_, 'n')) => result.push('\n'),
                Some((_, 't')) => result.push('\t'),
                Some((_, 'r')) => result.push('\r'),
                Some((_, escaped @ ('\\' | '"' | '\''))) => result.push(escaped),
                Some((_, other)) => {
                    result.push('\\');
                    result.push(other);
                }
                None => break,
            },
            c => result.push(c),
        }
    }
    fail(input, ErrorKind::Char)
}

/// Parse a list literal: `[expr, expr, ...]`.
fn parse_list(input: &str) -> IResult<&str, Expr> {
    map(
        delimited(
            pair(char('['), multispace0),
            separated_list0(ws(char(',')), parse_ternary),
            pair(multispace0, char(']')),
        ),
        Expr::List,
    )(input)
}

/// Parse a map literal: `{key: value, ...}`.
///
/// Keys can be quoted strings or bare identifiers.
fn parse_map(input: &str) -> IResult<&str, Expr> {
    let entry = separated_pair(
        ws(alt((
            parse_string_literal,
            map(parse_ident, str::to_owned),
        ))),
        char(':'),
        parse_ternary,
    );
    map(
        delimited(
            pair(char('{'), multispace0),
            separated_list0(ws(char(',')), entry),
            pair(multispace0, char('}')),
        ),
        Expr::Map,
    )(input)
}

/// Parse a bare identifier matching `[a-zA-Z_][a-zA-Z0-9_]*`.
fn parse_ident(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(is_ident_char),
    ))(input)
}

/// Parse a function call or a plain identifier.
fn parse_ident_or_call(input: &str) -> IResult<&str, Expr> {
    let (rest, name) = parse_ident(input)?;
    let (after_ws, _) = multispace0(rest)?;
    if after_ws.starts_with('(') {
        let (rest, args) = parse_args(after_ws)?;
        return Ok((rest, Expr::Call(builtin_name(name).to_owned(), args)));
    }
    Ok((rest, Expr::Ident(name.to_owned())))
}

/// Map dialect function names onto the core builtin names.
fn builtin_name(name: &str) -> &str {
    match name {
        "size" => "len",
        "int" => "to_int",
        "string" => "to_string",
        "bool" => "to_bool",
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Postfix: field access, index access, method calls
// ---------------------------------------------------------------------------

/// Parse postfix operations: `.field`, `[index]`, `.method(args)`.
fn parse_postfix(input: &str) -> IResult<&str, Expr> {
    let (mut input, mut expr) = parse_atom(input)?;

    loop {
        let (next, _) = multispace0(input)?;

        if let Some(after_dot) = next.strip_prefix('.') {
            let (rest, _) = multispace0(after_dot)?;
            let (rest, name) = parse_ident(rest)?;
            let (after_ws, _) = multispace0(rest)?;
            if after_ws.starts_with('(') {
                let (rest, args) = parse_args(after_ws)?;
                expr = compile_method_call(expr, name, args);
                input = rest;
            } else {
                expr = Expr::Field(Box::new(expr), name.to_owned());
                input = rest;
            }
            continue;
        }

        if next.starts_with('[') {
            let (rest, index) = delimited(
                pair(char('['), multispace0),
                parse_ternary,
                pair(multispace0, char(']')),
            )(next)?;
            expr = Expr::Index(Box::new(expr), Box::new(index));
            input = rest;
            continue;
        }

        return Ok((next, expr));
    }
}

/// Turn `receiver.method(args)` into the matching operator or builtin call.
fn compile_method_call(receiver: Expr, method: &str, args: Vec<Expr>) -> Expr {
    let op = match method {
        "contains" => Some(BinaryOp::Contains),
        "startsWith" => Some(BinaryOp::StartsWith),
        "endsWith" => Some(BinaryOp::EndsWith),
        "matches" => Some(BinaryOp::Matches),
        _ => None,
    };
    match (op, <[Expr; 1]>::try_from(args)) {
        (Some(op), Ok([arg])) => Expr::Binary(op, Box::new(receiver), Box::new(arg)),
        (None, Ok([arg])) => Expr::Call(builtin_name(method).to_owned(), vec![receiver, arg]),
        (_, Err(args)) if args.is_empty() && method == "size" => {
            Expr::Call("len".to_owned(), vec![receiver])
        }
        (_, Err(args)) => {
            // The receiver becomes the first argument.
            let mut full = Vec::with_capacity(args.len() + 1);
            full.push(receiver);
            full.extend(args);
            Expr::Call(builtin_name(method).to_owned(), full)
        }
    }
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

/// Parse prefix `!` and `-`.
fn parse_unary(input: &str) -> IResult<&str, Expr> {
    let mut ops = Vec::new();
    let mut input = input;
    loop {
        let (rest, _) = multispace0(input)?;
        let op = match rest.chars().next() {
            Some('!') => UnaryOp::Not,
            Some('-') => UnaryOp::Neg,
            _ => {
                input = rest;
                break;
            }
        };
        ops.push(op);
        input = &rest[1..];
    }
    let (rest, operand) = parse_postfix(input)?;
    let expr = ops
        .into_iter()
        .rev()
        .fold(operand, |expr, op| Expr::Unary(op, Box::new(expr)));
    Ok((rest, expr))
}

/// Match one of `ops` at the start of `input`.
fn match_operator<'a>(input: &'a str, ops: &[(&str, BinaryOp)]) -> Option<(&'a str, BinaryOp)> {
    ops.iter().find_map(|&(symbol, op)| {
        let rest = input.strip_prefix(symbol)?;
        let is_word = symbol.starts_with(is_ident_char);
        if is_word && rest.starts_with(is_ident_char) {
            return None;
        }
        Some((rest, op))
    })
}

/// Parse a left-associative chain of operators at `level` and tighter.
fn parse_binary(input: &str, level: usize) -> IResult<&str, Expr> {
    let Some(ops) = BINARY_LEVELS.get(level) else {
        return parse_unary(input);
    };
    let (mut input, mut left) = parse_binary(input, level + 1)?;
    loop {
        let (next, _) = multispace0(input)?;
        let Some((rest, op)) = match_operator(next, ops) else {
            return Ok((next, left));
        };
        let (rest, right) = parse_binary(rest, level + 1)?;
        left = Expr::Binary(op, Box::new(left), Box::new(right));
        input = rest;
    }
}

/// Top-level expression: ternary `condition ? then : else`.
fn parse_ternary(input: &str) -> IResult<&str, Expr> {
    let (input, cond) = parse_binary(input, 0)?;
    let (input, _) = multispace0(input)?;
    let Ok((rest, _)) = char::<&str, nom::error::Error<&str>>('?')(input) else {
        return Ok((input, cond));
    };
    let (rest, then_branch) = parse_ternary(rest)?;
    let (rest, _) = ws(char(':'))(rest)?;
    let (rest, else_branch) = parse_ternary(rest)?;
    Ok((
        rest,
        Expr::Ternary(
            Box::new(cond),
            Box::new(then_branch),
            Box::new(else_branch),
        ),
    ))
}
