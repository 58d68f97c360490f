//! Built-in functions available in predicate expressions.

use regex::Regex;

use crate::engine::value::Value;
use crate::error::RuleError;

/// Dispatch a built-in function call by name.
pub fn call_builtin(name: &str, args: &[Value]) -> Result<Value, RuleError> {
    match name {
        "len" => builtin_len(args),
        "lower" => builtin_lower(args),
        "upper" => builtin_upper(args),
        "contains" => builtin_contains(args),
        "starts_with" => builtin_starts_with(args),
        "ends_with" => builtin_ends_with(args),
        "matches" => builtin_matches(args),
        "format" => builtin_format(args),
        "abs" => builtin_abs(args),
        "min" => builtin_min(args),
        "max" => builtin_max(args),
        "to_string" => builtin_to_string(args),
        "to_int" => builtin_to_int(args),
        "to_bool" => builtin_to_bool(args),
        _ => Err(RuleError::UndefinedFunction(name.to_owned())),
    }
}

/// Ensure the argument list has exactly `n` elements.
fn expect_args(name: &str, args: &[Value], n: usize) -> Result<(), RuleError> {
    if args.len() != n {
        return Err(RuleError::TypeError(format!(
            "{name}() expects {n} argument(s), got {}",
            args.len()
        )));
    }
    Ok(())
}

fn length(n: usize) -> Value {
    Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
}

/// `len(value)` - returns the length of a string, list, or map.
fn builtin_len(args: &[Value]) -> Result<Value, RuleError> {
    expect_args("len", args, 1)?;
    match &args[0] {
        Value::String(s) => Ok(length(s.chars().count())),
        Value::List(v) => Ok(length(v.len())),
        Value::Map(m) => Ok(length(m.len())),
        other => Err(RuleError::TypeError(format!(
            "len() expects string, list, or map, got {}",
            other.type_name()
        ))),
    }
}

/// `lower(string)` - convert a string to lowercase.
fn builtin_lower(args: &[Value]) -> Result<Value, RuleError> {
    expect_args("lower", args, 1)?;
    match &args[0] {
        Value::String(s) => Ok(Value::String(s.to_lowercase())),
        other => Err(RuleError::TypeError(format!(
            "lower() expects string, got {}",
            other.type_name()
        ))),
    }
}

/// `upper(string)` - convert a string to uppercase.
fn builtin_upper(args: &[Value]) -> Result<Value, RuleError> {
    expect_args("upper", args, 1)?;
    match &args[0] {
        Value::String(s) => Ok(Value::String(s.to_uppercase())),
        other => Err(RuleError::TypeError(format!(
            "upper() expects string, got {}",
            other.type_name()
        ))),
    }
}

/// `contains(haystack, needle)` - substring or list membership.
fn builtin_contains(args: &[Value]) -> Result<Value, RuleError> {
    expect_args("contains", args, 2)?;
    match (&args[0], &args[1]) {
        (Value::String(haystack), Value::String(needle)) => {
            Ok(Value::Bool(haystack.contains(needle.as_str())))
        }
        (Value::List(list), needle) => Ok(Value::Bool(list.contains(needle))),
        (a, b) => Err(RuleError::TypeError(format!(
            "contains() expects (string, string) or (list, value), got ({}, {})",
            a.type_name(),
            b.type_name()
        ))),
    }
}

/// `starts_with(string, prefix)`.
fn builtin_starts_with(args: &[Value]) -> Result<Value, RuleError> {
    expect_args("starts_with", args, 2)?;
    match (&args[0], &args[1]) {
        (Value::String(s), Value::String(prefix)) => {
            Ok(Value::Bool(s.starts_with(prefix.as_str())))
        }
        (a, b) => Err(RuleError::TypeError(format!(
            "starts_with() expects (string, string), got ({}, {})",
            a.type_name(),
            b.type_name()
        ))),
    }
}

/// `ends_with(string, suffix)`.
fn builtin_ends_with(args: &[Value]) -> Result<Value, RuleError> {
    expect_args("ends_with", args, 2)?;
    match (&args[0], &args[1]) {
        (Value::String(s), Value::String(suffix)) => Ok(Value::Bool(s.ends_with(suffix.as_str()))),
        (a, b) => Err(RuleError::TypeError(format!(
            "ends_with() expects (string, string), got ({}, {})",
            a.type_name(),
            b.type_name()
        ))),
    }
}

/// `matches(string, pattern)` - regular expression test.
fn builtin_matches(args: &[Value]) -> Result<Value, RuleError> {
    expect_args("matches", args, 2)?;
    match (&args[0], &args[1]) {
        (Value::String(s), Value::String(pattern)) => {
            let re = Regex::new(pattern).map_err(|e| RuleError::InvalidRegex(e.to_string()))?;
            Ok(Value::Bool(re.is_match(s)))
        }
        (a, b) => Err(RuleError::TypeError(format!(
            "matches() expects (string, string), got ({}, {})",
            a.type_name(),
            b.type_name()
        ))),
    }
}

/// `format(template, args...)` - `{}` placeholders replaced left-to-right.
fn builtin_format(args: &[Value]) -> Result<Value, RuleError> {
    let Some((first, rest)) = args.split_first() else {
        return Err(RuleError::TypeError(
            "format() requires at least 1 argument".into(),
        ));
    };
    let Value::String(template) = first else {
        return Err(RuleError::TypeError(format!(
            "format() first argument must be string, got {}",
            first.type_name()
        )));
    };

    let mut result = String::with_capacity(template.len());
    let mut remaining = template.as_str();
    let mut values = rest.iter();
    while let Some(pos) = remaining.find("{}") {
        let Some(arg) = values.next() else {
            break;
        };
        result.push_str(&remaining[..pos]);
        result.push_str(&arg.display_string());
        remaining = &remaining[pos + 2..];
    }
    result.push_str(remaining);

    Ok(Value::String(result))
}

/// `abs(number)`.
fn builtin_abs(args: &[Value]) -> Result<Value, RuleError> {
    expect_args("abs", args, 1)?;
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(n.wrapping_abs())),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => Err(RuleError::TypeError(format!(
            "abs() expects number, got {}",
            other.type_name()
        ))),
    }
}

/// `min(a, b)`.
#[allow(clippy::cast_precision_loss)]
fn builtin_min(args: &[Value]) -> Result<Value, RuleError> {
    expect_args("min", args, 2)?;
    match (&args[0], &args[1]) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(*a.min(b))),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a.min(*b))),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float((*a as f64).min(*b))),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a.min(*b as f64))),
        (a, b) => Err(RuleError::TypeError(format!(
            "min() expects numbers, got ({}, {})",
            a.type_name(),
            b.type_name()
        ))),
    }
}

/// `max(a, b)`.
#[allow(clippy::cast_precision_loss)]
fn builtin_max(args: &[Value]) -> Result<Value, RuleError> {
    expect_args("max", args, 2)?;
    match (&args[0], &args[1]) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(*a.max(b))),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a.max(*b))),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float((*a as f64).max(*b))),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a.max(*b as f64))),
        (a, b) => Err(RuleError::TypeError(format!(
            "max() expects numbers, got ({}, {})",
            a.type_name(),
            b.type_name()
        ))),
    }
}

/// `to_string(value)`.
fn builtin_to_string(args: &[Value]) -> Result<Value, RuleError> {
    expect_args("to_string", args, 1)?;
    Ok(Value::String(args[0].display_string()))
}

/// `to_int(value)`.
#[allow(clippy::cast_possible_truncation)]
fn builtin_to_int(args: &[Value]) -> Result<Value, RuleError> {
    expect_args("to_int", args, 1)?;
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Float(f) => Ok(Value::Int(*f as i64)),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| RuleError::TypeError(format!("to_int() cannot parse '{s}': {e}"))),
        other => Err(RuleError::TypeError(format!(
            "to_int() cannot convert {} to int",
            other.type_name()
        ))),
    }
}

/// `to_bool(value)` - explicit truthiness coercion.
fn builtin_to_bool(args: &[Value]) -> Result<Value, RuleError> {
    expect_args("to_bool", args, 1)?;
    Ok(Value::Bool(args[0].is_truthy()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::String(v.into())
    }

    #[test]
    fn len_of_collections() {
        assert_eq!(call_builtin("len", &[s("héllo")]).unwrap(), Value::Int(5));
        assert_eq!(
            call_builtin("len", &[Value::List(vec![Value::Int(1), Value::Int(2)])]).unwrap(),
            Value::Int(2)
        );
        let mut m = std::collections::HashMap::new();
        m.insert("a".into(), Value::Int(1));
        assert_eq!(call_builtin("len", &[Value::Map(m)]).unwrap(), Value::Int(1));
    }

    #[test]
    fn lower_upper() {
        assert_eq!(call_builtin("lower", &[s("RED")]).unwrap(), s("red"));
        assert_eq!(call_builtin("upper", &[s("red")]).unwrap(), s("RED"));
    }

    #[test]
    fn contains_string_and_list() {
        assert_eq!(
            call_builtin("contains", &[s("dark green"), s("green")]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call_builtin(
                "contains",
                &[Value::List(vec![Value::Int(1), Value::Int(2)]), Value::Int(3)]
            )
            .unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn prefix_and_suffix() {
        assert_eq!(
            call_builtin("starts_with", &[s("user-42"), s("user-")]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call_builtin("ends_with", &[s("user-42"), s("43")]).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn matches_regex() {
        assert_eq!(
            call_builtin("matches", &[s("user-123"), s(r"^user-\d+$")]).unwrap(),
            Value::Bool(true)
        );
        assert!(matches!(
            call_builtin("matches", &[s("test"), s("[invalid")]),
            Err(RuleError::InvalidRegex(_))
        ));
    }

    #[test]
    fn format_placeholders() {
        assert_eq!(
            call_builtin("format", &[s("{} is {}"), s("sky"), s("blue")]).unwrap(),
            s("sky is blue")
        );
        // Surplus placeholders stay as written.
        assert_eq!(
            call_builtin("format", &[s("{} and {}"), Value::Int(1)]).unwrap(),
            s("1 and {}")
        );
        assert!(call_builtin("format", &[]).is_err());
    }

    #[test]
    fn numeric_helpers() {
        assert_eq!(call_builtin("abs", &[Value::Int(-42)]).unwrap(), Value::Int(42));
        assert_eq!(
            call_builtin("min", &[Value::Int(3), Value::Int(7)]).unwrap(),
            Value::Int(3)
        );
        assert_eq!(
            call_builtin("max", &[Value::Int(3), Value::Float(7.5)]).unwrap(),
            Value::Float(7.5)
        );
    }

    #[test]
    fn conversions() {
        assert_eq!(call_builtin("to_string", &[Value::Int(42)]).unwrap(), s("42"));
        assert_eq!(call_builtin("to_int", &[s(" 42 ")]).unwrap(), Value::Int(42));
        assert_eq!(
            call_builtin("to_int", &[Value::Float(3.9)]).unwrap(),
            Value::Int(3)
        );
        assert!(call_builtin("to_int", &[s("forty")]).is_err());
        assert_eq!(call_builtin("to_bool", &[s("x")]).unwrap(), Value::Bool(true));
        assert_eq!(call_builtin("to_bool", &[Value::Null]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn undefined_function() {
        assert!(matches!(
            call_builtin("nonexistent", &[]),
            Err(RuleError::UndefinedFunction(_))
        ));
    }

    #[test]
    fn wrong_arity_and_types() {
        assert!(matches!(
            call_builtin("len", &[]),
            Err(RuleError::TypeError(_))
        ));
        assert!(matches!(
            call_builtin("lower", &[Value::Int(42)]),
            Err(RuleError::TypeError(_))
        ));
    }
}
