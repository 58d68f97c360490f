use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::RuleError;

/// Runtime value produced by expression evaluation.
///
/// Input records are converted into a `Value` before a traversal starts, so
/// predicates never see raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// The null value.
    Null,
    /// A boolean value.
    Bool(bool),
    /// A 64-bit signed integer.
    Int(i64),
    /// A 64-bit floating-point number.
    Float(f64),
    /// A UTF-8 string.
    String(String),
    /// An ordered list of values.
    List(Vec<Value>),
    /// A string-keyed map of values.
    Map(HashMap<String, Value>),
}

impl Value {
    /// Convert a `serde_json::Value` into a runtime `Value`.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Self::Float(f)
                } else {
                    Self::Null
                }
            }
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(arr) => {
                Self::List(arr.into_iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(obj) => Self::Map(
                obj.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Returns `true` if this value is considered truthy.
    ///
    /// - `Null` is falsy.
    /// - `Bool` is its own truthiness.
    /// - `Int(0)`, `Float(0.0)` and `NaN` are falsy.
    /// - Empty strings are falsy.
    /// - Lists and maps are always truthy, empty or not.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
            Self::Float(f) => *f != 0.0 && !f.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::List(_) | Self::Map(_) => true,
        }
    }

    /// Returns a string representation of the value type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Returns a human-readable display string for the value.
    pub fn display_string(&self) -> String {
        match self {
            Self::Null => "null".to_owned(),
            Self::Bool(b) => b.to_string(),
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => s.clone(),
            Self::List(v) => format!("{v:?}"),
            Self::Map(m) => format!("{m:?}"),
        }
    }

    /// Look up a top-level key without failing on non-map values.
    pub(crate) fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Map(m) => m.get(key),
            _ => None,
        }
    }

    /// Access a field by name on this value (for Map values).
    ///
    /// A missing key yields [`Value::Null`]; any non-map value is a type error.
    pub fn field(&self, name: &str) -> Result<Self, RuleError> {
        match self {
            Self::Map(m) => Ok(m.get(name).cloned().unwrap_or(Self::Null)),
            _ => Err(RuleError::TypeError(format!(
                "cannot access field '{name}' on {}",
                self.type_name()
            ))),
        }
    }

    /// Access an index on this value (for List and Map values).
    ///
    /// Negative list indexes count from the end. Out-of-range indexes and
    /// missing keys yield [`Value::Null`].
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub fn index(&self, idx: &Self) -> Result<Self, RuleError> {
        match (self, idx) {
            (Self::List(v), Self::Int(i)) => {
                let len = i64::try_from(v.len()).unwrap_or(i64::MAX);
                let index = if *i < 0 { len + i } else { *i };
                if index < 0 {
                    return Ok(Self::Null);
                }
                Ok(v.get(index as usize).cloned().unwrap_or(Self::Null))
            }
            (Self::Map(m), Self::String(key)) => Ok(m.get(key).cloned().unwrap_or(Self::Null)),
            _ => Err(RuleError::TypeError(format!(
                "cannot index {} with {}",
                self.type_name(),
                idx.type_name()
            ))),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Self::from_json(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_json_converts_nested_records() {
        let value = Value::from_json(serde_json::json!({
            "color": "red",
            "size": 3,
            "ratio": 0.5,
            "tags": ["a", null],
            "ok": true
        }));
        let Value::Map(map) = value else {
            panic!("expected map");
        };
        assert_eq!(map["color"], Value::String("red".into()));
        assert_eq!(map["size"], Value::Int(3));
        assert_eq!(map["ratio"], Value::Float(0.5));
        assert_eq!(
            map["tags"],
            Value::List(vec![Value::String("a".into()), Value::Null])
        );
        assert_eq!(map["ok"], Value::Bool(true));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(!Value::Float(0.0).is_truthy());
        assert!(!Value::Float(f64::NAN).is_truthy());
        assert!(Value::Float(0.1).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(Value::String("x".into()).is_truthy());
        assert!(Value::List(vec![]).is_truthy());
        assert!(Value::Map(HashMap::new()).is_truthy());
    }

    #[test]
    fn field_access() {
        let record = Value::from_json(serde_json::json!({"color": "red"}));
        assert_eq!(record.field("color").unwrap(), Value::String("red".into()));
        assert_eq!(record.field("missing").unwrap(), Value::Null);
        assert!(matches!(
            Value::Null.field("color"),
            Err(RuleError::TypeError(_))
        ));
    }

    #[test]
    fn index_access() {
        let list = Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(list.index(&Value::Int(0)).unwrap(), Value::Int(1));
        assert_eq!(list.index(&Value::Int(-1)).unwrap(), Value::Int(3));
        assert_eq!(list.index(&Value::Int(-9)).unwrap(), Value::Null);
        assert_eq!(list.index(&Value::Int(9)).unwrap(), Value::Null);
        assert!(list.index(&Value::String("a".into())).is_err());
    }

    #[test]
    fn get_is_lenient() {
        let record = Value::from_json(serde_json::json!({"a": 1}));
        assert_eq!(record.get("a"), Some(&Value::Int(1)));
        assert_eq!(record.get("b"), None);
        assert_eq!(Value::Int(1).get("a"), None);
    }
}
