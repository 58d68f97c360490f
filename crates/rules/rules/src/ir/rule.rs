use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

/// Identifier of a rule in a flow.
///
/// Flows may key their rules by integer or by name; both forms can be mixed
/// in one flow. On the wire the id is the bare value (`1` or `"intake"`).
/// A string made only of an integer deserializes as [`RuleId::Int`], so `"2"`
/// and `2` name the same rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum RuleId {
    /// A numeric id.
    Int(i64),
    /// A string id.
    Name(String),
}

impl Default for RuleId {
    /// The well-known entry rule, `1`.
    fn default() -> Self {
        Self::Int(1)
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Name(s) => f.write_str(s),
        }
    }
}

impl FromStr for RuleId {
    type Err = std::convert::Infallible;

    /// Parses an integer id when the text is numeric, otherwise a name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(trimmed
            .parse::<i64>()
            .map_or_else(|_| Self::Name(trimmed.to_owned()), Self::Int))
    }
}

impl<'de> Deserialize<'de> for RuleId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RuleIdVisitor;

        impl Visitor<'_> for RuleIdVisitor {
            type Value = RuleId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an integer or string rule id")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<RuleId, E> {
                Ok(RuleId::Int(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<RuleId, E> {
                i64::try_from(v)
                    .map(RuleId::Int)
                    .map_err(|_| E::custom(format!("rule id {v} is out of range")))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<RuleId, E> {
                Ok(v.parse().unwrap_or_else(|never| match never {}))
            }
        }

        deserializer.deserialize_any(RuleIdVisitor)
    }
}

impl From<i64> for RuleId {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for RuleId {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<&str> for RuleId {
    /// Same normalisation as [`FromStr`]: `"2"` becomes `Int(2)`.
    fn from(s: &str) -> Self {
        s.parse().unwrap_or_else(|never| match never {})
    }
}

impl From<String> for RuleId {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

/// Authoring-time description of one rule in a flow.
///
/// The predicate is kept as source text; it is only turned into something
/// callable when a registry is compiled from the definitions. The field
/// aliases accept the camelCase names older flow files use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Unique key of the rule. Later definitions with the same id win.
    pub id: RuleId,
    /// Display label.
    #[serde(default)]
    pub title: String,
    /// Source of a boolean-returning computation over the record.
    #[serde(
        rename = "predicate",
        alias = "predicate_source",
        alias = "predicateSource",
        alias = "method"
    )]
    pub predicate_source: String,
    /// Rule visited when the predicate holds. `None` ends the walk.
    #[serde(
        default,
        alias = "true_id",
        alias = "trueId",
        alias = "trueNextId",
        skip_serializing_if = "Option::is_none"
    )]
    pub true_next: Option<RuleId>,
    /// Rule visited when the predicate fails. `None` ends the walk.
    #[serde(
        default,
        alias = "false_id",
        alias = "falseId",
        alias = "falseNextId",
        skip_serializing_if = "Option::is_none"
    )]
    pub false_next: Option<RuleId>,
}

impl RuleDefinition {
    /// Create a terminal rule definition with no successors.
    pub fn new(
        id: impl Into<RuleId>,
        title: impl Into<String>,
        predicate_source: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            predicate_source: predicate_source.into(),
            true_next: None,
            false_next: None,
        }
    }

    /// Set the rule visited when the predicate holds.
    #[must_use]
    pub fn on_true(mut self, next: impl Into<RuleId>) -> Self {
        self.true_next = Some(next.into());
        self
    }

    /// Set the rule visited when the predicate fails.
    #[must_use]
    pub fn on_false(mut self, next: impl Into<RuleId>) -> Self {
        self.false_next = Some(next.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_id_display() {
        assert_eq!(RuleId::Int(42).to_string(), "42");
        assert_eq!(RuleId::from("intake").to_string(), "intake");
    }

    #[test]
    fn rule_id_from_str_prefers_integers() {
        assert_eq!("7".parse::<RuleId>().unwrap(), RuleId::Int(7));
        assert_eq!(" -3 ".parse::<RuleId>().unwrap(), RuleId::Int(-3));
        assert_eq!(
            "check-color".parse::<RuleId>().unwrap(),
            RuleId::Name("check-color".into())
        );
    }

    #[test]
    fn default_rule_id_is_one() {
        assert_eq!(RuleId::default(), RuleId::Int(1));
    }

    #[test]
    fn rule_id_serde_is_untagged() {
        let ids: Vec<RuleId> = serde_json::from_str(r#"[1, "two"]"#).unwrap();
        assert_eq!(ids, vec![RuleId::Int(1), RuleId::Name("two".into())]);
        assert_eq!(serde_json::to_string(&ids).unwrap(), r#"[1,"two"]"#);
    }

    #[test]
    fn numeric_string_ids_deserialize_as_integers() {
        let ids: Vec<RuleId> = serde_json::from_str(r#"["2", 2, "02x"]"#).unwrap();
        assert_eq!(
            ids,
            vec![RuleId::Int(2), RuleId::Int(2), RuleId::Name("02x".into())]
        );
        assert!(serde_json::from_str::<RuleId>("1.5").is_err());
        assert!(serde_json::from_str::<RuleId>("true").is_err());
    }

    #[test]
    fn string_conversions_normalise_like_parsing() {
        assert_eq!(RuleId::from("2"), RuleId::Int(2));
        assert_eq!(RuleId::from(String::from("2")), RuleId::Int(2));
        assert_eq!(RuleId::from("2"), "2".parse::<RuleId>().unwrap());
        assert_eq!(RuleId::from("intake"), RuleId::Name("intake".into()));

        let def = RuleDefinition::new("2", "two", "true").on_true("3");
        assert_eq!(def.id, RuleId::Int(2));
        assert_eq!(def.true_next, Some(RuleId::Int(3)));
    }

    #[test]
    fn definition_builder() {
        let def = RuleDefinition::new(1, "Rule 1", "!!obj").on_true(4).on_false(3);
        assert_eq!(def.id, RuleId::Int(1));
        assert_eq!(def.title, "Rule 1");
        assert_eq!(def.true_next, Some(RuleId::Int(4)));
        assert_eq!(def.false_next, Some(RuleId::Int(3)));
    }

    #[test]
    fn definition_accepts_camel_case_fields() {
        let json = r#"{
            "id": 3,
            "title": "Rule 3",
            "method": "return obj.color == 'green'",
            "trueId": 2,
            "falseId": null
        }"#;
        let def: RuleDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(def.predicate_source, "return obj.color == 'green'");
        assert_eq!(def.true_next, Some(RuleId::Int(2)));
        assert_eq!(def.false_next, None);
    }

    #[test]
    fn definition_missing_edges_default_to_none() {
        let def: RuleDefinition =
            serde_json::from_str(r#"{"id": "end", "predicate": "true"}"#).unwrap();
        assert_eq!(def.id, RuleId::Name("end".into()));
        assert!(def.title.is_empty());
        assert!(def.true_next.is_none());
        assert!(def.false_next.is_none());
    }

    #[test]
    fn definition_serializes_with_canonical_names() {
        let def = RuleDefinition::new(1, "start", "true").on_true(2);
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 1,
                "title": "start",
                "predicate": "true",
                "true_next": 2
            })
        );
    }
}
