//! Flow document frontend.
//!
//! A flow document is YAML (and therefore also JSON). It is either a
//! mapping with a `rules` list or a bare list of rule definitions:
//!
//! ```yaml
//! rules:
//!   - id: 1
//!     title: Rule 1
//!     predicate: "return !!obj;"
//!     true_next: 4
//!     false_next: 3
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use rulechain_rules::{RuleDefinition, RuleError, RuleFrontend};

/// Wrapped form of a flow document.
#[derive(Debug, Deserialize)]
struct FlowFile {
    /// The rule definitions, in authoring order.
    rules: Vec<RuleDefinition>,
}

/// A [`RuleFrontend`] that reads YAML or JSON flow documents.
///
/// Predicates are left as source text; compile them with
/// [`CelCompiler`](crate::CelCompiler) when building the registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct CelFrontend;

impl CelFrontend {
    fn parse_document(content: &str) -> Result<Vec<RuleDefinition>, String> {
        let document: serde_yaml_ng::Value =
            serde_yaml_ng::from_str(content).map_err(|e| e.to_string())?;
        match document {
            serde_yaml_ng::Value::Sequence(_) => {
                serde_yaml_ng::from_value(document).map_err(|e| e.to_string())
            }
            serde_yaml_ng::Value::Mapping(_) => serde_yaml_ng::from_value::<FlowFile>(document)
                .map(|file| file.rules)
                .map_err(|e| e.to_string()),
            _ => Err("expected a list of rules or a mapping with a `rules` list".to_owned()),
        }
    }
}

impl RuleFrontend for CelFrontend {
    fn extensions(&self) -> &[&str] {
        &["yaml", "yml", "json", "flow"]
    }

    fn parse(&self, content: &str) -> Result<Vec<RuleDefinition>, RuleError> {
        let rules = Self::parse_document(content)
            .map_err(|e| RuleError::Parse(format!("flow document parse error: {e}")))?;
        debug!(rules = rules.len(), "flow document parsed");
        Ok(rules)
    }

    fn parse_file(&self, path: &Path) -> Result<Vec<RuleDefinition>, RuleError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RuleError::Parse(format!("cannot read {}: {e}", path.display())))?;

        let rules = Self::parse_document(&content).map_err(|e| {
            RuleError::Parse(format!(
                "flow document parse error in {}: {e}",
                path.display()
            ))
        })?;
        debug!(path = %path.display(), rules = rules.len(), "flow file parsed");
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rulechain_rules::RuleId;

    use super::*;

    #[test]
    fn parses_wrapped_yaml() {
        let yaml = r#"
rules:
  - id: 1
    title: Rule 1
    predicate: "return !!obj;"
    true_next: 4
    false_next: 3
  - id: 4
    title: Rule 4
    predicate: obj.color == 'green'
"#;
        let rules = CelFrontend.parse(yaml).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].id, RuleId::Int(1));
        assert_eq!(rules[0].predicate_source, "return !!obj;");
        assert_eq!(rules[0].true_next, Some(RuleId::Int(4)));
        assert_eq!(rules[0].false_next, Some(RuleId::Int(3)));
        assert_eq!(rules[1].predicate_source, "obj.color == 'green'");
        assert_eq!(rules[1].true_next, None);
    }

    #[test]
    fn parses_bare_json_list_with_camel_case_fields() {
        let json = r#"[
            {"id": "intake", "title": "Intake", "method": "true", "trueId": "done", "falseId": null},
            {"id": "done", "title": "Done", "predicateSource": "false"}
        ]"#;
        let rules = CelFrontend.parse(json).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].true_next, Some(RuleId::from("done")));
        assert_eq!(rules[0].false_next, None);
        assert_eq!(rules[1].predicate_source, "false");
    }

    #[test]
    fn keeps_duplicate_ids_in_order() {
        let yaml = "- {id: 1, title: a, predicate: 'true'}\n- {id: 1, title: b, predicate: 'false'}\n";
        let rules = CelFrontend.parse(yaml).unwrap();
        let titles: Vec<_> = rules.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["a", "b"]);
    }

    #[test]
    fn rejects_malformed_documents() {
        for doc in [
            "rules: [",
            "42",
            "rules:\n  - title: missing id and predicate",
            "other: []",
        ] {
            assert!(
                matches!(CelFrontend.parse(doc), Err(RuleError::Parse(_))),
                "expected parse error for {doc:?}"
            );
        }
    }

    #[test]
    fn extensions() {
        assert!(CelFrontend.handles(Path::new("flows/demo.yaml")));
        assert!(CelFrontend.handles(Path::new("demo.json")));
        assert!(!CelFrontend.handles(Path::new("demo.toml")));
    }

    #[test]
    fn parse_file_reads_from_disk() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "- id: 1\n  predicate: 'true'").unwrap();
        let rules = CelFrontend.parse_file(file.path()).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id, RuleId::Int(1));
    }

    #[test]
    fn parse_file_error_names_path() {
        let err = CelFrontend
            .parse_file(Path::new("/nonexistent/flow.yaml"))
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/flow.yaml"));
    }
}
