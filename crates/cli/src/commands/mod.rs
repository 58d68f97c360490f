pub mod check;
pub mod run;

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::info;

use rulechain_rules::{RuleRegistry, load_file};
use rulechain_rules_cel::{CelCompiler, CelFrontend};

use crate::config::RulechainConfig;

/// Pick the flow document from the flag, falling back to the config.
pub fn rules_path(flag: Option<&Path>, config: &RulechainConfig) -> anyhow::Result<PathBuf> {
    flag.or(config.rules.path.as_deref())
        .map(Path::to_path_buf)
        .context("no flow document given: pass --rules or set rules.path in the config")
}

/// Build the predicate compiler from flags, falling back to the config.
pub fn cel_compiler(
    param: Option<&str>,
    statement_bodies: bool,
    config: &RulechainConfig,
) -> CelCompiler {
    CelCompiler::new()
        .with_param(param.unwrap_or(&config.engine.param))
        .with_statement_bodies(statement_bodies || config.engine.statement_bodies)
}

/// Load the flow at `path` and compile every predicate with `compiler`.
pub fn load_registry(path: &Path, compiler: &CelCompiler) -> anyhow::Result<RuleRegistry> {
    let defs = load_file(path, &[&CelFrontend])
        .with_context(|| format!("failed to load flow {}", path.display()))?;
    let registry = RuleRegistry::compile(defs, compiler)
        .with_context(|| format!("failed to compile flow {}", path.display()))?;
    info!(path = %path.display(), rules = registry.len(), "flow loaded");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rulechain_rules::{ExecutionEngine, NoopObserver, Value};

    use super::*;

    #[test]
    fn flag_wins_over_config() {
        let mut config = RulechainConfig::default();
        config.rules.path = Some(PathBuf::from("from-config.yaml"));
        assert_eq!(
            rules_path(Some(Path::new("flag.yaml")), &config).unwrap(),
            PathBuf::from("flag.yaml")
        );
        assert_eq!(
            rules_path(None, &config).unwrap(),
            PathBuf::from("from-config.yaml")
        );
    }

    #[test]
    fn missing_rules_path_is_an_error() {
        assert!(rules_path(None, &RulechainConfig::default()).is_err());
    }

    #[test]
    fn load_registry_reports_unknown_extension() {
        let err = load_registry(Path::new("flow.toml"), &CelCompiler::new()).unwrap_err();
        assert!(format!("{err:#}").contains("no frontend handles"));
    }

    #[test]
    fn flags_and_config_pick_compiler_options() {
        let mut config = RulechainConfig::default();
        let compiler = cel_compiler(None, false, &config);
        assert_eq!(compiler.param(), "record");
        assert!(!compiler.statement_bodies());

        assert!(cel_compiler(Some("obj"), true, &config).statement_bodies());
        config.engine.statement_bodies = true;
        config.engine.param = "obj".to_owned();
        let compiler = cel_compiler(None, false, &config);
        assert_eq!(compiler.param(), "obj");
        assert!(compiler.statement_bodies());
    }

    #[test]
    fn demo_flow_runs_with_demo_config() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
        let config: RulechainConfig =
            toml::from_str(include_str!("../../../../demos/rulechain.toml")).unwrap();
        let compiler = cel_compiler(None, false, &config);
        let registry = load_registry(&root.join("demos/flow.yaml"), &compiler).unwrap();

        let engine = ExecutionEngine::new(Arc::new(registry))
            .with_observer(Arc::new(NoopObserver))
            .with_default_entry(config.engine.default_entry.clone());
        let green = Value::from_json(serde_json::json!({"color": "green"}));
        let trace = engine.run_default(&green).unwrap();
        assert_eq!(
            serde_json::to_string(&trace).unwrap(),
            r#"{"1":true,"4":false,"5":true}"#
        );
    }
}
