use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use rulechain_rules::RuleId;
use rulechain_rules::engine::context::DEFAULT_PARAM;

/// Top-level configuration for the `rulechain` CLI, loaded from a TOML file.
///
/// Every section is optional; command-line flags take precedence.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulechainConfig {
    /// Traversal settings.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Where flows are loaded from.
    #[serde(default)]
    pub rules: RulesConfig,
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Traversal settings.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Entry rule used when `--entry` is omitted.
    pub default_entry: RuleId,
    /// Name the record is bound to inside predicates.
    pub param: String,
    /// Read predicates as function bodies, so one without `return` fails.
    pub statement_bodies: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_entry: RuleId::default(),
            param: DEFAULT_PARAM.to_owned(),
            statement_bodies: false,
        }
    }
}

/// Configuration for loading flows from disk.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulesConfig {
    /// Flow document used when `--rules` is omitted.
    pub path: Option<PathBuf>,
}

/// Log output settings.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing` filter directive. `RUST_LOG` wins when set.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_owned(),
        }
    }
}

impl RulechainConfig {
    /// Read the config at `path`, or return defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config at {}", path.display()))
    }
}
