use std::path::PathBuf;

use clap::Args;

use crate::OutputFormat;
use crate::commands::{cel_compiler, load_registry, rules_path};
use crate::config::RulechainConfig;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Flow document (YAML or JSON). Defaults to `rules.path` from the config.
    #[arg(long)]
    pub rules: Option<PathBuf>,
    /// Name the record is bound to in predicates.
    #[arg(long)]
    pub param: Option<String>,
    /// Read predicates as function bodies: one without `return` fails.
    #[arg(long)]
    pub statement_bodies: bool,
}

pub fn run(args: &CheckArgs, config: &RulechainConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let path = rules_path(args.rules.as_deref(), config)?;
    let compiler = cel_compiler(args.param.as_deref(), args.statement_bodies, config);
    let registry = load_registry(&path, &compiler)?;

    match format {
        OutputFormat::Json => {
            let ids: Vec<String> = registry.ids().map(ToString::to_string).collect();
            let summary = serde_json::json!({
                "path": path.display().to_string(),
                "rules": registry.len(),
                "ids": ids,
                "fingerprint": format!("{:016x}", registry.fingerprint()),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Text => {
            println!("{} rules compiled from {}:", registry.len(), path.display());
            for rule in registry.iter() {
                let edge = |next: Option<&rulechain_rules::RuleId>| {
                    next.map_or_else(|| "-".to_owned(), ToString::to_string)
                };
                println!(
                    "  [{id}] {title} (true: {t}, false: {f})",
                    id = rule.id,
                    title = rule.title,
                    t = edge(rule.true_next.as_ref()),
                    f = edge(rule.false_next.as_ref()),
                );
            }
        }
    }
    Ok(())
}
