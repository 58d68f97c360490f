use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;

use rulechain_rules::{ExecutionEngine, ExecutionTrace, NoopObserver, RuleId, StepObserver, Value};

use crate::OutputFormat;
use crate::commands::{cel_compiler, load_registry, rules_path};
use crate::config::RulechainConfig;
use crate::console::ConsoleObserver;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Flow document (YAML or JSON). Defaults to `rules.path` from the config.
    #[arg(long)]
    pub rules: Option<PathBuf>,
    /// The record, as inline JSON.
    #[arg(long, required_unless_present = "record_file", conflicts_with = "record_file")]
    pub record: Option<String>,
    /// Read the record from a JSON file, or `-` for stdin.
    #[arg(long)]
    pub record_file: Option<PathBuf>,
    /// Entry rule id. Defaults to `engine.default_entry` from the config.
    #[arg(long)]
    pub entry: Option<RuleId>,
    /// Name the record is bound to in predicates.
    #[arg(long)]
    pub param: Option<String>,
    /// Read predicates as function bodies: one without `return` fails.
    #[arg(long)]
    pub statement_bodies: bool,
    /// Do not print a line per evaluated rule.
    #[arg(long, short)]
    pub quiet: bool,
}

pub fn run(args: &RunArgs, config: &RulechainConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let path = rules_path(args.rules.as_deref(), config)?;
    let compiler = cel_compiler(args.param.as_deref(), args.statement_bodies, config);
    let registry = load_registry(&path, &compiler)?;
    let record = read_record(args)?;

    let observer: Arc<dyn StepObserver> = if args.quiet {
        Arc::new(NoopObserver)
    } else {
        // Keep stdout clean for JSON output.
        let to_stderr = matches!(format, OutputFormat::Json);
        let color = if to_stderr {
            std::io::stderr().is_terminal()
        } else {
            std::io::stdout().is_terminal()
        };
        Arc::new(ConsoleObserver::new(color, to_stderr))
    };
    let engine = ExecutionEngine::new(Arc::new(registry))
        .with_observer(observer)
        .with_default_entry(config.engine.default_entry.clone());

    let entry = args.entry.as_ref().unwrap_or(engine.default_entry());
    let trace = engine
        .run(entry, &record)
        .with_context(|| format!("flow {} failed", path.display()))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&trace)?),
        OutputFormat::Text => print!("{}", render_trace(&trace)),
    }
    Ok(())
}

fn read_record(args: &RunArgs) -> anyhow::Result<Value> {
    let text = match (&args.record, &args.record_file) {
        (Some(inline), _) => inline.clone(),
        (None, Some(path)) if path.as_os_str() == "-" => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read record from stdin")?;
            buf
        }
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read record file {}", path.display()))?,
        (None, None) => anyhow::bail!("pass --record or --record-file"),
    };
    parse_record(&text)
}

fn parse_record(text: &str) -> anyhow::Result<Value> {
    let json: serde_json::Value =
        serde_json::from_str(text).context("record is not valid JSON")?;
    Ok(Value::from_json(json))
}

fn render_trace(trace: &ExecutionTrace) -> String {
    if trace.is_empty() {
        return "no rules evaluated\n".to_owned();
    }
    trace
        .iter()
        .map(|(id, outcome)| {
            let verdict = if outcome { "passed" } else { "failed" };
            format!("{id}: {verdict}\n")
        })
        .collect()
}
