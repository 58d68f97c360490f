use std::io::Write;

use rulechain_rules::{StepEvent, StepObserver};

const PASSED: &str = "\x1b[42m";
const FAILED: &str = "\x1b[41m";
const CIRCULAR: &str = "\x1b[44m";
const RESET: &str = "\x1b[0m";

/// Prints one line per evaluated rule, plus `circular!` when the walk
/// closes a cycle.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleObserver {
    color: bool,
    stderr: bool,
}

impl ConsoleObserver {
    /// Write to stdout, or to stderr when stdout carries machine output.
    pub fn new(color: bool, stderr: bool) -> Self {
        Self { color, stderr }
    }

    fn write(&self, line: &str) {
        if self.stderr {
            writeln!(std::io::stderr().lock(), "{line}").ok();
        } else {
            writeln!(std::io::stdout().lock(), "{line}").ok();
        }
    }
}

/// The step line without any styling.
pub fn step_line(event: &StepEvent<'_>) -> String {
    let verdict = if event.outcome { "passed" } else { "failed" };
    let next = event
        .next
        .map_or_else(|| "null".to_owned(), ToString::to_string);
    format!("{} {verdict} next will be id: {next}", event.title)
}

impl StepObserver for ConsoleObserver {
    fn on_step(&self, event: &StepEvent<'_>) {
        let line = step_line(event);
        if self.color {
            let style = if event.outcome { PASSED } else { FAILED };
            self.write(&format!("{style}{line}{RESET}"));
        } else {
            self.write(&line);
        }
        if event.cycle {
            if self.color {
                self.write(&format!("{CIRCULAR}circular!{RESET}"));
            } else {
                self.write("circular!");
            }
        }
    }
}
