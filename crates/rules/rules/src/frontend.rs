use std::path::Path;

use crate::error::RuleError;
use crate::ir::rule::RuleDefinition;

/// Trait for frontends that read rule definitions from a flow document.
///
/// Implementations parse a specific file format into [`RuleDefinition`]s.
/// Predicates stay as source text; compiling them is the registry's job.
pub trait RuleFrontend: Send + Sync {
    /// Return the file extensions this frontend supports (e.g., `["yaml", "yml"]`).
    fn extensions(&self) -> &[&str];

    /// Parse definitions from a string content.
    fn parse(&self, content: &str) -> Result<Vec<RuleDefinition>, RuleError>;

    /// Parse definitions from a file path.
    ///
    /// The default implementation reads the file and delegates to [`parse`](Self::parse).
    fn parse_file(&self, path: &Path) -> Result<Vec<RuleDefinition>, RuleError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RuleError::Parse(format!("cannot read {}: {e}", path.display())))?;
        self.parse(&content)
    }

    /// Whether `path` has one of this frontend's extensions.
    fn handles(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.extensions()
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
    }
}

/// Parse `path` with the first frontend that handles its extension.
pub fn load_file(
    path: &Path,
    frontends: &[&dyn RuleFrontend],
) -> Result<Vec<RuleDefinition>, RuleError> {
    let frontend = frontends
        .iter()
        .find(|frontend| frontend.handles(path))
        .ok_or_else(|| {
            RuleError::Parse(format!("no frontend handles {}", path.display()))
        })?;
    frontend.parse_file(path)
}
