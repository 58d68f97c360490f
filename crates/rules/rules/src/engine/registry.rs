use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::debug;

use crate::engine::predicate::{Predicate, PredicateCompiler};
use crate::error::RuleError;
use crate::ir::rule::{RuleDefinition, RuleId};

/// A rule whose predicate is ready to be invoked.
#[derive(Clone)]
pub struct CompiledRule {
    /// Unique key of the rule.
    pub id: RuleId,
    /// Display label.
    pub title: String,
    /// The invocable predicate.
    pub predicate: Arc<dyn Predicate>,
    /// Successor when the predicate holds.
    pub true_next: Option<RuleId>,
    /// Successor when the predicate fails.
    pub false_next: Option<RuleId>,
    /// Text the predicate was compiled from. Empty for rules built in code.
    pub source: String,
}

impl CompiledRule {
    /// Build a rule around an already constructed predicate.
    pub fn new(
        id: impl Into<RuleId>,
        title: impl Into<String>,
        predicate: Arc<dyn Predicate>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            predicate,
            true_next: None,
            false_next: None,
            source: String::new(),
        }
    }

    /// Compile `def` with `compiler`.
    pub fn compile(def: RuleDefinition, compiler: &dyn PredicateCompiler) -> Result<Self, RuleError> {
        let predicate = compiler
            .compile(&def.predicate_source)
            .map_err(|e| RuleError::Compilation {
                rule: def.id.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            id: def.id,
            title: def.title,
            predicate,
            true_next: def.true_next,
            false_next: def.false_next,
            source: def.predicate_source,
        })
    }

    /// Set the successor taken when the predicate holds.
    #[must_use]
    pub fn on_true(mut self, next: impl Into<RuleId>) -> Self {
        self.true_next = Some(next.into());
        self
    }

    /// Set the successor taken when the predicate fails.
    #[must_use]
    pub fn on_false(mut self, next: impl Into<RuleId>) -> Self {
        self.false_next = Some(next.into());
        self
    }

    /// The successor selected by `outcome`.
    pub fn next_for(&self, outcome: bool) -> Option<&RuleId> {
        if outcome {
            self.true_next.as_ref()
        } else {
            self.false_next.as_ref()
        }
    }
}

impl fmt::Debug for CompiledRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRule")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("source", &self.source)
            .field("true_next", &self.true_next)
            .field("false_next", &self.false_next)
            .finish_non_exhaustive()
    }
}

/// Read-only collection of compiled rules keyed by id.
///
/// When two rules share an id the later one replaces the earlier one, but the
/// id keeps the position where it first appeared.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: HashMap<RuleId, CompiledRule>,
    order: Vec<RuleId>,
}

impl RuleRegistry {
    /// Compile every definition and build the registry.
    ///
    /// All definitions are compiled, including ones later overridden by a
    /// duplicate id. The first compile failure aborts construction.
    pub fn compile(
        defs: impl IntoIterator<Item = RuleDefinition>,
        compiler: &dyn PredicateCompiler,
    ) -> Result<Self, RuleError> {
        let compiled = defs
            .into_iter()
            .map(|def| CompiledRule::compile(def, compiler))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_rules(compiled))
    }

    /// Build a registry from rules that are already compiled.
    pub fn from_rules(rules: impl IntoIterator<Item = CompiledRule>) -> Self {
        let mut registry = Self::default();
        let mut ingested = 0usize;
        for rule in rules {
            ingested += 1;
            registry.insert(rule);
        }
        debug!(
            ingested,
            rules = registry.len(),
            overridden = ingested - registry.len(),
            "rule registry built"
        );
        registry
    }

    fn insert(&mut self, rule: CompiledRule) {
        if !self.rules.contains_key(&rule.id) {
            self.order.push(rule.id.clone());
        }
        self.rules.insert(rule.id.clone(), rule);
    }

    /// Look up a rule by id.
    pub fn get(&self, id: &RuleId) -> Option<&CompiledRule> {
        self.rules.get(id)
    }

    /// Whether a rule with `id` is registered.
    pub fn contains(&self, id: &RuleId) -> bool {
        self.rules.contains_key(id)
    }

    /// Number of distinct rule ids.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the registry holds no rules.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Rule ids in order of first appearance.
    pub fn ids(&self) -> impl Iterator<Item = &RuleId> {
        self.order.iter()
    }

    /// Rules in order of first appearance.
    pub fn iter(&self) -> impl Iterator<Item = &CompiledRule> {
        self.order.iter().filter_map(|id| self.rules.get(id))
    }

    /// Compute a fingerprint of the rule set.
    ///
    /// Covers ids, titles, sources and edges, so any change to the flow
    /// yields a different value.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for rule in self.iter() {
            rule.id.hash(&mut hasher);
            rule.title.hash(&mut hasher);
            rule.source.hash(&mut hasher);
            rule.true_next.hash(&mut hasher);
            rule.false_next.hash(&mut hasher);
        }
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::engine::predicate::FnPredicate;
    use crate::engine::value::Value;

    /// Compiles `"true"` / `"false"` into constants and refuses anything else.
    #[derive(Default)]
    struct ConstCompiler {
        calls: AtomicUsize,
    }

    impl PredicateCompiler for ConstCompiler {
        fn compile(&self, source: &str) -> Result<Arc<dyn Predicate>, RuleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let outcome = match source {
                "true" => true,
                "false" => false,
                other => return Err(RuleError::Parse(format!("unknown source `{other}`"))),
            };
            Ok(Arc::new(FnPredicate::boolean(source, move |_| outcome)))
        }
    }

    fn def(id: i64, title: &str, src: &str) -> RuleDefinition {
        RuleDefinition::new(id, title, src)
    }

    #[test]
    fn compiles_definitions_in_order() {
        let compiler = ConstCompiler::default();
        let registry = RuleRegistry::compile(
            vec![def(2, "b", "true").on_true(1), def(1, "a", "false")],
            &compiler,
        )
        .unwrap();

        assert_eq!(registry.len(), 2);
        let ids: Vec<_> = registry.ids().cloned().collect();
        assert_eq!(ids, [RuleId::from(2), RuleId::from(1)]);
        let rule = registry.get(&RuleId::from(2)).unwrap();
        assert_eq!(rule.source, "true");
        assert_eq!(rule.next_for(true), Some(&RuleId::from(1)));
        assert_eq!(rule.next_for(false), None);
    }

    #[test]
    fn last_definition_wins_and_keeps_first_position() {
        let compiler = ConstCompiler::default();
        let registry = RuleRegistry::compile(
            vec![
                def(1, "first", "true"),
                def(2, "other", "true"),
                def(1, "second", "false"),
            ],
            &compiler,
        )
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(&RuleId::from(1)).unwrap().title, "second");
        let titles: Vec<_> = registry.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["second", "other"]);
        // The overridden definition was still compiled.
        assert_eq!(compiler.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn overridden_definition_can_still_fail_compilation() {
        let compiler = ConstCompiler::default();
        let err = RuleRegistry::compile(
            vec![def(1, "broken", "???"), def(1, "fixed", "true")],
            &compiler,
        )
        .unwrap_err();
        match err {
            RuleError::Compilation { rule, reason } => {
                assert_eq!(rule, RuleId::from(1));
                assert!(reason.contains("???"));
            }
            other => panic!("expected compilation error, got {other:?}"),
        }
    }

    #[test]
    fn compilation_does_not_evaluate() {
        struct Exploding;
        impl PredicateCompiler for Exploding {
            fn compile(&self, _source: &str) -> Result<Arc<dyn Predicate>, RuleError> {
                Ok(Arc::new(FnPredicate::new("boom", |_| {
                    panic!("evaluated during compilation")
                })))
            }
        }
        let registry = RuleRegistry::compile(vec![def(1, "a", "anything")], &Exploding).unwrap();
        assert!(registry.contains(&RuleId::from(1)));
    }

    #[test]
    fn from_rules_dedups() {
        let yes: Arc<dyn Predicate> = Arc::new(FnPredicate::boolean("yes", |_| true));
        let registry = RuleRegistry::from_rules(vec![
            CompiledRule::new("a", "one", Arc::clone(&yes)).on_true("b"),
            CompiledRule::new("a", "two", yes),
        ]);
        assert_eq!(registry.len(), 1);
        let rule = registry.get(&RuleId::from("a")).unwrap();
        assert_eq!(rule.title, "two");
        assert_eq!(rule.true_next, None);
        assert_eq!(rule.predicate.evaluate(&Value::Null).unwrap(), Value::Bool(true));
    }

    #[test]
    fn empty_registry() {
        let registry = RuleRegistry::compile(Vec::new(), &ConstCompiler::default()).unwrap();
        assert!(registry.is_empty());
        assert!(!registry.contains(&RuleId::default()));
    }

    #[test]
    fn fingerprint_tracks_changes() {
        let compiler = ConstCompiler::default();
        let a = RuleRegistry::compile(vec![def(1, "a", "true").on_true(2)], &compiler).unwrap();
        let same = RuleRegistry::compile(vec![def(1, "a", "true").on_true(2)], &compiler).unwrap();
        let edge = RuleRegistry::compile(vec![def(1, "a", "true").on_true(3)], &compiler).unwrap();
        let source = RuleRegistry::compile(vec![def(1, "a", "false").on_true(2)], &compiler).unwrap();

        assert_eq!(a.fingerprint(), same.fingerprint());
        assert_ne!(a.fingerprint(), edge.fingerprint());
        assert_ne!(a.fingerprint(), source.fingerprint());
    }
}
