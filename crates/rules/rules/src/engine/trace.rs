use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::ir::rule::RuleId;

/// Outcomes of one traversal, keyed by rule id, in visit order.
///
/// The trace doubles as the visited set: an id present here has already been
/// evaluated and is never evaluated again in the same traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionTrace {
    entries: Vec<(RuleId, bool)>,
    index: HashMap<RuleId, usize>,
}

impl ExecutionTrace {
    /// Create an empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcome recorded for `id`, if it was visited.
    pub fn get(&self, id: &RuleId) -> Option<bool> {
        self.index.get(id).map(|&pos| self.entries[pos].1)
    }

    /// Whether `id` was visited.
    pub fn contains(&self, id: &RuleId) -> bool {
        self.index.contains_key(id)
    }

    /// Record the outcome for `id`.
    ///
    /// Returns `false` and leaves the trace untouched when `id` is already
    /// present.
    pub fn record(&mut self, id: RuleId, outcome: bool) -> bool {
        if self.index.contains_key(&id) {
            return false;
        }
        self.index.insert(id.clone(), self.entries.len());
        self.entries.push((id, outcome));
        true
    }

    /// Number of visited rules.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no rule was visited.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(id, outcome)` pairs in visit order.
    pub fn iter(&self) -> impl Iterator<Item = (&RuleId, bool)> {
        self.entries.iter().map(|(id, outcome)| (id, *outcome))
    }

    /// Visited ids in visit order.
    pub fn ids(&self) -> impl Iterator<Item = &RuleId> {
        self.entries.iter().map(|(id, _)| id)
    }

    /// The most recently visited rule and its outcome.
    pub fn last(&self) -> Option<(&RuleId, bool)> {
        self.entries.last().map(|(id, outcome)| (id, *outcome))
    }
}

impl Serialize for ExecutionTrace {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, outcome) in &self.entries {
            map.serialize_entry(&id.to_string(), outcome)?;
        }
        map.end()
    }
}
