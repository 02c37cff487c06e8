//! Marshalling plans
//!
//! A plan mirrors a fieldset restricted to one request's selection. It holds
//! `Arc`s to the live descriptors of the schema, so building one per request
//! only allocates the tree itself.

use super::field::LeafField;
use super::nested::NestedField;
use indexmap::IndexMap;
use std::sync::Arc;

/// What the serializer does with one selected name
#[derive(Debug, Clone)]
pub enum PlanEntry {
    /// Plain leaf descriptor of the schema
    Leaf(Arc<LeafField>),
    /// Nested field rendered through its plain key
    Plain(Arc<LeafField>),
    /// Nested field expanded into its child plan
    Embedded {
        field: Arc<NestedField>,
        plan: MarshalPlan,
    },
    /// Nested field selected but neither embedded nor given a plain key
    ///
    /// Kept in the plan so the selection stays inspectable; omitted from output.
    Absent,
}

impl PlanEntry {
    pub fn is_absent(&self) -> bool {
        matches!(self, PlanEntry::Absent)
    }

    /// Child plan of an embedded entry
    pub fn nested(&self) -> Option<&MarshalPlan> {
        match self {
            PlanEntry::Embedded { plan, .. } => Some(plan),
            _ => None,
        }
    }

    /// Leaf descriptor of a leaf or plain entry
    pub fn leaf(&self) -> Option<&Arc<LeafField>> {
        match self {
            PlanEntry::Leaf(leaf) | PlanEntry::Plain(leaf) => Some(leaf),
            _ => None,
        }
    }
}

/// Ordered mapping from output names to plan entries
#[derive(Debug, Clone, Default)]
pub struct MarshalPlan {
    entries: IndexMap<String, PlanEntry>,
}

impl MarshalPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, entry: PlanEntry) {
        self.entries.insert(name.into(), entry);
    }

    pub fn get(&self, name: &str) -> Option<&PlanEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names in the plan, in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PlanEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Nested plan under a dotted path, e.g. `"test03.nest02"`
    pub fn nested_at(&self, path: &str) -> Option<&MarshalPlan> {
        path.split('.')
            .try_fold(self, |plan, segment| plan.get(segment)?.nested())
    }
}
