//! Knowledge store: node id -> attribute record
//!
//! Records are created on first reference and only ever grow or change by
//! shallow, last-write-wins merge. Nothing is removed.

use asi_core::Attributes;
use dashmap::DashMap;
use std::collections::BTreeMap;
use tracing::trace;

#[derive(Default)]
pub struct KnowledgeStore {
    nodes: DashMap<String, Attributes>,
}

impl KnowledgeStore {
    pub fn new() -> Self {
        Self { nodes: DashMap::new() }
    }

    /// Create the record if absent, then merge `attrs` into it key by key.
    pub fn merge(&self, node_id: &str, attrs: Attributes) {
        let mut entry = self.nodes.entry(node_id.to_string()).or_default();
        trace!(node = node_id, keys = attrs.len(), "merge");
        for (key, value) in attrs {
            entry.insert(key, value);
        }
    }

    pub fn get(&self, node_id: &str) -> Option<Attributes> {
        self.nodes.get(node_id).map(|r| r.value().clone())
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.nodes.contains_key(node_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Copy of the whole store, ordered by node id.
    pub fn snapshot(&self) -> BTreeMap<String, Attributes> {
        self.nodes
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }
}
