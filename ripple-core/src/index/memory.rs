//! In-memory dependency index.
//!
//! Edges live in one vector behind a `parking_lot::RwLock`. Reads take the
//! shared lock, so many chain builds can query concurrently. A replacement
//! holds the exclusive lock for its delete and insert together, so no reader
//! ever observes a target with half of its edges.

use parking_lot::RwLock;

use crate::error::Result;
use crate::graph::ComputationNode;
use crate::model::ResourceKind;

use super::{DependencyEdge, DependencyIndex};

/// A [`DependencyIndex`] kept entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryDependencyIndex {
    edges: RwLock<Vec<DependencyEdge>>,
}

impl InMemoryDependencyIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored edges.
    pub fn len(&self) -> usize {
        self.edges.read().len()
    }

    /// Whether no edge is stored.
    pub fn is_empty(&self) -> bool {
        self.edges.read().is_empty()
    }

    /// A copy of every stored edge, in insertion order.
    pub fn snapshot(&self) -> Vec<DependencyEdge> {
        self.edges.read().clone()
    }

    fn delete_where(&self, predicate: impl Fn(&DependencyEdge) -> bool) -> usize {
        let mut edges = self.edges.write();
        let before = edges.len();
        edges.retain(|edge| !predicate(edge));
        before - edges.len()
    }
}

impl DependencyIndex for InMemoryDependencyIndex {
    fn dependents_of(
        &self,
        kind: ResourceKind,
        resource_id: &str,
        attribute_id: Option<&str>,
    ) -> Result<Vec<DependencyEdge>> {
        Ok(self
            .edges
            .read()
            .iter()
            .filter(|edge| edge.reads(kind, resource_id, attribute_id))
            .cloned()
            .collect())
    }

    fn inputs_of(&self, node: &ComputationNode) -> Result<Vec<DependencyEdge>> {
        Ok(self
            .edges
            .read()
            .iter()
            .filter(|edge| edge.target_node() == *node)
            .cloned()
            .collect())
    }

    fn replace_edges_for_target(
        &self,
        target: &ComputationNode,
        edges: Vec<DependencyEdge>,
    ) -> Result<()> {
        let mut stored = self.edges.write();
        stored.retain(|edge| edge.target_node() != *target);

        for edge in edges {
            debug_assert_eq!(edge.target_node(), *target);
            if !stored.contains(&edge) {
                stored.push(edge);
            }
        }

        Ok(())
    }

    fn delete_edges_for_targets(
        &self,
        kind: ResourceKind,
        resource_ids: &[String],
        attribute_id: Option<&str>,
    ) -> Result<usize> {
        Ok(self.delete_where(|edge| {
            edge.target_kind == kind
                && resource_ids.contains(&edge.target_id)
                && attribute_id.map_or(true, |id| id == edge.target_attribute_id)
        }))
    }

    fn delete_edges_touching(
        &self,
        kind: ResourceKind,
        resource_id: &str,
        attribute_id: Option<&str>,
    ) -> Result<usize> {
        Ok(self.delete_where(|edge| edge.touches(kind, resource_id, attribute_id)))
    }
}
