//! Dependency Index
//!
//! The index stores one [`DependencyEdge`] per "function on attribute B reads
//! attribute A" relation. It is written when a function is defined and read
//! on every change to find who must be recomputed.
//!
//! # Query directions
//!
//! - [`DependencyIndex::dependents_of`] walks *forward*: given a changed
//!   attribute, which functions read it.
//! - [`DependencyIndex::inputs_of`] walks *backward*: given a function, which
//!   attributes it reads. The graph builder uses this for a node's
//!   `requires` list.
//!
//! Link-type sources have one extra case. A function that reads across a link
//! type depends on the relationship existing at all, so asking for the
//! dependents of a link type with no attribute also returns every edge that
//! traverses it.

pub mod reference;
mod memory;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::ComputationNode;
use crate::model::ResourceKind;

pub use memory::InMemoryDependencyIndex;

/// "The function on `target_attribute_id` of the target reads
/// `source_attribute_id` of the source, optionally across `via_link_type_id`."
///
/// Edges are immutable. A redefined function replaces its edges wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub source_kind: ResourceKind,
    pub source_id: String,
    pub source_attribute_id: String,
    pub target_kind: ResourceKind,
    pub target_id: String,
    pub target_attribute_id: String,
    #[serde(default)]
    pub via_link_type_id: Option<String>,
}

impl DependencyEdge {
    /// The computed attribute this edge feeds.
    pub fn target_node(&self) -> ComputationNode {
        ComputationNode::new(self.target_kind, &self.target_id, &self.target_attribute_id)
    }

    /// The attribute this edge reads, as a node.
    pub fn source_node(&self) -> ComputationNode {
        ComputationNode::new(self.source_kind, &self.source_id, &self.source_attribute_id)
    }

    /// Whether a change to `(kind, resource_id, attribute_id)` affects the
    /// target of this edge. `None` matches any attribute of the resource.
    pub fn reads(&self, kind: ResourceKind, resource_id: &str, attribute_id: Option<&str>) -> bool {
        let direct = self.source_kind == kind
            && self.source_id == resource_id
            && attribute_id.map_or(true, |id| id == self.source_attribute_id);

        match (kind, attribute_id) {
            (ResourceKind::Link, None) => {
                direct || self.via_link_type_id.as_deref() == Some(resource_id)
            }
            _ => direct,
        }
    }

    /// Whether this edge names the resource (or one of its attributes) as its
    /// source, its target, or the link type it traverses.
    pub fn touches(&self, kind: ResourceKind, resource_id: &str, attribute_id: Option<&str>) -> bool {
        let target = self.target_kind == kind
            && self.target_id == resource_id
            && attribute_id.map_or(true, |id| id == self.target_attribute_id);

        target || self.reads(kind, resource_id, attribute_id)
    }
}

/// Edge storage queried by the graph builder and written by the definition
/// entry points.
///
/// Callers must not interleave two replacements of the same target; the
/// in-memory implementation serializes them behind a lock.
pub trait DependencyIndex: Send + Sync {
    /// Edges whose source is the given attribute (or any attribute of the
    /// resource when `attribute_id` is `None`).
    fn dependents_of(
        &self,
        kind: ResourceKind,
        resource_id: &str,
        attribute_id: Option<&str>,
    ) -> Result<Vec<DependencyEdge>>;

    /// Edges whose target is `node`.
    fn inputs_of(&self, node: &ComputationNode) -> Result<Vec<DependencyEdge>>;

    /// Drop every edge targeting `target` and insert `edges` in its place.
    fn replace_edges_for_target(
        &self,
        target: &ComputationNode,
        edges: Vec<DependencyEdge>,
    ) -> Result<()>;

    /// Drop every edge whose target is one of the resources, optionally
    /// narrowed to one attribute. Returns the number of edges removed.
    fn delete_edges_for_targets(
        &self,
        kind: ResourceKind,
        resource_ids: &[String],
        attribute_id: Option<&str>,
    ) -> Result<usize>;

    /// Drop every edge that [touches](DependencyEdge::touches) the resource or
    /// attribute. Returns the number of edges removed.
    fn delete_edges_touching(
        &self,
        kind: ResourceKind,
        resource_id: &str,
        attribute_id: Option<&str>,
    ) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(source: (ResourceKind, &str, &str), target: (&str, &str), via: Option<&str>) -> DependencyEdge {
        DependencyEdge {
            source_kind: source.0,
            source_id: source.1.to_string(),
            source_attribute_id: source.2.to_string(),
            target_kind: ResourceKind::Collection,
            target_id: target.0.to_string(),
            target_attribute_id: target.1.to_string(),
            via_link_type_id: via.map(str::to_string),
        }
    }

    #[test]
    fn reads_matches_exact_attribute() {
        let e = edge((ResourceKind::Collection, "inv", "qty"), ("inv", "total"), None);

        assert!(e.reads(ResourceKind::Collection, "inv", Some("qty")));
        assert!(e.reads(ResourceKind::Collection, "inv", None));
        assert!(!e.reads(ResourceKind::Collection, "inv", Some("price")));
        assert!(!e.reads(ResourceKind::Link, "inv", None));
    }

    #[test]
    fn link_type_without_attribute_matches_traversals() {
        let e = edge(
            (ResourceKind::Collection, "inv", "total"),
            ("orders", "grand_total"),
            Some("order_invoice"),
        );

        assert!(e.reads(ResourceKind::Link, "order_invoice", None));
        assert!(!e.reads(ResourceKind::Link, "order_invoice", Some("total")));
    }

    #[test]
    fn touches_covers_target_side() {
        let e = edge((ResourceKind::Collection, "inv", "qty"), ("inv", "total"), None);

        assert!(e.touches(ResourceKind::Collection, "inv", Some("total")));
        assert!(e.touches(ResourceKind::Collection, "inv", Some("qty")));
        assert!(!e.touches(ResourceKind::Collection, "inv", Some("price")));
        assert_eq!(e.target_node(), ComputationNode::new(ResourceKind::Collection, "inv", "total"));
        assert_eq!(e.source_node(), ComputationNode::new(ResourceKind::Collection, "inv", "qty"));
    }
}
