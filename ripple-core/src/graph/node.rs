//! Graph Nodes
//!
//! This module defines the node type that lives in the dependency mapping,
//! and the concrete data attached to it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{Attribute, LinkInstance, Owner, Record, ResourceKind};

/// One computed attribute on one collection or link type.
///
/// Identity is the `(kind, resource_id, attribute_id)` triple: two nodes with
/// equal triples are the same node, whatever payload they carry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComputationNode {
    /// Whether the owning resource is a collection or a link type.
    pub kind: ResourceKind,

    /// Id of the owning collection or link type.
    pub resource_id: String,

    /// Id of the computed attribute.
    pub attribute_id: String,
}

impl ComputationNode {
    /// Create a node for an attribute of a collection or link type.
    pub fn new(kind: ResourceKind, resource_id: impl Into<String>, attribute_id: impl Into<String>) -> Self {
        Self {
            kind,
            resource_id: resource_id.into(),
            attribute_id: attribute_id.into(),
        }
    }

    /// Node for a collection attribute.
    pub fn collection(resource_id: impl Into<String>, attribute_id: impl Into<String>) -> Self {
        Self::new(ResourceKind::Collection, resource_id, attribute_id)
    }

    /// Node for a link type attribute.
    pub fn link(resource_id: impl Into<String>, attribute_id: impl Into<String>) -> Self {
        Self::new(ResourceKind::Link, resource_id, attribute_id)
    }
}

impl fmt::Display for ComputationNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.kind, self.resource_id, self.attribute_id)
    }
}

/// The concrete entities a node must be evaluated over.
///
/// Collection nodes hold records, link nodes hold link instances. Both are
/// keyed by id, so a set can only grow by union and iterates in id order.
#[derive(Debug, Clone, PartialEq)]
pub enum Instances {
    Records(BTreeMap<String, Record>),
    Links(BTreeMap<String, LinkInstance>),
}

impl Instances {
    /// A set of records.
    pub fn records(records: impl IntoIterator<Item = Record>) -> Self {
        Instances::Records(records.into_iter().map(|r| (r.id.clone(), r)).collect())
    }

    /// A set of link instances.
    pub fn links(links: impl IntoIterator<Item = LinkInstance>) -> Self {
        Instances::Links(links.into_iter().map(|l| (l.id.clone(), l)).collect())
    }

    /// An empty set of the flavour a node of `kind` holds.
    pub fn empty(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Collection => Instances::Records(BTreeMap::new()),
            ResourceKind::Link => Instances::Links(BTreeMap::new()),
        }
    }

    /// The resource kind this set belongs to.
    pub fn kind(&self) -> ResourceKind {
        match self {
            Instances::Records(_) => ResourceKind::Collection,
            Instances::Links(_) => ResourceKind::Link,
        }
    }

    /// Number of held entities.
    pub fn len(&self) -> usize {
        match self {
            Instances::Records(records) => records.len(),
            Instances::Links(links) => links.len(),
        }
    }

    /// Whether the set holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of the held entities, in id order.
    pub fn ids(&self) -> Vec<String> {
        match self {
            Instances::Records(records) => records.keys().cloned().collect(),
            Instances::Links(links) => links.keys().cloned().collect(),
        }
    }

    /// Merge `other` into this set. Entities already present are kept.
    ///
    /// Sets of different flavours never meet: a node's kind fixes its flavour.
    pub fn union(&mut self, other: Instances) {
        match (self, other) {
            (Instances::Records(mine), Instances::Records(theirs)) => {
                for (id, record) in theirs {
                    mine.entry(id).or_insert(record);
                }
            }
            (Instances::Links(mine), Instances::Links(theirs)) => {
                for (id, link) in theirs {
                    mine.entry(id).or_insert(link);
                }
            }
            (mine, theirs) => {
                debug_assert!(false, "union of {:?} into {:?} set", theirs.kind(), mine.kind());
            }
        }
    }
}

/// Data attached to a node while the graph is being built.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    /// Entities to evaluate the function over.
    pub instances: Instances,

    /// The owning definition, when the seed already had it in hand.
    /// Otherwise the assembler fetches it in bulk.
    pub owner: Option<Owner>,

    /// The attribute definition, under the same rule as `owner`.
    pub attribute: Option<Attribute>,
}

impl Payload {
    /// Create a payload without definitions.
    pub fn new(instances: Instances) -> Self {
        Self {
            instances,
            owner: None,
            attribute: None,
        }
    }

    /// Attach the definitions known at seeding time.
    pub fn with_definition(mut self, owner: Owner, attribute: Attribute) -> Self {
        self.owner = Some(owner);
        self.attribute = Some(attribute);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_identity_is_the_triple() {
        let a = ComputationNode::collection("inv", "total");
        let b = ComputationNode::new(ResourceKind::Collection, "inv".to_string(), "total");
        let c = ComputationNode::link("inv", "total");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "collection:inv.total");
    }

    #[test]
    fn union_keeps_existing_and_adds_new() {
        let mut set = Instances::records([Record::new("r1", "inv"), Record::new("r2", "inv")]);
        set.union(Instances::records([Record::new("r2", "inv"), Record::new("r3", "inv")]));

        assert_eq!(set.len(), 3);
        assert_eq!(set.ids(), ["r1", "r2", "r3"]);
        assert_eq!(set.kind(), ResourceKind::Collection);
    }

    #[test]
    fn empty_sets_follow_kind() {
        assert!(Instances::empty(ResourceKind::Link).is_empty());
        assert_eq!(Instances::empty(ResourceKind::Link).kind(), ResourceKind::Link);
    }
}
