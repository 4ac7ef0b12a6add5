//! Graph Builder
//!
//! Expands a change into the set of computed attributes it affects.
//!
//! # Algorithm
//!
//! The builder keeps an explicit frontier of *expansions*: "attribute X of
//! resource R changed on these concrete records / link instances".
//!
//! 1. Seeds push expansions (a changed attribute) or insert nodes directly
//!    (a computed attribute that must run, such as on record creation).
//! 2. For each expansion, ask the index which functions read the changed
//!    attribute. Each edge names a dependent node.
//! 3. Resolve the dependent's affected instances through the
//!    [resolver table](super::resolver). An empty resolution drops the node.
//! 4. A node already in the mapping absorbs the new instances and is not
//!    expanded again. This is also what stops cycles.
//! 5. A new node records its own inputs (`requires`) from the index and is
//!    pushed as an expansion of its own attribute.
//! 6. Repeat until the frontier is empty.
//!
//! The mapping is owned by the builder and handed out by value from
//! [`GraphBuilder::build`]; nothing else can observe it half-built.

use std::collections::VecDeque;

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::debug;

use crate::error::Result;
use crate::index::DependencyIndex;
use crate::model::ResourceKind;
use crate::store::RecordStore;

use super::node::{ComputationNode, Instances, Payload};
use super::resolver::resolver;

/// The inputs of one node. Most functions read a handful of attributes.
pub type Requires = SmallVec<[ComputationNode; 4]>;

/// A node's entry in the mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingEntry {
    /// Nodes this node reads, as declared in the index. Not all of them need
    /// to be in the mapping.
    pub requires: Requires,

    /// What the node will be evaluated over.
    pub payload: Payload,
}

/// Every affected node with its inputs and payload, in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyMapping {
    entries: IndexMap<ComputationNode, MappingEntry>,
}

impl DependencyMapping {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of discovered nodes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no node was discovered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `node` was discovered.
    pub fn contains(&self, node: &ComputationNode) -> bool {
        self.entries.contains_key(node)
    }

    /// Inputs and payload of `node`.
    pub fn get(&self, node: &ComputationNode) -> Option<&MappingEntry> {
        self.entries.get(node)
    }

    /// Discovery position of `node`.
    pub fn position(&self, node: &ComputationNode) -> Option<usize> {
        self.entries.get_index_of(node)
    }

    /// Nodes in discovery order.
    pub fn nodes(&self) -> impl Iterator<Item = &ComputationNode> {
        self.entries.keys()
    }

    /// Entries in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (&ComputationNode, &MappingEntry)> {
        self.entries.iter()
    }

    /// Insert or merge. Returns `true` when the node was new.
    ///
    /// Merging unions the instance sets and fills in definitions the existing
    /// entry lacked; the existing `requires` list is kept.
    pub fn merge(&mut self, node: ComputationNode, requires: Requires, payload: Payload) -> bool {
        match self.entries.get_mut(&node) {
            Some(entry) => {
                entry.payload.instances.union(payload.instances);
                if entry.payload.owner.is_none() {
                    entry.payload.owner = payload.owner;
                }
                if entry.payload.attribute.is_none() {
                    entry.payload.attribute = payload.attribute;
                }
                false
            }
            None => {
                self.entries.insert(node, MappingEntry { requires, payload });
                true
            }
        }
    }
}

impl IntoIterator for DependencyMapping {
    type Item = (ComputationNode, MappingEntry);
    type IntoIter = indexmap::map::IntoIter<ComputationNode, MappingEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// "`attribute_id` of `resource_id` changed on `instances`". `None` stands
/// for a change to the resource as a whole (deletion, or a relationship
/// appearing or disappearing).
#[derive(Debug)]
struct Expansion {
    kind: ResourceKind,
    resource_id: String,
    attribute_id: Option<String>,
    instances: Instances,
}

/// Builds a [`DependencyMapping`] from seeds by breadth-first expansion.
pub struct GraphBuilder<'a> {
    index: &'a dyn DependencyIndex,
    records: &'a dyn RecordStore,
    mapping: DependencyMapping,
    frontier: VecDeque<Expansion>,
}

impl<'a> GraphBuilder<'a> {
    /// Create a builder with an empty frontier.
    pub fn new(index: &'a dyn DependencyIndex, records: &'a dyn RecordStore) -> Self {
        Self {
            index,
            records,
            mapping: DependencyMapping::new(),
            frontier: VecDeque::new(),
        }
    }

    /// Seed a computed attribute that must be evaluated itself.
    pub fn seed_node(&mut self, node: ComputationNode, payload: Payload) -> Result<()> {
        self.discover(node, payload)
    }

    /// Seed a changed attribute; only its dependents are evaluated.
    pub fn seed_change(
        &mut self,
        kind: ResourceKind,
        resource_id: &str,
        attribute_id: Option<&str>,
        instances: Instances,
    ) {
        if instances.is_empty() {
            return;
        }
        self.frontier.push_back(Expansion {
            kind,
            resource_id: resource_id.to_string(),
            attribute_id: attribute_id.map(str::to_string),
            instances,
        });
    }

    /// Drain the frontier and return the finished mapping.
    pub fn build(mut self) -> Result<DependencyMapping> {
        while let Some(expansion) = self.frontier.pop_front() {
            self.expand(&expansion)?;
        }

        debug!(nodes = self.mapping.len(), "dependency mapping built");
        Ok(self.mapping)
    }

    fn expand(&mut self, expansion: &Expansion) -> Result<()> {
        let edges = self.index.dependents_of(
            expansion.kind,
            &expansion.resource_id,
            expansion.attribute_id.as_deref(),
        )?;

        for edge in edges {
            let node = edge.target_node();
            let resolve = resolver(expansion.kind, node.kind);
            let instances = resolve(self.records, &edge, &expansion.instances)?;
            self.discover(node, Payload::new(instances))?;
        }

        Ok(())
    }

    fn discover(&mut self, node: ComputationNode, payload: Payload) -> Result<()> {
        if payload.instances.is_empty() {
            debug!(%node, "nothing to evaluate, dropping node");
            return Ok(());
        }

        if self.mapping.contains(&node) {
            self.mapping.merge(node, Requires::new(), payload);
            return Ok(());
        }

        let mut requires = Requires::new();
        for edge in self.index.inputs_of(&node)? {
            let input = edge.source_node();
            if !requires.contains(&input) {
                requires.push(input);
            }
        }

        debug!(%node, instances = payload.instances.len(), inputs = requires.len(), "discovered node");

        self.frontier.push_back(Expansion {
            kind: node.kind,
            resource_id: node.resource_id.clone(),
            attribute_id: Some(node.attribute_id.clone()),
            instances: payload.instances.clone(),
        });
        self.mapping.merge(node, requires, payload);

        Ok(())
    }
}
