//! Task Chain Assembly
//!
//! Turns an evaluation order into a [`TaskChain`] of function tasks.
//!
//! Every task needs its owner definition. Seeds usually carry it already;
//! the rest are fetched in one batch per resource kind before the chain is
//! built. A node whose owner or attribute has disappeared in the meantime
//! (a concurrent deletion) is skipped, and the chain is built from what is
//! left.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::graph::{ComputationNode, DependencyMapping, EvaluationOrder, MappingEntry};
use crate::model::{Owner, ResourceKind};
use crate::store::DefinitionStore;

use super::{FunctionTask, Task, TaskChain};

/// Builds function chains from scheduled mappings.
pub struct TaskAssembler<'a> {
    definitions: &'a dyn DefinitionStore,
}

impl<'a> TaskAssembler<'a> {
    /// Create an assembler reading owners from `definitions`.
    pub fn new(definitions: &'a dyn DefinitionStore) -> Self {
        Self { definitions }
    }

    /// Build one function task per scheduled node, in evaluation order.
    pub fn assemble(&self, mapping: DependencyMapping, order: &EvaluationOrder) -> Result<TaskChain> {
        let owners = self.fetch_missing_owners(&mapping)?;
        let mut entries: HashMap<ComputationNode, MappingEntry> = mapping.into_iter().collect();
        let mut tasks = Vec::with_capacity(order.queue.len());

        for node in &order.queue {
            let Some(entry) = entries.remove(node) else {
                continue;
            };

            match resolve(node, entry, &owners) {
                Ok(task) => tasks.push(Task::Function(task)),
                Err(error) => warn!(%error, "skipping node"),
            }
        }

        debug!(tasks = tasks.len(), "function chain assembled");
        Ok(TaskChain::new(tasks))
    }

    fn fetch_missing_owners(&self, mapping: &DependencyMapping) -> Result<HashMap<(ResourceKind, String), Owner>> {
        let mut collection_ids = BTreeSet::new();
        let mut link_type_ids = BTreeSet::new();

        for (node, entry) in mapping.iter() {
            if entry.payload.owner.is_some() {
                continue;
            }
            match node.kind {
                ResourceKind::Collection => collection_ids.insert(node.resource_id.clone()),
                ResourceKind::Link => link_type_ids.insert(node.resource_id.clone()),
            };
        }

        let mut owners = HashMap::new();

        if !collection_ids.is_empty() {
            let ids: Vec<String> = collection_ids.into_iter().collect();
            for collection in self.definitions.collections_by_ids(&ids)? {
                owners.insert((ResourceKind::Collection, collection.id.clone()), collection.into());
            }
        }

        if !link_type_ids.is_empty() {
            let ids: Vec<String> = link_type_ids.into_iter().collect();
            for link_type in self.definitions.link_types_by_ids(&ids)? {
                owners.insert((ResourceKind::Link, link_type.id.clone()), link_type.into());
            }
        }

        Ok(owners)
    }
}

fn resolve(
    node: &ComputationNode,
    entry: MappingEntry,
    owners: &HashMap<(ResourceKind, String), Owner>,
) -> Result<FunctionTask> {
    let unresolved = || Error::UnresolvedReference {
        kind: node.kind,
        resource_id: node.resource_id.clone(),
        attribute_id: node.attribute_id.clone(),
    };

    let payload = entry.payload;
    let owner = match payload.owner {
        Some(owner) => owner,
        None => owners
            .get(&(node.kind, node.resource_id.clone()))
            .cloned()
            .ok_or_else(unresolved)?,
    };

    let attribute = match payload.attribute {
        Some(attribute) => attribute,
        None => owner
            .attribute(&node.attribute_id)
            .filter(|attribute| attribute.is_computed())
            .cloned()
            .ok_or_else(unresolved)?,
    };

    Ok(FunctionTask {
        node: node.clone(),
        owner,
        attribute,
        instances: payload.instances,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Instances, Payload, Requires};
    use crate::model::{Attribute, Collection, LinkInstance, LinkType, Record};
    use crate::store::InMemoryStore;

    fn store() -> InMemoryStore {
        let store = InMemoryStore::new();
        let mut inv = Collection::new("inv", "Invoices");
        inv.attributes.push(Attribute::new("total", "Total").with_function("price * qty", &[]));
        inv.attributes.push(Attribute::new("qty", "Qty"));
        store.put_collection(inv);

        let mut link = LinkType::new("order_invoice", "Order invoices", ["orders", "inv"]);
        link.attributes.push(Attribute::new("share", "Share").with_function("1", &[]));
        store.put_link_type(link);
        store
    }

    fn scheduled(nodes: &[ComputationNode]) -> (DependencyMapping, EvaluationOrder) {
        let mut mapping = DependencyMapping::new();
        for node in nodes {
            let instances = match node.kind {
                ResourceKind::Collection => Instances::records([Record::new("r1", node.resource_id.as_str())]),
                ResourceKind::Link => Instances::links([LinkInstance::new("li1", node.resource_id.as_str(), ["o1", "r1"])]),
            };
            mapping.merge(node.clone(), Requires::new(), Payload::new(instances));
        }
        let order = EvaluationOrder {
            queue: nodes.to_vec(),
            cycles: Vec::new(),
        };
        (mapping, order)
    }

    #[test]
    fn owners_are_fetched_for_every_kind() {
        let store = store();
        let nodes = [
            ComputationNode::collection("inv", "total"),
            ComputationNode::link("order_invoice", "share"),
        ];
        let (mapping, order) = scheduled(&nodes);

        let chain = TaskAssembler::new(&store).assemble(mapping, &order).unwrap();
        assert_eq!(chain.len(), 2);

        let Task::Function(link_task) = &chain.tasks()[1] else {
            panic!("expected a function task");
        };
        assert_eq!(link_task.owner.kind(), ResourceKind::Link);
        assert_eq!(link_task.attribute.id, "share");
        assert_eq!(link_task.instances.ids(), ["li1"]);
    }

    #[test]
    fn unresolved_nodes_are_skipped() {
        let store = store();
        let nodes = [
            ComputationNode::collection("gone", "total"),
            ComputationNode::collection("inv", "missing"),
            ComputationNode::collection("inv", "qty"),
            ComputationNode::collection("inv", "total"),
        ];
        let (mapping, order) = scheduled(&nodes);

        let chain = TaskAssembler::new(&store).assemble(mapping, &order).unwrap();
        let names: Vec<String> = chain.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["function collection:inv.total"]);
    }

    #[test]
    fn chain_follows_evaluation_order() {
        let store = store();
        let nodes = [
            ComputationNode::collection("inv", "total"),
            ComputationNode::link("order_invoice", "share"),
        ];
        let (mapping, mut order) = scheduled(&nodes);
        order.queue.reverse();

        let chain = TaskAssembler::new(&store).assemble(mapping, &order).unwrap();
        let names: Vec<String> = chain.iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            ["function link:order_invoice.share", "function collection:inv.total"]
        );
    }

    #[test]
    fn known_definitions_skip_the_store() {
        let store = InMemoryStore::new();
        let owner: Owner = Collection::new("adhoc", "Adhoc").into();
        let attribute = Attribute::new("calc", "Calc").with_function("1", &[]);
        let node = ComputationNode::collection("adhoc", "calc");

        let mut mapping = DependencyMapping::new();
        mapping.merge(
            node.clone(),
            Requires::new(),
            Payload::new(Instances::records([Record::new("r1", "adhoc")])).with_definition(owner, attribute),
        );
        let order = EvaluationOrder {
            queue: vec![node],
            cycles: Vec::new(),
        };

        let chain = TaskAssembler::new(&store).assemble(mapping, &order).unwrap();
        assert_eq!(chain.len(), 1);
    }
}
