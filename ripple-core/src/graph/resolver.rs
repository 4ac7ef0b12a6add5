//! Instance Resolution
//!
//! When a change reaches a dependent node, the builder must work out *which*
//! records or link instances of that node are affected. The answer depends on
//! the kind of the changed resource and the kind of the dependent node, so
//! resolution is a 2×2 table of plain functions selected by [`resolver`].
//!
//! | changed \ dependent | collection                          | link type                          |
//! |---------------------|-------------------------------------|------------------------------------|
//! | collection          | same records, or the far end of the edge's link type | target instances touching the records |
//! | link type           | endpoint records in the target collection | same instances, if the edge stays on the link type |

use std::collections::BTreeSet;

use crate::error::Result;
use crate::index::DependencyEdge;
use crate::model::{LinkInstance, Record, ResourceKind};
use crate::store::RecordStore;

use super::node::Instances;

/// Resolves the affected instances of `edge`'s target from the changed
/// instances of its source.
pub type ResolveFn = fn(&dyn RecordStore, &DependencyEdge, &Instances) -> Result<Instances>;

/// Select the resolution function for a change of `changed` kind reaching a
/// node of `dependent` kind.
pub fn resolver(changed: ResourceKind, dependent: ResourceKind) -> ResolveFn {
    match (changed, dependent) {
        (ResourceKind::Collection, ResourceKind::Collection) => records_from_records,
        (ResourceKind::Collection, ResourceKind::Link) => links_from_records,
        (ResourceKind::Link, ResourceKind::Collection) => records_from_links,
        (ResourceKind::Link, ResourceKind::Link) => links_from_links,
    }
}

fn in_collection(records: Vec<Record>, collection_id: &str) -> Instances {
    Instances::records(records.into_iter().filter(|r| r.collection_id == collection_id))
}

fn of_link_type(links: Vec<LinkInstance>, link_type_id: &str) -> Instances {
    Instances::links(links.into_iter().filter(|l| l.link_type_id == link_type_id))
}

fn records_from_records(
    store: &dyn RecordStore,
    edge: &DependencyEdge,
    changed: &Instances,
) -> Result<Instances> {
    let record_ids = changed.ids();
    if record_ids.is_empty() {
        return Ok(Instances::empty(ResourceKind::Collection));
    }

    match &edge.via_link_type_id {
        // Same-record read: refetch, so deleted records fall out.
        None if edge.target_id == edge.source_id => {
            Ok(in_collection(store.records_by_ids(&record_ids)?, &edge.target_id))
        }
        Some(link_type_id) => {
            let changed_ids: BTreeSet<&str> = record_ids.iter().map(String::as_str).collect();
            let far_ends: BTreeSet<String> = store
                .link_instances_by_record_ids(&record_ids, link_type_id)?
                .iter()
                .flat_map(|link| link.record_ids.iter())
                .filter(|id| !changed_ids.contains(id.as_str()))
                .cloned()
                .collect();

            if far_ends.is_empty() {
                return Ok(Instances::empty(ResourceKind::Collection));
            }

            let far_ends: Vec<String> = far_ends.into_iter().collect();
            Ok(in_collection(store.records_by_ids(&far_ends)?, &edge.target_id))
        }
        None => Ok(Instances::empty(ResourceKind::Collection)),
    }
}

fn links_from_records(
    store: &dyn RecordStore,
    edge: &DependencyEdge,
    changed: &Instances,
) -> Result<Instances> {
    let record_ids = changed.ids();
    if record_ids.is_empty() {
        return Ok(Instances::empty(ResourceKind::Link));
    }

    Ok(Instances::links(
        store.link_instances_by_record_ids(&record_ids, &edge.target_id)?,
    ))
}

fn records_from_links(
    store: &dyn RecordStore,
    edge: &DependencyEdge,
    changed: &Instances,
) -> Result<Instances> {
    let Instances::Links(links) = changed else {
        return Ok(Instances::empty(ResourceKind::Collection));
    };

    let endpoints: Vec<String> = links
        .values()
        .flat_map(|link| link.record_ids.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    if endpoints.is_empty() {
        return Ok(Instances::empty(ResourceKind::Collection));
    }

    Ok(in_collection(store.records_by_ids(&endpoints)?, &edge.target_id))
}

fn links_from_links(
    store: &dyn RecordStore,
    edge: &DependencyEdge,
    changed: &Instances,
) -> Result<Instances> {
    let stays_on_target = edge
        .via_link_type_id
        .as_deref()
        .map_or(true, |via| via == edge.target_id);

    let link_ids = changed.ids();
    if !stays_on_target || link_ids.is_empty() {
        return Ok(Instances::empty(ResourceKind::Link));
    }

    // Refetch, so deleted instances fall out.
    Ok(of_link_type(store.link_instances_by_ids(&link_ids)?, &edge.target_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.put_record(Record::new("r1", "inv"));
        store.put_record(Record::new("r2", "inv"));
        store.put_record(Record::new("o1", "orders"));
        store.put_link_instance(LinkInstance::new("li1", "order_invoice", ["o1", "r1"]));
        store.put_link_instance(LinkInstance::new("li2", "order_invoice", ["o1", "r2"]));
        store
    }

    fn edge(source: (ResourceKind, &str), target: (ResourceKind, &str), via: Option<&str>) -> DependencyEdge {
        DependencyEdge {
            source_kind: source.0,
            source_id: source.1.into(),
            source_attribute_id: "a".into(),
            target_kind: target.0,
            target_id: target.1.into(),
            target_attribute_id: "b".into(),
            via_link_type_id: via.map(Into::into),
        }
    }

    #[test]
    fn same_collection_refetches_records() {
        let store = store();
        let e = edge((ResourceKind::Collection, "inv"), (ResourceKind::Collection, "inv"), None);
        let changed = Instances::records([Record::new("r1", "inv"), Record::new("gone", "inv")]);

        let resolved = resolver(ResourceKind::Collection, ResourceKind::Collection)(&store, &e, &changed).unwrap();
        assert_eq!(resolved.ids(), ["r1"]);
    }

    #[test]
    fn linked_collection_follows_the_link_type() {
        let store = store();
        let e = edge(
            (ResourceKind::Collection, "inv"),
            (ResourceKind::Collection, "orders"),
            Some("order_invoice"),
        );
        let changed = Instances::records([Record::new("r1", "inv")]);

        let resolved = resolver(ResourceKind::Collection, ResourceKind::Collection)(&store, &e, &changed).unwrap();
        assert_eq!(resolved.ids(), ["o1"]);
    }

    #[test]
    fn other_collection_without_link_resolves_nothing() {
        let store = store();
        let e = edge((ResourceKind::Collection, "inv"), (ResourceKind::Collection, "orders"), None);
        let changed = Instances::records([Record::new("r1", "inv")]);

        let resolved = resolver(ResourceKind::Collection, ResourceKind::Collection)(&store, &e, &changed).unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn link_nodes_resolve_from_records() {
        let store = store();
        let e = edge((ResourceKind::Collection, "inv"), (ResourceKind::Link, "order_invoice"), None);
        let changed = Instances::records([Record::new("r2", "inv")]);

        let resolved = resolver(ResourceKind::Collection, ResourceKind::Link)(&store, &e, &changed).unwrap();
        assert_eq!(resolved.ids(), ["li2"]);
        assert_eq!(resolved.kind(), ResourceKind::Link);
    }

    #[test]
    fn collection_nodes_resolve_from_link_endpoints() {
        let store = store();
        let e = edge((ResourceKind::Link, "order_invoice"), (ResourceKind::Collection, "orders"), None);
        // The instance itself may already be deleted; its endpoints still count.
        let changed = Instances::links([LinkInstance::new("li9", "order_invoice", ["o1", "r1"])]);

        let resolved = resolver(ResourceKind::Link, ResourceKind::Collection)(&store, &e, &changed).unwrap();
        assert_eq!(resolved.ids(), ["o1"]);
    }

    #[test]
    fn link_to_link_requires_staying_on_the_type() {
        let store = store();
        let changed = Instances::links([LinkInstance::new("li1", "order_invoice", ["o1", "r1"])]);

        let same = edge((ResourceKind::Link, "order_invoice"), (ResourceKind::Link, "order_invoice"), None);
        let resolved = resolver(ResourceKind::Link, ResourceKind::Link)(&store, &same, &changed).unwrap();
        assert_eq!(resolved.ids(), ["li1"]);

        let elsewhere = edge(
            (ResourceKind::Link, "order_invoice"),
            (ResourceKind::Link, "order_invoice"),
            Some("other_link"),
        );
        let resolved = resolver(ResourceKind::Link, ResourceKind::Link)(&store, &elsewhere, &changed).unwrap();
        assert!(resolved.is_empty());
    }
}
