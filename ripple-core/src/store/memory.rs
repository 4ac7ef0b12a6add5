//! In-memory definition and record store.
//!
//! Backed by `DashMap`s so it can be shared between request threads without
//! an outer lock. Query results are sorted by id so that repeated builds over
//! the same data are identical.

use dashmap::DashMap;

use crate::error::Result;
use crate::model::{Collection, LinkInstance, LinkType, Record};

use super::{DefinitionStore, RecordStore};

/// Implements both [`DefinitionStore`] and [`RecordStore`] over concurrent maps.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: DashMap<String, Collection>,
    link_types: DashMap<String, LinkType>,
    records: DashMap<String, Record>,
    link_instances: DashMap<String, LinkInstance>,
}

fn sorted_records(mut records: Vec<Record>) -> Vec<Record> {
    records.sort_by(|a, b| a.id.cmp(&b.id));
    records
}

fn sorted_links(mut links: Vec<LinkInstance>) -> Vec<LinkInstance> {
    links.sort_by(|a, b| a.id.cmp(&b.id));
    links
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a collection.
    pub fn put_collection(&self, collection: Collection) {
        self.collections.insert(collection.id.clone(), collection);
    }

    /// Insert or replace a link type.
    pub fn put_link_type(&self, link_type: LinkType) {
        self.link_types.insert(link_type.id.clone(), link_type);
    }

    /// Insert or replace a record.
    pub fn put_record(&self, record: Record) {
        self.records.insert(record.id.clone(), record);
    }

    /// Insert or replace a link instance.
    pub fn put_link_instance(&self, link: LinkInstance) {
        self.link_instances.insert(link.id.clone(), link);
    }

    /// Remove a collection, returning it if present.
    pub fn remove_collection(&self, id: &str) -> Option<Collection> {
        self.collections.remove(id).map(|(_, collection)| collection)
    }

    /// Remove a link type, returning it if present.
    pub fn remove_link_type(&self, id: &str) -> Option<LinkType> {
        self.link_types.remove(id).map(|(_, link_type)| link_type)
    }

    /// Remove a record, returning it if present.
    pub fn remove_record(&self, id: &str) -> Option<Record> {
        self.records.remove(id).map(|(_, record)| record)
    }

    /// Remove a link instance, returning it if present.
    pub fn remove_link_instance(&self, id: &str) -> Option<LinkInstance> {
        self.link_instances.remove(id).map(|(_, link)| link)
    }
}

impl DefinitionStore for InMemoryStore {
    fn collection(&self, id: &str) -> Result<Option<Collection>> {
        Ok(self.collections.get(id).map(|entry| entry.value().clone()))
    }

    fn link_type(&self, id: &str) -> Result<Option<LinkType>> {
        Ok(self.link_types.get(id).map(|entry| entry.value().clone()))
    }

    fn collections_by_ids(&self, ids: &[String]) -> Result<Vec<Collection>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.collections.get(id).map(|entry| entry.value().clone()))
            .collect())
    }

    fn link_types_by_ids(&self, ids: &[String]) -> Result<Vec<LinkType>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.link_types.get(id).map(|entry| entry.value().clone()))
            .collect())
    }
}

impl RecordStore for InMemoryStore {
    fn records_by_ids(&self, ids: &[String]) -> Result<Vec<Record>> {
        let records: Vec<Record> = ids
            .iter()
            .filter_map(|id| self.records.get(id).map(|entry| entry.value().clone()))
            .collect();
        Ok(sorted_records(records))
    }

    fn records_by_collection(&self, collection_id: &str) -> Result<Vec<Record>> {
        let records: Vec<Record> = self
            .records
            .iter()
            .filter(|entry| entry.collection_id == collection_id)
            .map(|entry| entry.value().clone())
            .collect();
        Ok(sorted_records(records))
    }

    fn link_instances_by_ids(&self, ids: &[String]) -> Result<Vec<LinkInstance>> {
        let links: Vec<LinkInstance> = ids
            .iter()
            .filter_map(|id| self.link_instances.get(id).map(|entry| entry.value().clone()))
            .collect();
        Ok(sorted_links(links))
    }

    fn link_instances_by_type(&self, link_type_id: &str) -> Result<Vec<LinkInstance>> {
        let links: Vec<LinkInstance> = self
            .link_instances
            .iter()
            .filter(|entry| entry.link_type_id == link_type_id)
            .map(|entry| entry.value().clone())
            .collect();
        Ok(sorted_links(links))
    }

    fn link_instances_by_record_ids(
        &self,
        record_ids: &[String],
        link_type_id: &str,
    ) -> Result<Vec<LinkInstance>> {
        let links: Vec<LinkInstance> = self
            .link_instances
            .iter()
            .filter(|entry| {
                entry.link_type_id == link_type_id
                    && record_ids.iter().any(|id| entry.connects(id))
            })
            .map(|entry| entry.value().clone())
            .collect();
        Ok(sorted_links(links))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.put_record(Record::new("r2", "inv"));
        store.put_record(Record::new("r1", "inv"));
        store.put_record(Record::new("o1", "orders"));
        store.put_link_instance(LinkInstance::new("li1", "order_invoice", ["o1", "r1"]));
        store.put_link_instance(LinkInstance::new("li2", "order_invoice", ["o1", "r2"]));
        store.put_link_instance(LinkInstance::new("li3", "other", ["o1", "r1"]));
        store
    }

    #[test]
    fn records_come_back_sorted() {
        let store = store();
        let ids: Vec<_> = store
            .records_by_collection("inv")
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, ["r1", "r2"]);

        let fetched = store
            .records_by_ids(&["r2".into(), "missing".into(), "o1".into()])
            .unwrap();
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].id, "o1");
    }

    #[test]
    fn link_lookup_by_record_respects_type() {
        let store = store();
        let links: Vec<LinkInstance> = store
            .link_instances_by_record_ids(&["r1".into()], "order_invoice")
            .unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].id, "li1");

        assert_eq!(store.link_instances_by_type("order_invoice").unwrap().len(), 2);
    }

    #[test]
    fn removed_entities_disappear() {
        let store = store();
        store.put_collection(Collection::new("inv", "Invoices"));

        assert!(store.remove_record("r1").is_some());
        assert!(store.records_by_ids(&["r1".into()]).unwrap().is_empty());

        assert!(store.collection("inv").unwrap().is_some());
        store.remove_collection("inv");
        assert!(store.collection("inv").unwrap().is_none());
    }
}
