//! Records and link instances.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A row of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub collection_id: String,
    /// Decoded attribute values keyed by attribute id.
    #[serde(default)]
    pub data: IndexMap<String, Value>,
}

impl Record {
    /// Create a record with no data.
    pub fn new(id: impl Into<String>, collection_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            collection_id: collection_id.into(),
            data: IndexMap::new(),
        }
    }

    /// Set an attribute value, builder style.
    pub fn with(mut self, attribute_id: impl Into<String>, value: Value) -> Self {
        self.data.insert(attribute_id.into(), value);
        self
    }
}

/// A row of a link type, connecting two records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkInstance {
    pub id: String,
    pub link_type_id: String,
    pub record_ids: [String; 2],
    #[serde(default)]
    pub data: IndexMap<String, Value>,
}

impl LinkInstance {
    /// Create a link instance between two records.
    pub fn new(id: impl Into<String>, link_type_id: impl Into<String>, record_ids: [&str; 2]) -> Self {
        Self {
            id: id.into(),
            link_type_id: link_type_id.into(),
            record_ids: record_ids.map(str::to_string),
            data: IndexMap::new(),
        }
    }

    /// Set an attribute value, builder style.
    pub fn with(mut self, attribute_id: impl Into<String>, value: Value) -> Self {
        self.data.insert(attribute_id.into(), value);
        self
    }

    /// Whether this instance touches the given record.
    pub fn connects(&self, record_id: &str) -> bool {
        self.record_ids.iter().any(|id| id == record_id)
    }
}

/// The entity a rule task runs against.
#[derive(Debug, Clone, PartialEq)]
pub enum Subject {
    Record(Record),
    Link(LinkInstance),
}

/// Attribute ids whose values differ between two states of the same entity.
///
/// Values are compared structurally. A key present on only one side counts
/// as changed. Ids are returned in first-seen order: old keys, then keys
/// only present in the new state.
pub fn changed_attributes(
    old: &IndexMap<String, Value>,
    new: &IndexMap<String, Value>,
) -> Vec<String> {
    let mut changed: Vec<String> = old
        .iter()
        .filter(|(key, value)| new.get(*key) != Some(*value))
        .map(|(key, _)| key.clone())
        .collect();

    changed.extend(
        new.keys()
            .filter(|key| !old.contains_key(*key))
            .cloned(),
    );

    changed
}
