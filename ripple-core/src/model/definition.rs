//! Collection and link type definitions.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::ResourceKind;

/// A function attached to an attribute.
///
/// The formula text is opaque to this crate. `inputs` lists the attribute
/// references the formula reads, in the form parsed by
/// [`reference`](crate::index::reference).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Function {
    pub formula: String,
    #[serde(default)]
    pub inputs: Vec<String>,
}

/// A named attribute of a collection or link type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub function: Option<Function>,
}

impl Attribute {
    /// Create a plain (non-computed) attribute.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            function: None,
        }
    }

    /// Attach a function to this attribute.
    pub fn with_function(mut self, formula: impl Into<String>, inputs: &[&str]) -> Self {
        self.function = Some(Function {
            formula: formula.into(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    /// Whether the attribute carries a function with a non-empty formula.
    pub fn is_computed(&self) -> bool {
        self.function
            .as_ref()
            .is_some_and(|function| !function.formula.trim().is_empty())
    }
}

/// A lifecycle event that rules can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Create,
    Update,
    Delete,
}

/// When a rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTiming {
    Create,
    Update,
    Delete,
    CreateUpdate,
    CreateDelete,
    UpdateDelete,
    All,
}

impl RuleTiming {
    /// Whether a rule with this timing fires on the given event.
    pub fn fires_on(self, event: Lifecycle) -> bool {
        use RuleTiming::*;

        match event {
            Lifecycle::Create => matches!(self, Create | CreateUpdate | CreateDelete | All),
            Lifecycle::Update => matches!(self, Update | CreateUpdate | UpdateDelete | All),
            Lifecycle::Delete => matches!(self, Delete | CreateDelete | UpdateDelete | All),
        }
    }
}

/// An automation rule. The action payload is interpreted by the task runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub timing: RuleTiming,
    #[serde(default)]
    pub action: serde_json::Value,
}

/// A user-defined record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    /// Rules keyed by name, in definition order.
    #[serde(default)]
    pub rules: IndexMap<String, Rule>,
}

impl Collection {
    /// Create a collection with no attributes or rules.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attributes: Vec::new(),
            rules: IndexMap::new(),
        }
    }
}

/// A relationship type between two collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkType {
    pub id: String,
    pub name: String,
    pub collection_ids: [String; 2],
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub rules: IndexMap<String, Rule>,
}

impl LinkType {
    /// Create a link type between two collections.
    pub fn new(id: impl Into<String>, name: impl Into<String>, collection_ids: [&str; 2]) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            collection_ids: collection_ids.map(str::to_string),
            attributes: Vec::new(),
            rules: IndexMap::new(),
        }
    }
}

/// The definition that owns an attribute: either a collection or a link type.
#[derive(Debug, Clone, PartialEq)]
pub enum Owner {
    Collection(Collection),
    LinkType(LinkType),
}

impl Owner {
    /// Whether this owner is a collection or a link type.
    pub fn kind(&self) -> ResourceKind {
        match self {
            Owner::Collection(_) => ResourceKind::Collection,
            Owner::LinkType(_) => ResourceKind::Link,
        }
    }

    /// Id of the collection or link type.
    pub fn id(&self) -> &str {
        match self {
            Owner::Collection(collection) => &collection.id,
            Owner::LinkType(link_type) => &link_type.id,
        }
    }

    /// Every attribute, in definition order.
    pub fn attributes(&self) -> &[Attribute] {
        match self {
            Owner::Collection(collection) => &collection.attributes,
            Owner::LinkType(link_type) => &link_type.attributes,
        }
    }

    /// Automation rules, keyed by name.
    pub fn rules(&self) -> &IndexMap<String, Rule> {
        match self {
            Owner::Collection(collection) => &collection.rules,
            Owner::LinkType(link_type) => &link_type.rules,
        }
    }

    /// Look up an attribute by id.
    pub fn attribute(&self, attribute_id: &str) -> Option<&Attribute> {
        self.attributes().iter().find(|a| a.id == attribute_id)
    }

    /// Attributes that carry a non-empty formula, in definition order.
    pub fn computed_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes().iter().filter(|a| a.is_computed())
    }
}

impl From<Collection> for Owner {
    fn from(collection: Collection) -> Self {
        Owner::Collection(collection)
    }
}

impl From<LinkType> for Owner {
    fn from(link_type: LinkType) -> Self {
        Owner::LinkType(link_type)
    }
}
