//! Definition and Record Stores
//!
//! Persistence belongs to the host application. The engine only needs the
//! narrow read interface below, and every lookup is batched by id set so a
//! chain build never fetches one definition at a time.
//!
//! Implementations report outages as [`Error::IndexUnavailable`]; the engine
//! propagates them unchanged.
//!
//! [`Error::IndexUnavailable`]: crate::Error::IndexUnavailable

mod memory;

use crate::error::Result;
use crate::model::{Collection, LinkInstance, LinkType, Record};

pub use memory::InMemoryStore;

/// Read access to collection and link type definitions.
pub trait DefinitionStore: Send + Sync {
    fn collection(&self, id: &str) -> Result<Option<Collection>>;

    fn link_type(&self, id: &str) -> Result<Option<LinkType>>;

    /// Fetch collections by id. Missing ids are silently absent.
    fn collections_by_ids(&self, ids: &[String]) -> Result<Vec<Collection>>;

    /// Fetch link types by id. Missing ids are silently absent.
    fn link_types_by_ids(&self, ids: &[String]) -> Result<Vec<LinkType>>;
}

/// Read access to records and link instances.
pub trait RecordStore: Send + Sync {
    fn records_by_ids(&self, ids: &[String]) -> Result<Vec<Record>>;

    fn records_by_collection(&self, collection_id: &str) -> Result<Vec<Record>>;

    fn link_instances_by_ids(&self, ids: &[String]) -> Result<Vec<LinkInstance>>;

    fn link_instances_by_type(&self, link_type_id: &str) -> Result<Vec<LinkInstance>>;

    /// Instances of `link_type_id` that touch any of `record_ids`.
    fn link_instances_by_record_ids(
        &self,
        record_ids: &[String],
        link_type_id: &str,
    ) -> Result<Vec<LinkInstance>>;
}
