//! Data Model
//!
//! The engine works over two kinds of resources:
//!
//! - **Collections**: user-defined record types. Their rows are [`Record`]s.
//! - **Link types**: user-defined relationships between exactly two
//!   collections. Their rows are [`LinkInstance`]s.
//!
//! Both kinds carry attributes, and any attribute may be *computed*: its value
//! is produced by a function over other attributes, possibly read across
//! relationships. Both kinds may also carry automation rules bound to
//! lifecycle events.
//!
//! Persistence of these types is out of scope; they are loaded through the
//! traits in [`crate::store`].

mod definition;
mod record;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use definition::{Attribute, Collection, Function, Lifecycle, LinkType, Owner, Rule, RuleTiming};
pub use record::{changed_attributes, LinkInstance, Record, Subject};

/// The two resource kinds that can own attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A record collection.
    Collection,
    /// A link type between two collections.
    Link,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Collection => f.write_str("collection"),
            ResourceKind::Link => f.write_str("link"),
        }
    }
}
