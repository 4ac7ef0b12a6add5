//! Formula Reference Parsing
//!
//! A function declares the attributes it reads as short reference strings:
//!
//! ```text
//! collection:<collection>.<attribute>                 same record or another collection
//! collection:<collection>.<attribute>@<link type>     read across a link type
//! link:<link type>.<attribute>                        read a link attribute
//! ```
//!
//! Each reference becomes one [`DependencyEdge`] targeting the function's
//! attribute. A single malformed reference rejects the whole definition.

use crate::error::{Error, Result};
use crate::model::{Attribute, ResourceKind};

use super::DependencyEdge;

/// One parsed input reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeReference {
    pub kind: ResourceKind,
    pub resource_id: String,
    pub attribute_id: String,
    pub via_link_type_id: Option<String>,
}

impl AttributeReference {
    /// Parse one reference string.
    pub fn parse(raw: &str) -> Result<Self, &'static str> {
        let (prefix, rest) = raw.trim().split_once(':').ok_or("missing resource kind")?;

        let kind = match prefix {
            "collection" => ResourceKind::Collection,
            "link" => ResourceKind::Link,
            _ => return Err("unknown resource kind"),
        };

        let (path, via) = match rest.split_once('@') {
            Some(_) if kind == ResourceKind::Link => {
                return Err("link references cannot traverse another link type")
            }
            Some((path, via)) => (path, Some(identifier(via)?)),
            None => (rest, None),
        };

        let (resource_id, attribute_id) = path.split_once('.').ok_or("missing attribute")?;

        Ok(Self {
            kind,
            resource_id: identifier(resource_id)?,
            attribute_id: identifier(attribute_id)?,
            via_link_type_id: via,
        })
    }
}

fn identifier(part: &str) -> Result<String, &'static str> {
    if part.is_empty() {
        return Err("empty identifier");
    }
    if part.contains(['.', '@', ':']) || part.contains(char::is_whitespace) {
        return Err("unexpected separator in identifier");
    }
    Ok(part.to_string())
}

/// Parse every declared input of `attribute`. Duplicates are collapsed.
pub fn parse_inputs(attribute: &Attribute) -> Result<Vec<AttributeReference>> {
    let Some(function) = &attribute.function else {
        return Ok(Vec::new());
    };

    let mut references: Vec<AttributeReference> = Vec::with_capacity(function.inputs.len());
    for raw in &function.inputs {
        let reference = AttributeReference::parse(raw).map_err(|reason| {
            Error::MalformedFormulaReference {
                attribute_id: attribute.id.clone(),
                reference: raw.clone(),
                reason,
            }
        })?;
        if !references.contains(&reference) {
            references.push(reference);
        }
    }

    Ok(references)
}

/// Build the edges for a function defined on `attribute` of the owner.
pub fn edges_for(
    owner_kind: ResourceKind,
    owner_id: &str,
    attribute: &Attribute,
) -> Result<Vec<DependencyEdge>> {
    Ok(parse_inputs(attribute)?
        .into_iter()
        .map(|reference| DependencyEdge {
            source_kind: reference.kind,
            source_id: reference.resource_id,
            source_attribute_id: reference.attribute_id,
            target_kind: owner_kind,
            target_id: owner_id.to_string(),
            target_attribute_id: attribute.id.clone(),
            via_link_type_id: reference.via_link_type_id,
        })
        .collect())
}
