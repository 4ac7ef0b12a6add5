//! Error types shared by every component of the engine.

use thiserror::Error;

use crate::graph::ComputationNode;
use crate::model::ResourceKind;

/// Errors raised while building or running task chains.
#[derive(Error, Debug)]
pub enum Error {
    /// A function's declared input is not a valid attribute reference.
    #[error("attribute '{attribute_id}' declares malformed reference '{reference}': {reason}")]
    MalformedFormulaReference {
        attribute_id: String,
        reference: String,
        reason: &'static str,
    },

    /// The owner or attribute of a node disappeared before its task was built.
    #[error("{kind} '{resource_id}' no longer defines attribute '{attribute_id}'")]
    UnresolvedReference {
        kind: ResourceKind,
        resource_id: String,
        attribute_id: String,
    },

    /// The orderer could not place a node after all of its inputs.
    #[error("{node} is part of a dependency cycle")]
    CyclicDependency { node: ComputationNode },

    /// A backing store did not answer.
    #[error("store unavailable: {0}")]
    IndexUnavailable(String),

    /// A task runner reported failure; the rest of the chain was abandoned.
    #[error("task '{task}' failed: {reason}")]
    TaskFailed { task: String, reason: String },

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
