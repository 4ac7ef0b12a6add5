//! Dependency Graph
//!
//! This module turns a single change into the ordered list of computed
//! attributes that must be re-evaluated.
//!
//! # Overview
//!
//! The graph is never stored. It is rebuilt per change from the
//! [dependency index](crate::index):
//!
//! - Nodes are computed attributes ([`ComputationNode`]), each carrying the
//!   concrete records or link instances it must be evaluated over.
//! - Edges come from the index: if the function on B reads A, B requires A.
//!
//! Construction happens in two passes:
//!
//! 1. [`GraphBuilder`] walks forward from the change and collects every
//!    affected node into a [`DependencyMapping`].
//! 2. [`EvaluationScheduler`] orders that mapping so inputs are evaluated
//!    before the functions that read them.
//!
//! # Design Decisions
//!
//! 1. Nodes are identified by value, not by handle. The same computed
//!    attribute reached twice is one node whose instance set grows.
//!
//! 2. The mapping preserves discovery order. That order is the tie-break
//!    for otherwise independent nodes, so two builds over the same data
//!    produce the same chain.
//!
//! 3. Cycles are tolerated during discovery (a node is expanded once) and
//!    handled explicitly during ordering.

pub mod builder;
mod node;
pub mod resolver;
mod scheduler;

pub use builder::{DependencyMapping, GraphBuilder, MappingEntry, Requires};
pub use node::{ComputationNode, Instances, Payload};
pub use scheduler::{EvaluationOrder, EvaluationScheduler};
