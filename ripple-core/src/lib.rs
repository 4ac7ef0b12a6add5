//! Ripple Core
//!
//! This crate decides what must be recomputed when data changes in a
//! system of collections, relationships and computed attributes.
//! It implements:
//!
//! - A dependency index of "function B reads attribute A" edges
//! - Change propagation across records and relationships
//! - Deterministic evaluation ordering with explicit cycle handling
//! - Task chain assembly, with automation rules spliced in after functions
//!
//! Formula evaluation itself is left to the host application, which plugs in
//! a [`TaskRunner`](task::TaskRunner).
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `model`: collections, link types, records and link instances
//! - `index`: dependency edges, formula reference parsing, edge storage
//! - `store`: read access to definitions and data
//! - `graph`: per-change dependency graph construction and ordering
//! - `task`: task chains, assembly and execution
//! - `engine`: event entry points tying the above together
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ripple_core::{Engine, index::InMemoryDependencyIndex, store::InMemoryStore};
//! use ripple_core::task::{InlineExecutor, Task};
//!
//! let store = Arc::new(InMemoryStore::new());
//! let executor = InlineExecutor::new(|task: &Task| -> ripple_core::Result<()> {
//!     println!("running {task}");
//!     Ok(())
//! });
//! let engine = Engine::new(
//!     Arc::new(InMemoryDependencyIndex::new()),
//!     store.clone(),
//!     store.clone(),
//!     Arc::new(executor),
//! );
//!
//! // Index the function and compute its initial values
//! engine.on_computed_attribute_defined(&invoices, &total)?;
//!
//! // Recompute whatever reads `qty`
//! engine.on_record_updated(&before, &after)?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod index;
pub mod model;
pub mod store;
pub mod task;

pub use config::{CyclePolicy, EngineConfig};
pub use engine::Engine;
pub use error::{Error, Result};
