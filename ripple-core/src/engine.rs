//! Event Entry Points
//!
//! [`Engine`] is what the host application calls when data or definitions
//! change. Each data event goes through the same pipeline:
//!
//! ```text
//! seeds ──► GraphBuilder ──► EvaluationScheduler ──► TaskAssembler ──► rules ──► TaskExecutor
//! ```
//!
//! Definition events write the dependency index. Defining or redefining a
//! function also runs the pipeline once so the new attribute gets its
//! initial values. Removals only clean up the index.
//!
//! Chain construction is synchronous and runs on the caller's thread; only
//! execution is handed off.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, instrument};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::graph::{ComputationNode, EvaluationScheduler, GraphBuilder, Instances, Payload};
use crate::index::reference::edges_for;
use crate::index::DependencyIndex;
use crate::model::{
    changed_attributes, Attribute, Lifecycle, LinkInstance, Owner, Record, ResourceKind, Subject,
};
use crate::store::{DefinitionStore, RecordStore};
use crate::task::{RuleTask, TaskAssembler, TaskExecutor};

/// Builds and submits task chains for data and definition events.
pub struct Engine {
    index: Arc<dyn DependencyIndex>,
    definitions: Arc<dyn DefinitionStore>,
    records: Arc<dyn RecordStore>,
    executor: Arc<dyn TaskExecutor>,
    config: EngineConfig,
}

impl Engine {
    /// Create an engine with the default configuration.
    pub fn new(
        index: Arc<dyn DependencyIndex>,
        definitions: Arc<dyn DefinitionStore>,
        records: Arc<dyn RecordStore>,
        executor: Arc<dyn TaskExecutor>,
    ) -> Self {
        Self {
            index,
            definitions,
            records,
            executor,
            config: EngineConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate every computed attribute of the new record, then everything
    /// that reads them. Fires create rules.
    #[instrument(skip_all, fields(record = %record.id, collection = %record.collection_id))]
    pub fn on_record_created(&self, record: &Record) -> Result<()> {
        let Some(owner) = self.collection_owner(&record.collection_id)? else {
            return Ok(());
        };

        let mut builder = self.builder();
        for attribute in owner.computed_attributes() {
            let node = ComputationNode::collection(owner.id(), &attribute.id);
            let payload = Payload::new(Instances::records([record.clone()]))
                .with_definition(owner.clone(), attribute.clone());
            builder.seed_node(node, payload)?;
        }

        let subject = Subject::Record(record.clone());
        let rules = RuleTask::for_event(&owner, Lifecycle::Create, None, Some(&subject));
        self.finish(builder, rules)
    }

    /// Re-evaluate what reads the attributes that changed. Fires update
    /// rules even when no attribute changed.
    #[instrument(skip_all, fields(record = %new.id, collection = %new.collection_id))]
    pub fn on_record_updated(&self, old: &Record, new: &Record) -> Result<()> {
        let Some(owner) = self.collection_owner(&new.collection_id)? else {
            return Ok(());
        };

        let changed = changed_attributes(&old.data, &new.data);
        debug!(?changed, "record attributes changed");

        let mut builder = self.builder();
        for attribute_id in &changed {
            builder.seed_change(
                ResourceKind::Collection,
                owner.id(),
                Some(attribute_id.as_str()),
                Instances::records([new.clone()]),
            );
        }

        let old = Subject::Record(old.clone());
        let new = Subject::Record(new.clone());
        let rules = RuleTask::for_event(&owner, Lifecycle::Update, Some(&old), Some(&new));
        self.finish(builder, rules)
    }

    /// Re-evaluate what read the deleted record. Fires delete rules.
    #[instrument(skip_all, fields(record = %record.id, collection = %record.collection_id))]
    pub fn on_record_deleted(&self, record: &Record) -> Result<()> {
        let Some(owner) = self.collection_owner(&record.collection_id)? else {
            return Ok(());
        };

        let mut builder = self.builder();
        builder.seed_change(
            ResourceKind::Collection,
            owner.id(),
            None,
            Instances::records([record.clone()]),
        );

        let subject = Subject::Record(record.clone());
        let rules = RuleTask::for_event(&owner, Lifecycle::Delete, Some(&subject), None);
        self.finish(builder, rules)
    }

    /// Evaluate the computed attributes of the new link instances and
    /// everything that depends on the relationship existing. Fires create
    /// rules of each link type.
    #[instrument(skip_all, fields(links = links.len()))]
    pub fn on_relationship_created(&self, links: &[LinkInstance]) -> Result<()> {
        let mut builder = self.builder();
        let mut rules = Vec::new();

        for (link_type_id, group) in by_link_type(links) {
            let Some(owner) = self.link_type_owner(&link_type_id)? else {
                continue;
            };

            for attribute in owner.computed_attributes() {
                let node = ComputationNode::link(owner.id(), &attribute.id);
                let payload = Payload::new(Instances::links(group.iter().cloned()))
                    .with_definition(owner.clone(), attribute.clone());
                builder.seed_node(node, payload)?;
            }
            builder.seed_change(ResourceKind::Link, owner.id(), None, Instances::links(group.iter().cloned()));

            for link in group {
                let subject = Subject::Link(link);
                rules.extend(RuleTask::for_event(&owner, Lifecycle::Create, None, Some(&subject)));
            }
        }

        self.finish(builder, rules)
    }

    /// Re-evaluate what reads the link attributes that changed. Fires update
    /// rules.
    #[instrument(skip_all, fields(link = %new.id, link_type = %new.link_type_id))]
    pub fn on_relationship_updated(&self, old: &LinkInstance, new: &LinkInstance) -> Result<()> {
        let Some(owner) = self.link_type_owner(&new.link_type_id)? else {
            return Ok(());
        };

        let changed = changed_attributes(&old.data, &new.data);
        debug!(?changed, "link attributes changed");

        let mut builder = self.builder();
        for attribute_id in &changed {
            builder.seed_change(
                ResourceKind::Link,
                owner.id(),
                Some(attribute_id.as_str()),
                Instances::links([new.clone()]),
            );
        }

        let old = Subject::Link(old.clone());
        let new = Subject::Link(new.clone());
        let rules = RuleTask::for_event(&owner, Lifecycle::Update, Some(&old), Some(&new));
        self.finish(builder, rules)
    }

    /// Re-evaluate the endpoints of removed relationships. Fires delete rules.
    #[instrument(skip_all, fields(links = links.len()))]
    pub fn on_relationship_deleted(&self, links: &[LinkInstance]) -> Result<()> {
        let mut builder = self.builder();
        let mut rules = Vec::new();

        for (link_type_id, group) in by_link_type(links) {
            let Some(owner) = self.link_type_owner(&link_type_id)? else {
                continue;
            };

            builder.seed_change(ResourceKind::Link, owner.id(), None, Instances::links(group.iter().cloned()));

            for link in group {
                let subject = Subject::Link(link);
                rules.extend(RuleTask::for_event(&owner, Lifecycle::Delete, Some(&subject), None));
            }
        }

        self.finish(builder, rules)
    }

    /// Index a new function and compute its initial values over every record
    /// or link instance of the owner.
    ///
    /// A malformed input reference rejects the definition before the index
    /// is touched.
    #[instrument(skip_all, fields(owner = %owner.id(), attribute = %attribute.id))]
    pub fn on_computed_attribute_defined(&self, owner: &Owner, attribute: &Attribute) -> Result<()> {
        self.define(owner, attribute)
    }

    /// Replace a function's edges with those of its new definition, then
    /// recompute it as for a new definition.
    #[instrument(skip_all, fields(owner = %owner.id(), attribute = %attribute.id))]
    pub fn on_computed_attribute_redefined(&self, owner: &Owner, attribute: &Attribute) -> Result<()> {
        self.define(owner, attribute)
    }

    /// Drop the edges feeding a function whose formula was removed. The
    /// attribute stays, so edges of functions reading it are kept; nothing
    /// is recomputed.
    #[instrument(skip(self))]
    pub fn on_computed_attribute_removed(
        &self,
        kind: ResourceKind,
        owner_id: &str,
        attribute_id: &str,
    ) -> Result<()> {
        let owners = [owner_id.to_string()];
        let removed = self.index.delete_edges_for_targets(kind, &owners, Some(attribute_id))?;
        debug!(removed, "function edges removed");
        Ok(())
    }

    /// Drop every edge naming a deleted attribute, on either side. Used for
    /// computed and plain attributes alike; nothing is recomputed.
    #[instrument(skip(self))]
    pub fn on_attribute_removed(&self, kind: ResourceKind, owner_id: &str, attribute_id: &str) -> Result<()> {
        let removed = self.index.delete_edges_touching(kind, owner_id, Some(attribute_id))?;
        debug!(removed, "attribute edges removed");
        Ok(())
    }

    /// Drop every edge naming the collection or link type.
    #[instrument(skip(self))]
    pub fn on_owner_removed(&self, kind: ResourceKind, owner_id: &str) -> Result<()> {
        let removed = self.index.delete_edges_touching(kind, owner_id, None)?;
        debug!(removed, "owner edges removed");
        Ok(())
    }

    fn define(&self, owner: &Owner, attribute: &Attribute) -> Result<()> {
        let node = ComputationNode::new(owner.kind(), owner.id(), &attribute.id);
        let edges = edges_for(owner.kind(), owner.id(), attribute)?;
        self.index.replace_edges_for_target(&node, edges)?;

        if !attribute.is_computed() {
            return Ok(());
        }

        let instances = match owner.kind() {
            ResourceKind::Collection => Instances::records(self.records.records_by_collection(owner.id())?),
            ResourceKind::Link => Instances::links(self.records.link_instances_by_type(owner.id())?),
        };

        let mut builder = self.builder();
        builder.seed_node(node, Payload::new(instances).with_definition(owner.clone(), attribute.clone()))?;
        self.finish(builder, Vec::new())
    }

    fn builder(&self) -> GraphBuilder<'_> {
        GraphBuilder::new(self.index.as_ref(), self.records.as_ref())
    }

    fn collection_owner(&self, collection_id: &str) -> Result<Option<Owner>> {
        let owner = self.definitions.collection(collection_id)?.map(Owner::from);
        if owner.is_none() {
            debug!(collection_id, "collection is gone, nothing to do");
        }
        Ok(owner)
    }

    fn link_type_owner(&self, link_type_id: &str) -> Result<Option<Owner>> {
        let owner = self.definitions.link_type(link_type_id)?.map(Owner::from);
        if owner.is_none() {
            debug!(link_type_id, "link type is gone, nothing to do");
        }
        Ok(owner)
    }

    fn finish(&self, builder: GraphBuilder<'_>, rules: Vec<RuleTask>) -> Result<()> {
        let mapping = builder.build()?;
        let order = EvaluationScheduler::new(self.config.cycle_policy).schedule(&mapping);
        let mut chain = TaskAssembler::new(self.definitions.as_ref()).assemble(mapping, &order)?;

        if self.config.rules_enabled {
            chain = chain.append(rules);
        }

        if chain.is_empty() {
            debug!("empty chain, nothing submitted");
            return Ok(());
        }

        debug!(tasks = chain.len(), "submitting chain");
        self.executor.submit(chain);
        Ok(())
    }
}

/// Group link instances by link type, in first-seen order.
fn by_link_type(links: &[LinkInstance]) -> IndexMap<String, Vec<LinkInstance>> {
    let mut groups: IndexMap<String, Vec<LinkInstance>> = IndexMap::new();
    for link in links {
        groups.entry(link.link_type_id.clone()).or_default().push(link.clone());
    }
    groups
}
