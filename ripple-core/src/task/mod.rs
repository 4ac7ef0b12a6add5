//! Tasks and Task Chains
//!
//! A change produces one [`TaskChain`]: the function evaluations it requires,
//! in dependency order, followed by any automation rules the event fires.
//! The chain is handed to a [`TaskExecutor`](executor::TaskExecutor) and is
//! not touched again by the engine.
//!
//! Internally a chain is a plain vector. Runners that expect the
//! "task with a parent to run next" shape get it from
//! [`TaskChain::into_linked`].

pub mod assembler;
pub mod executor;

use std::fmt;

use crate::graph::{ComputationNode, Instances};
use crate::model::{Attribute, Lifecycle, Owner, Rule, Subject};

pub use assembler::TaskAssembler;
pub use executor::{InlineExecutor, TaskExecutor, TaskRunner, TokioExecutor};

/// Evaluate one computed attribute over a set of records or link instances.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionTask {
    pub node: ComputationNode,
    pub owner: Owner,
    pub attribute: Attribute,
    pub instances: Instances,
}

/// Run one automation rule against the entity that triggered it.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTask {
    pub name: String,
    pub rule: Rule,
    pub owner: Owner,
    /// State before the event; `None` on creation.
    pub old: Option<Subject>,
    /// State after the event; `None` on deletion.
    pub new: Option<Subject>,
}

impl RuleTask {
    /// Rule tasks of `owner` that fire on `event`, in rule definition order.
    pub fn for_event(
        owner: &Owner,
        event: Lifecycle,
        old: Option<&Subject>,
        new: Option<&Subject>,
    ) -> Vec<RuleTask> {
        owner
            .rules()
            .iter()
            .filter(|(_, rule)| rule.timing.fires_on(event))
            .map(|(name, rule)| RuleTask {
                name: name.clone(),
                rule: rule.clone(),
                owner: owner.clone(),
                old: old.cloned(),
                new: new.cloned(),
            })
            .collect()
    }
}

/// One unit of work in a chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    Function(FunctionTask),
    Rule(RuleTask),
}

impl Task {
    /// Whether this evaluates a computed attribute.
    pub fn is_function(&self) -> bool {
        matches!(self, Task::Function(_))
    }

    /// Whether this runs an automation rule.
    pub fn is_rule(&self) -> bool {
        matches!(self, Task::Rule(_))
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Function(task) => write!(f, "function {}", task.node),
            Task::Rule(task) => write!(f, "rule '{}' on {}:{}", task.name, task.owner.kind(), task.owner.id()),
        }
    }
}

/// An ordered, immutable list of tasks. The first task runs first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskChain {
    tasks: Vec<Task>,
}

impl TaskChain {
    /// Create a chain from tasks in execution order.
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the chain has no task.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks in execution order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Iterate over tasks in execution order.
    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.tasks.iter()
    }

    /// Splice rule tasks after every task already in the chain.
    pub fn append(mut self, rules: impl IntoIterator<Item = RuleTask>) -> Self {
        self.tasks.extend(rules.into_iter().map(Task::Rule));
        self
    }

    /// Convert to the linked form: the returned task runs first and each
    /// `parent` is the task that runs right after it.
    pub fn into_linked(self) -> Option<LinkedTask> {
        let mut head: Option<Box<LinkedTask>> = None;
        for task in self.tasks.into_iter().rev() {
            head = Some(Box::new(LinkedTask { task, parent: head }));
        }
        head.map(|boxed| *boxed)
    }
}

impl<'a> IntoIterator for &'a TaskChain {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}

/// A task with a pointer to the task that runs after it.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedTask {
    pub task: Task,
    pub parent: Option<Box<LinkedTask>>,
}

impl LinkedTask {
    /// Number of tasks from here to the end of the chain, this one included.
    pub fn len(&self) -> usize {
        let mut count = 1;
        let mut next = self.parent.as_deref();
        while let Some(linked) = next {
            count += 1;
            next = linked.parent.as_deref();
        }
        count
    }

    /// Split off the task that runs next.
    pub fn into_parts(self) -> (Task, Option<LinkedTask>) {
        (self.task, self.parent.map(|boxed| *boxed))
    }
}
