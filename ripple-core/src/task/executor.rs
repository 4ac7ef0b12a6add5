//! Task Execution
//!
//! Evaluating formulas and running rule actions belongs to the host
//! application, behind [`TaskRunner`]. This module only decides *when* each
//! task runs:
//!
//! - tasks of one chain run one at a time, in chain order;
//! - the first failure stops the chain, and later tasks never run;
//! - separate chains are independent of each other.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::Result;

use super::{Task, TaskChain};

/// Runs a single task. Implemented by the host application.
pub trait TaskRunner: Send + Sync {
    fn run(&self, task: &Task) -> Result<()>;
}

impl<F> TaskRunner for F
where
    F: Fn(&Task) -> Result<()> + Send + Sync,
{
    fn run(&self, task: &Task) -> Result<()> {
        self(task)
    }
}

/// Accepts finished chains from the engine.
pub trait TaskExecutor: Send + Sync {
    fn submit(&self, chain: TaskChain);
}

/// Run `chain` to completion or to its first failure.
pub fn run_chain<R: TaskRunner + ?Sized>(runner: &R, chain: TaskChain) -> Result<()> {
    let mut next = chain.into_linked();

    while let Some(linked) = next {
        let remaining = linked.len() - 1;
        let (task, parent) = linked.into_parts();

        if let Err(error) = runner.run(&task) {
            warn!(%task, %error, remaining, "task failed, abandoning chain");
            return Err(error);
        }

        debug!(%task, "task finished");
        next = parent;
    }

    Ok(())
}

/// Runs each chain on the submitting thread before `submit` returns.
pub struct InlineExecutor<R> {
    runner: R,
}

impl<R: TaskRunner> InlineExecutor<R> {
    /// Create an executor around `runner`.
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// The wrapped runner.
    pub fn runner(&self) -> &R {
        &self.runner
    }
}

impl<R: TaskRunner> TaskExecutor for InlineExecutor<R> {
    fn submit(&self, chain: TaskChain) {
        // Failures are already logged; the chain has nowhere else to report.
        let _ = run_chain(&self.runner, chain);
    }
}

/// Runs each chain on a tokio blocking thread.
///
/// Runners are synchronous, so chains go through `spawn_blocking`. Handles
/// of submitted chains, finished or not, are kept until
/// [`TokioExecutor::drain`] collects them.
pub struct TokioExecutor<R> {
    runner: Arc<R>,
    handle: Handle,
    in_flight: Mutex<Vec<JoinHandle<Result<()>>>>,
}

impl<R: TaskRunner + 'static> TokioExecutor<R> {
    /// Create an executor on the current runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn new(runner: R) -> Self {
        Self::with_handle(runner, Handle::current())
    }

    /// Create an executor on the runtime behind `handle`.
    pub fn with_handle(runner: R, handle: Handle) -> Self {
        Self {
            runner: Arc::new(runner),
            handle,
            in_flight: Mutex::new(Vec::new()),
        }
    }

    /// The wrapped runner.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Spawn `chain` and return its handle.
    pub fn spawn(&self, chain: TaskChain) -> JoinHandle<Result<()>> {
        let runner = Arc::clone(&self.runner);
        self.handle
            .spawn_blocking(move || run_chain(runner.as_ref(), chain))
    }

    /// Wait for every chain submitted so far. Returns how many failed.
    pub async fn drain(&self) -> usize {
        let handles: Vec<_> = std::mem::take(&mut *self.in_flight.lock());
        let mut failed = 0;

        for handle in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => failed += 1,
                Err(error) => {
                    warn!(%error, "chain panicked");
                    failed += 1;
                }
            }
        }

        failed
    }
}

impl<R: TaskRunner + 'static> TaskExecutor for TokioExecutor<R> {
    fn submit(&self, chain: TaskChain) {
        let handle = self.spawn(chain);
        self.in_flight.lock().push(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::graph::{ComputationNode, Instances};
    use crate::model::{Attribute, Collection, Record};
    use crate::task::FunctionTask;

    fn chain(attributes: &[&str]) -> TaskChain {
        TaskChain::new(
            attributes
                .iter()
                .map(|attribute| {
                    Task::Function(FunctionTask {
                        node: ComputationNode::collection("inv", *attribute),
                        owner: Collection::new("inv", "Invoices").into(),
                        attribute: Attribute::new(*attribute, *attribute).with_function("1", &[]),
                        instances: Instances::records([Record::new("r1", "inv")]),
                    })
                })
                .collect(),
        )
    }

    /// Records every task it sees and fails on the named attribute.
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl TaskRunner for Recorder {
        fn run(&self, task: &Task) -> Result<()> {
            let Task::Function(function) = task else {
                return Ok(());
            };
            self.seen.lock().push(function.attribute.id.clone());

            if self.fail_on == Some(function.attribute.id.as_str()) {
                return Err(Error::TaskFailed {
                    task: task.to_string(),
                    reason: "boom".into(),
                });
            }
            Ok(())
        }
    }

    #[test]
    fn inline_runs_in_order() {
        let executor = InlineExecutor::new(Recorder::default());
        executor.submit(chain(&["a", "b", "c"]));

        assert_eq!(*executor.runner().seen.lock(), ["a", "b", "c"]);
    }

    #[test]
    fn failure_stops_the_chain() {
        let executor = InlineExecutor::new(Recorder {
            fail_on: Some("b"),
            ..Default::default()
        });
        executor.submit(chain(&["a", "b", "c"]));

        assert_eq!(*executor.runner().seen.lock(), ["a", "b"]);
    }

    #[test]
    fn closures_are_runners() {
        let result = run_chain(&|_: &Task| -> Result<()> { Ok(()) }, chain(&["a"]));
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn tokio_chains_are_independent() {
        let executor = TokioExecutor::new(Recorder {
            fail_on: Some("x"),
            ..Default::default()
        });
        executor.submit(chain(&["x", "never"]));
        executor.submit(chain(&["y"]));

        assert_eq!(executor.drain().await, 1);

        let mut seen = executor.runner().seen.lock().clone();
        seen.sort();
        assert_eq!(seen, ["x", "y"]);
    }

    #[tokio::test]
    async fn finished_failures_are_still_counted() {
        let executor = TokioExecutor::new(Recorder {
            fail_on: Some("x"),
            ..Default::default()
        });
        executor.submit(chain(&["x"]));
        while !executor.in_flight.lock().iter().all(JoinHandle::is_finished) {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        executor.submit(chain(&["y"]));

        assert_eq!(executor.drain().await, 1);
        assert!(executor.in_flight.lock().is_empty());
    }
}
