//! Compiling action sequences into plans and running them.
//!
//! [`PlanMaker::make_plan`] validates every token before anything runs, so a
//! typo at the end of a sequence never leaves a server half-handled.
//! [`ExecutionPlan::run`] executes the bound actions in order, stops at the
//! first failure and always releases the target session afterwards.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tracing::{debug, info, warn};

use super::{ActionFn, ActionResult, Executor, ExecutorFactory, Params, TargetKind};
use crate::error::{Error, Result};

/// One bound step of a plan.
struct PlanStep {
    action: String,
    run: ActionFn,
}

/// A compiled, not yet executed action sequence for one target.
///
/// Consumed by [`ExecutionPlan::run`], so it can only be executed once.
pub struct ExecutionPlan {
    executor: Box<dyn Executor>,
    steps: Vec<PlanStep>,
}

impl std::fmt::Debug for ExecutionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionPlan")
            .field("target", &self.executor.kind())
            .field("actions", &self.actions())
            .finish()
    }
}

impl ExecutionPlan {
    /// The tokens this plan will run, in order.
    pub fn actions(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.action.as_str()).collect()
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True for a plan with no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order, stopping after the first failed one.
    ///
    /// The executor's cleanup runs exactly once when the steps are done, on
    /// success, on failure and while a panic from a step unwinds. If this
    /// future is dropped part-way, cleanup is spawned onto the runtime.
    pub async fn run(self) -> PlanOutcome {
        let ExecutionPlan { executor, steps } = self;
        let kind = executor.kind();
        let started = Instant::now();
        let guard = CleanupGuard::new(executor);

        let outcome = AssertUnwindSafe(run_steps(kind, steps))
            .catch_unwind()
            .await;

        guard.finish().await;

        match outcome {
            Ok(results) => {
                let outcome = PlanOutcome { results };
                info!(
                    target_kind = %kind,
                    actions = outcome.results.len(),
                    success = outcome.is_success(),
                    duration_ms = started.elapsed().as_millis() as u64,
                    "plan finished"
                );
                outcome
            }
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Owns the executor while a plan runs and makes sure it is cleaned up even
/// when the run is cancelled.
struct CleanupGuard {
    executor: Option<Box<dyn Executor>>,
}

impl CleanupGuard {
    fn new(executor: Box<dyn Executor>) -> Self {
        Self {
            executor: Some(executor),
        }
    }

    async fn finish(mut self) {
        if let Some(executor) = &self.executor {
            debug!(target_kind = %executor.kind(), "cleaning up executor");
            executor.cleanup().await;
        }
        self.executor = None;
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let Some(executor) = self.executor.take() else {
            return;
        };
        let kind = executor.kind();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!(target_kind = %kind, "plan cancelled, cleaning up in background");
                handle.spawn(async move {
                    executor.cleanup().await;
                });
            }
            Err(_) => {
                warn!(target_kind = %kind, "plan dropped outside a runtime, session not released");
            }
        }
    }
}

async fn run_steps(kind: TargetKind, steps: Vec<PlanStep>) -> Vec<ActionResult> {
    let mut results = Vec::with_capacity(steps.len());
    for step in steps {
        debug!(target_kind = %kind, action = %step.action, "running action");
        let result = (step.run)().await;
        let failed = result.is_failure();
        if let Some(err) = &result.error {
            warn!(target_kind = %kind, action = %step.action, error = %err, "action failed");
        }
        results.push(result);
        if failed {
            break;
        }
    }
    results
}

/// What a plan run produced.
#[derive(Debug)]
pub struct PlanOutcome {
    results: Vec<ActionResult>,
}

impl PlanOutcome {
    /// Results of the steps that ran, in order. After a failure the failed
    /// step is last.
    pub fn results(&self) -> &[ActionResult] {
        &self.results
    }

    /// Take the results.
    pub fn into_results(self) -> Vec<ActionResult> {
        self.results
    }

    /// The error that stopped the plan, if any.
    pub fn error(&self) -> Option<&Error> {
        self.results.last().and_then(|r| r.error.as_ref())
    }

    /// True when no step failed.
    pub fn is_success(&self) -> bool {
        self.error().is_none()
    }
}

/// Compiles action sequences with one executor factory.
#[derive(Clone)]
pub struct PlanMaker {
    factory: Arc<dyn ExecutorFactory>,
}

impl PlanMaker {
    /// Create a plan maker around `factory`.
    pub fn new(factory: impl ExecutorFactory + 'static) -> Self {
        Self {
            factory: Arc::new(factory),
        }
    }

    /// Which kind of target the plans drive.
    pub fn kind(&self) -> TargetKind {
        self.factory.kind()
    }

    /// Build an executor from `params` and bind every token.
    ///
    /// Fails on the first token that does not resolve; no hardware is
    /// contacted either way.
    pub fn make_plan<S: AsRef<str>>(&self, actions: &[S], params: &Params) -> Result<ExecutionPlan> {
        let executor = self.factory.create(params)?;
        let mut steps = Vec::with_capacity(actions.len());
        for token in actions {
            let token = token.as_ref();
            let run = executor.resolve_action(token)?;
            steps.push(PlanStep {
                action: token.to_string(),
                run,
            });
        }
        debug!(target_kind = %executor.kind(), actions = steps.len(), "plan compiled");
        Ok(ExecutionPlan { executor, steps })
    }
}
