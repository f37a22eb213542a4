//! Ordered step runner for one production attempt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use super::errors::{PipelineError, PipelineResult, StepResult};
use super::step::PipelineStep;
use super::types::{ProductionContext, ProductionState, StepOutcome};

/// Synthesis, post-processing and delivery, or any other step list.
///
/// Cancellation is only observed between steps; an in-flight
/// collaborator call always runs to completion.
pub struct Pipeline {
    steps: Vec<Box<dyn PipelineStep>>,
    cancel: CancelHandle,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            cancel: CancelHandle::new(),
        }
    }

    /// Append a step.
    pub fn add_step<S: PipelineStep + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn with_step<S: PipelineStep + 'static>(mut self, step: S) -> Self {
        self.add_step(step);
        self
    }

    /// Shared handle; cancelling it stops the run before the next step.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Produce one claimed task.
    ///
    /// Every step is input-checked, executed and, when it reports
    /// success, output-checked. A failing optional step is recorded as
    /// skipped; a failing required step ends the run.
    pub async fn run(
        &self,
        ctx: &ProductionContext,
        state: &mut ProductionState,
    ) -> PipelineResult<PipelineRunResult> {
        let mut run = PipelineRunResult::default();

        for step in &self.steps {
            let name = step.name();
            if self.cancel.is_cancelled() {
                ctx.logger.warn(&format!("Production cancelled before {}", name));
                return Err(PipelineError::cancelled(ctx.task_name()));
            }
            ctx.logger.debug(&format!("{}: begin", name));

            let outcome = match run_step(step.as_ref(), ctx, state).await {
                Ok(outcome) => outcome,
                Err(e) if step.is_optional() => {
                    ctx.logger
                        .warn(&format!("{} did not finish: {}", step.description(), e));
                    StepOutcome::Skipped(e.to_string())
                }
                Err(e) => {
                    tracing::error!(task = %ctx.task.id, step = name, "{}", e);
                    return Err(PipelineError::step_failed(ctx.task_name(), name, e));
                }
            };

            if let StepOutcome::Skipped(ref reason) = outcome {
                ctx.logger.debug(&format!("{}: skipped ({})", name, reason));
                run.steps_skipped.push(name.to_string());
            } else {
                ctx.logger.debug(&format!("{}: done", name));
                run.steps_completed.push(name.to_string());
            }
        }

        Ok(run)
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_step(
    step: &dyn PipelineStep,
    ctx: &ProductionContext,
    state: &mut ProductionState,
) -> StepResult<StepOutcome> {
    step.validate_input(ctx, state)?;
    let outcome = step.execute(ctx, state).await?;
    if outcome == StepOutcome::Success {
        step.validate_output(ctx, state)?;
    }
    Ok(outcome)
}

/// Handle for cancelling the pipeline and the loops around it.
#[derive(Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake every waiter.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resolve once cancellation has been requested.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Names of the steps a finished run went through.
#[derive(Debug, Clone, Default)]
pub struct PipelineRunResult {
    pub steps_completed: Vec<String>,
    pub steps_skipped: Vec<String>,
}

impl PipelineRunResult {
    /// No step was skipped.
    pub fn all_completed(&self) -> bool {
        self.steps_skipped.is_empty()
    }

    pub fn total_steps(&self) -> usize {
        self.steps_completed.len() + self.steps_skipped.len()
    }
}
