//! Pipeline step trait definition.

use async_trait::async_trait;

use super::errors::StepResult;
use super::types::{ProductionContext, ProductionState, StepOutcome};

/// Trait for pipeline steps.
///
/// The pipeline runner calls these methods in order:
///
/// 1. `validate_input` - Check preconditions before execution
/// 2. `execute` - Perform the step's work (may suspend on collaborators)
/// 3. `validate_output` - Verify the step produced valid output
#[async_trait]
pub trait PipelineStep: Send + Sync {
    /// Get the step name (for logging and error context).
    fn name(&self) -> &str;

    /// Validate inputs before execution.
    fn validate_input(&self, ctx: &ProductionContext, state: &ProductionState) -> StepResult<()>;

    /// Execute the step's main work and record results in `state`.
    async fn execute(
        &self,
        ctx: &ProductionContext,
        state: &mut ProductionState,
    ) -> StepResult<StepOutcome>;

    /// Validate outputs after execution.
    fn validate_output(&self, ctx: &ProductionContext, state: &ProductionState) -> StepResult<()>;

    /// Whether a failure of this step leaves the task intact.
    ///
    /// Errors from optional steps are logged as warnings and the step is
    /// recorded as skipped.
    fn is_optional(&self) -> bool {
        false
    }

    /// Human-readable description of what this step does.
    fn description(&self) -> &str {
        self.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockStep {
        name: &'static str,
    }

    #[async_trait]
    impl PipelineStep for MockStep {
        fn name(&self) -> &str {
            self.name
        }

        fn validate_input(&self, _ctx: &ProductionContext, _state: &ProductionState) -> StepResult<()> {
            Ok(())
        }

        async fn execute(
            &self,
            _ctx: &ProductionContext,
            _state: &mut ProductionState,
        ) -> StepResult<StepOutcome> {
            Ok(StepOutcome::Success)
        }

        fn validate_output(&self, _ctx: &ProductionContext, _state: &ProductionState) -> StepResult<()> {
            Ok(())
        }
    }

    #[test]
    fn step_trait_object_works() {
        let step: Box<dyn PipelineStep> = Box::new(MockStep { name: "TestStep" });

        assert_eq!(step.name(), "TestStep");
        assert_eq!(step.description(), "TestStep");
        assert!(!step.is_optional());
    }
}
