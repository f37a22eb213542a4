//! Error types for the production pipeline.
//!
//! Errors carry context that chains through layers:
//! Task → Step → Detail

use std::io;

use thiserror::Error;

use super::audio::AudioError;
use super::collaborators::CollaboratorError;

/// Top-level pipeline error with task context.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A step failed during execution.
    #[error("Task '{task_name}' failed at step '{step_name}': {source}")]
    StepFailed {
        task_name: String,
        step_name: String,
        #[source]
        source: StepError,
    },

    /// Pipeline was cancelled.
    #[error("Task '{task_name}' was cancelled")]
    Cancelled { task_name: String },
}

impl PipelineError {
    pub fn step_failed(
        task_name: impl Into<String>,
        step_name: impl Into<String>,
        source: StepError,
    ) -> Self {
        Self::StepFailed {
            task_name: task_name.into(),
            step_name: step_name.into(),
            source,
        }
    }

    pub fn cancelled(task_name: impl Into<String>) -> Self {
        Self::Cancelled {
            task_name: task_name.into(),
        }
    }

    /// Name of the failing step, if a step failed.
    pub fn step_name(&self) -> Option<&str> {
        match self {
            Self::StepFailed { step_name, .. } => Some(step_name),
            Self::Cancelled { .. } => None,
        }
    }
}

/// Error from a pipeline step.
#[derive(Error, Debug)]
pub enum StepError {
    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    /// Output validation failed.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    /// The synthesis collaborator failed for a segment or the whole text.
    #[error("Synthesis of {part} failed: {source}")]
    Synthesis {
        part: String,
        #[source]
        source: CollaboratorError,
    },

    /// Mastering, music fetch or artifact generation failed.
    #[error("Post-processing failed: {0}")]
    PostProcess(#[source] CollaboratorError),

    /// Segment audio could not be stitched.
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    IoError {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// A precondition was not met.
    #[error("Precondition not met: {0}")]
    PreconditionFailed(String),
}

impl StepError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    pub fn synthesis(part: impl Into<String>, source: CollaboratorError) -> Self {
        Self::Synthesis {
            part: part.into(),
            source,
        }
    }

    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::IoError {
            operation: operation.into(),
            source,
        }
    }

    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::PreconditionFailed(message.into())
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_error_displays_context() {
        let err = StepError::synthesis(
            "segment 2/3",
            CollaboratorError::rejected("synthesis", "voice not found"),
        );
        let msg = err.to_string();
        assert!(msg.contains("segment 2/3"));
        assert!(msg.contains("voice not found"));
    }

    #[test]
    fn pipeline_error_chains_context() {
        let step_err = StepError::PostProcess(CollaboratorError::malformed("mastering", "bad header"));
        let pipeline_err = PipelineError::step_failed("Prod_1.mp3", "PostProcess", step_err);

        let msg = pipeline_err.to_string();
        assert!(msg.contains("Prod_1.mp3"));
        assert!(msg.contains("PostProcess"));
        assert!(msg.contains("bad header"));
        assert_eq!(pipeline_err.step_name(), Some("PostProcess"));
    }
}
