//! Production pipeline and the driver that feeds it.
//!
//! Every claimed task runs through the same sequence of steps. Each step
//! validates its input, executes (suspending on collaborator calls) and
//! validates what it recorded in the production state.
//!
//! # Architecture
//!
//! ```text
//! ProductionDriver
//!     └── Pipeline
//!         ├── Step: Synthesis    (fatal on error)
//!         ├── Step: PostProcess  (fatal on error)
//!         └── Step: Delivery     (never fatal)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use vocalize_core::orchestrator::{create_production_pipeline, ProductionDriver};
//!
//! let pipeline = create_production_pipeline(&collaborators, MusicLibrary::default(), "productions");
//! let driver = ProductionDriver::new(queue.clone(), pipeline, analytics.clone());
//!
//! // Produce everything that is currently pending
//! while let Some(result) = driver.drive_once().await {
//!     println!("{} -> {}", result.task_id, result.success);
//! }
//! ```

pub mod audio;
mod collaborators;
mod delivery;
mod driver;
mod errors;
mod music;
mod pipeline;
mod step;
pub mod steps;
mod types;

#[cfg(test)]
pub(crate) mod testing;

use std::path::PathBuf;
use std::sync::Arc;

pub use audio::{AudioError, AudioResult};
pub use collaborators::{
    advise, CollaboratorError, CollaboratorResult, Collaborators, Deliverer, MusicBed,
    MusicSource, PostProcessOptions, PostProcessor, ProcessedAudio, Synthesizer, TextAdvisor,
    ADVISOR_MIN_CHARS,
};
pub use delivery::LocalFolderDelivery;
pub use driver::{run_eta_ticker, DriveResult, EventCallback, ProductionDriver, ProductionEvent};
pub use errors::{PipelineError, PipelineResult, StepError, StepResult};
pub use music::{MusicCache, MusicLibrary, MusicTrack};
pub use pipeline::{CancelHandle, Pipeline, PipelineRunResult};
pub use step::PipelineStep;
pub use steps::{DeliveryStep, PostProcessStep, SynthesisStep};
pub use types::{
    DeliveryOutput, ProductionContext, ProductionState, ProgressCallback, StepOutcome,
    SynthesisOutput, UploadCallback,
};

/// Create the production pipeline with all steps in order.
///
/// 1. Synthesis - one call per text, or one per story segment then stitch
/// 2. PostProcess - mastering, music bed, subtitle and video artifacts
/// 3. Delivery - output folder plus enabled remote destinations
///
/// The music cache lives as long as the pipeline.
pub fn create_production_pipeline(
    collaborators: &Collaborators,
    library: MusicLibrary,
    output_dir: impl Into<PathBuf>,
) -> Pipeline {
    let cache = Arc::new(MusicCache::new(collaborators.music_source.clone()));
    Pipeline::new()
        .with_step(SynthesisStep::new(collaborators.synthesizer.clone()))
        .with_step(PostProcessStep::new(
            collaborators.post_processor.clone(),
            library,
            cache,
        ))
        .with_step(DeliveryStep::new(
            LocalFolderDelivery::new(output_dir),
            collaborators.deliverer.clone(),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use testing::{FakeProcessor, FakeSynthesizer, StaticMusic};

    #[test]
    fn production_pipeline_has_three_steps() {
        let collaborators = Collaborators::new(
            Arc::new(FakeSynthesizer::default()),
            Arc::new(FakeProcessor::default()),
            Arc::new(StaticMusic),
        );
        let pipeline = create_production_pipeline(&collaborators, MusicLibrary::default(), "out");

        assert_eq!(
            pipeline.step_names(),
            vec!["Synthesis", "PostProcess", "Delivery"]
        );
    }
}
