//! Post-process step - mastering, music bed and side artifacts.
//!
//! Picks the background track (explicit library track, or the mood match in
//! AI-composer mode), fetches it through the shared cache and hands the
//! synthesized audio to the post-processor. Any failure here fails the task.

use std::sync::Arc;

use async_trait::async_trait;

use crate::orchestrator::collaborators::{MusicBed, PostProcessOptions, PostProcessor};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::music::{MusicCache, MusicLibrary};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{ProductionContext, ProductionState, StepOutcome};

/// Progress reported before mastering starts.
const MASTERING_PROGRESS: u8 = 70;

pub struct PostProcessStep {
    processor: Arc<dyn PostProcessor>,
    library: MusicLibrary,
    cache: Arc<MusicCache>,
}

impl PostProcessStep {
    pub fn new(processor: Arc<dyn PostProcessor>, library: MusicLibrary, cache: Arc<MusicCache>) -> Self {
        Self {
            processor,
            library,
            cache,
        }
    }

    /// Resolve and fetch the music bed, if the task asks for one.
    async fn music_bed(&self, ctx: &ProductionContext) -> StepResult<Option<MusicBed>> {
        let features = &ctx.task.settings.extra_features;
        let Some(ref music) = features.background_music else {
            return Ok(None);
        };

        let Some(track) = self
            .library
            .select(music, features.suggested_mood.as_deref())
        else {
            ctx.logger
                .warn("Background track not found in library; mixing skipped");
            return Ok(None);
        };

        let bytes = self
            .cache
            .bytes(track)
            .await
            .map_err(StepError::PostProcess)?;
        ctx.logger.info(&format!(
            "Mastering: mixing \"{}\" ({}) at {:.0}% volume",
            track.name,
            track.mood,
            music.volume() * 100.0
        ));

        Ok(Some(MusicBed {
            track_id: track.id.clone(),
            bytes,
            volume: music.volume(),
        }))
    }
}

#[async_trait]
impl PipelineStep for PostProcessStep {
    fn name(&self) -> &str {
        "PostProcess"
    }

    fn description(&self) -> &str {
        "Master audio and render artifacts"
    }

    fn validate_input(&self, _ctx: &ProductionContext, state: &ProductionState) -> StepResult<()> {
        if state.synthesis.is_none() {
            return Err(StepError::precondition_failed(
                "no synthesized audio to process",
            ));
        }
        Ok(())
    }

    async fn execute(
        &self,
        ctx: &ProductionContext,
        state: &mut ProductionState,
    ) -> StepResult<StepOutcome> {
        let audio = match state.synthesis {
            Some(ref output) => output.audio.clone(),
            None => return Err(StepError::precondition_failed("synthesis output missing")),
        };

        ctx.report_progress(MASTERING_PROGRESS, None);
        ctx.logger.info("Mastering: applying studio processing");

        let music = self.music_bed(ctx).await?;
        state.music_track = music.as_ref().map(|m| m.track_id.clone());

        let options = PostProcessOptions::from_settings(&ctx.task.settings, &ctx.task.text, music);
        let processed = self
            .processor
            .process(audio, &options)
            .await
            .map_err(StepError::PostProcess)?;

        if options.generate_subtitles && processed.subtitle.is_none() {
            ctx.logger.warn("Subtitles were requested but not produced");
        }
        if options.generate_video && processed.video.is_none() {
            ctx.logger.warn("Video was requested but not produced");
        }

        state.processed = Some(processed);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &ProductionContext, state: &ProductionState) -> StepResult<()> {
        match state.primary_audio() {
            Some(audio) if !audio.is_empty() => Ok(()),
            Some(_) => Err(StepError::invalid_output(
                "post-processor returned empty audio",
            )),
            None => Err(StepError::invalid_output("processed audio missing")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BackgroundMusic, MusicSelection};
    use crate::orchestrator::testing::{context, task, FakeProcessor, StaticMusic};
    use crate::orchestrator::types::SynthesisOutput;

    fn step(processor: Arc<FakeProcessor>) -> (PostProcessStep, Arc<MusicCache>) {
        let cache = Arc::new(MusicCache::new(Arc::new(StaticMusic)));
        (
            PostProcessStep::new(processor, MusicLibrary::default(), cache.clone()),
            cache,
        )
    }

    fn synthesized(id: &str) -> ProductionState {
        let mut state = ProductionState::new(id);
        state.synthesis = Some(SynthesisOutput {
            audio: b"voice".to_vec(),
            calls: 1,
        });
        state
    }

    #[tokio::test]
    async fn processes_without_music() {
        let processor = Arc::new(FakeProcessor::default());
        let (step, cache) = step(processor.clone());
        let ctx = context(task("Plain narration"));
        let mut state = synthesized(&ctx.task.id);

        step.execute(&ctx, &mut state).await.unwrap();
        step.validate_output(&ctx, &state).unwrap();

        assert_eq!(state.primary_audio(), Some(&b"voice"[..]));
        assert!(state.music_track.is_none());
        assert!(cache.is_empty());
        assert!(processor.last_options().unwrap().music.is_none());
    }

    #[tokio::test]
    async fn ai_composer_uses_suggested_mood() {
        let processor = Arc::new(FakeProcessor::default());
        let (step, cache) = step(processor.clone());
        let mut t = task("Rise and shine, the journey begins");
        t.settings.extra_features.background_music =
            Some(BackgroundMusic::new(MusicSelection::ai_composer("track-1"), 0.9));
        t.settings.extra_features.suggested_mood = Some("Inspirational".to_string());
        let ctx = context(t);
        let mut state = synthesized(&ctx.task.id);

        step.execute(&ctx, &mut state).await.unwrap();

        assert_eq!(state.music_track.as_deref(), Some("track-5"));
        assert!(cache.is_cached("track-5"));
        let bed = processor.last_options().unwrap().music.unwrap();
        assert_eq!(bed.volume, 0.5);
    }

    #[tokio::test]
    async fn unknown_library_track_mixes_nothing() {
        let processor = Arc::new(FakeProcessor::default());
        let (step, _) = step(processor.clone());
        let mut t = task("Some narration here");
        t.settings.extra_features.background_music = Some(BackgroundMusic::new(
            MusicSelection::Library {
                track_id: "track-99".to_string(),
            },
            0.1,
        ));
        let ctx = context(t);
        let mut state = synthesized(&ctx.task.id);

        step.execute(&ctx, &mut state).await.unwrap();

        assert!(state.music_track.is_none());
        assert!(processor.last_options().unwrap().music.is_none());
    }

    #[tokio::test]
    async fn processor_failure_is_a_step_error() {
        let processor = Arc::new(FakeProcessor::failing());
        let (step, _) = step(processor);
        let ctx = context(task("Some narration here"));
        let mut state = synthesized(&ctx.task.id);

        let err = step.execute(&ctx, &mut state).await.unwrap_err();
        assert!(matches!(err, StepError::PostProcess(_)));
        assert!(state.processed.is_none());
    }

    #[tokio::test]
    async fn empty_processed_audio_fails_validation() {
        let processor = Arc::new(FakeProcessor::returning_empty());
        let (step, _) = step(processor);
        let ctx = context(task("Some narration here"));
        let mut state = synthesized(&ctx.task.id);

        step.execute(&ctx, &mut state).await.unwrap();
        assert!(step.validate_output(&ctx, &state).is_err());
    }
}
