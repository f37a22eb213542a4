//! Synthesis step - renders the task text through the synthesizer.
//!
//! Single-voice tasks make one call. Story tasks make one call per dialogue
//! segment, strictly in segment order, then stitch the segment audio into
//! one stream. The first failing segment fails the task.

use std::sync::Arc;

use async_trait::async_trait;

use crate::orchestrator::audio;
use crate::orchestrator::collaborators::Synthesizer;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{ProductionContext, ProductionState, StepOutcome, SynthesisOutput};

/// Progress reported before a single-voice call.
const SINGLE_PROGRESS: u8 = 25;
/// ETA reported before a single-voice call, in seconds.
const SINGLE_ETA_SECS: u32 = 5;
/// Story progress starts here and spreads segments over `STORY_SPAN`.
const STORY_BASE_PROGRESS: u8 = 10;
const STORY_SPAN: usize = 50;
/// Seconds of ETA per remaining segment.
const SECS_PER_SEGMENT: u32 = 3;

pub struct SynthesisStep {
    synthesizer: Arc<dyn Synthesizer>,
}

impl SynthesisStep {
    pub fn new(synthesizer: Arc<dyn Synthesizer>) -> Self {
        Self { synthesizer }
    }

    async fn render_single(&self, ctx: &ProductionContext) -> StepResult<SynthesisOutput> {
        let task = &ctx.task;
        ctx.report_progress(SINGLE_PROGRESS, Some(SINGLE_ETA_SECS));
        ctx.logger.info(&format!(
            "Synthesis: rendering {} characters with voice {}",
            task.character_count(),
            task.voice_name
        ));

        let audio = self
            .synthesizer
            .synthesize(&task.text, &task.voice_id, &task.settings)
            .await
            .map_err(|e| StepError::synthesis("text", e))?;

        Ok(SynthesisOutput { audio, calls: 1 })
    }

    async fn render_story(&self, ctx: &ProductionContext) -> StepResult<SynthesisOutput> {
        let segments = ctx.task.segments().unwrap_or_default();
        let total = segments.len();
        let mut parts = Vec::with_capacity(total);

        for (i, segment) in segments.iter().enumerate() {
            let progress = STORY_BASE_PROGRESS as usize + i * STORY_SPAN / total;
            let remaining = (total - i) as u32 * SECS_PER_SEGMENT;
            ctx.report_progress(progress as u8, Some(remaining));
            ctx.logger.info(&format!(
                "Synthesis: rendering segment {}/{} with voice {}",
                i + 1,
                total,
                segment.voice_name
            ));

            let part = self
                .synthesizer
                .synthesize(&segment.text, &segment.voice_id, &ctx.task.settings)
                .await
                .map_err(|e| StepError::synthesis(format!("segment {}/{}", i + 1, total), e))?;
            parts.push(part);
        }

        ctx.logger
            .info(&format!("Mastering: stitching {} dialogue segments", total));
        let audio = audio::stitch(&parts)?;
        Ok(SynthesisOutput {
            audio,
            calls: total,
        })
    }
}

#[async_trait]
impl PipelineStep for SynthesisStep {
    fn name(&self) -> &str {
        "Synthesis"
    }

    fn description(&self) -> &str {
        "Render speech audio"
    }

    fn validate_input(&self, ctx: &ProductionContext, _state: &ProductionState) -> StepResult<()> {
        if ctx.task.trimmed_text().is_empty() {
            return Err(StepError::invalid_input("task text is empty"));
        }
        if ctx.task.settings.extra_features.story_mode && !ctx.task.is_story() {
            return Err(StepError::invalid_input(
                "story task has no dialogue segments",
            ));
        }
        Ok(())
    }

    async fn execute(
        &self,
        ctx: &ProductionContext,
        state: &mut ProductionState,
    ) -> StepResult<StepOutcome> {
        let output = if ctx.task.is_story() {
            self.render_story(ctx).await?
        } else {
            self.render_single(ctx).await?
        };

        ctx.logger.debug(&format!(
            "Synthesized {} bytes in {} call(s)",
            output.audio.len(),
            output.calls
        ));
        state.synthesis = Some(output);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &ProductionContext, state: &ProductionState) -> StepResult<()> {
        match state.synthesis {
            Some(ref output) if !output.audio.is_empty() => Ok(()),
            Some(_) => Err(StepError::invalid_output("synthesizer returned no audio")),
            None => Err(StepError::invalid_output("synthesis output missing")),
        }
    }
}
