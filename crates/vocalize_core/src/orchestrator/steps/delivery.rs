//! Delivery step - local output folder plus remote destinations.
//!
//! Delivery never fails the task. Each destination is attempted on its own;
//! a failure is logged as a warning and reported on the task's upload
//! status while the remaining destinations still run.

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{Destination, RemoteReceipt, UploadStatus};
use crate::orchestrator::collaborators::{CollaboratorError, Deliverer};
use crate::orchestrator::delivery::LocalFolderDelivery;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{DeliveryOutput, ProductionContext, ProductionState, StepOutcome};

/// Progress reported before delivery starts.
const DELIVERY_PROGRESS: u8 = 90;

pub struct DeliveryStep {
    local: LocalFolderDelivery,
    remote: Option<Arc<dyn Deliverer>>,
}

impl DeliveryStep {
    pub fn new(local: LocalFolderDelivery, remote: Option<Arc<dyn Deliverer>>) -> Self {
        Self { local, remote }
    }

    async fn deliver_remote(
        &self,
        destination: Destination,
        audio: &[u8],
        file_name: &str,
    ) -> Result<String, CollaboratorError> {
        match self.remote {
            Some(ref deliverer) => deliverer.deliver(destination, audio, file_name).await,
            None => Err(CollaboratorError::NotConfigured(format!(
                "{} delivery",
                destination
            ))),
        }
    }
}

#[async_trait]
impl PipelineStep for DeliveryStep {
    fn name(&self) -> &str {
        "Delivery"
    }

    fn description(&self) -> &str {
        "Deliver artifacts to destinations"
    }

    fn validate_input(&self, _ctx: &ProductionContext, state: &ProductionState) -> StepResult<()> {
        if state.processed.is_none() {
            return Err(StepError::precondition_failed("no processed audio to deliver"));
        }
        Ok(())
    }

    async fn execute(
        &self,
        ctx: &ProductionContext,
        state: &mut ProductionState,
    ) -> StepResult<StepOutcome> {
        let Some(ref processed) = state.processed else {
            return Err(StepError::precondition_failed("processed audio missing"));
        };
        let task = &ctx.task;

        ctx.report_progress(DELIVERY_PROGRESS, None);
        ctx.logger
            .info("Delivery: transmitting final asset to selected destinations");

        let mut output = DeliveryOutput::default();

        match self.local.store(&task.file_name, processed).await {
            Ok(artifacts) => {
                if let Some(ref path) = artifacts.audio {
                    ctx.logger.info(&format!("Delivery: saved {}", path));
                }
                output.artifacts = artifacts;
            }
            Err(e) => {
                ctx.logger
                    .warn(&format!("Local save failed for {}: {}", task.file_name, e));
                output.failed.push(Destination::Local);
            }
        }

        for destination in task.destinations.enabled_remote() {
            ctx.report_upload(destination, UploadStatus::Uploading);
            let result = self
                .deliver_remote(destination, &processed.primary_audio, &task.file_name)
                .await;

            match result {
                Ok(remote_id) => {
                    ctx.report_upload(destination, UploadStatus::Success);
                    ctx.logger
                        .success(&format!("Delivery: uploaded to {}", destination));
                    output.artifacts.remote.push(RemoteReceipt {
                        destination,
                        remote_id,
                    });
                }
                Err(e) => {
                    ctx.report_upload(destination, UploadStatus::Error);
                    ctx.logger.warn(&format!(
                        "Cloud Error: {} delivery interrupted ({})",
                        destination, e
                    ));
                    output.failed.push(destination);
                }
            }
        }

        state.delivery = Some(output);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &ProductionContext, _state: &ProductionState) -> StepResult<()> {
        Ok(())
    }

    fn is_optional(&self) -> bool {
        true
    }
}
