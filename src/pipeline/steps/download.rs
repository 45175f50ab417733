use super::{parameters, run_component, DeclaredOutput, PipelineStep, StageContext, StepResult};
use crate::constants::RAW_SAMPLE_ARTIFACT;
use crate::error::Result;
use crate::pipeline::stages::Stage;
use async_trait::async_trait;
use tracing::{info, instrument};

pub const GET_DATA_COMPONENT: &str = "get_data";

/// Fetches the configured raw sample and logs it as `sample.csv`
pub struct DownloadStep;

#[async_trait]
impl PipelineStep for DownloadStep {
    #[instrument(skip_all, fields(stage = "download"))]
    async fn execute(&self, ctx: &StageContext) -> Result<StepResult> {
        let sample = &ctx.config.etl.sample;
        info!("Downloading {} as {}", sample, RAW_SAMPLE_ARTIFACT);

        let description = "Raw file as downloaded";
        let params = parameters([
            ("sample", sample.clone()),
            ("artifact_name", RAW_SAMPLE_ARTIFACT.to_string()),
            ("artifact_type", "raw_data".to_string()),
            ("artifact_description", description.to_string()),
        ]);
        let logged = run_component(
            ctx,
            GET_DATA_COMPONENT,
            &params,
            &[],
            &[DeclaredOutput {
                name: RAW_SAMPLE_ARTIFACT,
                artifact_type: "raw_data",
                description,
            }],
        )
        .await?;

        let mut result = StepResult::success(1, format!("Downloaded {}", sample));
        for version in logged {
            result = result.with_artifact(version.reference().to_string());
        }
        Ok(result)
    }

    fn stage(&self) -> Stage {
        Stage::Download
    }
}
