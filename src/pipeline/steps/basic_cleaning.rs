use super::{PipelineStep, StageContext, StepResult};
use crate::constants::{CLEAN_SAMPLE_ARTIFACT, RAW_SAMPLE_ARTIFACT};
use crate::dataset::{read_csv, write_csv};
use crate::error::Result;
use crate::pipeline::processing::cleaning;
use crate::pipeline::stages::Stage;
use async_trait::async_trait;
use tracing::{info, instrument};

/// Drops price outliers, parses review dates and fills missing names
pub struct BasicCleaningStep;

#[async_trait]
impl PipelineStep for BasicCleaningStep {
    #[instrument(skip_all, fields(stage = "basic_cleaning"))]
    async fn execute(&self, ctx: &StageContext) -> Result<StepResult> {
        let raw = ctx
            .store
            .resolve(&format!("{}:latest", RAW_SAMPLE_ARTIFACT))
            .await?;
        info!("Cleaning {}", raw.version.reference());

        let data = read_csv(&raw.path)?;
        let (cleaned, summary) =
            cleaning::clean(&data, ctx.config.etl.min_price, ctx.config.etl.max_price)?;

        let output = ctx.work_path(CLEAN_SAMPLE_ARTIFACT);
        write_csv(&cleaned, &output)?;
        let logged = ctx
            .store
            .log_artifact(
                CLEAN_SAMPLE_ARTIFACT,
                "clean_sample",
                "Data with outliers and null values removed",
                &output,
            )
            .await?;

        Ok(StepResult::success(
            summary.kept_rows,
            format!(
                "Kept {} of {} rows ({} dropped)",
                summary.kept_rows, summary.input_rows, summary.dropped_rows
            ),
        )
        .with_artifact(logged.reference().to_string())
        .with_metadata("dropped_rows", summary.dropped_rows)
        .with_metadata("unparsed_dates", summary.unparsed_dates))
    }

    fn stage(&self) -> Stage {
        Stage::BasicCleaning
    }
}
