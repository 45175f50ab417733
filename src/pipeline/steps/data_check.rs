use super::{PipelineStep, StageContext, StepResult};
use crate::constants::{CLEAN_SAMPLE_ARTIFACT, LATEST_ALIAS, REFERENCE_ALIAS};
use crate::dataset::read_csv;
use crate::error::Result;
use crate::pipeline::stages::Stage;
use crate::validation::{CheckParameters, DataValidator};
use async_trait::async_trait;
use tracing::{error, info, instrument};

/// Gates the latest cleaned sample on the data checks.
///
/// Any failing check fails the stage, which halts the run before training.
pub struct DataCheckStep;

#[async_trait]
impl PipelineStep for DataCheckStep {
    #[instrument(skip_all, fields(stage = "data_check"))]
    async fn execute(&self, ctx: &StageContext) -> Result<StepResult> {
        let params = CheckParameters::from_config(&ctx.config)?;

        let candidate = ctx
            .store
            .resolve(&format!("{}:{}", CLEAN_SAMPLE_ARTIFACT, LATEST_ALIAS))
            .await?;
        let reference = ctx
            .store
            .resolve(&format!("{}:{}", CLEAN_SAMPLE_ARTIFACT, REFERENCE_ALIAS))
            .await?;
        info!(
            "Checking {} against {}",
            candidate.version.reference(),
            reference.version.reference()
        );

        let data = read_csv(&candidate.path)?;
        let reference_data = read_csv(&reference.path)?;

        let validator = DataValidator::new(params, ctx.reporter.clone());
        let report = validator.validate(&data, Some(&reference_data));
        let summary = report.summary();
        if !report.passed() {
            error!("Data check failed: {}", summary);
        }
        let report = report.into_result()?;

        Ok(StepResult::success(data.row_count(), summary)
            .with_metadata("checks_run", report.outcomes.len())
            .with_metadata("candidate", candidate.version.reference())
            .with_metadata("reference", reference.version.reference()))
    }

    fn stage(&self) -> Stage {
        Stage::DataCheck
    }
}
