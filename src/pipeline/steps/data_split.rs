use super::{PipelineStep, StageContext, StepResult};
use crate::constants::{CLEAN_SAMPLE_ARTIFACT, TEST_ARTIFACT, TRAINVAL_ARTIFACT};
use crate::dataset::{read_csv, write_csv};
use crate::error::Result;
use crate::pipeline::processing::split::{train_test_split, SplitParameters};
use crate::pipeline::stages::Stage;
use async_trait::async_trait;
use tracing::{info, instrument};

/// Holds out the test partition of the latest cleaned sample
pub struct DataSplitStep;

#[async_trait]
impl PipelineStep for DataSplitStep {
    #[instrument(skip_all, fields(stage = "data_split"))]
    async fn execute(&self, ctx: &StageContext) -> Result<StepResult> {
        let modeling = &ctx.config.modeling;
        let params = SplitParameters::new(
            modeling.test_size,
            modeling.random_seed,
            &modeling.stratify_by,
        );

        let clean = ctx
            .store
            .resolve(&format!("{}:latest", CLEAN_SAMPLE_ARTIFACT))
            .await?;
        info!("Splitting {} (test_size {})", clean.version.reference(), params.test_size);
        let data = read_csv(&clean.path)?;
        let (trainval, test) = train_test_split(&data, &params)?;

        let mut result = StepResult::success(
            data.row_count(),
            format!("{} trainval / {} test rows", trainval.row_count(), test.row_count()),
        );
        for (name, artifact_type, partition) in [
            (TRAINVAL_ARTIFACT, "trainval_data", &trainval),
            (TEST_ARTIFACT, "test_data", &test),
        ] {
            let path = ctx.work_path(name);
            write_csv(partition, &path)?;
            let logged = ctx
                .store
                .log_artifact(
                    name,
                    artifact_type,
                    &format!("{} split of the data", artifact_type),
                    &path,
                )
                .await?;
            result = result.with_artifact(logged.reference().to_string());
        }

        Ok(result)
    }

    fn stage(&self) -> Stage {
        Stage::DataSplit
    }
}
