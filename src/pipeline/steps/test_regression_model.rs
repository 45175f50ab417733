use super::{parameters, run_component, PipelineStep, StageContext, StepResult};
use crate::constants::{MODEL_EXPORT_ARTIFACT, PROD_ALIAS, TEST_ARTIFACT};
use crate::error::Result;
use crate::pipeline::stages::Stage;
use async_trait::async_trait;
use tracing::{info, instrument};

pub const TEST_REGRESSION_MODEL_COMPONENT: &str = "test_regression_model";

/// Scores the model promoted to `prod` against the held-out test split
pub struct TestRegressionModelStep;

#[async_trait]
impl PipelineStep for TestRegressionModelStep {
    #[instrument(skip_all, fields(stage = "test_regression_model"))]
    async fn execute(&self, ctx: &StageContext) -> Result<StepResult> {
        let model = format!("{}:{}", MODEL_EXPORT_ARTIFACT, PROD_ALIAS);
        let test_dataset = format!("{}:latest", TEST_ARTIFACT);
        info!("Testing {} against {}", model, test_dataset);

        let params = parameters([
            ("mlflow_model", model.clone()),
            ("test_dataset", test_dataset.clone()),
        ]);
        run_component(
            ctx,
            TEST_REGRESSION_MODEL_COMPONENT,
            &params,
            &[model.as_str(), test_dataset.as_str()],
            &[],
        )
        .await?;

        Ok(StepResult::success(1, format!("Tested {}", model)))
    }

    fn stage(&self) -> Stage {
        Stage::TestRegressionModel
    }
}
