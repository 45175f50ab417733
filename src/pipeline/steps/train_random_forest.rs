use super::{parameters, run_component, DeclaredOutput, PipelineStep, StageContext, StepResult};
use crate::constants::{MODEL_EXPORT_ARTIFACT, TRAINVAL_ARTIFACT};
use crate::error::Result;
use crate::pipeline::stages::Stage;
use async_trait::async_trait;
use tracing::{debug, info, instrument};

pub const TRAIN_RANDOM_FOREST_COMPONENT: &str = "train_random_forest";
pub const RF_CONFIG_FILE: &str = "rf_config.json";

/// Writes the random forest hyperparameters to JSON, hands them and the
/// train/validation split to the training component and logs the model
/// export it writes
pub struct TrainRandomForestStep;

#[async_trait]
impl PipelineStep for TrainRandomForestStep {
    #[instrument(skip_all, fields(stage = "train_random_forest"))]
    async fn execute(&self, ctx: &StageContext) -> Result<StepResult> {
        let rf_config = ctx.work_path(RF_CONFIG_FILE);
        let document = ctx.config.random_forest_json()?;
        tokio::fs::write(&rf_config, serde_json::to_vec(&document)?).await?;
        debug!("Wrote random forest config to {}", rf_config.display());

        let trainval = format!("{}:latest", TRAINVAL_ARTIFACT);
        let modeling = &ctx.config.modeling;
        let params = parameters([
            ("trainval_artifact", trainval.clone()),
            ("val_size", modeling.val_size.to_string()),
            ("random_seed", modeling.random_seed.to_string()),
            ("stratify_by", modeling.stratify_by.clone()),
            ("rf_config", rf_config.display().to_string()),
            ("max_tfidf_features", modeling.max_tfidf_features.to_string()),
            ("output_artifact", MODEL_EXPORT_ARTIFACT.to_string()),
        ]);
        info!("Training random forest on {}", trainval);
        let logged = run_component(
            ctx,
            TRAIN_RANDOM_FOREST_COMPONENT,
            &params,
            &[trainval.as_str()],
            &[DeclaredOutput {
                name: MODEL_EXPORT_ARTIFACT,
                artifact_type: "model_export",
                description: "Random forest pipeline export",
            }],
        )
        .await?;

        let mut result = StepResult::success(1, "Trained random forest".to_string())
            .with_metadata("rf_config", rf_config.display());
        for version in logged {
            result = result.with_artifact(version.reference().to_string());
        }
        Ok(result)
    }

    fn stage(&self) -> Stage {
        Stage::TrainRandomForest
    }
}
