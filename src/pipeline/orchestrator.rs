use super::stages::{Stage, StagePlan};
use super::steps::{create_step, StageContext, StepResult};
use crate::app::ports::{ArtifactStore, ComponentRunner};
use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::observability::metrics;
use crate::validation::{CheckReporter, TracingReporter};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Runs the enabled stages one after another, stopping at the first failure
pub struct PipelineOrchestrator {
    store: Arc<dyn ArtifactStore>,
    components: Arc<dyn ComponentRunner>,
    reporter: Arc<dyn CheckReporter>,
}

impl PipelineOrchestrator {
    pub fn new(store: Arc<dyn ArtifactStore>, components: Arc<dyn ComponentRunner>) -> Self {
        Self {
            store,
            components,
            reporter: Arc::new(TracingReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn CheckReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Run every stage `config.main.steps` enables inside a fresh scratch directory
    pub async fn run_pipeline(&self, config: &Config) -> Result<PipelineExecutionResult> {
        let plan = StagePlan::resolve(&config.requested_steps())?;
        let work_dir = tempfile::TempDir::new()?;
        let ctx = StageContext::new(
            config.clone(),
            self.store.clone(),
            self.components.clone(),
            work_dir.path(),
        )
        .with_reporter(self.reporter.clone());

        let stages: Vec<Stage> = plan.enabled().map(|d| d.stage).collect();
        info!(
            "Starting pipeline '{}' ({}): {} stage(s)",
            config.main.project_name,
            config.main.experiment_name,
            stages.len()
        );

        let mut execution = PipelineExecutionResult::new(&config.main.project_name);
        for (index, stage) in stages.iter().enumerate() {
            info!("Executing stage {}/{}: {}", index + 1, stages.len(), stage);
            let step = create_step(*stage);
            let outcome = {
                let _timer = metrics::stage::started(stage.as_str());
                step.execute(&ctx).await
            };

            match outcome {
                Ok(result) => {
                    info!("Stage '{}' completed: {}", stage, result.message);
                    execution.add_step_result(*stage, result);
                }
                Err(e) => {
                    error!("Stage '{}' failed: {}", stage, e);
                    metrics::stage::failed(stage.as_str());
                    execution.add_step_result(*stage, StepResult::failure(e.to_string()));
                    execution.fail(*stage, e.to_string());
                    let skipped = stages.len() - index - 1;
                    if skipped > 0 {
                        warn!("Stopping pipeline; {} later stage(s) not run", skipped);
                    }
                    break;
                }
            }
        }

        execution.complete();
        if execution.success {
            info!("Pipeline '{}' completed successfully", execution.pipeline_name);
        } else {
            error!("Pipeline '{}' failed", execution.pipeline_name);
        }
        Ok(execution)
    }
}

/// Result of executing the pipeline
#[derive(Debug, Clone, Serialize)]
pub struct PipelineExecutionResult {
    pub pipeline_name: String,
    pub success: bool,
    pub step_results: Vec<(Stage, StepResult)>,
    pub failed_stage: Option<Stage>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PipelineExecutionResult {
    pub fn new(pipeline_name: &str) -> Self {
        Self {
            pipeline_name: pipeline_name.to_string(),
            success: true,
            step_results: Vec::new(),
            failed_stage: None,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn add_step_result(&mut self, stage: Stage, result: StepResult) {
        self.step_results.push((stage, result));
    }

    pub fn fail(&mut self, stage: Stage, message: String) {
        self.success = false;
        self.failed_stage = Some(stage);
        self.error = Some(message);
    }

    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|end| end - self.started_at)
    }

    pub fn stages_run(&self) -> Vec<Stage> {
        self.step_results.iter().map(|(stage, _)| *stage).collect()
    }

    /// `Err(StageFailed)` when a stage failed
    pub fn into_result(self) -> Result<Self> {
        match (self.failed_stage, &self.error) {
            (Some(stage), Some(message)) => Err(PipelineError::StageFailed {
                stage: stage.to_string(),
                message: message.clone(),
            }),
            _ => Ok(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::FsArtifactStore;
    use crate::pipeline::steps::testing::{config, seed, RecordingRunner};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_component_stages_run_in_order() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FsArtifactStore::new(dir.path().join("store")));
        seed(&store, &dir, "trainval_data.csv", "id,price\n1,150\n").await;
        seed(&store, &dir, "test_data.csv", "id,price\n2,95\n").await;
        seed(&store, &dir, "random_forest_export:prod", "promoted model").await;
        let runner = Arc::new(RecordingRunner::with_component_outputs());
        let orchestrator = PipelineOrchestrator::new(store.clone(), runner.clone());

        let config = config()
            .with_steps("test_regression_model,train_random_forest,download")
            .unwrap();
        let result = orchestrator.run_pipeline(&config).await.unwrap();

        assert!(result.success);
        assert_eq!(
            result.stages_run(),
            vec![Stage::Download, Stage::TrainRandomForest, Stage::TestRegressionModel]
        );
        assert_eq!(
            runner.components(),
            vec!["get_data", "train_random_forest", "test_regression_model"]
        );
        assert!(result.completed_at.is_some());

        // the fresh export moves `latest` while the test stage keeps using `prod`
        let latest = store.resolve("random_forest_export:latest").await.unwrap();
        let prod = store.resolve("random_forest_export:prod").await.unwrap();
        assert_eq!((latest.version.version, prod.version.version), (1, 0));
    }

    #[tokio::test]
    async fn test_downloaded_sample_feeds_cleaning() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FsArtifactStore::new(dir.path().join("store")));
        let runner = Arc::new(RecordingRunner::default().producing(
            "get_data",
            "sample.csv",
            "id,name,host_name,price,last_review\n1,Loft,Ana,150,2019-05-21\n2,Castle,Bo,5000,\n",
        ));
        let orchestrator = PipelineOrchestrator::new(store.clone(), runner);

        let config = config().with_steps("download,basic_cleaning").unwrap();
        let result = orchestrator.run_pipeline(&config).await.unwrap();

        assert!(result.success, "{:?}", result.error);
        let clean = store.resolve("clean_sample.csv:latest").await.unwrap();
        let cleaned = crate::dataset::read_csv(&clean.path).unwrap();
        assert_eq!(cleaned.row_count(), 1);
    }

    #[tokio::test]
    async fn test_stops_at_first_failing_stage() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FsArtifactStore::new(dir.path()));
        let runner = Arc::new(RecordingRunner::default());
        let orchestrator = PipelineOrchestrator::new(store, runner.clone());

        // nothing was downloaded, so cleaning cannot resolve sample.csv
        let config = config().with_steps("basic_cleaning,data_check,data_split").unwrap();
        let result = orchestrator.run_pipeline(&config).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.failed_stage, Some(Stage::BasicCleaning));
        assert_eq!(result.stages_run(), vec![Stage::BasicCleaning]);
        assert!(matches!(
            result.into_result(),
            Err(PipelineError::StageFailed { ref stage, .. }) if stage == "basic_cleaning"
        ));
    }

    #[tokio::test]
    async fn test_failing_component_halts_run() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FsArtifactStore::new(dir.path()));
        let runner = Arc::new(RecordingRunner {
            fail: true,
            ..RecordingRunner::default()
        });
        let orchestrator = PipelineOrchestrator::new(store, runner.clone());

        let result = orchestrator.run_pipeline(&config()).await.unwrap();
        assert_eq!(result.failed_stage, Some(Stage::Download));
        assert_eq!(runner.calls.lock().unwrap().len(), 1);
    }
}
