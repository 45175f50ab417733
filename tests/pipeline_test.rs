#![cfg(unix)]

mod common;

use anyhow::Result;
use common::{listings_csv, write, CONFIG};
use nyc_rental_pipeline::app::ports::ArtifactStore;
use nyc_rental_pipeline::config::Config;
use nyc_rental_pipeline::dataset::read_csv;
use nyc_rental_pipeline::infra::{FsArtifactStore, MlflowComponentRunner};
use nyc_rental_pipeline::pipeline::{PipelineOrchestrator, Stage};
use nyc_rental_pipeline::validation::MemoryReporter;
use nyc_rental_pipeline::PipelineError;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

/// Stands in for `mlflow run <repository>/<component> -e main -P ...`.
/// `get_data` publishes `$SAMPLE_SOURCE`; training exports a model built
/// from the staged train/validation split.
const FAKE_MLFLOW: &str = r#"#!/bin/sh
component=$(basename "$2")
echo "$component" >> "$CALL_LOG"
case "$component" in
  get_data)
    cp "$SAMPLE_SOURCE" "$PIPELINE_ARTIFACT_OUTPUT_DIR/sample.csv"
    ;;
  train_random_forest)
    trainval="$PIPELINE_ARTIFACT_INPUT_DIR/trainval_data.csv"
    [ -f "$trainval" ] || exit 3
    lines=$(wc -l < "$trainval")
    echo "trained on $((lines)) lines" > "$PIPELINE_ARTIFACT_OUTPUT_DIR/random_forest_export"
    ;;
esac
"#;

struct Fixture {
    dir: TempDir,
    store: Arc<FsArtifactStore>,
    runner: Arc<MlflowComponentRunner>,
}

impl Fixture {
    fn new(rows: usize, price_of: impl Fn(usize) -> f64) -> Self {
        let dir = tempdir().unwrap();
        let sample = dir.path().join("sample1.csv");
        write(&sample, &listings_csv(rows, price_of));
        let program = dir.path().join("fake-mlflow");
        write(&program, FAKE_MLFLOW);
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

        let store = Arc::new(FsArtifactStore::new(dir.path().join("artifacts")));
        let runner = Arc::new(
            MlflowComponentRunner::new("components")
                .with_program(&program)
                .with_env("SAMPLE_SOURCE", path_str(&sample))
                .with_env("CALL_LOG", path_str(&dir.path().join("calls.log"))),
        );
        Self { dir, store, runner }
    }

    fn orchestrator(&self) -> PipelineOrchestrator {
        PipelineOrchestrator::new(self.store.clone(), self.runner.clone())
    }

    fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[tokio::test]
async fn test_full_run_gates_training_on_data_check() -> Result<()> {
    // every 50th listing is a price outlier the cleaning stage drops
    let fixture = Fixture::new(16_000, |i| if i % 50 == 0 { 9_000.0 } else { 95.0 });
    let store = fixture.store.clone();
    let orchestrator = fixture.orchestrator();
    let config = Config::from_toml_str(CONFIG)?;

    // first run produces the cleaned sample that becomes the reference
    let first = orchestrator
        .run_pipeline(&config.clone().with_steps("download,basic_cleaning")?)
        .await?;
    assert!(first.success, "{:?}", first.error);
    store.add_alias("clean_sample.csv:latest", "reference").await?;

    let result = orchestrator.run_pipeline(&config).await?.into_result()?;
    assert_eq!(
        result.stages_run(),
        vec![
            Stage::Download,
            Stage::BasicCleaning,
            Stage::DataCheck,
            Stage::DataSplit,
            Stage::TrainRandomForest,
        ]
    );

    let raw = store.resolve("sample.csv:latest").await?;
    assert_eq!(raw.version.artifact_type, "raw_data");
    let clean = read_csv(&store.resolve("clean_sample.csv:latest").await?.path)?;
    assert_eq!(clean.row_count(), 15_680);
    let test = read_csv(&store.resolve("test_data.csv:latest").await?.path)?;
    let trainval = read_csv(&store.resolve("trainval_data.csv:latest").await?.path)?;
    assert_eq!(test.row_count() + trainval.row_count(), 15_680);
    assert_eq!(test.row_count(), 3_136);

    // header plus every trainval row reached the component
    let model = store.resolve("random_forest_export:latest").await?;
    assert_eq!(model.version.artifact_type, "model_export");
    let export = std::fs::read_to_string(&model.path)?;
    assert_eq!(export.trim(), format!("trained on {} lines", 12_544 + 1));

    assert_eq!(fixture.calls(), vec!["get_data", "get_data", "train_random_forest"]);
    Ok(())
}

#[tokio::test]
async fn test_failed_data_check_stops_before_split() -> Result<()> {
    // too few rows to pass the row-count check
    let fixture = Fixture::new(500, |_| 95.0);
    let store = fixture.store.clone();
    let reporter = Arc::new(MemoryReporter::new());
    let orchestrator = fixture.orchestrator().with_reporter(reporter.clone());
    let config = Config::from_toml_str(CONFIG)?;

    orchestrator
        .run_pipeline(&config.clone().with_steps("download,basic_cleaning")?)
        .await?
        .into_result()?;
    store.add_alias("clean_sample.csv", "reference").await?;

    let result = orchestrator.run_pipeline(&config).await?;
    assert!(!result.success);
    assert_eq!(result.failed_stage, Some(Stage::DataCheck));
    assert!(result.error.as_deref().unwrap_or_default().contains("row_count"));
    assert!(store.resolve("test_data.csv:latest").await.is_err());
    assert!(!fixture.calls().contains(&"train_random_forest".to_string()));

    let failed: Vec<String> = reporter
        .outcomes()
        .iter()
        .filter(|o| !o.passed())
        .map(|o| o.check.to_string())
        .collect();
    assert_eq!(failed, vec!["row_count"]);

    assert!(matches!(
        result.into_result(),
        Err(PipelineError::StageFailed { ref stage, .. }) if stage == "data_check"
    ));
    Ok(())
}

#[tokio::test]
async fn test_component_that_writes_nothing_fails_download() -> Result<()> {
    let dir = tempdir()?;
    let store = Arc::new(FsArtifactStore::new(dir.path().join("artifacts")));
    let runner = Arc::new(MlflowComponentRunner::new("components").with_program("true"));
    let config = Config::from_toml_str(CONFIG)?;

    let result = PipelineOrchestrator::new(store.clone(), runner)
        .run_pipeline(&config)
        .await?;

    assert_eq!(result.failed_stage, Some(Stage::Download));
    assert_eq!(result.stages_run(), vec![Stage::Download]);
    let error = result.error.unwrap_or_default();
    assert!(error.contains("did not write declared output sample.csv"), "{}", error);
    assert!(store.resolve("sample.csv").await.is_err());
    Ok(())
}
