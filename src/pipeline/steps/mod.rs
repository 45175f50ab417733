use crate::app::ports::{ArtifactExchange, ArtifactStore, ArtifactVersion, ComponentRunner};
use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::pipeline::stages::Stage;
use crate::validation::{CheckReporter, TracingReporter};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Everything a stage may touch while it runs
#[derive(Clone)]
pub struct StageContext {
    pub config: Config,
    pub store: Arc<dyn ArtifactStore>,
    pub components: Arc<dyn ComponentRunner>,
    pub reporter: Arc<dyn CheckReporter>,
    /// Scratch directory for files produced before they are logged
    pub work_dir: PathBuf,
}

impl StageContext {
    pub fn new(
        config: Config,
        store: Arc<dyn ArtifactStore>,
        components: Arc<dyn ComponentRunner>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            store,
            components,
            reporter: Arc::new(TracingReporter),
            work_dir: work_dir.into(),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn CheckReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn work_path(&self, file_name: &str) -> PathBuf {
        self.work_dir.join(file_name)
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

/// Common trait for all pipeline stages
#[async_trait]
pub trait PipelineStep: Send + Sync {
    async fn execute(&self, ctx: &StageContext) -> Result<StepResult>;

    fn stage(&self) -> Stage;
}

/// Result of executing one stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    pub success: bool,
    pub processed_count: usize,
    pub message: String,
    /// `name:vN` references of every artifact the stage logged
    pub artifacts: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

impl StepResult {
    pub fn success(processed: usize, message: String) -> Self {
        Self {
            success: true,
            processed_count: processed,
            message,
            artifacts: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn failure(message: String) -> Self {
        Self {
            success: false,
            processed_count: 0,
            message,
            artifacts: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_artifact(mut self, reference: String) -> Self {
        self.artifacts.push(reference);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl ToString) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }
}

/// Build the step implementing `stage`
pub fn create_step(stage: Stage) -> Box<dyn PipelineStep> {
    match stage {
        Stage::Download => Box::new(DownloadStep),
        Stage::BasicCleaning => Box::new(BasicCleaningStep),
        Stage::DataCheck => Box::new(DataCheckStep),
        Stage::DataSplit => Box::new(DataSplitStep),
        Stage::TrainRandomForest => Box::new(TrainRandomForestStep),
        Stage::TestRegressionModel => Box::new(TestRegressionModelStep),
    }
}

/// A file a component must leave in its output directory, logged under `name`
pub(crate) struct DeclaredOutput<'a> {
    pub name: &'a str,
    pub artifact_type: &'a str,
    pub description: &'a str,
}

/// Run `component` through its artifact exchange.
///
/// Every `inputs` reference is resolved from the store and copied into the
/// input directory under its artifact name. After a successful run each
/// declared output is logged to the store; one the component did not write
/// fails the stage.
pub(crate) async fn run_component(
    ctx: &StageContext,
    component: &str,
    parameters: &BTreeMap<String, String>,
    inputs: &[&str],
    outputs: &[DeclaredOutput<'_>],
) -> Result<Vec<ArtifactVersion>> {
    let root = ctx.work_path(component);
    if tokio::fs::try_exists(&root).await? {
        tokio::fs::remove_dir_all(&root).await?;
    }
    let exchange = ArtifactExchange::new(&root);
    tokio::fs::create_dir_all(&exchange.input_dir).await?;
    tokio::fs::create_dir_all(&exchange.output_dir).await?;

    for reference in inputs {
        let resolved = ctx.store.resolve(reference).await?;
        let staged = exchange.input(&resolved.version.name);
        tokio::fs::copy(&resolved.path, &staged).await?;
        debug!("Staged {} at {}", resolved.version.reference(), staged.display());
    }

    ctx.components.run(component, "main", parameters, &exchange).await?;

    let mut logged = Vec::with_capacity(outputs.len());
    for output in outputs {
        let path = exchange.output(output.name);
        if !tokio::fs::try_exists(&path).await? {
            return Err(PipelineError::Component {
                component: component.to_string(),
                message: format!(
                    "did not write declared output {} to {}",
                    output.name,
                    exchange.output_dir.display()
                ),
            });
        }
        let version = ctx
            .store
            .log_artifact(output.name, output.artifact_type, output.description, &path)
            .await?;
        logged.push(version);
    }
    Ok(logged)
}

/// `-P` parameters for a component run
pub(crate) fn parameters<const N: usize>(pairs: [(&str, String); N]) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

pub mod basic_cleaning;
pub mod data_check;
pub mod data_split;
pub mod download;
pub mod test_regression_model;
pub mod train_random_forest;

pub use basic_cleaning::BasicCleaningStep;
pub use data_check::DataCheckStep;
pub use data_split::DataSplitStep;
pub use download::DownloadStep;
pub use test_regression_model::TestRegressionModelStep;
pub use train_random_forest::TrainRandomForestStep;

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::app::ports::ArtifactReference;
    use crate::constants::LATEST_ALIAS;
    use crate::infra::FsArtifactStore;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// One recorded component invocation
    #[derive(Debug, Clone)]
    pub(crate) struct ComponentCall {
        pub component: String,
        pub entry_point: String,
        pub parameters: BTreeMap<String, String>,
        /// File names staged in the input directory, sorted
        pub inputs: Vec<String>,
    }

    /// Records component invocations instead of spawning them, writing the
    /// configured files into the output directory
    #[derive(Default)]
    pub(crate) struct RecordingRunner {
        pub calls: Mutex<Vec<ComponentCall>>,
        pub fail: bool,
        pub outputs: Vec<(String, String, String)>,
    }

    impl RecordingRunner {
        /// Make `component` write `contents` to `file_name` in its output directory
        pub(crate) fn producing(
            mut self,
            component: &str,
            file_name: &str,
            contents: &str,
        ) -> Self {
            self.outputs.push((
                component.to_string(),
                file_name.to_string(),
                contents.to_string(),
            ));
            self
        }

        /// Writes the outputs the download and training stages declare
        pub(crate) fn with_component_outputs() -> Self {
            Self::default()
                .producing("get_data", "sample.csv", "id,price\n1,150\n")
                .producing("train_random_forest", "random_forest_export", "model")
        }

        pub(crate) fn components(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|call| call.component.clone())
                .collect()
        }
    }

    #[async_trait]
    impl ComponentRunner for RecordingRunner {
        async fn run(
            &self,
            component: &str,
            entry_point: &str,
            parameters: &BTreeMap<String, String>,
            exchange: &ArtifactExchange,
        ) -> Result<()> {
            let mut inputs: Vec<String> = std::fs::read_dir(&exchange.input_dir)?
                .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
                .collect::<std::io::Result<_>>()?;
            inputs.sort();
            self.calls.lock().unwrap().push(ComponentCall {
                component: component.to_string(),
                entry_point: entry_point.to_string(),
                parameters: parameters.clone(),
                inputs,
            });
            if self.fail {
                return Err(PipelineError::Component {
                    component: component.to_string(),
                    message: "exited with exit status: 1".to_string(),
                });
            }
            for (_, file_name, contents) in self.outputs.iter().filter(|o| o.0 == component) {
                std::fs::write(exchange.output(file_name), contents)?;
            }
            Ok(())
        }
    }

    pub(crate) fn config() -> Config {
        Config::from_toml_str(crate::config::tests::SAMPLE_CONFIG).unwrap()
    }

    /// Context over a fresh store and `runner`
    pub(crate) fn context_with(
        dir: &TempDir,
        runner: RecordingRunner,
    ) -> (StageContext, Arc<FsArtifactStore>, Arc<RecordingRunner>) {
        let store = Arc::new(FsArtifactStore::new(dir.path().join("store")));
        let runner = Arc::new(runner);
        let work = dir.path().join("work");
        std::fs::create_dir_all(&work).unwrap();
        let ctx = StageContext::new(config(), store.clone(), runner.clone(), work);
        (ctx, store, runner)
    }

    /// Context over a fresh store and a runner writing every declared output
    pub(crate) fn context(
        dir: &TempDir,
    ) -> (StageContext, Arc<FsArtifactStore>, Arc<RecordingRunner>) {
        context_with(dir, RecordingRunner::with_component_outputs())
    }

    /// Log `contents` as `reference`'s artifact, then alias it when the
    /// reference names something other than `latest`
    pub(crate) async fn seed(
        store: &FsArtifactStore,
        dir: &TempDir,
        reference: &str,
        contents: &str,
    ) {
        let parsed = ArtifactReference::parse(reference).unwrap();
        let path = dir.path().join(format!("seed-{}-{}", parsed.name, parsed.alias));
        std::fs::write(&path, contents).unwrap();
        store.log_artifact(&parsed.name, "seed", "", &path).await.unwrap();
        if parsed.alias != LATEST_ALIAS {
            store
                .add_alias(&format!("{}:latest", parsed.name), &parsed.alias)
                .await
                .unwrap();
        }
    }
}
