use crate::app::ports::{ArtifactExchange, ComponentRunner};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{error, info};

/// Directory the child reads its staged input artifacts from
pub const ARTIFACT_INPUT_DIR_ENV: &str = "PIPELINE_ARTIFACT_INPUT_DIR";
/// Directory the child writes the artifacts it produces to
pub const ARTIFACT_OUTPUT_DIR_ENV: &str = "PIPELINE_ARTIFACT_OUTPUT_DIR";

/// Runs packaged components as `mlflow run <repository>/<component>`
pub struct MlflowComponentRunner {
    repository: String,
    program: PathBuf,
    env: BTreeMap<String, String>,
}

impl MlflowComponentRunner {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            program: PathBuf::from("mlflow"),
            env: BTreeMap::new(),
        }
    }

    /// Use another executable in place of `mlflow`
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Export `key=value` into every child process
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    /// `<repository>/<component>`; a URL repository keeps its `/` joins
    pub fn component_uri(&self, component: &str) -> String {
        format!("{}/{}", self.repository.trim_end_matches('/'), component)
    }

    pub fn arguments(
        &self,
        component: &str,
        entry_point: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            self.component_uri(component),
            "-e".to_string(),
            entry_point.to_string(),
        ];
        for (key, value) in parameters {
            args.push("-P".to_string());
            args.push(format!("{}={}", key, value));
        }
        args
    }
}

#[async_trait]
impl ComponentRunner for MlflowComponentRunner {
    async fn run(
        &self,
        component: &str,
        entry_point: &str,
        parameters: &BTreeMap<String, String>,
        exchange: &ArtifactExchange,
    ) -> Result<()> {
        let args = self.arguments(component, entry_point, parameters);
        info!(
            "Running component {} ({} {})",
            component,
            self.program.display(),
            args.join(" ")
        );

        let status = Command::new(&self.program)
            .args(&args)
            .envs(&self.env)
            .env(ARTIFACT_INPUT_DIR_ENV, &exchange.input_dir)
            .env(ARTIFACT_OUTPUT_DIR_ENV, &exchange.output_dir)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|e| PipelineError::Component {
                component: component.to_string(),
                message: format!("failed to start {}: {}", self.program.display(), e),
            })?;

        if !status.success() {
            error!("Component {} exited with {}", component, status);
            return Err(PipelineError::Component {
                component: component.to_string(),
                message: format!("exited with {}", status),
            });
        }
        Ok(())
    }
}
