use crate::constants::{
    BASIC_CLEANING_STEP, CLEAN_SAMPLE_ARTIFACT, DATA_CHECK_STEP, DATA_SPLIT_STEP, DOWNLOAD_STEP,
    MODEL_EXPORT_ARTIFACT, RAW_SAMPLE_ARTIFACT, TEST_ARTIFACT, TEST_REGRESSION_MODEL_STEP,
    TRAINVAL_ARTIFACT, TRAIN_RANDOM_FOREST_STEP,
};
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stages in canonical execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Download,
    BasicCleaning,
    DataCheck,
    DataSplit,
    TrainRandomForest,
    TestRegressionModel,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Download,
        Stage::BasicCleaning,
        Stage::DataCheck,
        Stage::DataSplit,
        Stage::TrainRandomForest,
        Stage::TestRegressionModel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Download => DOWNLOAD_STEP,
            Stage::BasicCleaning => BASIC_CLEANING_STEP,
            Stage::DataCheck => DATA_CHECK_STEP,
            Stage::DataSplit => DATA_SPLIT_STEP,
            Stage::TrainRandomForest => TRAIN_RANDOM_FOREST_STEP,
            Stage::TestRegressionModel => TEST_REGRESSION_MODEL_STEP,
        }
    }

    pub fn from_name(name: &str) -> Option<Stage> {
        Stage::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// Stages `"all"` leaves out; they run only when named
    pub fn explicit_only(&self) -> bool {
        matches!(self, Stage::TestRegressionModel)
    }

    /// Artifact references the stage reads
    pub fn inputs(&self) -> Vec<String> {
        match self {
            Stage::Download => vec![],
            Stage::BasicCleaning => vec![format!("{}:latest", RAW_SAMPLE_ARTIFACT)],
            Stage::DataCheck => vec![
                format!("{}:latest", CLEAN_SAMPLE_ARTIFACT),
                format!("{}:reference", CLEAN_SAMPLE_ARTIFACT),
            ],
            Stage::DataSplit => vec![format!("{}:latest", CLEAN_SAMPLE_ARTIFACT)],
            Stage::TrainRandomForest => vec![format!("{}:latest", TRAINVAL_ARTIFACT)],
            Stage::TestRegressionModel => vec![
                format!("{}:prod", MODEL_EXPORT_ARTIFACT),
                format!("{}:latest", TEST_ARTIFACT),
            ],
        }
    }

    /// Artifact names the stage logs
    pub fn outputs(&self) -> Vec<String> {
        let names: &[&str] = match self {
            Stage::Download => &[RAW_SAMPLE_ARTIFACT],
            Stage::BasicCleaning => &[CLEAN_SAMPLE_ARTIFACT],
            Stage::DataCheck => &[],
            Stage::DataSplit => &[TRAINVAL_ARTIFACT, TEST_ARTIFACT],
            Stage::TrainRandomForest => &[MODEL_EXPORT_ARTIFACT],
            Stage::TestRegressionModel => &[],
        };
        names.iter().map(|n| n.to_string()).collect()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stage with its input/output contract and whether this run executes it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageDescriptor {
    pub stage: Stage,
    pub enabled: bool,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl StageDescriptor {
    fn new(stage: Stage, enabled: bool) -> Self {
        Self {
            stage,
            enabled,
            inputs: stage.inputs(),
            outputs: stage.outputs(),
        }
    }
}

/// Descriptors for every stage, resolved once from the requested step names
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagePlan {
    descriptors: Vec<StageDescriptor>,
}

impl StagePlan {
    /// Resolve `["all"]` or explicit stage names into a plan
    pub fn resolve<S: AsRef<str>>(steps: &[S]) -> Result<Self> {
        let mut requested = Vec::new();
        let mut all = false;
        for step in steps {
            let step = step.as_ref().trim();
            if step.is_empty() {
                continue;
            }
            if step == "all" {
                all = true;
                continue;
            }
            let stage = Stage::from_name(step)
                .ok_or_else(|| PipelineError::Config(format!("Unknown step '{}'", step)))?;
            requested.push(stage);
        }

        let descriptors = Stage::ALL
            .into_iter()
            .map(|stage| {
                let enabled = requested.contains(&stage) || (all && !stage.explicit_only());
                StageDescriptor::new(stage, enabled)
            })
            .collect();
        Ok(Self { descriptors })
    }

    pub fn descriptors(&self) -> &[StageDescriptor] {
        &self.descriptors
    }

    /// Enabled descriptors in execution order
    pub fn enabled(&self) -> impl Iterator<Item = &StageDescriptor> {
        self.descriptors.iter().filter(|d| d.enabled)
    }

    pub fn is_enabled(&self, stage: Stage) -> bool {
        self.enabled().any(|d| d.stage == stage)
    }
}
