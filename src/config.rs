use crate::constants;
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub main: MainConfig,
    pub etl: EtlConfig,
    pub data_check: DataCheckConfig,
    pub modeling: ModelingConfig,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainConfig {
    pub project_name: String,
    pub experiment_name: String,
    /// `"all"` or a comma-separated list of stage names
    #[serde(default = "default_steps")]
    pub steps: String,
    pub components_repository: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtlConfig {
    pub sample: String,
    pub min_price: f64,
    pub max_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataCheckConfig {
    pub kl_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelingConfig {
    pub test_size: f64,
    pub val_size: f64,
    pub random_seed: u64,
    /// Column to stratify the splits by, or `"none"`
    pub stratify_by: String,
    #[serde(default = "default_max_tfidf_features")]
    pub max_tfidf_features: u32,
    /// Handed to the training component verbatim as JSON
    #[serde(default)]
    pub random_forest: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    pub root: PathBuf,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("artifacts"),
        }
    }
}

fn default_steps() -> String {
    "all".to_string()
}

fn default_max_tfidf_features() -> u32 {
    5
}

impl Config {
    /// Load `config.toml` from the working directory
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_PATH))
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;

        let config = Self::from_toml_str(&config_content)?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Replace the configured steps, e.g. from a `--steps` CLI override
    pub fn with_steps(mut self, steps: &str) -> Result<Self> {
        self.main.steps = steps.to_string();
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.etl.min_price < self.etl.max_price) {
            return Err(PipelineError::Config(format!(
                "etl.min_price ({}) must be below etl.max_price ({})",
                self.etl.min_price, self.etl.max_price
            )));
        }

        let kl = self.data_check.kl_threshold;
        if !kl.is_finite() || kl < 0.0 {
            return Err(PipelineError::Config(format!(
                "data_check.kl_threshold must be a non-negative number, got {}",
                kl
            )));
        }

        let test_size = self.modeling.test_size;
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(PipelineError::Config(format!(
                "modeling.test_size must lie in (0, 1), got {}",
                test_size
            )));
        }

        let val_size = self.modeling.val_size;
        if !(0.0..1.0).contains(&val_size) {
            return Err(PipelineError::Config(format!(
                "modeling.val_size must lie in [0, 1), got {}",
                val_size
            )));
        }

        for step in self.requested_steps() {
            if step != "all" && !constants::get_all_steps().contains(&step.as_str()) {
                return Err(PipelineError::Config(format!("Unknown step '{}'", step)));
            }
        }

        Ok(())
    }

    /// The raw step names from `main.steps`, trimmed
    pub fn requested_steps(&self) -> Vec<String> {
        self.main
            .steps
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Random forest hyperparameters as the JSON document the training component reads
    pub fn random_forest_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(&self.modeling.random_forest)?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE_CONFIG: &str = r#"
[main]
project_name = "nyc_airbnb"
experiment_name = "development"
steps = "all"
components_repository = "https://github.com/udacity/build-ml-pipeline-for-short-term-rental-prices#components"

[etl]
sample = "sample1.csv"
min_price = 10
max_price = 350

[data_check]
kl_threshold = 0.2

[modeling]
test_size = 0.2
val_size = 0.2
random_seed = 42
stratify_by = "neighbourhood_group"
max_tfidf_features = 5

[modeling.random_forest]
n_estimators = 100
max_depth = 15
min_samples_split = 4
min_samples_leaf = 3
n_jobs = -1
criterion = "mae"
max_features = 0.5
oob_score = true
"#;

    #[test]
    fn test_parses_sample_config() {
        let config = Config::from_toml_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.etl.min_price, 10.0);
        assert_eq!(config.etl.max_price, 350.0);
        assert_eq!(config.data_check.kl_threshold, 0.2);
        assert_eq!(config.modeling.random_seed, 42);
        assert_eq!(config.artifacts.root, PathBuf::from("artifacts"));
        assert_eq!(config.requested_steps(), vec!["all".to_string()]);
    }

    #[test]
    fn test_rejects_inverted_price_bounds() {
        let bad = SAMPLE_CONFIG.replace("max_price = 350", "max_price = 5");
        let err = Config::from_toml_str(&bad).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_rejects_negative_kl_threshold() {
        let bad = SAMPLE_CONFIG.replace("kl_threshold = 0.2", "kl_threshold = -0.1");
        assert!(Config::from_toml_str(&bad).is_err());
    }

    #[test]
    fn test_rejects_unknown_step_override() {
        let config = Config::from_toml_str(SAMPLE_CONFIG).unwrap();
        assert!(config.clone().with_steps("download,basic_cleaning").is_ok());
        assert!(config.with_steps("download,deploy").is_err());
    }

    #[test]
    fn test_random_forest_section_serializes_to_json() {
        let config = Config::from_toml_str(SAMPLE_CONFIG).unwrap();
        let json = config.random_forest_json().unwrap();
        assert_eq!(json["n_estimators"], 100);
        assert_eq!(json["criterion"], "mae");
        assert_eq!(json["oob_score"], true);
    }
}
