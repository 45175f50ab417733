use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid check parameters: {0}")]
    InvalidParameters(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Artifact store error: {0}")]
    Artifact(String),

    #[error("Component '{component}' failed: {message}")]
    Component { component: String, message: String },

    #[error("Data validation failed: {failed} check(s) failed ({})", .checks.join(", "))]
    ValidationFailed { failed: usize, checks: Vec<String> },

    #[error("Stage '{stage}' failed: {message}")]
    StageFailed { stage: String, message: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
