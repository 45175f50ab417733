// Infrastructure adapters implementing the application ports

pub mod fs_artifact_store;
pub mod mlflow_runner;

pub use fs_artifact_store::FsArtifactStore;
pub use mlflow_runner::MlflowComponentRunner;
