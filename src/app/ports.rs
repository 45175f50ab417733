use crate::constants::LATEST_ALIAS;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// A `name:alias` reference to one immutable artifact snapshot.
///
/// A bare `name` means `name:latest`; an alias of the form `vN` addresses
/// version `N` directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReference {
    pub name: String,
    pub alias: String,
}

impl ArtifactReference {
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        // split on the last ':' so names may contain one
        let (name, alias) = match reference.rsplit_once(':') {
            Some((name, alias)) => (name, alias),
            None => (reference, LATEST_ALIAS),
        };
        if name.is_empty() || alias.is_empty() {
            return Err(PipelineError::Artifact(format!(
                "invalid artifact reference '{}'",
                reference
            )));
        }
        Ok(Self {
            name: name.to_string(),
            alias: alias.to_string(),
        })
    }

    pub fn new(name: &str, alias: &str) -> Self {
        Self {
            name: name.to_string(),
            alias: alias.to_string(),
        }
    }

    /// The explicit version number when the alias is `vN`
    pub fn version(&self) -> Option<u32> {
        self.alias.strip_prefix('v')?.parse().ok()
    }
}

impl fmt::Display for ArtifactReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.alias)
    }
}

/// Metadata of one stored artifact version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactVersion {
    pub name: String,
    pub version: u32,
    pub artifact_type: String,
    pub description: String,
    /// `cas:sha256:<hex>` content address of the blob
    pub digest: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl ArtifactVersion {
    pub fn reference(&self) -> ArtifactReference {
        ArtifactReference::new(&self.name, &format!("v{}", self.version))
    }
}

/// An artifact version materialised as a local file
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedArtifact {
    pub version: ArtifactVersion,
    pub path: PathBuf,
}

/// Versioned storage of named, typed blobs (datasets and models)
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Upload `path` as a new version of `name` and move `latest` to it
    async fn log_artifact(
        &self,
        name: &str,
        artifact_type: &str,
        description: &str,
        path: &Path,
    ) -> Result<ArtifactVersion>;

    /// Resolve a `name:alias` reference to a local file
    async fn resolve(&self, reference: &str) -> Result<ResolvedArtifact>;

    /// Point `alias` at the version `reference` resolves to
    async fn add_alias(&self, reference: &str, alias: &str) -> Result<ArtifactVersion>;
}

/// Local directories shared with one component run.
///
/// The pipeline stages the component's input artifacts into `input_dir`
/// before the run and logs whatever the component leaves in `output_dir`
/// into the artifact store afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactExchange {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl ArtifactExchange {
    /// `<root>/inputs` and `<root>/outputs`
    pub fn new(root: &Path) -> Self {
        Self {
            input_dir: root.join("inputs"),
            output_dir: root.join("outputs"),
        }
    }

    pub fn input(&self, file_name: &str) -> PathBuf {
        self.input_dir.join(file_name)
    }

    pub fn output(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}

/// Runs an externally packaged pipeline component
#[async_trait]
pub trait ComponentRunner: Send + Sync {
    async fn run(
        &self,
        component: &str,
        entry_point: &str,
        parameters: &BTreeMap<String, String>,
        exchange: &ArtifactExchange,
    ) -> Result<()>;
}
