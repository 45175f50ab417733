use crate::app::ports::{ArtifactReference, ArtifactStore, ArtifactVersion, ResolvedArtifact};
use crate::constants::LATEST_ALIAS;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

const DIGEST_PREFIX: &str = "cas:sha256:";

/// On-disk record of every version logged under one artifact name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Manifest {
    name: String,
    versions: Vec<ArtifactVersion>,
}

impl Manifest {
    fn find(&self, alias: &str) -> Option<&ArtifactVersion> {
        self.versions.iter().find(|v| v.aliases.iter().any(|a| a == alias))
    }

    fn lookup(&self, reference: &ArtifactReference) -> Option<&ArtifactVersion> {
        match reference.version() {
            Some(number) => self.versions.iter().find(|v| v.version == number),
            None => self.find(&reference.alias),
        }
    }

    /// Move `alias` onto `version`, dropping it from whichever version held it
    fn point(&mut self, alias: &str, version: u32) {
        for v in self.versions.iter_mut() {
            v.aliases.retain(|a| a != alias);
            if v.version == version {
                v.aliases.push(alias.to_string());
            }
        }
    }
}

/// Artifact store on the local filesystem.
///
/// Blobs are content addressed under `<root>/blobs/sha256/ab/cd/<hex>`;
/// each artifact name has a JSON manifest under `<root>/manifests/`.
/// Resolved versions are materialised under `<root>/files/<name>/vN/<name>`
/// so consumers see the logged file name.
pub struct FsArtifactStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All versions logged under `name`, oldest first
    pub async fn versions(&self, name: &str) -> Result<Vec<ArtifactVersion>> {
        Ok(self.read_manifest(name).await?.versions)
    }

    fn manifest_path(&self, name: &str) -> PathBuf {
        self.root.join("manifests").join(format!("{}.json", name))
    }

    fn blob_path(&self, hex: &str) -> PathBuf {
        self.root
            .join("blobs")
            .join("sha256")
            .join(&hex[0..2])
            .join(&hex[2..4])
            .join(hex)
    }

    async fn read_manifest(&self, name: &str) -> Result<Manifest> {
        let path = self.manifest_path(name);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(Manifest {
                name: name.to_string(),
                versions: Vec::new(),
            });
        }
        let bytes = tokio::fs::read(&path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write_manifest(&self, manifest: &Manifest) -> Result<()> {
        let path = self.manifest_path(&manifest.name);
        write_atomically(&path, &serde_json::to_vec_pretty(manifest)?).await
    }

    async fn write_blob(&self, bytes: &[u8]) -> Result<String> {
        let hex = hex::encode(Sha256::digest(bytes));
        let path = self.blob_path(&hex);
        if !holds_content(&path, &hex).await? {
            write_atomically(&path, bytes).await?;
        }
        Ok(format!("{}{}", DIGEST_PREFIX, hex))
    }

    /// Copy the version's blob to its readable path. Caller holds `write_lock`.
    async fn materialise(&self, version: &ArtifactVersion) -> Result<PathBuf> {
        let hex = version.digest.strip_prefix(DIGEST_PREFIX).ok_or_else(|| {
            PipelineError::Artifact(format!("malformed digest '{}'", version.digest))
        })?;
        let bytes = tokio::fs::read(self.blob_path(hex)).await.map_err(|e| {
            PipelineError::Artifact(format!(
                "blob for {} is missing from the store: {}",
                version.reference(),
                e
            ))
        })?;
        if hex::encode(Sha256::digest(&bytes)) != hex {
            return Err(PipelineError::Artifact(format!(
                "blob for {} is corrupt; log the file again to repair it",
                version.reference()
            )));
        }

        let target = self
            .root
            .join("files")
            .join(&version.name)
            .join(format!("v{}", version.version))
            .join(&version.name);
        if !holds_content(&target, hex).await? {
            debug!("Materialising {} at {}", version.reference(), target.display());
            write_atomically(&target, &bytes).await?;
        }
        Ok(target)
    }
}

/// Whether `path` exists and its sha256 is `hex`
async fn holds_content(path: &Path, hex: &str) -> Result<bool> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(hex::encode(Sha256::digest(&bytes)) == hex),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Write to a sibling `.tmp` file and rename it over `path`
async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(PipelineError::Artifact(format!(
            "invalid artifact name '{}'",
            name
        )));
    }
    Ok(())
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn log_artifact(
        &self,
        name: &str,
        artifact_type: &str,
        description: &str,
        path: &Path,
    ) -> Result<ArtifactVersion> {
        check_name(name)?;
        let bytes = tokio::fs::read(path).await?;
        let _guard = self.write_lock.lock().await;

        let digest = self.write_blob(&bytes).await?;
        let mut manifest = self.read_manifest(name).await?;

        let number = match manifest.versions.iter().find(|v| v.digest == digest) {
            Some(existing) => {
                debug!("{} already stored as {}", name, existing.reference());
                existing.version
            }
            None => {
                let number = manifest.versions.len() as u32;
                manifest.versions.push(ArtifactVersion {
                    name: name.to_string(),
                    version: number,
                    artifact_type: artifact_type.to_string(),
                    description: description.to_string(),
                    digest,
                    created_at: chrono::Utc::now(),
                    aliases: Vec::new(),
                });
                number
            }
        };
        manifest.point(LATEST_ALIAS, number);
        self.write_manifest(&manifest).await?;

        let logged = manifest
            .versions
            .iter()
            .find(|v| v.version == number)
            .cloned()
            .ok_or_else(|| PipelineError::Artifact(format!("{} vanished from manifest", name)))?;
        info!("Logged artifact {} ({})", logged.reference(), artifact_type);
        Ok(logged)
    }

    async fn resolve(&self, reference: &str) -> Result<ResolvedArtifact> {
        let reference = ArtifactReference::parse(reference)?;
        check_name(&reference.name)?;
        let manifest = self.read_manifest(&reference.name).await?;
        let version = manifest
            .lookup(&reference)
            .cloned()
            .ok_or_else(|| PipelineError::Artifact(format!("artifact {} not found", reference)))?;
        let path = {
            let _guard = self.write_lock.lock().await;
            self.materialise(&version).await?
        };
        debug!("Resolved {} to {}", reference, path.display());
        Ok(ResolvedArtifact { version, path })
    }

    async fn add_alias(&self, reference: &str, alias: &str) -> Result<ArtifactVersion> {
        let reference = ArtifactReference::parse(reference)?;
        check_name(&reference.name)?;
        if alias.is_empty()
            || alias.contains(':')
            || ArtifactReference::new("", alias).version().is_some()
        {
            return Err(PipelineError::Artifact(format!("invalid alias '{}'", alias)));
        }
        let _guard = self.write_lock.lock().await;

        let mut manifest = self.read_manifest(&reference.name).await?;
        let number = manifest
            .lookup(&reference)
            .map(|v| v.version)
            .ok_or_else(|| PipelineError::Artifact(format!("artifact {} not found", reference)))?;
        manifest.point(alias, number);
        self.write_manifest(&manifest).await?;

        info!("Aliased {}:v{} as {}", reference.name, number, alias);
        manifest
            .versions
            .into_iter()
            .find(|v| v.version == number)
            .ok_or_else(|| PipelineError::Artifact(format!("artifact {} not found", reference)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        tokio::fs::write(&path, contents).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_log_and_resolve_latest() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(dir.path().join("store"));
        let src = file(&dir, "a.csv", "id\n1\n").await;

        let v0 = store.log_artifact("sample.csv", "raw_data", "Raw", &src).await.unwrap();
        assert_eq!(v0.version, 0);
        assert_eq!(v0.aliases, vec!["latest".to_string()]);
        assert!(v0.digest.starts_with("cas:sha256:"));

        let resolved = store.resolve("sample.csv").await.unwrap();
        assert_eq!(resolved.version.version, 0);
        assert!(resolved.path.ends_with("sample.csv"));
        assert_eq!(tokio::fs::read_to_string(&resolved.path).await.unwrap(), "id\n1\n");
    }

    #[tokio::test]
    async fn test_new_upload_moves_latest_but_not_other_aliases() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(dir.path().join("store"));
        let first = file(&dir, "first.csv", "id\n1\n").await;
        let second = file(&dir, "second.csv", "id\n2\n").await;

        store.log_artifact("clean_sample.csv", "clean_sample", "", &first).await.unwrap();
        store.add_alias("clean_sample.csv:latest", "reference").await.unwrap();
        let v1 = store.log_artifact("clean_sample.csv", "clean_sample", "", &second).await.unwrap();
        assert_eq!(v1.version, 1);

        assert_eq!(store.resolve("clean_sample.csv:latest").await.unwrap().version.version, 1);
        assert_eq!(store.resolve("clean_sample.csv:reference").await.unwrap().version.version, 0);
        assert_eq!(store.resolve("clean_sample.csv:v0").await.unwrap().version.version, 0);

        let versions = store.versions("clean_sample.csv").await.unwrap();
        assert_eq!(versions[0].aliases, vec!["reference".to_string()]);
        assert_eq!(versions[1].aliases, vec!["latest".to_string()]);
    }

    #[tokio::test]
    async fn test_identical_content_reuses_version() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(dir.path().join("store"));
        let a = file(&dir, "a.csv", "same").await;
        let b = file(&dir, "b.csv", "other").await;

        store.log_artifact("sample.csv", "raw_data", "", &a).await.unwrap();
        store.log_artifact("sample.csv", "raw_data", "", &b).await.unwrap();
        let again = store.log_artifact("sample.csv", "raw_data", "", &a).await.unwrap();

        assert_eq!(again.version, 0);
        assert_eq!(store.versions("sample.csv").await.unwrap().len(), 2);
        assert_eq!(store.resolve("sample.csv").await.unwrap().version.version, 0);
    }

    #[tokio::test]
    async fn test_unknown_references_are_artifact_errors() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let src = file(&dir, "a.csv", "x").await;
        store.log_artifact("sample.csv", "raw_data", "", &src).await.unwrap();

        assert!(matches!(
            store.resolve("sample.csv:reference").await,
            Err(PipelineError::Artifact(_))
        ));
        assert!(matches!(store.resolve("nothing.csv").await, Err(PipelineError::Artifact(_))));
        assert!(store.add_alias("sample.csv:v7", "prod").await.is_err());
        assert!(store.add_alias("sample.csv", "v2").await.is_err());
        assert!(store.log_artifact("../escape", "raw_data", "", &src).await.is_err());
    }

    #[tokio::test]
    async fn test_resolve_repairs_truncated_materialised_file() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(dir.path().join("store"));
        let src = file(&dir, "a.csv", "id,price\n1,150\n2,95\n").await;
        store.log_artifact("sample.csv", "raw_data", "", &src).await.unwrap();

        let path = store.resolve("sample.csv").await.unwrap().path;
        tokio::fs::write(&path, "id,pri").await.unwrap();

        let again = store.resolve("sample.csv").await.unwrap();
        assert_eq!(again.path, path);
        assert_eq!(
            tokio::fs::read_to_string(&path).await.unwrap(),
            "id,price\n1,150\n2,95\n"
        );
        assert!(!tokio::fs::try_exists(path.with_file_name("sample.csv.tmp")).await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_blob_is_rejected_until_relogged() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(dir.path().join("store"));
        let src = file(&dir, "a.csv", "id\n1\n").await;
        let logged = store.log_artifact("sample.csv", "raw_data", "", &src).await.unwrap();
        let hex = logged.digest.strip_prefix(DIGEST_PREFIX).unwrap();
        tokio::fs::write(store.blob_path(hex), "id").await.unwrap();

        let err = store.resolve("sample.csv").await.unwrap_err();
        assert!(matches!(err, PipelineError::Artifact(ref m) if m.contains("corrupt")));

        let relogged = store.log_artifact("sample.csv", "raw_data", "", &src).await.unwrap();
        assert_eq!(relogged.version, logged.version);
        let resolved = store.resolve("sample.csv").await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&resolved.path).await.unwrap(), "id\n1\n");
    }
}
