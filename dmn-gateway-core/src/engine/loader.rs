//! Artifact loaders
//!
//! A loader turns an artifact reference into a compiled [`ModelContainer`].
//! Every load is stamped with a fresh [`BuildId`] so two materialisations of
//! the same artifact are distinguishable in logs.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

use super::runtime::ModelContainer;

/// Unique identifier of one artifact materialisation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildId(String);

impl BuildId {
    pub fn generate() -> Self {
        Self(format!("dmn-gateway-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("artifact not found")]
    NotFound,
    #[error("{0}")]
    Malformed(String),
}

/// Source of packaged model artifacts.
pub trait ArtifactLoader: Send + Sync {
    fn load(&self, artifact: &str, build_id: BuildId) -> Result<ModelContainer, LoadError>;
}

/// Loads artifacts from files under a root directory.
#[derive(Debug, Clone)]
pub struct FsArtifactLoader {
    root: PathBuf,
}

impl FsArtifactLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, artifact: &str) -> Result<PathBuf, LoadError> {
        let relative = Path::new(artifact);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(LoadError::Malformed(format!(
                "artifact reference '{artifact}' must be a relative path inside the model directory"
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl ArtifactLoader for FsArtifactLoader {
    fn load(&self, artifact: &str, build_id: BuildId) -> Result<ModelContainer, LoadError> {
        let path = self.path_for(artifact)?;
        let yaml = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound,
            _ => LoadError::Malformed(format!("{}: {e}", path.display())),
        })?;
        ModelContainer::from_yaml(artifact, build_id, &yaml)
    }
}

/// Serves artifacts compiled into the binary.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedArtifactLoader {
    artifacts: HashMap<String, &'static str>,
}

impl EmbeddedArtifactLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_artifact(mut self, name: impl Into<String>, yaml: &'static str) -> Self {
        self.artifacts.insert(name.into(), yaml);
        self
    }
}

impl ArtifactLoader for EmbeddedArtifactLoader {
    fn load(&self, artifact: &str, build_id: BuildId) -> Result<ModelContainer, LoadError> {
        let yaml = self.artifacts.get(artifact).ok_or(LoadError::NotFound)?;
        ModelContainer::from_yaml(artifact, build_id, yaml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{PARTY_ARTIFACT, PARTY_NAME, PARTY_NAMESPACE};

    #[test]
    fn test_build_ids_are_unique() {
        let a = BuildId::generate();
        let b = BuildId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("dmn-gateway-"));
    }

    #[test]
    fn test_fs_loader_reads_artifact() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("party.yaml"), PARTY_ARTIFACT).unwrap();

        let loader = FsArtifactLoader::new(dir.path());
        let build_id = BuildId::generate();
        let container = loader.load("party.yaml", build_id.clone()).unwrap();

        assert_eq!(container.artifact(), "party.yaml");
        assert_eq!(container.build_id(), &build_id);
        assert!(container
            .new_runtime()
            .model(PARTY_NAMESPACE, PARTY_NAME)
            .is_some());
    }

    #[test]
    fn test_fs_loader_missing_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.yaml"), "models: [this is: not a model").unwrap();
        let loader = FsArtifactLoader::new(dir.path());

        assert!(matches!(
            loader.load("absent.yaml", BuildId::generate()),
            Err(LoadError::NotFound)
        ));
        assert!(matches!(
            loader.load("broken.yaml", BuildId::generate()),
            Err(LoadError::Malformed(_))
        ));
    }

    #[test]
    fn test_fs_loader_rejects_escaping_paths() {
        let loader = FsArtifactLoader::new("/srv/models");
        assert!(matches!(
            loader.load("../etc/passwd", BuildId::generate()),
            Err(LoadError::Malformed(_))
        ));
        assert!(matches!(
            loader.load("/etc/passwd", BuildId::generate()),
            Err(LoadError::Malformed(_))
        ));
    }

    #[test]
    fn test_embedded_loader() {
        let loader = EmbeddedArtifactLoader::new().with_artifact("party.yaml", PARTY_ARTIFACT);

        assert!(loader.load("party.yaml", BuildId::generate()).is_ok());
        assert!(matches!(
            loader.load("dinner.yaml", BuildId::generate()),
            Err(LoadError::NotFound)
        ));
    }
}
