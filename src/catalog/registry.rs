//! Catalog of search models discovered on disk

use crate::error::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extension carried by model files
pub const DEFAULT_MODEL_EXTENSION: &str = "hmm";

/// A single search model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Model {
    /// File name without its extension
    pub id: String,
    /// Full path to the model file
    pub path: PathBuf,
}

impl Model {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }
}

/// Ordered, non-empty list of models
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    dir: PathBuf,
    models: Vec<Model>,
}

impl ModelCatalog {
    /// Discover all models in `dir` with the default extension
    pub fn discover(dir: impl AsRef<Path>) -> Result<Self> {
        Self::discover_with_extension(dir, DEFAULT_MODEL_EXTENSION)
    }

    /// Discover all files in `dir` ending in `.extension`.
    ///
    /// Models are sorted by id so repeated runs submit work in the same order.
    pub fn discover_with_extension(dir: impl AsRef<Path>, extension: &str) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::ModelDirNotFound(dir.to_path_buf()));
        }

        let entries = std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
        let mut models = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| Error::io(dir, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let matches_ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e == extension)
                .unwrap_or(false);
            if !matches_ext {
                debug!("Ignoring non-model file {}", path.display());
                continue;
            }

            if let Some(id) = path.file_stem().and_then(|s| s.to_str()) {
                models.push(Model::new(id, path.clone()));
            }
        }

        Self::from_models(dir, models, extension)
    }

    /// Build a catalog from an explicit list of models
    pub fn from_models(
        dir: impl Into<PathBuf>,
        mut models: Vec<Model>,
        extension: &str,
    ) -> Result<Self> {
        let dir = dir.into();
        if models.is_empty() {
            return Err(Error::NoModels {
                dir,
                extension: extension.to_string(),
            });
        }

        models.sort_by(|a, b| a.id.cmp(&b.id));
        info!("Found {} model files in {}", models.len(), dir.display());

        Ok(Self { dir, models })
    }

    /// Directory the models were discovered in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get all models
    pub fn models(&self) -> &[Model] {
        &self.models
    }

    /// Get a model by id
    pub fn get(&self, id: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Get all model ids
    pub fn ids(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.id.as_str()).collect()
    }

    /// Get number of models
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Always false for a constructed catalog
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cas9.hmm"), "HMMER3/f").unwrap();
        std::fs::write(dir.path().join("Cas3.hmm"), "HMMER3/f").unwrap();
        std::fs::write(dir.path().join("README.txt"), "notes").unwrap();
        std::fs::create_dir(dir.path().join("nested.hmm")).unwrap();

        let catalog = ModelCatalog::discover(dir.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.ids(), vec!["Cas3", "Cas9"]);
        assert_eq!(
            catalog.get("Cas9").unwrap().path,
            dir.path().join("Cas9.hmm")
        );
    }

    #[test]
    fn test_missing_directory() {
        let err = ModelCatalog::discover("/definitely/not/here").unwrap_err();
        assert!(matches!(err, Error::ModelDirNotFound(_)));
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("model.txt"), "").unwrap();

        let err = ModelCatalog::discover(dir.path()).unwrap_err();
        assert!(matches!(err, Error::NoModels { .. }));
    }

    #[test]
    fn test_custom_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("csn2.h3m"), "").unwrap();

        let catalog = ModelCatalog::discover_with_extension(dir.path(), "h3m").unwrap();
        assert_eq!(catalog.ids(), vec!["csn2"]);
    }
}
