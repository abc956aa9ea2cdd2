//! Artifact persistence for fitted models.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::model::{GradientBoosting, ModelFamily};

/// Persists fitted models as JSON files under a base directory.
///
/// File names are keyed by family name, so later trials that pick the
/// same family overwrite the previous artifact. Callers that need
/// per-trial retention must rename or copy after each trial.
///
/// # Examples
///
/// ```no_run
/// use automl::artifact::ArtifactStore;
///
/// let store = ArtifactStore::new("model");
/// ```
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    base_dir: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at `base_dir`. The directory is created on
    /// the first persist, not here.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// The directory artifacts are written under.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// The file name a family's artifact is stored under. Unknown family
    /// names fall back to a generic path.
    fn file_name(family: Option<ModelFamily>) -> &'static str {
        match family {
            Some(ModelFamily::Depthwise) => "model.depthwise.json",
            Some(ModelFamily::Leafwise) => "model.leafwise.json",
            None => "model.json",
        }
    }

    /// Write a fitted model and return the path it was stored at.
    ///
    /// Creates the base directory if absent (idempotent).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Artifact`] if the directory cannot be created or
    /// the file cannot be written.
    pub fn persist(
        &self,
        model: &GradientBoosting,
        family: Option<ModelFamily>,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.base_dir)
            .map_err(|e| Error::Artifact(format!("creating {}: {e}", self.base_dir.display())))?;

        let path = self.base_dir.join(Self::file_name(family));
        let json = serde_json::to_string(model)
            .map_err(|e| Error::Artifact(format!("serializing model: {e}")))?;
        fs::write(&path, json)
            .map_err(|e| Error::Artifact(format!("writing {}: {e}", path.display())))?;
        Ok(path)
    }

    /// Read a persisted model back.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Artifact`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<GradientBoosting> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| Error::Artifact(format!("reading {}: {e}", path.display())))?;
        serde_json::from_str(&json)
            .map_err(|e| Error::Artifact(format!("parsing {}: {e}", path.display())))
    }
}
