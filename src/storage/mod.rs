//! Persisted forms of the artifact model document.

mod directory;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub use directory::DirectoryStorage;

use crate::document::Element;

/// Where the `artifacts` document lives between runs.
pub trait StateStorage {
    /// The saved document, or `None` when nothing was saved yet.
    fn load(&self) -> Result<Option<Element>>;

    fn save(&self, state: &Element) -> Result<()>;
}

/// The whole document in one JSON file.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StateStorage for FileStorage {
    fn load(&self) -> Result<Option<Element>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let state = Element::from_json(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        Ok(Some(state))
    }

    fn save(&self, state: &Element) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("Failed to create storage directory")?;
        }
        let content = state.to_json().context("Failed to serialize artifacts")?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        tracing::info!("Saved artifacts to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("artifacts.json"));
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn saved_document_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested/artifacts.json"));
        let state = Element::new("artifacts")
            .with_child(Element::new("artifact").with_attribute("name", "app"));

        storage.save(&state).unwrap();
        assert_eq!(storage.load().unwrap(), Some(state));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifacts.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(FileStorage::new(path).load().is_err());
    }
}
