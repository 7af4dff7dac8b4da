use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::StateStorage;
use crate::codec::{ARTIFACTS_TAG, ARTIFACT_TAG};
use crate::document::Element;

const EXTENSION: &str = "json";

/// One JSON file per artifact inside a directory.
///
/// File names are derived from artifact names; loading reads the files in
/// file-name order, so the original model order is not preserved.
pub struct DirectoryStorage {
    dir: PathBuf,
}

impl DirectoryStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn artifact_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list {}", self.dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|e| e == EXTENSION) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// File-system safe stem for an artifact name.
pub fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.trim_matches('.').is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}

fn unique_file(dir: &Path, stem: &str, used: &mut HashSet<String>) -> PathBuf {
    let mut candidate = format!("{stem}.{EXTENSION}");
    let mut counter = 2;
    while !used.insert(candidate.clone()) {
        candidate = format!("{stem}{counter}.{EXTENSION}");
        counter += 1;
    }
    dir.join(candidate)
}

impl StateStorage for DirectoryStorage {
    fn load(&self) -> Result<Option<Element>> {
        if !self.dir.is_dir() {
            return Ok(None);
        }
        let mut state = Element::new(ARTIFACTS_TAG);
        for path in self.artifact_files()? {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let artifact = Element::from_json(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            if artifact.tag != ARTIFACT_TAG {
                tracing::warn!("Ignoring {}: not an artifact document", path.display());
                continue;
            }
            state.add_child(artifact);
        }
        Ok(Some(state))
    }

    fn save(&self, state: &Element) -> Result<()> {
        fs::create_dir_all(&self.dir).context("Failed to create artifacts directory")?;

        let mut used = HashSet::new();
        let mut written = HashSet::new();
        for artifact in state.children_named(ARTIFACT_TAG) {
            let stem = sanitize_file_name(artifact.attribute("name").unwrap_or_default());
            let path = unique_file(&self.dir, &stem, &mut used);
            let content = artifact.to_json().context("Failed to serialize artifact")?;
            fs::write(&path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            written.insert(path);
        }

        for stale in self.artifact_files()? {
            if !written.contains(&stale) {
                fs::remove_file(&stale)
                    .with_context(|| format!("Failed to remove {}", stale.display()))?;
            }
        }

        tracing::info!(
            "Saved {} artifacts to {}",
            written.len(),
            self.dir.display()
        );
        Ok(())
    }
}
