use std::sync::Arc;

use crate::models::{Artifact, ArtifactId};

/// Read access shared by committed snapshots and editing sessions.
pub trait ArtifactModel {
    /// All artifacts in model order.
    fn artifacts(&self) -> Vec<&Artifact>;

    fn find_artifact(&self, name: &str) -> Option<&Artifact> {
        self.artifacts().into_iter().find(|a| a.name() == name)
    }

    fn artifact_by_id(&self, id: ArtifactId) -> Option<&Artifact> {
        self.artifacts().into_iter().find(|a| a.id() == id)
    }

    fn artifacts_by_type(&self, artifact_type: &str) -> Vec<&Artifact> {
        self.artifacts()
            .into_iter()
            .filter(|a| a.artifact_type() == artifact_type)
            .collect()
    }
}

/// An immutable, published list of artifacts.
///
/// A snapshot is never modified; a commit builds a new one and swaps it in,
/// so readers holding an `Arc<ArtifactSnapshot>` always see a consistent
/// list.
#[derive(Debug, Default)]
pub struct ArtifactSnapshot {
    artifacts: Vec<Arc<Artifact>>,
    modification_count: u64,
}

impl ArtifactSnapshot {
    pub(crate) fn new(artifacts: Vec<Arc<Artifact>>, modification_count: u64) -> Self {
        Self {
            artifacts,
            modification_count,
        }
    }

    /// Shared handles to the artifacts, in model order.
    pub fn entries(&self) -> &[Arc<Artifact>] {
        &self.artifacts
    }

    pub fn find(&self, name: &str) -> Option<Arc<Artifact>> {
        self.artifacts.iter().find(|a| a.name() == name).cloned()
    }

    pub fn get(&self, id: ArtifactId) -> Option<Arc<Artifact>> {
        self.artifacts.iter().find(|a| a.id() == id).cloned()
    }

    /// Current counterpart of a possibly superseded artifact, or the artifact
    /// itself when it is no longer part of this snapshot.
    pub fn artifact_by_original(&self, artifact: &Arc<Artifact>) -> Arc<Artifact> {
        self.get(artifact.id()).unwrap_or_else(|| Arc::clone(artifact))
    }

    /// Incremented by every commit and load that replaced the snapshot.
    pub fn modification_count(&self) -> u64 {
        self.modification_count
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

impl ArtifactModel for ArtifactSnapshot {
    fn artifacts(&self) -> Vec<&Artifact> {
        self.artifacts.iter().map(|a| a.as_ref()).collect()
    }
}
