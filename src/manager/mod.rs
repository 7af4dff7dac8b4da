//! The committed artifact model and its commit protocol.
//!
//! Readers call [`ArtifactManager::snapshot`] (or the convenience lookups)
//! at any time. Writers open an [`ArtifactSession`], edit it, and hand it to
//! [`ArtifactManager::commit`], which diffs it against the current snapshot,
//! swaps in the new snapshot and then notifies listeners:
//! all additions, then all removals, then all changes.

mod access;
mod events;
mod model;
mod session;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use indexmap::IndexMap;

pub use access::*;
pub use events::*;
pub use model::*;
pub use session::ArtifactSession;

use session::StagedArtifact;

use crate::codec::{self, LoadProblem};
use crate::document::Element;
use crate::error::{Error, Result};
use crate::models::{type_ids, Artifact, ArtifactId};
use crate::registry::Registry;
use crate::validation::{PermissiveContext, ResolvingContext};

/// Handles of the artifacts a commit added, removed and changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub added: Vec<ArtifactId>,
    pub removed: Vec<ArtifactId>,
    pub changed: Vec<ArtifactId>,
}

impl CommitSummary {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

pub struct ArtifactManager {
    registry: Arc<Registry>,
    snapshot: RwLock<Arc<ArtifactSnapshot>>,
    events: EventBus,
    write_access: Arc<dyn WriteAccess>,
    resolving_context: Arc<dyn ResolvingContext>,
    inside_commit: AtomicBool,
}

/// Clears the in-progress flag however the commit ends.
struct CommitGuard<'a>(&'a AtomicBool);

impl Drop for CommitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ArtifactManager {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            snapshot: RwLock::new(Arc::new(ArtifactSnapshot::default())),
            events: EventBus::new(),
            write_access: Arc::new(Unrestricted),
            resolving_context: Arc::new(PermissiveContext),
            inside_commit: AtomicBool::new(false),
        }
    }

    pub fn with_write_access(mut self, write_access: Arc<dyn WriteAccess>) -> Self {
        self.write_access = write_access;
        self
    }

    pub fn with_resolving_context(mut self, context: Arc<dyn ResolvingContext>) -> Self {
        self.resolving_context = context;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn resolving_context(&self) -> &dyn ResolvingContext {
        self.resolving_context.as_ref()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self, listener: Arc<dyn ArtifactListener>) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    // ============================================================
    // Read model
    // ============================================================

    /// The current committed snapshot. Stays valid (but may become stale)
    /// across later commits.
    pub fn snapshot(&self) -> Arc<ArtifactSnapshot> {
        Arc::clone(&self.snapshot.read().expect("artifact snapshot lock poisoned"))
    }

    pub fn artifacts(&self) -> Vec<Arc<Artifact>> {
        self.snapshot().entries().to_vec()
    }

    pub fn find_artifact(&self, name: &str) -> Option<Arc<Artifact>> {
        self.snapshot().find(name)
    }

    pub fn artifact_by_original(&self, artifact: &Arc<Artifact>) -> Arc<Artifact> {
        self.snapshot().artifact_by_original(artifact)
    }

    pub fn artifacts_by_type(&self, artifact_type: &str) -> Vec<Arc<Artifact>> {
        self.snapshot()
            .entries()
            .iter()
            .filter(|a| a.artifact_type() == artifact_type)
            .cloned()
            .collect()
    }

    pub fn modification_count(&self) -> u64 {
        self.snapshot().modification_count()
    }

    // ============================================================
    // Editing
    // ============================================================

    pub fn create_session(&self) -> ArtifactSession {
        ArtifactSession::new(Arc::clone(&self.registry), &self.snapshot())
    }

    /// Publish a session.
    ///
    /// Fails with [`Error::RecursiveCommit`] when called while another commit
    /// on this manager is still running, e.g. from a listener, and with
    /// [`Error::InvalidRoot`] when an edited artifact's root is no longer a
    /// `root` node. The snapshot is replaced in a single swap after the diff
    /// has been computed, so a failed commit changes nothing.
    pub fn commit(&self, session: ArtifactSession) -> Result<CommitSummary> {
        if !self.write_access.is_write_access_allowed() {
            return Err(Error::WriteAccessRequired);
        }
        if self.inside_commit.swap(true, Ordering::SeqCst) {
            tracing::error!("Recursive commit rejected");
            return Err(Error::RecursiveCommit);
        }
        let _guard = CommitGuard(&self.inside_commit);

        let current = self.snapshot();
        let mut removed: IndexMap<ArtifactId, Arc<Artifact>> = current
            .entries()
            .iter()
            .map(|a| (a.id(), Arc::clone(a)))
            .collect();
        let mut added = Vec::new();
        let mut changed = Vec::new();
        let mut new_artifacts = Vec::new();

        for staged in session.into_staged() {
            let previous = removed.shift_remove(&staged.id());
            let artifact = match staged {
                StagedArtifact::Untouched(artifact) => {
                    if previous.is_none() {
                        added.push(Arc::clone(&artifact));
                    }
                    artifact
                }
                StagedArtifact::Edited(edited) => {
                    let root_kind = edited.root_element().type_id();
                    if root_kind != type_ids::ROOT {
                        tracing::warn!(
                            "Commit rejected: artifact '{}' has a '{}' root",
                            edited.name(),
                            root_kind
                        );
                        return Err(Error::InvalidRoot(root_kind.to_string()));
                    }
                    let artifact = Arc::new(edited);
                    match previous {
                        Some(original) => changed.push((original, Arc::clone(&artifact))),
                        None => added.push(Arc::clone(&artifact)),
                    }
                    artifact
                }
            };
            new_artifacts.push(artifact);
        }

        let summary = CommitSummary {
            added: added.iter().map(|a| a.id()).collect(),
            removed: removed.keys().copied().collect(),
            changed: changed.iter().map(|(_, a)| a.id()).collect(),
        };

        self.replace_snapshot(new_artifacts);
        tracing::debug!(
            "Committed artifacts: {} added, {} removed, {} changed",
            summary.added.len(),
            summary.removed.len(),
            summary.changed.len()
        );

        for artifact in added {
            self.events.publish(&ArtifactEvent::Added(artifact));
        }
        for (_, artifact) in removed {
            self.events.publish(&ArtifactEvent::Removed(artifact));
        }
        for (original, artifact) in changed {
            self.events
                .publish(&ArtifactEvent::Changed { original, artifact });
        }

        Ok(summary)
    }

    // ============================================================
    // Persistence
    // ============================================================

    /// Serialize the current snapshot.
    pub fn state(&self) -> Element {
        let snapshot = self.snapshot();
        codec::serialize_artifacts(snapshot.artifacts(), &self.registry)
    }

    /// Replace the model with the artifacts found in `state`, without
    /// notifying listeners. Returns whatever had to be dropped.
    pub fn load_state(&self, state: &Element) -> Vec<LoadProblem> {
        let report = codec::deserialize_artifacts(state, &self.registry);
        self.replace_snapshot(report.artifacts.into_iter().map(Arc::new).collect());
        report.problems
    }

    fn replace_snapshot(&self, artifacts: Vec<Arc<Artifact>>) {
        let mut snapshot = self
            .snapshot
            .write()
            .expect("artifact snapshot lock poisoned");
        let modification_count = snapshot.modification_count() + 1;
        *snapshot = Arc::new(ArtifactSnapshot::new(artifacts, modification_count));
    }
}
