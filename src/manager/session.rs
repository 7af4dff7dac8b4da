use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use super::model::{ArtifactModel, ArtifactSnapshot};
use crate::error::{Error, Result};
use crate::models::{Artifact, ArtifactId, ArtifactProperties, PackagingElement};
use crate::registry::Registry;

/// A private copy-on-write staging area over a committed snapshot.
///
/// The session starts out sharing the snapshot's artifacts. The first edit
/// of an artifact clones it and records the clone as the replacement for the
/// artifact's handle; committed artifacts are never touched. Hand the
/// session to [`ArtifactManager::commit`](super::ArtifactManager::commit) to
/// publish it, or drop it to discard the edits.
pub struct ArtifactSession {
    registry: Arc<Registry>,
    base: Vec<ArtifactId>,
    order: Vec<ArtifactId>,
    originals: HashMap<ArtifactId, Arc<Artifact>>,
    replacements: HashMap<ArtifactId, Artifact>,
}

/// What a session contributes to the next snapshot, per artifact.
pub(crate) enum StagedArtifact {
    Untouched(Arc<Artifact>),
    Edited(Artifact),
}

impl StagedArtifact {
    pub(crate) fn id(&self) -> ArtifactId {
        match self {
            Self::Untouched(artifact) => artifact.id(),
            Self::Edited(artifact) => artifact.id(),
        }
    }
}

impl ArtifactSession {
    pub(crate) fn new(registry: Arc<Registry>, snapshot: &ArtifactSnapshot) -> Self {
        let order: Vec<ArtifactId> = snapshot.entries().iter().map(|a| a.id()).collect();
        let originals = snapshot
            .entries()
            .iter()
            .map(|a| (a.id(), Arc::clone(a)))
            .collect();
        Self {
            registry,
            base: order.clone(),
            order,
            originals,
            replacements: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Create an artifact with the default layout of its type.
    pub fn add_artifact(&mut self, name: &str, artifact_type: &str) -> Result<&mut Artifact> {
        let root = self
            .registry
            .artifact_types()
            .find_by_id(artifact_type)
            .ok_or_else(|| Error::UnknownArtifactType(artifact_type.to_string()))?
            .create_root(name);

        let mut artifact = Artifact::new(name, artifact_type);
        artifact.set_root_element(root)?;
        let id = self.insert_artifact(artifact)?;
        self.modifiable_artifact(id)
    }

    /// Stage a fully built artifact as an addition.
    pub fn insert_artifact(&mut self, artifact: Artifact) -> Result<ArtifactId> {
        self.check_name(artifact.name(), None)?;
        if !self.registry.artifact_types().contains(artifact.artifact_type()) {
            return Err(Error::UnknownArtifactType(artifact.artifact_type().to_string()));
        }
        let id = artifact.id();
        if self.order.contains(&id) {
            return Err(Error::DuplicateArtifactId(id));
        }

        tracing::debug!("Staging new artifact {}", artifact.name());
        self.order.push(id);
        self.replacements.insert(id, artifact);
        Ok(id)
    }

    pub fn remove_artifact(&mut self, id: ArtifactId) -> Result<()> {
        let index = self
            .order
            .iter()
            .position(|existing| *existing == id)
            .ok_or(Error::UnknownArtifact(id))?;
        self.order.remove(index);
        self.replacements.remove(&id);
        self.originals.remove(&id);
        Ok(())
    }

    /// Editable version of the artifact, cloning it on first access.
    pub fn modifiable_artifact(&mut self, id: ArtifactId) -> Result<&mut Artifact> {
        match self.replacements.entry(id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let original = self.originals.get(&id).ok_or(Error::UnknownArtifact(id))?;
                tracing::trace!("Copying artifact {} for editing", original.name());
                Ok(entry.insert(Artifact::clone(original)))
            }
        }
    }

    pub fn rename_artifact(&mut self, id: ArtifactId, new_name: &str) -> Result<()> {
        self.check_name(new_name, Some(id))?;
        self.modifiable_artifact(id)?.set_name(new_name);
        Ok(())
    }

    pub fn set_artifact_type(&mut self, id: ArtifactId, artifact_type: &str) -> Result<()> {
        if !self.registry.artifact_types().contains(artifact_type) {
            return Err(Error::UnknownArtifactType(artifact_type.to_string()));
        }
        self.modifiable_artifact(id)?.set_artifact_type(artifact_type);
        Ok(())
    }

    pub fn set_output_path(&mut self, id: ArtifactId, output_path: Option<String>) -> Result<()> {
        self.modifiable_artifact(id)?.set_output_path(output_path);
        Ok(())
    }

    pub fn set_build_on_make(&mut self, id: ArtifactId, build_on_make: bool) -> Result<()> {
        self.modifiable_artifact(id)?.set_build_on_make(build_on_make);
        Ok(())
    }

    pub fn set_clear_output_on_rebuild(&mut self, id: ArtifactId, clear: bool) -> Result<()> {
        self.modifiable_artifact(id)?.set_clear_output_on_rebuild(clear);
        Ok(())
    }

    pub fn root_element_mut(&mut self, id: ArtifactId) -> Result<&mut PackagingElement> {
        Ok(self.modifiable_artifact(id)?.root_element_mut())
    }

    /// Attach properties for a registered provider available for the
    /// artifact's type.
    pub fn set_properties(
        &mut self,
        id: ArtifactId,
        provider_id: &str,
        properties: Box<dyn ArtifactProperties>,
    ) -> Result<()> {
        let artifact_type = self
            .artifact_by_id(id)
            .ok_or(Error::UnknownArtifact(id))?
            .artifact_type()
            .to_string();
        let available = self
            .registry
            .providers()
            .find_by_id(provider_id)
            .is_some_and(|p| p.is_available_for(&artifact_type));
        if !available {
            return Err(Error::UnknownPropertiesProvider(provider_id.to_string()));
        }
        self.modifiable_artifact(id)?
            .set_properties(provider_id, properties);
        Ok(())
    }

    /// Replacement for `original` staged in this session, or `original`
    /// itself when it was not edited.
    pub fn artifact_by_original<'a>(&'a self, original: &'a Artifact) -> &'a Artifact {
        self.replacements.get(&original.id()).unwrap_or(original)
    }

    /// True when the committed artifact with this handle has been cloned.
    pub fn is_changed(&self, id: ArtifactId) -> bool {
        self.originals.contains_key(&id) && self.replacements.contains_key(&id)
    }

    /// True when committing would publish anything new.
    pub fn is_modified(&self) -> bool {
        self.order != self.base || !self.replacements.is_empty()
    }

    fn check_name(&self, name: &str, except: Option<ArtifactId>) -> Result<()> {
        if name.is_empty() {
            return Err(Error::EmptyArtifactName);
        }
        let taken = self
            .artifacts()
            .into_iter()
            .any(|a| a.name() == name && Some(a.id()) != except);
        if taken {
            return Err(Error::DuplicateArtifactName(name.to_string()));
        }
        Ok(())
    }

    pub(crate) fn into_staged(mut self) -> Vec<StagedArtifact> {
        let mut staged = Vec::with_capacity(self.order.len());
        for id in &self.order {
            if let Some(edited) = self.replacements.remove(id) {
                staged.push(StagedArtifact::Edited(edited));
            } else if let Some(original) = self.originals.remove(id) {
                staged.push(StagedArtifact::Untouched(original));
            }
        }
        staged
    }
}

impl ArtifactModel for ArtifactSession {
    fn artifacts(&self) -> Vec<&Artifact> {
        self.order
            .iter()
            .filter_map(|id| {
                self.replacements
                    .get(id)
                    .or_else(|| self.originals.get(id).map(|a| a.as_ref()))
            })
            .collect()
    }
}
