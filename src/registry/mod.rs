//! Registries mapping stable string ids to element kinds, artifact types and
//! properties providers.
//!
//! Registries are populated once at startup (the core set via
//! [`Registry::with_defaults`] plus any contributed entries) and shared
//! read-only through `Arc` afterwards. There is no removal.

mod artifact_types;
mod element_types;
mod providers;

use std::sync::Arc;

use indexmap::IndexMap;

pub use artifact_types::*;
pub use element_types::*;
pub use providers::*;

use crate::error::{Error, Result};
use crate::models::{Artifact, ArtifactProperties, PackagingElement};

/// Insertion-ordered id → entry map shared by the three registries.
pub struct Catalog<T: ?Sized> {
    entries: IndexMap<String, Arc<T>>,
}

impl<T: ?Sized> Catalog<T> {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    fn insert(&mut self, id: &str, entry: Arc<T>) -> Result<()> {
        if self.entries.contains_key(id) {
            return Err(Error::DuplicateTypeId(id.to_string()));
        }
        self.entries.insert(id.to_string(), entry);
        Ok(())
    }

    pub fn find(&self, id: &str) -> Option<Arc<T>> {
        self.entries.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: ?Sized> Default for Catalog<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// All type knowledge the codec and sessions need.
#[derive(Default)]
pub struct Registry {
    element_types: ElementTypeRegistry,
    artifact_types: ArtifactTypeRegistry,
    providers: PropertiesProviderRegistry,
}

impl Registry {
    /// Empty registry; nothing can be created or loaded until types are
    /// registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the core element kinds, artifact types and providers.
    pub fn with_defaults() -> Self {
        Self {
            element_types: ElementTypeRegistry::with_defaults(),
            artifact_types: ArtifactTypeRegistry::with_defaults(),
            providers: PropertiesProviderRegistry::with_defaults(),
        }
    }

    pub fn element_types(&self) -> &ElementTypeRegistry {
        &self.element_types
    }

    pub fn element_types_mut(&mut self) -> &mut ElementTypeRegistry {
        &mut self.element_types
    }

    pub fn artifact_types(&self) -> &ArtifactTypeRegistry {
        &self.artifact_types
    }

    pub fn artifact_types_mut(&mut self) -> &mut ArtifactTypeRegistry {
        &mut self.artifact_types
    }

    pub fn providers(&self) -> &PropertiesProviderRegistry {
        &self.providers
    }

    pub fn providers_mut(&mut self) -> &mut PropertiesProviderRegistry {
        &mut self.providers
    }

    /// Create a node of the given kind with default state.
    pub fn create_element(&self, type_id: &str) -> Result<PackagingElement> {
        self.element_types.create_empty(type_id)
    }

    /// Properties of `artifact` for `provider_id`, or the provider's default
    /// state when the artifact holds none. `None` when the provider is unknown
    /// or not available for the artifact's type.
    pub fn effective_properties(
        &self,
        artifact: &Artifact,
        provider_id: &str,
    ) -> Option<Box<dyn ArtifactProperties>> {
        let provider = self.providers.find_by_id(provider_id)?;
        if !provider.is_available_for(artifact.artifact_type()) {
            return None;
        }
        Some(match artifact.properties(provider_id) {
            Some(properties) => properties.clone_boxed(),
            None => provider.create_properties(),
        })
    }
}
