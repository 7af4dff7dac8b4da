use std::sync::Arc;

use super::Catalog;
use crate::error::Result;
use crate::models::{ArtifactProperties, HookProperties};

pub const PRE_PROCESSING: &str = "pre-processing";
pub const POST_PROCESSING: &str = "post-processing";

/// Contributes a properties object to artifacts.
pub trait PropertiesProvider: Send + Sync {
    fn id(&self) -> &str;

    fn is_available_for(&self, _artifact_type: &str) -> bool {
        true
    }

    /// Properties in their default state. Options equal to these defaults
    /// are left out of saved documents.
    fn create_properties(&self) -> Box<dyn ArtifactProperties>;
}

/// Runs a command before or after the build, depending on its id.
pub struct HookPropertiesProvider {
    id: &'static str,
}

impl HookPropertiesProvider {
    pub fn pre_processing() -> Self {
        Self { id: PRE_PROCESSING }
    }

    pub fn post_processing() -> Self {
        Self { id: POST_PROCESSING }
    }
}

impl PropertiesProvider for HookPropertiesProvider {
    fn id(&self) -> &str {
        self.id
    }

    fn create_properties(&self) -> Box<dyn ArtifactProperties> {
        Box::new(HookProperties::default())
    }
}

#[derive(Default)]
pub struct PropertiesProviderRegistry {
    providers: Catalog<dyn PropertiesProvider>,
}

impl PropertiesProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for provider in [
            HookPropertiesProvider::pre_processing(),
            HookPropertiesProvider::post_processing(),
        ] {
            registry
                .providers
                .entries
                .insert(provider.id.to_string(), Arc::new(provider));
        }
        registry
    }

    pub fn register(&mut self, provider: Arc<dyn PropertiesProvider>) -> Result<()> {
        let id = provider.id().to_string();
        self.providers.insert(&id, provider)
    }

    pub fn find_by_id(&self, id: &str) -> Option<Arc<dyn PropertiesProvider>> {
        self.providers.find(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.providers.contains(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.providers.ids()
    }
}
