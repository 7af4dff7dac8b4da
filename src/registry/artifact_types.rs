use std::sync::Arc;

use super::Catalog;
use crate::error::Result;
use crate::models::PackagingElement;

pub const PLAIN: &str = "plain";
pub const JAR: &str = "jar";

/// Kind of artifact, deciding the default layout of new artifacts.
pub trait ArtifactType: Send + Sync {
    fn id(&self) -> &str;

    fn presentable_name(&self) -> &str;

    /// Root tree for a freshly created artifact of this type.
    fn create_root(&self, artifact_name: &str) -> PackagingElement;
}

/// Output is a plain directory; new artifacts start with an empty root.
pub struct PlainArtifactType;

impl ArtifactType for PlainArtifactType {
    fn id(&self) -> &str {
        PLAIN
    }

    fn presentable_name(&self) -> &str {
        "Other"
    }

    fn create_root(&self, _artifact_name: &str) -> PackagingElement {
        PackagingElement::root()
    }
}

/// Output is a single archive named after the artifact.
pub struct JarArtifactType;

impl ArtifactType for JarArtifactType {
    fn id(&self) -> &str {
        JAR
    }

    fn presentable_name(&self) -> &str {
        "JAR"
    }

    fn create_root(&self, artifact_name: &str) -> PackagingElement {
        PackagingElement::root_with_children(vec![PackagingElement::archive(format!(
            "{artifact_name}.jar"
        ))])
    }
}

#[derive(Default)]
pub struct ArtifactTypeRegistry {
    types: Catalog<dyn ArtifactType>,
}

impl ArtifactTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.types.entries.insert(PLAIN.to_string(), Arc::new(PlainArtifactType));
        registry.types.entries.insert(JAR.to_string(), Arc::new(JarArtifactType));
        registry
    }

    pub fn register(&mut self, artifact_type: Arc<dyn ArtifactType>) -> Result<()> {
        let id = artifact_type.id().to_string();
        self.types.insert(&id, artifact_type)
    }

    pub fn find_by_id(&self, id: &str) -> Option<Arc<dyn ArtifactType>> {
        self.types.find(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.types.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.types.ids()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jar_root_wraps_archive() {
        let root = JarArtifactType.create_root("app");
        assert_eq!(root.type_id(), "root");
        assert_eq!(root.children().len(), 1);
        assert_eq!(root.children()[0].composite_name(), Some("app.jar"));
        assert_eq!(root.children()[0].type_id(), "archive");
    }

    #[test]
    fn plain_root_is_empty() {
        assert!(PlainArtifactType.create_root("app").children().is_empty());
    }
}
