use std::sync::Arc;

use super::Catalog;
use crate::document::Attributes;
use crate::error::{Error, Result};
use crate::models::{
    type_ids, ArtifactReferenceState, CustomState, ElementState, ExtractedDirectoryState,
    FileCopyState, LibraryState, NamedState, PackagingElement, PathState, RESERVED_ATTRIBUTE,
};

/// Descriptor of a packaging element kind.
pub trait ElementType: Send + Sync {
    fn id(&self) -> &str;

    fn presentable_name(&self) -> &str;

    fn is_composite(&self) -> bool;

    /// New node of this kind with default state and no children.
    fn create_empty(&self) -> PackagingElement;
}

/// One of the built-in kinds backed by an [`ElementState`] variant.
pub struct CoreElementType {
    id: &'static str,
    presentable_name: &'static str,
    empty_state: fn() -> ElementState,
}

impl CoreElementType {
    pub fn all() -> Vec<CoreElementType> {
        vec![
            Self::new(type_ids::ROOT, "Output Root", || ElementState::Root),
            Self::new(type_ids::DIRECTORY, "Directory", || {
                ElementState::Directory(NamedState::default())
            }),
            Self::new(type_ids::ARCHIVE, "Archive", || {
                ElementState::Archive(NamedState::default())
            }),
            Self::new(type_ids::FILE_COPY, "File", || {
                ElementState::FileCopy(FileCopyState::default())
            }),
            Self::new(type_ids::DIR_COPY, "Directory Content", || {
                ElementState::DirectoryCopy(PathState::default())
            }),
            Self::new(type_ids::EXTRACTED_DIR, "Extracted Directory", || {
                ElementState::ExtractedDirectory(ExtractedDirectoryState::default())
            }),
            Self::new(type_ids::MODULE_OUTPUT, "Module Output", || {
                ElementState::ModuleOutput(NamedState::default())
            }),
            Self::new(type_ids::LIBRARY, "Library Files", || {
                ElementState::Library(LibraryState::default())
            }),
            Self::new(type_ids::ARTIFACT, "Artifact", || {
                ElementState::ArtifactReference(ArtifactReferenceState::default())
            }),
        ]
    }

    fn new(id: &'static str, presentable_name: &'static str, empty_state: fn() -> ElementState) -> Self {
        Self {
            id,
            presentable_name,
            empty_state,
        }
    }
}

impl ElementType for CoreElementType {
    fn id(&self) -> &str {
        self.id
    }

    fn presentable_name(&self) -> &str {
        self.presentable_name
    }

    fn is_composite(&self) -> bool {
        (self.empty_state)().is_composite()
    }

    fn create_empty(&self) -> PackagingElement {
        PackagingElement::new((self.empty_state)())
    }
}

/// Externally contributed kind whose state is a free-form attribute bag.
pub struct CustomElementType {
    id: String,
    presentable_name: String,
    composite: bool,
    defaults: Attributes,
}

impl CustomElementType {
    pub fn new(id: impl Into<String>, presentable_name: impl Into<String>, composite: bool) -> Self {
        Self {
            id: id.into(),
            presentable_name: presentable_name.into(),
            composite,
            defaults: Attributes::new(),
        }
    }

    /// Attribute present on every new node of this kind.
    pub fn with_default(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(name.into(), value.into());
        self
    }
}

impl ElementType for CustomElementType {
    fn id(&self) -> &str {
        &self.id
    }

    fn presentable_name(&self) -> &str {
        &self.presentable_name
    }

    fn is_composite(&self) -> bool {
        self.composite
    }

    fn create_empty(&self) -> PackagingElement {
        PackagingElement::new(ElementState::Custom(CustomState::with_attributes(
            self.id.clone(),
            self.composite,
            self.defaults.clone(),
        )))
    }
}

#[derive(Default)]
pub struct ElementTypeRegistry {
    types: Catalog<dyn ElementType>,
}

impl ElementTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for core in CoreElementType::all() {
            registry.types.entries.insert(core.id.to_string(), Arc::new(core));
        }
        registry
    }

    /// Add a kind. Ids are the on-disk discriminator, so duplicates are
    /// rejected.
    pub fn register(&mut self, element_type: Arc<dyn ElementType>) -> Result<()> {
        if let ElementState::Custom(state) = element_type.create_empty().state() {
            if let Some(value) = state.attribute(RESERVED_ATTRIBUTE) {
                return Err(Error::InvalidAttribute {
                    name: RESERVED_ATTRIBUTE.to_string(),
                    value: value.to_string(),
                });
            }
        }
        let id = element_type.id().to_string();
        self.types.insert(&id, element_type)
    }

    pub fn find_type(&self, type_id: &str) -> Option<Arc<dyn ElementType>> {
        self.types.find(type_id)
    }

    pub fn create_empty(&self, type_id: &str) -> Result<PackagingElement> {
        self.find_type(type_id)
            .map(|t| t.create_empty())
            .ok_or_else(|| Error::UnknownElementType(type_id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.types.ids()
    }
}
