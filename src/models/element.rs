use std::fmt;

use serde::{Deserialize, Serialize};

use super::bean::{read_optional, read_string, write_optional, StateBean};
use crate::document::Attributes;
use crate::error::{Error, Result};

/// Stable type ids of the core element kinds. These are the on-disk
/// discriminators and must never change.
pub mod type_ids {
    pub const ROOT: &str = "root";
    pub const DIRECTORY: &str = "directory";
    pub const ARCHIVE: &str = "archive";
    pub const FILE_COPY: &str = "file-copy";
    pub const DIR_COPY: &str = "dir-copy";
    pub const EXTRACTED_DIR: &str = "extracted-dir";
    pub const MODULE_OUTPUT: &str = "module-output";
    pub const LIBRARY: &str = "library";
    pub const ARTIFACT: &str = "artifact";
}

/// A node of an artifact's packaging tree.
///
/// Composite kinds (`root`, `directory`, `archive` and composite custom
/// kinds) own an ordered list of children; every other kind is a leaf and
/// never has children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagingElement {
    state: ElementState,
    children: Vec<PackagingElement>,
}

/// Type-specific state of a packaging element, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementState {
    Root,
    Directory(NamedState),
    Archive(NamedState),
    FileCopy(FileCopyState),
    DirectoryCopy(PathState),
    ExtractedDirectory(ExtractedDirectoryState),
    ModuleOutput(NamedState),
    Library(LibraryState),
    ArtifactReference(ArtifactReferenceState),
    /// Kind contributed through the registry; its state is an opaque bag.
    Custom(CustomState),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedState {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileCopyState {
    pub path: String,
    /// Rename the file in the output; `None` keeps the source file name.
    pub output_file_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathState {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDirectoryState {
    pub path: String,
    pub path_in_jar: String,
}

impl Default for ExtractedDirectoryState {
    fn default() -> Self {
        Self {
            path: String::new(),
            path_in_jar: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryState {
    pub level: LibraryLevel,
    pub name: String,
    /// Owning module for module-level libraries.
    pub module_name: Option<String>,
}

/// Where a library is declared.
///
/// - `Project`: shared by every module of the project
/// - `Application`: global to the installation
/// - `Module`: private to a single module
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryLevel {
    #[default]
    Project,
    Application,
    Module,
}

impl LibraryLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Application => "application",
            Self::Module => "module",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "project" => Some(Self::Project),
            "application" => Some(Self::Application),
            "module" => Some(Self::Module),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactReferenceState {
    pub artifact_name: String,
}

/// Attribute bag of a registry-contributed kind.
///
/// `id` is reserved for the kind discriminator in documents and cannot be
/// used as an attribute name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomState {
    type_id: String,
    composite: bool,
    attributes: Attributes,
}

pub const RESERVED_ATTRIBUTE: &str = "id";

impl CustomState {
    pub fn new(type_id: impl Into<String>, composite: bool) -> Self {
        Self {
            type_id: type_id.into(),
            composite,
            attributes: Attributes::new(),
        }
    }

    /// Bag taken as given; callers outside the crate go through
    /// [`CustomState::set_attribute`].
    pub(crate) fn with_attributes(
        type_id: impl Into<String>,
        composite: bool,
        attributes: Attributes,
    ) -> Self {
        Self {
            type_id: type_id.into(),
            composite,
            attributes,
        }
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn is_composite(&self) -> bool {
        self.composite
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        if name == RESERVED_ATTRIBUTE {
            return Err(Error::InvalidAttribute {
                name,
                value: value.into(),
            });
        }
        self.attributes.insert(name, value.into());
        Ok(())
    }
}

impl ElementState {
    pub fn type_id(&self) -> &str {
        match self {
            Self::Root => type_ids::ROOT,
            Self::Directory(_) => type_ids::DIRECTORY,
            Self::Archive(_) => type_ids::ARCHIVE,
            Self::FileCopy(_) => type_ids::FILE_COPY,
            Self::DirectoryCopy(_) => type_ids::DIR_COPY,
            Self::ExtractedDirectory(_) => type_ids::EXTRACTED_DIR,
            Self::ModuleOutput(_) => type_ids::MODULE_OUTPUT,
            Self::Library(_) => type_ids::LIBRARY,
            Self::ArtifactReference(_) => type_ids::ARTIFACT,
            Self::Custom(state) => &state.type_id,
        }
    }

    pub fn is_composite(&self) -> bool {
        match self {
            Self::Root | Self::Directory(_) | Self::Archive(_) => true,
            Self::Custom(state) => state.composite,
            _ => false,
        }
    }
}

impl StateBean for ElementState {
    fn write_attributes(&self, attributes: &mut Attributes) {
        match self {
            Self::Root => {}
            Self::Directory(state) | Self::Archive(state) | Self::ModuleOutput(state) => {
                put(attributes, "name", &state.name)
            }
            Self::FileCopy(state) => {
                put(attributes, "path", &state.path);
                write_optional(attributes, "output-file-name", &state.output_file_name);
            }
            Self::DirectoryCopy(state) => put(attributes, "path", &state.path),
            Self::ExtractedDirectory(state) => {
                put(attributes, "path", &state.path);
                put(attributes, "path-in-jar", &state.path_in_jar);
            }
            Self::Library(state) => {
                put(attributes, "level", state.level.as_str());
                put(attributes, "name", &state.name);
                write_optional(attributes, "module-name", &state.module_name);
            }
            Self::ArtifactReference(state) => put(attributes, "artifact-name", &state.artifact_name),
            Self::Custom(state) => {
                attributes.extend(state.attributes.iter().map(|(k, v)| (k.clone(), v.clone())))
            }
        }
    }

    fn read_attributes(&mut self, attributes: &Attributes) -> Result<()> {
        match self {
            Self::Root => {}
            Self::Directory(state) | Self::Archive(state) | Self::ModuleOutput(state) => {
                read_string(attributes, "name", &mut state.name)
            }
            Self::FileCopy(state) => {
                read_string(attributes, "path", &mut state.path);
                read_optional(attributes, "output-file-name", &mut state.output_file_name);
            }
            Self::DirectoryCopy(state) => read_string(attributes, "path", &mut state.path),
            Self::ExtractedDirectory(state) => {
                read_string(attributes, "path", &mut state.path);
                read_string(attributes, "path-in-jar", &mut state.path_in_jar);
            }
            Self::Library(state) => {
                if let Some(level) = attributes.get("level") {
                    state.level =
                        LibraryLevel::from_str(level).ok_or_else(|| Error::InvalidAttribute {
                            name: "level".to_string(),
                            value: level.clone(),
                        })?;
                }
                read_string(attributes, "name", &mut state.name);
                read_optional(attributes, "module-name", &mut state.module_name);
            }
            Self::ArtifactReference(state) => {
                read_string(attributes, "artifact-name", &mut state.artifact_name)
            }
            Self::Custom(state) => {
                for (name, value) in attributes {
                    state.set_attribute(name.as_str(), value.as_str())?;
                }
            }
        }
        Ok(())
    }
}

fn put(attributes: &mut Attributes, name: &str, value: &str) {
    attributes.insert(name.to_string(), value.to_string());
}

impl PackagingElement {
    pub fn new(state: ElementState) -> Self {
        Self {
            state,
            children: Vec::new(),
        }
    }

    pub fn root() -> Self {
        Self::new(ElementState::Root)
    }

    /// A root holding `children` as given, without merging.
    pub fn root_with_children(children: Vec<PackagingElement>) -> Self {
        Self {
            state: ElementState::Root,
            children,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self::new(ElementState::Directory(NamedState { name: name.into() }))
    }

    pub fn archive(name: impl Into<String>) -> Self {
        Self::new(ElementState::Archive(NamedState { name: name.into() }))
    }

    pub fn file_copy(path: impl Into<String>, output_file_name: Option<String>) -> Self {
        Self::new(ElementState::FileCopy(FileCopyState {
            path: path.into(),
            output_file_name,
        }))
    }

    pub fn dir_copy(path: impl Into<String>) -> Self {
        Self::new(ElementState::DirectoryCopy(PathState { path: path.into() }))
    }

    pub fn extracted_dir(path: impl Into<String>, path_in_jar: impl Into<String>) -> Self {
        Self::new(ElementState::ExtractedDirectory(ExtractedDirectoryState {
            path: path.into(),
            path_in_jar: path_in_jar.into(),
        }))
    }

    pub fn module_output(module_name: impl Into<String>) -> Self {
        Self::new(ElementState::ModuleOutput(NamedState {
            name: module_name.into(),
        }))
    }

    pub fn library(level: LibraryLevel, name: impl Into<String>, module_name: Option<String>) -> Self {
        Self::new(ElementState::Library(LibraryState {
            level,
            name: name.into(),
            module_name,
        }))
    }

    pub fn artifact_reference(artifact_name: impl Into<String>) -> Self {
        Self::new(ElementState::ArtifactReference(ArtifactReferenceState {
            artifact_name: artifact_name.into(),
        }))
    }

    pub fn type_id(&self) -> &str {
        self.state.type_id()
    }

    pub fn is_composite(&self) -> bool {
        self.state.is_composite()
    }

    pub fn state(&self) -> &ElementState {
        &self.state
    }

    /// Replace the kind-specific state. The kind itself cannot change, and a
    /// node with children must stay composite.
    pub fn set_state(&mut self, state: ElementState) -> Result<()> {
        if state.type_id() != self.type_id() {
            return Err(Error::KindChange {
                from: self.type_id().to_string(),
                to: state.type_id().to_string(),
            });
        }
        if !state.is_composite() && !self.children.is_empty() {
            return Err(Error::NotComposite(state.type_id().to_string()));
        }
        self.state = state;
        Ok(())
    }

    /// Populate the state from a flat attribute bag.
    pub(crate) fn read_state(&mut self, attributes: &Attributes) -> Result<()> {
        self.state.read_attributes(attributes)
    }

    /// Name of a directory or archive; `None` for other kinds.
    pub fn composite_name(&self) -> Option<&str> {
        match &self.state {
            ElementState::Directory(state) | ElementState::Archive(state) => Some(&state.name),
            _ => None,
        }
    }

    /// Children in insertion order. Always empty for leaf kinds.
    pub fn children(&self) -> &[PackagingElement] {
        &self.children
    }

    pub fn child_mut(&mut self, index: usize) -> Option<&mut PackagingElement> {
        self.children.get_mut(index)
    }

    /// Whether `other` denotes the same logical node as `self`.
    ///
    /// Directories and archives are identified by kind and name only, so
    /// their contents can be merged; leaves must match on their full state.
    pub fn is_equal_to(&self, other: &PackagingElement) -> bool {
        match (&self.state, &other.state) {
            (ElementState::Root, ElementState::Root) => true,
            (ElementState::Directory(a), ElementState::Directory(b))
            | (ElementState::Archive(a), ElementState::Archive(b)) => a.name == b.name,
            (a, b) => a == b,
        }
    }

    /// Return the child equal to `child`, appending `child` if there is none.
    ///
    /// When an equal composite child already exists, the children of `child`
    /// are merged into it with the same rule.
    pub fn add_or_find_child(&mut self, child: PackagingElement) -> Result<&mut PackagingElement> {
        if !self.is_composite() {
            return Err(Error::NotComposite(self.type_id().to_string()));
        }

        match self.children.iter().position(|c| c.is_equal_to(&child)) {
            Some(index) => {
                let existing = &mut self.children[index];
                for grandchild in child.children {
                    existing.add_or_find_child(grandchild)?;
                }
                Ok(existing)
            }
            None => {
                let index = self.children.len();
                self.children.push(child);
                Ok(&mut self.children[index])
            }
        }
    }

    pub fn remove_child(&mut self, index: usize) -> Result<PackagingElement> {
        if index >= self.children.len() {
            return Err(Error::ChildIndexOutOfBounds {
                index,
                len: self.children.len(),
            });
        }
        Ok(self.children.remove(index))
    }

    /// Directory or archive child with the given name.
    pub fn find_composite_child(&self, name: &str) -> Option<&PackagingElement> {
        self.children
            .iter()
            .find(|c| c.composite_name() == Some(name))
    }

    pub fn find_composite_child_mut(&mut self, name: &str) -> Option<&mut PackagingElement> {
        self.children
            .iter_mut()
            .find(|c| c.composite_name() == Some(name))
    }

    /// Walk a `/`-separated path below this node, creating missing
    /// directories, and return the innermost node. An empty path returns
    /// `self`.
    pub fn find_or_create_directory(&mut self, path: &str) -> Result<&mut PackagingElement> {
        let mut current = self;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if !current.is_composite() {
                return Err(Error::NotComposite(current.type_id().to_string()));
            }
            let index = match current
                .children
                .iter()
                .position(|c| c.composite_name() == Some(segment))
            {
                Some(index) => index,
                None => {
                    current.children.push(PackagingElement::directory(segment));
                    current.children.len() - 1
                }
            };
            current = &mut current.children[index];
        }
        Ok(current)
    }

    /// Visit this node and all descendants in pre-order.
    pub fn walk<'a>(&'a self, visitor: &mut dyn FnMut(&'a PackagingElement)) {
        visitor(self);
        for child in &self.children {
            child.walk(visitor);
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(PackagingElement::node_count).sum::<usize>()
    }
}

impl fmt::Display for PackagingElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            ElementState::Root => write!(f, "<output root>"),
            ElementState::Directory(s) => write!(f, "{}/", s.name),
            ElementState::Archive(s) => write!(f, "{}", s.name),
            ElementState::FileCopy(s) => match &s.output_file_name {
                Some(renamed) => write!(f, "{} (as {})", s.path, renamed),
                None => write!(f, "{}", s.path),
            },
            ElementState::DirectoryCopy(s) => write!(f, "{}/*", s.path),
            ElementState::ExtractedDirectory(s) => write!(f, "{}!{}", s.path, s.path_in_jar),
            ElementState::ModuleOutput(s) => write!(f, "'{}' compile output", s.name),
            ElementState::Library(s) => write!(f, "{} library '{}'", s.level.as_str(), s.name),
            ElementState::ArtifactReference(s) => write!(f, "artifact '{}'", s.artifact_name),
            ElementState::Custom(s) => write!(f, "{}", s.type_id),
        }
    }
}
