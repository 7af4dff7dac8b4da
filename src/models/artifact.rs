use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::element::{type_ids, PackagingElement};
use super::properties::{options_of, ArtifactProperties};
use crate::error::{Error, Result};

/// Stable handle of an artifact.
///
/// The handle survives renames and copy-on-write clones, so it is what the
/// commit diff uses to tell "changed" from "removed and re-added".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactId(Uuid);

impl ArtifactId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A named build-output descriptor owning a packaging tree.
///
/// Artifacts published in a read model are shared behind `Arc` and never
/// mutated; edits happen on a clone owned by an
/// [`ArtifactSession`](crate::manager::ArtifactSession).
#[derive(Debug, Clone)]
pub struct Artifact {
    id: ArtifactId,
    name: String,
    artifact_type: String,
    output_path: Option<String>,
    build_on_make: bool,
    clear_output_on_rebuild: bool,
    root: PackagingElement,
    properties: BTreeMap<String, Box<dyn ArtifactProperties>>,
}

impl Artifact {
    /// Create an artifact with a fresh handle and an empty root.
    pub fn new(name: impl Into<String>, artifact_type: impl Into<String>) -> Self {
        Self {
            id: ArtifactId::new(),
            name: name.into(),
            artifact_type: artifact_type.into(),
            output_path: None,
            build_on_make: false,
            clear_output_on_rebuild: false,
            root: PackagingElement::root(),
            properties: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> ArtifactId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names are unique per model, so renames go through the session.
    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn artifact_type(&self) -> &str {
        &self.artifact_type
    }

    pub fn set_artifact_type(&mut self, artifact_type: impl Into<String>) {
        self.artifact_type = artifact_type.into();
    }

    pub fn output_path(&self) -> Option<&str> {
        self.output_path.as_deref()
    }

    /// Set the output directory. An empty string clears it.
    pub fn set_output_path(&mut self, output_path: Option<String>) {
        self.output_path = output_path.filter(|p| !p.is_empty());
    }

    pub fn is_build_on_make(&self) -> bool {
        self.build_on_make
    }

    pub fn set_build_on_make(&mut self, build_on_make: bool) {
        self.build_on_make = build_on_make;
    }

    pub fn is_clear_output_on_rebuild(&self) -> bool {
        self.clear_output_on_rebuild
    }

    pub fn set_clear_output_on_rebuild(&mut self, clear: bool) {
        self.clear_output_on_rebuild = clear;
    }

    pub fn root_element(&self) -> &PackagingElement {
        &self.root
    }

    pub fn root_element_mut(&mut self) -> &mut PackagingElement {
        &mut self.root
    }

    /// Replace the whole tree. The new root must be of kind `root`.
    pub fn set_root_element(&mut self, root: PackagingElement) -> Result<()> {
        if root.type_id() != type_ids::ROOT {
            return Err(Error::InvalidRoot(root.type_id().to_string()));
        }
        self.root = root;
        Ok(())
    }

    pub fn properties(&self, provider_id: &str) -> Option<&dyn ArtifactProperties> {
        self.properties.get(provider_id).map(|p| p.as_ref())
    }

    /// Attach properties. Default-valued properties are equivalent to none
    /// and clear the entry instead.
    pub fn set_properties(&mut self, provider_id: impl Into<String>, properties: Box<dyn ArtifactProperties>) {
        let provider_id = provider_id.into();
        if properties.is_default() {
            self.remove_properties(&provider_id);
        } else {
            self.properties.insert(provider_id, properties);
        }
    }

    pub fn remove_properties(&mut self, provider_id: &str) -> Option<Box<dyn ArtifactProperties>> {
        self.properties.remove(provider_id)
    }

    /// Properties entries ordered by provider id.
    pub fn properties_entries(&self) -> impl Iterator<Item = (&str, &dyn ArtifactProperties)> {
        self.properties
            .iter()
            .map(|(id, props)| (id.as_str(), props.as_ref()))
    }

    /// Compare everything except the handle.
    pub fn content_eq(&self, other: &Artifact) -> bool {
        self.name == other.name
            && self.artifact_type == other.artifact_type
            && self.output_path == other.output_path
            && self.build_on_make == other.build_on_make
            && self.clear_output_on_rebuild == other.clear_output_on_rebuild
            && self.root == other.root
            && self.properties.len() == other.properties.len()
            && self
                .properties
                .iter()
                .zip(other.properties.iter())
                .all(|((a_id, a), (b_id, b))| {
                    a_id == b_id && options_of(a.as_ref()) == options_of(b.as_ref())
                })
    }
}
