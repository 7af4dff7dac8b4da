//! Conversion between artifacts and the attributed-tree [`Element`] document.
//!
//! Layout of one artifact:
//!
//! ```text
//! artifact name=.. output-path=.. build-on-make=.. clear-output-on-rebuild=.. artifact-type-id=..
//! ├── element id=root
//! │   └── element id=directory name=lib
//! │       └── element id=file-copy path=..
//! └── properties id=post-processing
//!     └── options enabled=true command=..
//! ```
//!
//! The recursion over `element` nodes knows nothing about the attributes a
//! kind carries; that mapping belongs to each kind's [`StateBean`].

use std::collections::HashSet;
use std::fmt;

use crate::document::{Attributes, Element};
use crate::error::{Error, Result};
use crate::models::{
    format_bool, parse_bool, type_ids, Artifact, ArtifactProperties, PackagingElement, StateBean,
};
use crate::registry::Registry;

pub const ARTIFACTS_TAG: &str = "artifacts";
pub const ARTIFACT_TAG: &str = "artifact";
pub const ELEMENT_TAG: &str = "element";
pub const PROPERTIES_TAG: &str = "properties";
pub const OPTIONS_TAG: &str = "options";

const ID_ATTR: &str = "id";
const NAME_ATTR: &str = "name";
const OUTPUT_PATH_ATTR: &str = "output-path";
const BUILD_ON_MAKE_ATTR: &str = "build-on-make";
const CLEAR_OUTPUT_ATTR: &str = "clear-output-on-rebuild";
const ARTIFACT_TYPE_ATTR: &str = "artifact-type-id";

/// Something dropped while loading a document.
#[derive(Debug)]
pub enum LoadProblem {
    ArtifactSkipped {
        name: String,
        reason: Error,
    },
    PropertiesSkipped {
        artifact: String,
        provider_id: String,
        reason: Error,
    },
}

impl fmt::Display for LoadProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArtifactSkipped { name, reason } => {
                write!(f, "artifact '{name}' skipped: {reason}")
            }
            Self::PropertiesSkipped {
                artifact,
                provider_id,
                reason,
            } => write!(
                f,
                "properties '{provider_id}' of artifact '{artifact}' skipped: {reason}"
            ),
        }
    }
}

/// Artifacts recovered from a document plus everything that was dropped.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub artifacts: Vec<Artifact>,
    pub problems: Vec<LoadProblem>,
}

// ============================================================
// Serialization
// ============================================================

/// Serialize a whole model, one `artifact` child per entry, in order.
pub fn serialize_artifacts<'a>(
    artifacts: impl IntoIterator<Item = &'a Artifact>,
    registry: &Registry,
) -> Element {
    let mut state = Element::new(ARTIFACTS_TAG);
    for artifact in artifacts {
        state.add_child(serialize_artifact(artifact, registry));
    }
    state
}

pub fn serialize_artifact(artifact: &Artifact, registry: &Registry) -> Element {
    let mut element = Element::new(ARTIFACT_TAG).with_attribute(NAME_ATTR, artifact.name());
    if let Some(output_path) = artifact.output_path() {
        element.set_attribute(OUTPUT_PATH_ATTR, output_path);
    }
    element.set_attribute(BUILD_ON_MAKE_ATTR, format_bool(artifact.is_build_on_make()));
    element.set_attribute(
        CLEAR_OUTPUT_ATTR,
        format_bool(artifact.is_clear_output_on_rebuild()),
    );
    element.set_attribute(ARTIFACT_TYPE_ATTR, artifact.artifact_type());

    element.add_child(serialize_element(artifact.root_element()));
    for (provider_id, properties) in artifact.properties_entries() {
        if let Some(state) = serialize_properties(provider_id, properties, registry) {
            element.add_child(state);
        }
    }
    element
}

/// Serialize a tree node and, for composite kinds, its subtree.
pub fn serialize_element(packaging_element: &PackagingElement) -> Element {
    let mut element =
        Element::new(ELEMENT_TAG).with_attribute(ID_ATTR, packaging_element.type_id());

    let mut bean = Attributes::new();
    packaging_element.state().write_attributes(&mut bean);
    bean.shift_remove(ID_ATTR);
    element.attributes.extend(bean);

    for child in packaging_element.children() {
        element.add_child(serialize_element(child));
    }
    element
}

/// `None` when every option equals the provider's default.
fn serialize_properties(
    provider_id: &str,
    properties: &dyn ArtifactProperties,
    registry: &Registry,
) -> Option<Element> {
    let mut options = Attributes::new();
    properties.write_attributes(&mut options);

    if let Some(provider) = registry.providers().find_by_id(provider_id) {
        let mut defaults = Attributes::new();
        provider.create_properties().write_attributes(&mut defaults);
        options.retain(|name, value| defaults.get(name) != Some(value));
    }

    if options.is_empty() {
        return None;
    }

    let mut options_element = Element::new(OPTIONS_TAG);
    options_element.attributes = options;
    Some(
        Element::new(PROPERTIES_TAG)
            .with_attribute(ID_ATTR, provider_id)
            .with_child(options_element),
    )
}

// ============================================================
// Deserialization
// ============================================================

/// Rebuild artifacts from a model document.
///
/// Artifacts that cannot be rebuilt (unknown artifact or element type,
/// malformed attributes, duplicate names) are dropped and reported; the rest
/// still load.
pub fn deserialize_artifacts(state: &Element, registry: &Registry) -> LoadReport {
    let mut report = LoadReport::default();
    let mut names = HashSet::new();

    for node in state.children_named(ARTIFACT_TAG) {
        let name = node.attribute(NAME_ATTR).unwrap_or_default().to_string();
        let result = if names.contains(&name) {
            Err(Error::DuplicateArtifactName(name.clone()))
        } else {
            deserialize_artifact(node, registry, &mut report.problems)
        };

        match result {
            Ok(artifact) => {
                names.insert(name);
                report.artifacts.push(artifact);
            }
            Err(reason) => {
                tracing::warn!("Skipping artifact '{}': {}", name, reason);
                report
                    .problems
                    .push(LoadProblem::ArtifactSkipped { name, reason });
            }
        }
    }

    tracing::debug!(
        "Loaded {} artifacts ({} problems)",
        report.artifacts.len(),
        report.problems.len()
    );
    report
}

/// Rebuild one artifact. Unknown properties providers are pushed to
/// `problems` without failing the artifact.
pub fn deserialize_artifact(
    node: &Element,
    registry: &Registry,
    problems: &mut Vec<LoadProblem>,
) -> Result<Artifact> {
    let name = node.attribute(NAME_ATTR).unwrap_or_default();
    if name.is_empty() {
        return Err(Error::EmptyArtifactName);
    }

    let type_id = node.attribute(ARTIFACT_TYPE_ATTR).unwrap_or_default();
    if !registry.artifact_types().contains(type_id) {
        return Err(Error::UnknownArtifactType(type_id.to_string()));
    }

    let root = match node.child(ELEMENT_TAG) {
        Some(element) => deserialize_element(element, registry)?,
        None => PackagingElement::root(),
    };

    let mut artifact = Artifact::new(name, type_id);
    artifact.set_root_element(root)?;
    artifact.set_output_path(node.attribute(OUTPUT_PATH_ATTR).map(str::to_string));
    artifact.set_build_on_make(read_flag(node, BUILD_ON_MAKE_ATTR)?);
    artifact.set_clear_output_on_rebuild(read_flag(node, CLEAR_OUTPUT_ATTR)?);

    for properties_node in node.children_named(PROPERTIES_TAG) {
        let provider_id = properties_node.attribute(ID_ATTR).unwrap_or_default();
        if let Err(reason) = deserialize_properties(&mut artifact, provider_id, properties_node, registry) {
            tracing::warn!(
                "Skipping properties '{}' of artifact '{}': {}",
                provider_id,
                name,
                reason
            );
            problems.push(LoadProblem::PropertiesSkipped {
                artifact: name.to_string(),
                provider_id: provider_id.to_string(),
                reason,
            });
        }
    }

    Ok(artifact)
}

/// Rebuild a tree node and its subtree, merging duplicate children.
pub fn deserialize_element(element: &Element, registry: &Registry) -> Result<PackagingElement> {
    let type_id = element.attribute(ID_ATTR).unwrap_or_default();
    let mut packaging_element = registry.create_element(type_id)?;

    let mut bean = element.attributes.clone();
    bean.shift_remove(ID_ATTR);
    if !bean.is_empty() {
        packaging_element.read_state(&bean)?;
    }

    for child in element.children_named(ELEMENT_TAG) {
        let child = deserialize_element(child, registry)?;
        packaging_element.add_or_find_child(child)?;
    }
    Ok(packaging_element)
}

fn deserialize_properties(
    artifact: &mut Artifact,
    provider_id: &str,
    node: &Element,
    registry: &Registry,
) -> Result<()> {
    let provider = registry
        .providers()
        .find_by_id(provider_id)
        .ok_or_else(|| Error::UnknownPropertiesProvider(provider_id.to_string()))?;

    let Some(options) = node.child(OPTIONS_TAG) else {
        return Ok(());
    };

    let mut properties = provider.create_properties();
    properties.read_attributes(&options.attributes)?;
    artifact.set_properties(provider_id, properties);
    Ok(())
}

fn read_flag(node: &Element, name: &str) -> Result<bool> {
    let mut flag = false;
    if let Some(value) = node.attribute(name) {
        flag = parse_bool(name, value)?;
    }
    Ok(flag)
}

/// True when `element` is a tree node document for the core `root` kind.
pub fn is_root_element(element: &Element) -> bool {
    element.tag == ELEMENT_TAG && element.attribute(ID_ATTR) == Some(type_ids::ROOT)
}
