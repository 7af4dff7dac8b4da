//! Checks that the references inside a packaging tree can be resolved.

use std::collections::HashSet;
use std::fmt;

use crate::manager::ArtifactModel;
use crate::models::{Artifact, ElementState, LibraryLevel};

/// Answers questions about the project hosting the artifacts.
pub trait ResolvingContext: Send + Sync {
    fn has_module(&self, name: &str) -> bool;

    fn has_library(&self, level: LibraryLevel, name: &str, module_name: Option<&str>) -> bool;
}

/// Resolves every reference. Used when no project information is available.
pub struct PermissiveContext;

impl ResolvingContext for PermissiveContext {
    fn has_module(&self, _name: &str) -> bool {
        true
    }

    fn has_library(&self, _level: LibraryLevel, _name: &str, _module_name: Option<&str>) -> bool {
        true
    }
}

/// Fixed sets of known modules and libraries.
#[derive(Debug, Clone, Default)]
pub struct StaticResolvingContext {
    modules: HashSet<String>,
    libraries: HashSet<(LibraryLevel, String)>,
}

impl StaticResolvingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, name: impl Into<String>) -> Self {
        self.modules.insert(name.into());
        self
    }

    pub fn with_library(mut self, level: LibraryLevel, name: impl Into<String>) -> Self {
        self.libraries.insert((level, name.into()));
        self
    }
}

impl ResolvingContext for StaticResolvingContext {
    fn has_module(&self, name: &str) -> bool {
        self.modules.contains(name)
    }

    fn has_library(&self, level: LibraryLevel, name: &str, module_name: Option<&str>) -> bool {
        if level == LibraryLevel::Module && !module_name.is_some_and(|m| self.has_module(m)) {
            return false;
        }
        self.libraries.contains(&(level, name.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationProblem {
    MissingOutputPath,
    UnknownModule(String),
    UnknownLibrary { level: LibraryLevel, name: String },
    MissingArtifact(String),
    SelfReference,
}

impl fmt::Display for ValidationProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingOutputPath => write!(f, "output directory is not specified"),
            Self::UnknownModule(name) => write!(f, "module '{name}' not found"),
            Self::UnknownLibrary { level, name } => {
                write!(f, "{} library '{}' not found", level.as_str(), name)
            }
            Self::MissingArtifact(name) => write!(f, "artifact '{name}' not found"),
            Self::SelfReference => write!(f, "artifact includes itself"),
        }
    }
}

/// Problems with `artifact`, resolving artifact references against `model`.
pub fn validate_artifact<M: ArtifactModel + ?Sized>(
    artifact: &Artifact,
    model: &M,
    context: &dyn ResolvingContext,
) -> Vec<ValidationProblem> {
    let mut problems = Vec::new();
    if artifact.output_path().is_none() {
        problems.push(ValidationProblem::MissingOutputPath);
    }

    artifact.root_element().walk(&mut |element| match element.state() {
        ElementState::ModuleOutput(state) if !context.has_module(&state.name) => {
            problems.push(ValidationProblem::UnknownModule(state.name.clone()));
        }
        ElementState::Library(state)
            if !context.has_library(state.level, &state.name, state.module_name.as_deref()) =>
        {
            problems.push(ValidationProblem::UnknownLibrary {
                level: state.level,
                name: state.name.clone(),
            });
        }
        ElementState::ArtifactReference(state) => {
            if state.artifact_name == artifact.name() {
                problems.push(ValidationProblem::SelfReference);
            } else if model.find_artifact(&state.artifact_name).is_none() {
                problems.push(ValidationProblem::MissingArtifact(state.artifact_name.clone()));
            }
        }
        _ => {}
    });

    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::ArtifactSnapshot;
    use crate::models::PackagingElement;

    fn artifact_with(children: Vec<PackagingElement>) -> Artifact {
        let mut artifact = Artifact::new("web", "plain");
        artifact.set_output_path(Some("/out/web".into()));
        for child in children {
            artifact.root_element_mut().add_or_find_child(child).unwrap();
        }
        artifact
    }

    #[test]
    fn resolved_tree_has_no_problems() {
        let context = StaticResolvingContext::new()
            .with_module("core")
            .with_library(LibraryLevel::Project, "serde");
        let artifact = artifact_with(vec![
            PackagingElement::module_output("core"),
            PackagingElement::library(LibraryLevel::Project, "serde", None),
        ]);
        let problems = validate_artifact(&artifact, &ArtifactSnapshot::default(), &context);
        assert!(problems.is_empty());
    }

    #[test]
    fn unresolved_references_are_reported() {
        let artifact = artifact_with(vec![
            PackagingElement::module_output("ghost"),
            PackagingElement::library(LibraryLevel::Module, "junit", Some("core".into())),
            PackagingElement::artifact_reference("missing"),
            PackagingElement::artifact_reference("web"),
        ]);
        let problems = validate_artifact(
            &artifact,
            &ArtifactSnapshot::default(),
            &StaticResolvingContext::new(),
        );
        assert_eq!(
            problems,
            vec![
                ValidationProblem::UnknownModule("ghost".into()),
                ValidationProblem::UnknownLibrary {
                    level: LibraryLevel::Module,
                    name: "junit".into()
                },
                ValidationProblem::MissingArtifact("missing".into()),
                ValidationProblem::SelfReference,
            ]
        );
    }

    #[test]
    fn missing_output_path_is_reported() {
        let artifact = Artifact::new("bare", "plain");
        let problems =
            validate_artifact(&artifact, &ArtifactSnapshot::default(), &PermissiveContext);
        assert_eq!(problems, vec![ValidationProblem::MissingOutputPath]);
    }
}
