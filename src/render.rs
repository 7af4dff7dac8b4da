//! ASCII tree rendering for artifact layouts.

use crate::models::{Artifact, ElementState, PackagingElement};

const DIRECTORY: char = '▸';
const ARCHIVE: char = '▣';
const FILE: char = '•';
const OUTPUT: char = '●';
const LIBRARY: char = '◇';
const ARTIFACT: char = '○';
const OTHER: char = '·';

/// Get the symbol for an element kind.
fn element_symbol(element: &PackagingElement) -> char {
    match element.state() {
        ElementState::Root | ElementState::Directory(_) => DIRECTORY,
        ElementState::Archive(_) => ARCHIVE,
        ElementState::FileCopy(_)
        | ElementState::DirectoryCopy(_)
        | ElementState::ExtractedDirectory(_) => FILE,
        ElementState::ModuleOutput(_) => OUTPUT,
        ElementState::Library(_) => LIBRARY,
        ElementState::ArtifactReference(_) => ARTIFACT,
        ElementState::Custom(_) => OTHER,
    }
}

/// Render an artifact's packaging tree with kind symbols.
///
/// Example output:
/// ```text
/// app (jar) -> /out/app
/// └── ▣ app.jar
///     ├── ● 'core' compile output
///     └── ▸ lib/
///         └── ◇ project library 'serde'
/// ```
pub fn render_artifact(artifact: &Artifact) -> String {
    let mut output = String::new();
    output.push_str(artifact.name());
    output.push_str(&format!(" ({})", artifact.artifact_type()));
    if let Some(path) = artifact.output_path() {
        output.push_str(" -> ");
        output.push_str(path);
    }
    output.push('\n');

    let children = artifact.root_element().children();
    for (i, child) in children.iter().enumerate() {
        let is_last = i == children.len() - 1;
        render_node(&mut output, child, "", is_last);
    }
    output
}

/// Recursively render a node and its children.
fn render_node(output: &mut String, node: &PackagingElement, prefix: &str, is_last: bool) {
    let branch = if is_last { "└── " } else { "├── " };
    output.push_str(prefix);
    output.push_str(branch);
    output.push(element_symbol(node));
    output.push(' ');
    output.push_str(&node.to_string());
    output.push('\n');

    let continuation = if is_last { "    " } else { "│   " };
    let child_prefix = format!("{}{}", prefix, continuation);

    for (i, child) in node.children().iter().enumerate() {
        let child_is_last = i == node.children().len() - 1;
        render_node(output, child, &child_prefix, child_is_last);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LibraryLevel;

    #[test]
    fn test_empty_artifact() {
        let artifact = Artifact::new("app", "plain");
        assert_eq!(render_artifact(&artifact), "app (plain)\n");
    }

    #[test]
    fn test_nested_children() {
        let mut artifact = Artifact::new("app", "jar");
        artifact.set_output_path(Some("/out/app".into()));
        let archive = artifact
            .root_element_mut()
            .add_or_find_child(PackagingElement::archive("app.jar"))
            .unwrap();
        archive
            .add_or_find_child(PackagingElement::module_output("core"))
            .unwrap();
        archive
            .add_or_find_child(PackagingElement::directory("lib"))
            .unwrap()
            .add_or_find_child(PackagingElement::library(LibraryLevel::Project, "serde", None))
            .unwrap();

        let expected = "app (jar) -> /out/app\n└── ▣ app.jar\n    ├── ● 'core' compile output\n    └── ▸ lib/\n        └── ◇ project library 'serde'\n";
        assert_eq!(render_artifact(&artifact), expected);
    }
}
