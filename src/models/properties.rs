use std::fmt;

use super::bean::{format_bool, read_bool, read_optional, read_string, write_optional, StateBean};
use crate::document::Attributes;
use crate::error::Result;

/// Extra per-artifact state contributed by a properties provider.
///
/// The artifact model never inspects this state; it only clones it with the
/// owning artifact and moves it through the attribute bag on save and load.
pub trait ArtifactProperties: StateBean + fmt::Debug + Send + Sync {
    fn clone_boxed(&self) -> Box<dyn ArtifactProperties>;

    /// True when this state equals what its provider creates.
    fn is_default(&self) -> bool;
}

impl Clone for Box<dyn ArtifactProperties> {
    fn clone(&self) -> Self {
        self.clone_boxed()
    }
}

/// Full attribute form of a properties object.
pub fn options_of(properties: &dyn ArtifactProperties) -> Attributes {
    let mut options = Attributes::new();
    properties.write_attributes(&mut options);
    options
}

/// A shell command run before or after an artifact is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookProperties {
    pub enabled: bool,
    pub command: String,
    pub working_dir: Option<String>,
}

impl StateBean for HookProperties {
    fn write_attributes(&self, attributes: &mut Attributes) {
        attributes.insert("enabled".to_string(), format_bool(self.enabled).to_string());
        attributes.insert("command".to_string(), self.command.clone());
        write_optional(attributes, "working-dir", &self.working_dir);
    }

    fn read_attributes(&mut self, attributes: &Attributes) -> Result<()> {
        read_bool(attributes, "enabled", &mut self.enabled)?;
        read_string(attributes, "command", &mut self.command);
        read_optional(attributes, "working-dir", &mut self.working_dir);
        Ok(())
    }
}

impl ArtifactProperties for HookProperties {
    fn clone_boxed(&self) -> Box<dyn ArtifactProperties> {
        Box::new(self.clone())
    }

    fn is_default(&self) -> bool {
        *self == Self::default()
    }
}
