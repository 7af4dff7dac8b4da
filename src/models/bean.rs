use crate::document::Attributes;
use crate::error::{Error, Result};

/// Mapping between a typed state struct and a flat attribute bag.
///
/// Writers emit the full state; readers start from the current (default)
/// values and only overwrite fields whose attribute is present.
pub trait StateBean {
    fn write_attributes(&self, attributes: &mut Attributes);

    fn read_attributes(&mut self, attributes: &Attributes) -> Result<()>;
}

pub fn format_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

pub(crate) fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(Error::InvalidAttribute {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

pub(crate) fn read_string(attributes: &Attributes, name: &str, target: &mut String) {
    if let Some(value) = attributes.get(name) {
        target.clone_from(value);
    }
}

pub(crate) fn read_optional(attributes: &Attributes, name: &str, target: &mut Option<String>) {
    if let Some(value) = attributes.get(name) {
        *target = Some(value.clone());
    }
}

pub(crate) fn read_bool(attributes: &Attributes, name: &str, target: &mut bool) -> Result<()> {
    if let Some(value) = attributes.get(name) {
        *target = parse_bool(name, value)?;
    }
    Ok(())
}

pub(crate) fn write_optional(attributes: &mut Attributes, name: &str, value: &Option<String>) {
    if let Some(value) = value {
        attributes.insert(name.to_string(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_attributes_keep_current_values() {
        let attributes = Attributes::new();
        let mut name = "kept".to_string();
        let mut flag = true;
        read_string(&attributes, "name", &mut name);
        read_bool(&attributes, "enabled", &mut flag).unwrap();
        assert_eq!(name, "kept");
        assert!(flag);
    }

    #[test]
    fn malformed_bool_is_rejected() {
        let mut attributes = Attributes::new();
        attributes.insert("enabled".into(), "yes".into());
        let mut flag = false;
        let err = read_bool(&attributes, "enabled", &mut flag).unwrap_err();
        assert!(matches!(err, Error::InvalidAttribute { ref name, .. } if name == "enabled"));
    }
}
