//! Schema-free attributed-tree document.
//!
//! A [`Element`] is a tag, an ordered map of string attributes and an ordered
//! list of child elements. The codec maps artifacts onto this shape and the
//! storage backends persist it as JSON.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered string attribute bag.
pub type Attributes = IndexMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Attributes::new(),
            children: Vec::new(),
        }
    }

    /// Builder form of [`Element::set_attribute`].
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Set an attribute, replacing any existing value in place.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn add_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// First child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// All children with the given tag, in document order.
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// True when the element carries neither attributes nor children.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.children.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_attribute_keeps_original_position() {
        let mut element = Element::new("artifact")
            .with_attribute("name", "a")
            .with_attribute("build-on-make", "false");
        element.set_attribute("name", "b");

        let keys: Vec<&str> = element.attributes.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "build-on-make"]);
        assert_eq!(element.attribute("name"), Some("b"));
    }

    #[test]
    fn children_named_filters_by_tag() {
        let element = Element::new("artifact")
            .with_child(Element::new("element"))
            .with_child(Element::new("properties"))
            .with_child(Element::new("properties"));

        assert_eq!(element.children_named("properties").count(), 2);
        assert!(element.child("element").is_some());
        assert!(element.child("options").is_none());
    }

    #[test]
    fn empty_collections_are_not_serialized() {
        let json = Element::new("options").to_json().unwrap();
        assert!(!json.contains("attributes"));
        assert!(!json.contains("children"));

        let parsed = Element::from_json(&json).unwrap();
        assert!(parsed.is_empty());
        assert_eq!(parsed.tag, "options");
    }
}
