//! Template node tree.
//!
//! The parser produces this tree once per component definition; every render
//! clones it and hands the clone to the executor, which rewrites structure in
//! place. The executed tree is consumed by the reconciler and dropped.

use crate::dom::NodeId;

/// An element with ordered attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lowercase tag name.
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing one in place.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(n, _)| *n == name) {
            Some(attr) => attr.1 = value,
            None => self.attrs.push((name, value)),
        }
    }
}

/// A subcomponent that has already rendered its own live subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mounted {
    pub tag: String,
    /// Live root element of the subcomponent instance.
    pub root: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Text still subject to mustache interpolation.
    Text(String),
    /// Placeholder for a subcomponent's live root.
    Component(Mounted),
}

impl Node {
    pub fn element(tag: impl Into<String>) -> Self {
        Node::Element(Element::new(tag))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    /// Kind name, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Element(_) => "element",
            Node::Text(_) => "text",
            Node::Component(_) => "component",
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Collect the live roots of every mounted subcomponent in this subtree.
    pub fn mounted_roots(&self, out: &mut Vec<NodeId>) {
        match self {
            Node::Component(mounted) => out.push(mounted.root),
            Node::Element(el) => {
                for child in &el.children {
                    child.mounted_roots(out);
                }
            }
            Node::Text(_) => {}
        }
    }
}
