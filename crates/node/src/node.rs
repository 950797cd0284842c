//! The node and cursor capability consumed by accessors.
//!
//! A node is a shared handle to one position in an XML tree: the document
//! root, an element, an attribute, or a text node. Cursors iterate the
//! children or attributes of a node that match a [`Selector`], and can
//! create and remove matching nodes as they go.

use std::fmt;
use std::rc::Rc;

use crate::capability::NodeCapability;
use crate::error::{NodeError, Result};
use crate::xpath::{CompiledXPath, XPathValue};

/// The kind of position a node refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The document itself, parent of the document element.
    Root,
    /// An element.
    Element,
    /// An attribute of an element.
    Attribute,
    /// A text node.
    Text,
    /// A comment, processing instruction, or DOCTYPE.
    Markup,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Root => write!(f, "root"),
            NodeKind::Element => write!(f, "element"),
            NodeKind::Attribute => write!(f, "attribute"),
            NodeKind::Text => write!(f, "text"),
            NodeKind::Markup => write!(f, "markup"),
        }
    }
}

/// What a [`Selector`] matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectorKind {
    /// Child elements.
    Element,
    /// Attributes.
    Attribute,
}

/// Selects child elements or attributes of a node by local name.
///
/// A selector may carry several names; any of them matches on read, and the
/// first one is used when a cursor has to create a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector {
    kind: SelectorKind,
    names: Vec<String>,
}

impl Selector {
    /// Selects child elements named `name`.
    pub fn element(name: impl Into<String>) -> Self {
        Self {
            kind: SelectorKind::Element,
            names: vec![name.into()],
        }
    }

    /// Selects the attribute named `name`.
    pub fn attribute(name: impl Into<String>) -> Self {
        Self {
            kind: SelectorKind::Attribute,
            names: vec![name.into()],
        }
    }

    /// Adds an alternative name matched on read.
    pub fn with_alias(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.names.contains(&name) {
            self.names.push(name);
        }
        self
    }

    /// Returns what this selector matches.
    pub fn kind(&self) -> SelectorKind {
        self.kind
    }

    /// Returns all names accepted by this selector.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Returns the name used when creating a node.
    pub fn create_name(&self) -> &str {
        &self.names[0]
    }

    /// Returns true if `name` is accepted by this selector.
    pub fn matches(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            SelectorKind::Element => "",
            SelectorKind::Attribute => "@",
        };
        write!(f, "{}{}", prefix, self.names.join("|"))
    }
}

/// A position in an XML tree.
///
/// Handles are cheap to clone behind an [`Rc`] and never own the document
/// exclusively; the document lives as long as any handle into it.
pub trait XmlNode: fmt::Debug {
    /// Returns the kind of position this handle refers to.
    fn kind(&self) -> NodeKind;

    /// Returns true for element positions.
    fn is_element(&self) -> bool {
        self.kind() == NodeKind::Element
    }

    /// Returns true for attribute positions.
    fn is_attribute(&self) -> bool {
        self.kind() == NodeKind::Attribute
    }

    /// Returns true for the document root.
    fn is_root(&self) -> bool {
        self.kind() == NodeKind::Root
    }

    /// Returns false for pending positions that have not been created yet.
    fn exists(&self) -> bool {
        true
    }

    /// Local name of an element or attribute.
    fn name(&self) -> Option<String>;

    /// Text content of an element, or the value of an attribute.
    fn value(&self) -> Result<Option<String>>;

    /// Replaces the text content of an element, or the value of an attribute.
    fn set_value(&self, value: &str) -> Result<()>;

    /// Opens a cursor over the children or attributes matching `selector`.
    fn select(&self, selector: &Selector) -> Result<Box<dyn XmlCursor>>;

    /// Opens a cursor over the nodes selected by an XPath expression.
    fn select_xpath(&self, path: &CompiledXPath) -> Result<Box<dyn XmlCursor>> {
        let _ = path;
        Err(NodeError::unsupported(NodeCapability::XPath))
    }

    /// Evaluates an XPath expression relative to this node.
    fn evaluate_xpath(&self, path: &CompiledXPath) -> Result<XPathValue> {
        let _ = path;
        Err(NodeError::unsupported(NodeCapability::XPath))
    }

    /// Removes this node from its parent.
    fn remove(&self) -> Result<()>;

    /// Capabilities of the backend behind this handle.
    fn capabilities(&self) -> &'static [NodeCapability];

    /// Returns true if the backend provides the capability.
    fn supports(&self, capability: NodeCapability) -> bool {
        self.capabilities().contains(&capability)
    }
}

/// An iterator over nodes matched by a selector or an XPath expression.
///
/// A fresh cursor is positioned before the first match.
pub trait XmlCursor: fmt::Debug {
    /// Advances to the next match. Returns false when there are no more.
    fn move_next(&mut self) -> bool;

    /// The node the cursor is positioned on.
    fn current(&self) -> Option<Rc<dyn XmlNode>>;

    /// Appends a new matching node and positions the cursor on it.
    fn create(&mut self) -> Result<Rc<dyn XmlNode>>;

    /// Removes the current node. The next `move_next` continues with the
    /// match that followed it.
    fn remove(&mut self) -> Result<()>;

    /// Removes every match after the current position.
    fn remove_all_next(&mut self) -> Result<()> {
        while self.move_next() {
            self.remove()?;
        }
        Ok(())
    }

    /// Returns a handle to the current position.
    ///
    /// An unadvanced or exhausted cursor yields a pending node that is
    /// created on first write.
    fn save(&self) -> Rc<dyn XmlNode>;
}

/// Reads the value of the first node matched by `selector`, if any.
pub fn first_value(node: &dyn XmlNode, selector: &Selector) -> Result<Option<String>> {
    let mut cursor = node.select(selector)?;
    if cursor.move_next() {
        match cursor.current() {
            Some(current) => current.value(),
            None => Ok(None),
        }
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_aliases() {
        let selector = Selector::element("Name").with_alias("FullName").with_alias("Name");
        assert_eq!(selector.names().len(), 2);
        assert_eq!(selector.create_name(), "Name");
        assert!(selector.matches("FullName"));
        assert!(!selector.matches("name"));
    }

    #[test]
    fn test_selector_display() {
        assert_eq!(Selector::attribute("id").to_string(), "@id");
        assert_eq!(
            Selector::element("a").with_alias("b").to_string(),
            "a|b"
        );
    }
}
