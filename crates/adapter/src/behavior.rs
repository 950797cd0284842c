//! Behavior descriptors declared on properties.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One declared binding rule for a property.
///
/// Descriptors arrive as an ordered list per property. In mapping files they
/// are objects tagged by `kind`, for example
/// `{"kind": "attribute", "name": "id"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Behavior {
    /// Maps to a child element; repeated declarations add read aliases.
    Element {
        #[serde(default)]
        name: Option<String>,
    },
    /// Maps a collection to a wrapper element.
    Array {
        #[serde(default)]
        name: Option<String>,
    },
    /// Names the item elements of a collection.
    ArrayItem {
        #[serde(default)]
        name: Option<String>,
    },
    /// Makes a collection keyed, storing the key in an item attribute.
    Key {
        #[serde(default)]
        attribute: Option<String>,
    },
    /// Maps to an attribute of the bound element.
    Attribute {
        #[serde(default)]
        name: Option<String>,
    },
    /// Maps to the nodes selected by an XPath expression.
    #[serde(rename = "xpath")]
    XPath { expression: String },
    /// Computes a read-only value by applying an XPath function.
    #[serde(rename = "xpath_function")]
    XPathFunction { function: String, expression: String },
    /// Excludes the property from XML binding.
    Ignore,
    /// The stored value is never trusted; every read goes to the tree.
    Volatile,
}

impl Behavior {
    /// The accessor family this descriptor selects, if any.
    pub fn family(&self) -> Option<AccessorFamily> {
        match self {
            Behavior::Element { .. } => Some(AccessorFamily::Element),
            Behavior::Array { .. } | Behavior::ArrayItem { .. } | Behavior::Key { .. } => {
                Some(AccessorFamily::Array)
            }
            Behavior::Attribute { .. } => Some(AccessorFamily::Attribute),
            Behavior::XPath { .. } | Behavior::XPathFunction { .. } => Some(AccessorFamily::XPath),
            Behavior::Ignore | Behavior::Volatile => None,
        }
    }

    /// True for [`Behavior::Ignore`].
    pub fn is_ignore(&self) -> bool {
        matches!(self, Behavior::Ignore)
    }

    /// True for [`Behavior::Volatile`].
    pub fn is_volatile(&self) -> bool {
        matches!(self, Behavior::Volatile)
    }

    /// Shorthand for an element mapping.
    pub fn element(name: impl Into<String>) -> Self {
        Behavior::Element {
            name: Some(name.into()),
        }
    }

    /// Shorthand for an attribute mapping.
    pub fn attribute(name: impl Into<String>) -> Self {
        Behavior::Attribute {
            name: Some(name.into()),
        }
    }

    /// Shorthand for an XPath mapping.
    pub fn xpath(expression: impl Into<String>) -> Self {
        Behavior::XPath {
            expression: expression.into(),
        }
    }
}

/// Families of accessors. A property is mapped by at most one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorFamily {
    /// Child elements.
    Element,
    /// Wrapper and item elements.
    Array,
    /// Attributes.
    Attribute,
    /// XPath expressions.
    XPath,
}

impl fmt::Display for AccessorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessorFamily::Element => write!(f, "element"),
            AccessorFamily::Array => write!(f, "array"),
            AccessorFamily::Attribute => write!(f, "attribute"),
            AccessorFamily::XPath => write!(f, "xpath"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_family_subsumes_key_and_item() {
        for behavior in [
            Behavior::Array { name: None },
            Behavior::ArrayItem { name: None },
            Behavior::Key { attribute: None },
        ] {
            assert_eq!(behavior.family(), Some(AccessorFamily::Array));
        }
        assert_eq!(
            Behavior::XPathFunction {
                function: "count".into(),
                expression: "Item".into()
            }
            .family(),
            Some(AccessorFamily::XPath)
        );
        assert_eq!(Behavior::Volatile.family(), None);
    }

    #[test]
    fn test_serde_tagging() {
        let behaviors: Vec<Behavior> = serde_json::from_str(
            r#"[
                {"kind": "element", "name": "Id"},
                {"kind": "array_item"},
                {"kind": "xpath", "expression": "a/b"},
                {"kind": "xpath_function", "function": "count", "expression": "Item"},
                {"kind": "ignore"}
            ]"#,
        )
        .unwrap();
        assert_eq!(behaviors[0], Behavior::element("Id"));
        assert_eq!(behaviors[1], Behavior::ArrayItem { name: None });
        assert_eq!(behaviors[2], Behavior::xpath("a/b"));
        assert!(behaviors[4].is_ignore());
    }
}
