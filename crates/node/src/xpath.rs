//! Compiled XPath expressions and evaluation results.
//!
//! Expressions are compiled once with `sxd-xpath` when an accessor is
//! prepared. Evaluation itself is left to backends that report the
//! [`NodeCapability::XPath`](crate::NodeCapability::XPath) capability.

use std::fmt;
use std::rc::Rc;

use sxd_xpath::{Factory, XPath};

use crate::error::{NodeError, Result};
use crate::node::{Selector, XmlNode};

/// One step of a simple, creatable path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// A child element step (`name`).
    Element(String),
    /// A trailing attribute step (`@name`).
    Attribute(String),
}

impl PathStep {
    /// Returns the selector matching this step.
    pub fn selector(&self) -> Selector {
        match self {
            PathStep::Element(name) => Selector::element(name.as_str()),
            PathStep::Attribute(name) => Selector::attribute(name.as_str()),
        }
    }
}

/// An XPath expression compiled once and evaluated many times.
#[derive(Clone)]
pub struct CompiledXPath {
    expression: String,
    xpath: Rc<XPath>,
    steps: Option<Vec<PathStep>>,
}

impl CompiledXPath {
    /// Compiles `expression`, failing on syntax errors.
    pub fn compile(expression: &str) -> Result<Self> {
        let factory = Factory::new();
        let xpath = match factory.build(expression) {
            Ok(Some(xpath)) => xpath,
            Ok(None) => {
                return Err(NodeError::InvalidXPath {
                    expression: expression.to_string(),
                    message: "expression is empty".to_string(),
                });
            }
            Err(e) => {
                return Err(NodeError::InvalidXPath {
                    expression: expression.to_string(),
                    message: format!("{:?}", e),
                });
            }
        };

        Ok(Self {
            expression: expression.to_string(),
            xpath: Rc::new(xpath),
            steps: simple_path_steps(expression),
        })
    }

    /// The source text of the expression.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Steps of the expression when it is a simple relative path.
    pub fn steps(&self) -> Option<&[PathStep]> {
        self.steps.as_deref()
    }

    /// Returns true if missing nodes on this path can be created.
    pub fn is_creatable(&self) -> bool {
        self.steps.is_some()
    }

    pub(crate) fn xpath(&self) -> &XPath {
        &self.xpath
    }
}

impl fmt::Debug for CompiledXPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledXPath")
            .field("expression", &self.expression)
            .field("steps", &self.steps)
            .finish()
    }
}

impl PartialEq for CompiledXPath {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression
    }
}

/// The result of evaluating an XPath expression.
#[derive(Debug, Clone)]
pub enum XPathValue {
    /// A node-set in document order.
    Nodes(Vec<Rc<dyn XmlNode>>),
    /// A string result.
    Text(String),
    /// A numeric result.
    Number(f64),
    /// A boolean result.
    Boolean(bool),
}

impl XPathValue {
    /// Text form of the result: the value of the first node for node-sets.
    pub fn first_value(&self) -> Result<Option<String>> {
        match self {
            XPathValue::Nodes(nodes) => match nodes.first() {
                Some(node) => node.value(),
                None => Ok(None),
            },
            XPathValue::Text(text) => Ok(Some(text.clone())),
            XPathValue::Number(n) => Ok(Some(n.to_string())),
            XPathValue::Boolean(b) => Ok(Some(if *b { "true" } else { "false" }.to_string())),
        }
    }

    /// Returns true for an empty node-set.
    pub fn is_empty(&self) -> bool {
        matches!(self, XPathValue::Nodes(nodes) if nodes.is_empty())
    }
}

/// Splits `a/b/@c` style paths into creatable steps.
fn simple_path_steps(expression: &str) -> Option<Vec<PathStep>> {
    let trimmed = expression.trim();
    if trimmed.is_empty() || trimmed.starts_with('/') {
        return None;
    }

    let parts: Vec<&str> = trimmed.split('/').map(str::trim).collect();
    let mut steps = Vec::with_capacity(parts.len());
    for (index, part) in parts.iter().enumerate() {
        if *part == "." {
            continue;
        }
        if let Some(name) = part.strip_prefix('@') {
            if index != parts.len() - 1 || !is_simple_name(name) {
                return None;
            }
            steps.push(PathStep::Attribute(name.to_string()));
        } else if is_simple_name(part) {
            steps.push(PathStep::Element(part.to_string()));
        } else {
            return None;
        }
    }

    if steps.is_empty() { None } else { Some(steps) }
}

fn is_simple_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_valid_expression() {
        let path = CompiledXPath::compile("Customer/Name").unwrap();
        assert_eq!(path.expression(), "Customer/Name");
        assert!(path.is_creatable());
        assert_eq!(
            path.steps().unwrap(),
            &[
                PathStep::Element("Customer".to_string()),
                PathStep::Element("Name".to_string())
            ]
        );
    }

    #[test]
    fn test_compile_invalid_expression() {
        let err = CompiledXPath::compile("Customer[").unwrap_err();
        assert!(matches!(err, NodeError::InvalidXPath { .. }));
    }

    #[test]
    fn test_attribute_step_must_be_last() {
        assert!(CompiledXPath::compile("a/@b").unwrap().is_creatable());
        assert!(!CompiledXPath::compile("@b/a").unwrap().is_creatable());
    }

    #[test]
    fn test_non_simple_paths_are_not_creatable() {
        for expression in ["/Order/Id", "count(Item)", "Item[1]", "a//b"] {
            let path = CompiledXPath::compile(expression).unwrap();
            assert!(!path.is_creatable(), "{} should not be creatable", expression);
        }
    }

    #[test]
    fn test_dot_steps_are_skipped() {
        let path = CompiledXPath::compile("./Total").unwrap();
        assert_eq!(path.steps().unwrap(), &[PathStep::Element("Total".to_string())]);
        assert!(!CompiledXPath::compile(".").unwrap().is_creatable());
    }

    #[test]
    fn test_scalar_first_value() {
        assert_eq!(
            XPathValue::Number(3.0).first_value().unwrap(),
            Some("3".to_string())
        );
        assert_eq!(
            XPathValue::Boolean(false).first_value().unwrap(),
            Some("false".to_string())
        );
        assert!(XPathValue::Nodes(Vec::new()).is_empty());
        assert_eq!(XPathValue::Nodes(Vec::new()).first_value().unwrap(), None);
    }
}
