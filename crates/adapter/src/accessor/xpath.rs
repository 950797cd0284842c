use std::rc::Rc;

use xbind_node::{CompiledXPath, NodeCapability, NodeError, PathStep, XPathValue, XmlNode};

use super::{AccessorCore, remove_all, write_first};
use crate::behavior::Behavior;
use crate::error::{ConfigurationError, Result};
use crate::value::PropertyValue;

#[derive(Debug, Clone, PartialEq, Eq)]
enum XPathSource {
    Path(String),
    Function { function: String, expression: String },
}

impl XPathSource {
    fn expression(&self) -> String {
        match self {
            XPathSource::Path(path) => path.clone(),
            XPathSource::Function {
                function,
                expression,
            } => format!("{}({})", function, expression),
        }
    }
}

/// Maps a scalar property to the result of XPath expressions.
///
/// Several expressions may be declared. Reads try them in order and take the
/// first one that selects something. Writes go to the first simple path
/// (`a/b/@c`); function mappings are read-only.
///
/// On backends without XPath, simple paths are still served by plain
/// navigation.
#[derive(Debug, Clone)]
pub struct XPathAccessor {
    core: AccessorCore,
    sources: Vec<XPathSource>,
    compiled: Vec<(CompiledXPath, bool)>,
}

impl XPathAccessor {
    pub(super) fn new(core: AccessorCore) -> Self {
        Self {
            core,
            sources: Vec::new(),
            compiled: Vec::new(),
        }
    }

    pub(super) fn core(&self) -> &AccessorCore {
        &self.core
    }

    pub(super) fn core_mut(&mut self) -> &mut AccessorCore {
        &mut self.core
    }

    /// Declared expressions, in order.
    pub fn expressions(&self) -> Vec<String> {
        self.sources.iter().map(XPathSource::expression).collect()
    }

    /// Returns true if at least one expression can be written through.
    pub fn is_writable(&self) -> bool {
        self.compiled.iter().any(|(_, writable)| *writable)
    }

    pub(super) fn configure(&mut self, behavior: &Behavior) -> Result<()> {
        let source = match behavior {
            Behavior::XPath { expression } => XPathSource::Path(expression.clone()),
            Behavior::XPathFunction {
                function,
                expression,
            } => XPathSource::Function {
                function: function.clone(),
                expression: expression.clone(),
            },
            _ => return Ok(()),
        };
        if !self.sources.contains(&source) {
            self.sources.push(source);
        }
        Ok(())
    }

    pub(super) fn prepare(&mut self) -> Result<()> {
        if self.core.property_type.is_collection() {
            return Err(self.core.invalid("XPath mappings hold scalar values only"));
        }
        if self.sources.is_empty() {
            return Err(self.core.invalid("no XPath expression declared"));
        }

        let mut compiled = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let path = CompiledXPath::compile(&source.expression())?;
            let writable = matches!(source, XPathSource::Path(_)) && path.is_creatable();
            compiled.push((path, writable));
        }
        self.compiled = compiled;
        Ok(())
    }

    pub(super) fn get(&self, node: &Rc<dyn XmlNode>) -> Result<Option<PropertyValue>> {
        let item_type = self.core.property_type.item_type();
        for (path, _) in &self.compiled {
            let value = evaluate(node, path)?;
            if value.is_empty() {
                continue;
            }
            return match value.first_value()? {
                Some(text) => item_type.parse_text(&self.core.property, &text),
                None => Ok(None),
            };
        }
        Ok(None)
    }

    pub(super) fn set(&self, node: &Rc<dyn XmlNode>, value: Option<&PropertyValue>) -> Result<()> {
        let writable: Vec<&CompiledXPath> = self
            .compiled
            .iter()
            .filter(|(_, writable)| *writable)
            .map(|(path, _)| path)
            .collect();
        if writable.is_empty() {
            return Err(ConfigurationError::ReadOnly {
                property: self.core.property.clone(),
            }
            .into());
        }

        let Some(value) = value else {
            for path in writable {
                remove_path(node, path)?;
            }
            return Ok(());
        };

        let text = self
            .core
            .property_type
            .item_type()
            .format_value(&self.core.property, value)?;

        for path in &writable {
            if let XPathValue::Nodes(nodes) = evaluate(node, path)? {
                if let Some(target) = nodes.first() {
                    target.set_value(&text)?;
                    return Ok(());
                }
            }
        }

        let path = writable[0];
        let steps = path.steps().ok_or_else(|| NodeError::NotCreatable {
            expression: path.expression().to_string(),
        })?;
        create_path(node, steps, &text)
    }
}

/// Evaluates `path`, navigating simple paths when the backend lacks XPath.
fn evaluate(node: &Rc<dyn XmlNode>, path: &CompiledXPath) -> Result<XPathValue> {
    if node.supports(NodeCapability::XPath) {
        return Ok(node.evaluate_xpath(path)?);
    }
    match path.steps() {
        Some(steps) => Ok(XPathValue::Nodes(navigate(node, steps)?)),
        None => Err(NodeError::unsupported(NodeCapability::XPath).into()),
    }
}

/// Collects every node reached by following `steps` from `node`.
fn navigate(node: &Rc<dyn XmlNode>, steps: &[PathStep]) -> Result<Vec<Rc<dyn XmlNode>>> {
    let mut frontier = vec![node.clone()];
    for step in steps {
        let selector = step.selector();
        let mut next = Vec::new();
        for current in &frontier {
            let mut cursor = current.select(&selector)?;
            while cursor.move_next() {
                if let Some(found) = cursor.current() {
                    next.push(found);
                }
            }
        }
        frontier = next;
    }
    Ok(frontier)
}

fn remove_path(node: &Rc<dyn XmlNode>, path: &CompiledXPath) -> Result<()> {
    let Some((last, parents)) = path.steps().and_then(<[PathStep]>::split_last) else {
        return Ok(());
    };
    for parent in navigate(node, parents)? {
        remove_all(&parent, &last.selector())?;
    }
    Ok(())
}

/// Creates the nodes along `steps` that are missing and writes `text` at
/// the end.
fn create_path(node: &Rc<dyn XmlNode>, steps: &[PathStep], text: &str) -> Result<()> {
    let Some((last, parents)) = steps.split_last() else {
        node.set_value(text)?;
        return Ok(());
    };

    let mut current = node.clone();
    for step in parents {
        let mut cursor = current.select(&step.selector())?;
        current = if cursor.move_next() {
            cursor.current().ok_or(NodeError::NoCurrentNode)?
        } else {
            cursor.create()?
        };
    }
    write_first(&current, &last.selector(), text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use xbind_node::{NodeBackend, XmlDocument};

    use crate::accessor::{Accessor, PropertyAccessor};
    use crate::behavior::AccessorFamily;
    use crate::dictionary::PropertyDescriptor;
    use crate::metadata::XmlMetadata;
    use crate::value::{PropertyType, ScalarType};

    fn prepared(property: &PropertyDescriptor, behaviors: &[Behavior]) -> Result<Accessor> {
        let mut accessor =
            Accessor::create(AccessorFamily::XPath, property, &XmlMetadata::new("Order"));
        for behavior in behaviors {
            accessor.configure(behavior)?;
        }
        accessor.prepare()?;
        Ok(accessor)
    }

    fn order(xml: &str, backend: NodeBackend) -> (XmlDocument, Rc<dyn XmlNode>) {
        let doc = XmlDocument::parse(xml, backend).unwrap();
        let element = doc.document_element().unwrap();
        (doc, element)
    }

    #[test]
    fn test_alternatives_in_order() {
        let property = PropertyDescriptor::new("City", PropertyType::Text);
        let accessor = prepared(
            &property,
            &[
                Behavior::xpath("Shipping/City"),
                Behavior::xpath("Billing/City"),
            ],
        )
        .unwrap();
        let (_doc, node) = order(
            "<Order><Billing><City>Oslo</City></Billing></Order>",
            NodeBackend::Sxd,
        );
        assert_eq!(
            accessor.get(&node, false).unwrap(),
            Some(PropertyValue::from("Oslo"))
        );
    }

    #[test]
    fn test_write_creates_path() {
        for backend in [NodeBackend::Dom, NodeBackend::Sxd] {
            let property = PropertyDescriptor::new("Code", PropertyType::Text);
            let accessor = prepared(&property, &[Behavior::xpath("Shipping/Address/@code")]).unwrap();
            let (doc, node) = order("<Order/>", backend);

            accessor.set(&node, &mut Some("N1".into())).unwrap();
            let xml = doc.to_xml_string().unwrap();
            assert!(xml.contains("<Shipping><Address code="), "{backend}: {xml}");
            assert_eq!(
                accessor.get(&node, false).unwrap(),
                Some(PropertyValue::from("N1"))
            );

            accessor.set(&node, &mut None).unwrap();
            assert_eq!(accessor.get(&node, false).unwrap(), None);
        }
    }

    #[test]
    fn test_function_is_read_only() {
        let property = PropertyDescriptor::new("LineTotal", PropertyType::Float);
        let accessor = prepared(
            &property,
            &[Behavior::XPathFunction {
                function: "sum".into(),
                expression: "Line/Amount".into(),
            }],
        )
        .unwrap();
        let (_doc, node) = order(
            "<Order><Line><Amount>2</Amount></Line><Line><Amount>3.5</Amount></Line></Order>",
            NodeBackend::Sxd,
        );
        assert_eq!(
            accessor.get(&node, false).unwrap(),
            Some(PropertyValue::Float(5.5))
        );

        let err = accessor
            .set(&node, &mut Some(PropertyValue::Float(1.0)))
            .unwrap_err();
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn test_computed_path_needs_xpath_backend() {
        let property = PropertyDescriptor::new("Count", PropertyType::Integer);
        let accessor = prepared(&property, &[Behavior::xpath("count(Line)")]).unwrap();
        let (_doc, node) = order("<Order><Line/></Order>", NodeBackend::Dom);
        assert!(accessor.get(&node, false).is_err());
    }

    #[test]
    fn test_invalid_declarations() {
        let list = PropertyDescriptor::new("Lines", PropertyType::List(ScalarType::Text));
        assert!(prepared(&list, &[Behavior::xpath("Line")]).is_err());

        let scalar = PropertyDescriptor::new("Total", PropertyType::Integer);
        assert!(prepared(&scalar, &[Behavior::xpath("Line[")]).is_err());
    }
}
