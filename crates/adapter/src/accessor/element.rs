use std::rc::Rc;

use xbind_node::{Selector, XmlNode};

use super::{AccessorCore, push_name, reconcile, remove_all, selector_for, write_first};
use crate::behavior::Behavior;
use crate::error::Result;
use crate::observe::ObservableList;
use crate::value::{PropertyType, PropertyValue};

/// Maps a property to child elements.
///
/// Scalar properties use the first matching element. List properties map
/// every matching sibling, one item per element. Several element names may
/// be declared; all are read, the first is written.
#[derive(Debug, Clone)]
pub struct ElementAccessor {
    core: AccessorCore,
    names: Vec<String>,
    selector: Option<Selector>,
}

impl ElementAccessor {
    pub(super) fn new(core: AccessorCore) -> Self {
        Self {
            core,
            names: Vec::new(),
            selector: None,
        }
    }

    pub(super) fn core(&self) -> &AccessorCore {
        &self.core
    }

    pub(super) fn core_mut(&mut self) -> &mut AccessorCore {
        &mut self.core
    }

    /// Declared element names, in declaration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub(super) fn configure(&mut self, behavior: &Behavior) -> Result<()> {
        if let Behavior::Element { name } = behavior {
            let name = name.clone().unwrap_or_else(|| self.core.property.clone());
            push_name(&mut self.names, name);
        }
        Ok(())
    }

    pub(super) fn prepare(&mut self) -> Result<()> {
        if let PropertyType::Map(_) = self.core.property_type {
            return Err(self
                .core
                .invalid("map properties need an array or key mapping"));
        }
        self.selector = Some(selector_for(
            &self.names,
            &self.core.property,
            Selector::element,
        ));
        Ok(())
    }

    fn selector(&self) -> Selector {
        self.selector
            .clone()
            .unwrap_or_else(|| Selector::element(self.core.property.as_str()))
    }

    pub(super) fn get(
        &self,
        node: &Rc<dyn XmlNode>,
        must_exist: bool,
    ) -> Result<Option<PropertyValue>> {
        let selector = self.selector();
        let item_type = self.core.property_type.item_type();
        let mut cursor = node.select(&selector)?;

        if !self.core.property_type.is_collection() {
            if !cursor.move_next() {
                return Ok(None);
            }
            return match cursor.current() {
                Some(current) => match current.value()? {
                    Some(text) => item_type.parse_text(&self.core.property, &text),
                    None => Ok(None),
                },
                None => Ok(None),
            };
        }

        let mut items = Vec::new();
        while cursor.move_next() {
            let Some(current) = cursor.current() else {
                continue;
            };
            if let Some(text) = current.value()? {
                if let Some(item) = item_type.parse_text(&self.core.property, &text)? {
                    items.push(item);
                }
            }
        }

        if items.is_empty() && !must_exist {
            return Ok(None);
        }
        Ok(Some(PropertyValue::List(ObservableList::from_items(items))))
    }

    pub(super) fn set(&self, node: &Rc<dyn XmlNode>, value: Option<&PropertyValue>) -> Result<()> {
        let selector = self.selector();
        let item_type = self.core.property_type.item_type();

        let Some(value) = value else {
            return remove_all(node, &selector);
        };

        match value {
            PropertyValue::List(list) if self.core.property_type.is_collection() => {
                let texts = list
                    .items()
                    .iter()
                    .map(|item| item_type.format_value(&self.core.property, item))
                    .collect::<Result<Vec<_>>>()?;
                reconcile(node, &selector, &texts)?;
                Ok(())
            }
            scalar => {
                let expected = self.core.property_type;
                if expected.is_collection() {
                    return Err(crate::error::ValueError::TypeMismatch {
                        property: self.core.property.clone(),
                        expected: expected.to_string(),
                        found: scalar.type_name().to_string(),
                    }
                    .into());
                }
                let text = item_type.format_value(&self.core.property, scalar)?;
                write_first(node, &selector, &text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xbind_node::{NodeBackend, XmlDocument};

    use crate::accessor::{Accessor, PropertyAccessor};
    use crate::behavior::AccessorFamily;
    use crate::dictionary::PropertyDescriptor;
    use crate::metadata::XmlMetadata;

    fn accessor(property: &PropertyDescriptor, behaviors: &[Behavior]) -> Accessor {
        let mut accessor =
            Accessor::create(AccessorFamily::Element, property, &XmlMetadata::new("Order"));
        for behavior in behaviors {
            accessor.configure(behavior).unwrap();
        }
        accessor.prepare().unwrap();
        accessor
    }

    fn order(xml: &str) -> (XmlDocument, Rc<dyn XmlNode>) {
        let doc = XmlDocument::parse(xml, NodeBackend::Dom).unwrap();
        let element = doc.document_element().unwrap();
        (doc, element)
    }

    #[test]
    fn test_reads_first_alias_match() {
        let property = PropertyDescriptor::new("Name", PropertyType::Text);
        let accessor = accessor(
            &property,
            &[Behavior::element("Name"), Behavior::element("FullName")],
        );
        let (_doc, node) = order("<Order><FullName>Ann</FullName></Order>");
        assert_eq!(
            accessor.get(&node, false).unwrap(),
            Some(PropertyValue::from("Ann"))
        );
    }

    #[test]
    fn test_write_creates_with_first_name() {
        let property = PropertyDescriptor::new("Total", PropertyType::Integer);
        let accessor = accessor(&property, &[Behavior::element("Sum")]);
        let (doc, node) = order("<Order/>");
        accessor
            .set(&node, &mut Some(PropertyValue::Integer(12)))
            .unwrap();
        assert!(doc.to_xml_string().unwrap().contains("<Sum>12</Sum>"));
        accessor.set(&node, &mut None).unwrap();
        assert!(doc.to_xml_string().unwrap().contains("<Order/>"));
    }

    #[test]
    fn test_list_reconciles_siblings() {
        let property = PropertyDescriptor::new("Line", PropertyType::List(crate::value::ScalarType::Integer));
        let accessor = accessor(&property, &[Behavior::Element { name: None }]);
        let (doc, node) = order("<Order><Line>1</Line><Line>2</Line><Line>3</Line></Order>");

        let list = ObservableList::from_items(vec![7i64.into(), 8i64.into()]);
        accessor
            .set(&node, &mut Some(PropertyValue::List(list)))
            .unwrap();
        assert!(
            doc.to_xml_string()
                .unwrap()
                .contains("<Order><Line>7</Line><Line>8</Line></Order>")
        );

        let read = accessor.get(&node, false).unwrap().unwrap();
        assert_eq!(read.as_list().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_list_is_stub_only_when_required() {
        let property = PropertyDescriptor::new("Line", PropertyType::List(crate::value::ScalarType::Text));
        let accessor = accessor(&property, &[]);
        let (_doc, node) = order("<Order/>");
        assert_eq!(accessor.get(&node, false).unwrap(), None);
        let stub = accessor.get(&node, true).unwrap().unwrap();
        assert!(stub.is_empty());
    }

    #[test]
    fn test_map_type_is_rejected() {
        let property = PropertyDescriptor::new("Lines", PropertyType::Map(crate::value::ScalarType::Text));
        let mut accessor =
            Accessor::create(AccessorFamily::Element, &property, &XmlMetadata::new("Order"));
        assert!(accessor.prepare().is_err());
        assert!(!accessor.is_prepared());
    }
}
