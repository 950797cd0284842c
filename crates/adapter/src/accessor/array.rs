use std::collections::BTreeMap;
use std::rc::Rc;

use xbind_node::{NodeError, Selector, XmlNode, first_value};

use super::{AccessorCore, reconcile, remove_all, write_first};
use crate::behavior::Behavior;
use crate::error::{Result, ValueError};
use crate::observe::ObservableList;
use crate::value::{PropertyType, PropertyValue};

/// Attribute holding the key of a keyed item when none is declared.
pub const DEFAULT_KEY_ATTRIBUTE: &str = "key";

/// Maps a collection to item elements inside a wrapper element.
///
/// ```xml
/// <Lines>
///   <int>1</int>
///   <int>2</int>
/// </Lines>
/// ```
///
/// Map properties are keyed: each item carries its key in an attribute.
#[derive(Debug, Clone)]
pub struct ArrayAccessor {
    core: AccessorCore,
    wrapper: Option<String>,
    item: Option<String>,
    key_attribute: Option<String>,
    keyed: bool,
}

impl ArrayAccessor {
    pub(super) fn new(core: AccessorCore) -> Self {
        Self {
            core,
            wrapper: None,
            item: None,
            key_attribute: None,
            keyed: false,
        }
    }

    pub(super) fn core(&self) -> &AccessorCore {
        &self.core
    }

    pub(super) fn core_mut(&mut self) -> &mut AccessorCore {
        &mut self.core
    }

    /// Name of the wrapper element.
    pub fn wrapper_name(&self) -> &str {
        self.wrapper.as_deref().unwrap_or(&self.core.property)
    }

    /// Name of the item elements.
    pub fn item_name(&self) -> &str {
        self.item
            .as_deref()
            .unwrap_or_else(|| self.core.property_type.item_type().default_item_name())
    }

    /// Attribute holding item keys, for keyed collections.
    pub fn key_attribute(&self) -> Option<&str> {
        self.keyed
            .then(|| self.key_attribute.as_deref().unwrap_or(DEFAULT_KEY_ATTRIBUTE))
    }

    pub(super) fn configure(&mut self, behavior: &Behavior) -> Result<()> {
        match behavior {
            Behavior::Array { name } => {
                if let Some(name) = name {
                    self.wrapper = Some(name.clone());
                }
            }
            Behavior::ArrayItem { name } => {
                if let Some(name) = name {
                    self.item = Some(name.clone());
                }
            }
            Behavior::Key { attribute } => {
                self.keyed = true;
                if let Some(attribute) = attribute {
                    self.key_attribute = Some(attribute.clone());
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub(super) fn prepare(&mut self) -> Result<()> {
        match self.core.property_type {
            PropertyType::List(_) if self.keyed => {
                Err(self.core.invalid("key mappings need a map property"))
            }
            PropertyType::List(_) => Ok(()),
            PropertyType::Map(_) => {
                self.keyed = true;
                Ok(())
            }
            _ => Err(self.core.invalid("array mappings need a list or map property")),
        }
    }

    fn wrapper_selector(&self) -> Selector {
        Selector::element(self.wrapper_name())
    }

    fn item_selector(&self) -> Selector {
        Selector::element(self.item_name())
    }

    pub(super) fn get(
        &self,
        node: &Rc<dyn XmlNode>,
        must_exist: bool,
    ) -> Result<Option<PropertyValue>> {
        let mut wrappers = node.select(&self.wrapper_selector())?;
        let wrapper = if wrappers.move_next() {
            wrappers.current()
        } else {
            None
        };
        let Some(wrapper) = wrapper else {
            return Ok(if must_exist {
                self.core.property_type.empty_collection()
            } else {
                None
            });
        };

        let item_type = self.core.property_type.item_type();
        let mut cursor = wrapper.select(&self.item_selector())?;

        match self.key_attribute() {
            None => {
                let mut items = Vec::new();
                while cursor.move_next() {
                    let Some(item) = cursor.current() else {
                        continue;
                    };
                    if let Some(text) = item.value()? {
                        if let Some(value) = item_type.parse_text(&self.core.property, &text)? {
                            items.push(value);
                        }
                    }
                }
                Ok(Some(PropertyValue::List(ObservableList::from_items(items))))
            }
            Some(key_attribute) => {
                let key_selector = Selector::attribute(key_attribute);
                let mut entries = BTreeMap::new();
                while cursor.move_next() {
                    let Some(item) = cursor.current() else {
                        continue;
                    };
                    let Some(key) = first_value(item.as_ref(), &key_selector)? else {
                        tracing::warn!(
                            property = %self.core.property,
                            attribute = key_attribute,
                            "skipping keyed item without a key"
                        );
                        continue;
                    };
                    if let Some(text) = item.value()? {
                        if let Some(value) = item_type.parse_text(&self.core.property, &text)? {
                            entries.insert(key, value);
                        }
                    }
                }
                Ok(Some(PropertyValue::Map(entries)))
            }
        }
    }

    pub(super) fn set(&self, node: &Rc<dyn XmlNode>, value: Option<&PropertyValue>) -> Result<()> {
        let Some(value) = value else {
            return remove_all(node, &self.wrapper_selector());
        };

        match (value, self.key_attribute()) {
            (PropertyValue::List(list), None) => {
                let items = list.items();
                let texts = self.texts(items.iter())?;
                let wrapper = self.wrapper(node)?;
                reconcile(&wrapper, &self.item_selector(), &texts)?;
                Ok(())
            }
            (PropertyValue::Map(entries), Some(key_attribute)) => {
                let texts = self.texts(entries.values())?;
                let wrapper = self.wrapper(node)?;
                let written = reconcile(&wrapper, &self.item_selector(), &texts)?;
                let key_selector = Selector::attribute(key_attribute);
                for (item, key) in written.iter().zip(entries.keys()) {
                    write_first(item, &key_selector, key)?;
                }
                Ok(())
            }
            (other, _) => Err(ValueError::TypeMismatch {
                property: self.core.property.clone(),
                expected: self.core.property_type.to_string(),
                found: other.type_name().to_string(),
            }
            .into()),
        }
    }

    fn texts<'a>(&self, items: impl Iterator<Item = &'a PropertyValue>) -> Result<Vec<String>> {
        let item_type = self.core.property_type.item_type();
        items
            .map(|item| item_type.format_value(&self.core.property, item))
            .collect()
    }

    fn wrapper(&self, node: &Rc<dyn XmlNode>) -> Result<Rc<dyn XmlNode>> {
        let mut cursor = node.select(&self.wrapper_selector())?;
        if cursor.move_next() {
            Ok(cursor.current().ok_or(NodeError::NoCurrentNode)?)
        } else {
            Ok(cursor.create()?)
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
    use crate::value::ScalarType;

    fn prepared(property: &PropertyDescriptor, behaviors: &[Behavior]) -> Result<Accessor> {
        let mut accessor =
            Accessor::create(AccessorFamily::Array, property, &XmlMetadata::new("Order"));
        for behavior in behaviors {
            accessor.configure(behavior)?;
        }
        accessor.prepare()?;
        Ok(accessor)
    }

    fn node(xml: &str) -> (XmlDocument, Rc<dyn XmlNode>) {
        let doc = XmlDocument::parse(xml, NodeBackend::Dom).unwrap();
        let element = doc.document_element().unwrap();
        (doc, element)
    }

    #[test]
    fn test_reads_wrapped_items() {
        let property = PropertyDescriptor::new("Lines", PropertyType::List(ScalarType::Integer));
        let accessor = prepared(&property, &[Behavior::Array { name: None }]).unwrap();
        let (_doc, order) = node("<Order><Lines><int>1</int><int>2</int></Lines></Order>");
        let value = accessor.get(&order, false).unwrap().unwrap();
        assert_eq!(
            value.as_list().unwrap().items(),
            vec![PropertyValue::Integer(1), PropertyValue::Integer(2)]
        );
    }

    #[test]
    fn test_set_reconciles_cardinality() {
        let property = PropertyDescriptor::new("Lines", PropertyType::List(ScalarType::Text));
        let accessor = prepared(
            &property,
            &[
                Behavior::Array {
                    name: Some("Items".into()),
                },
                Behavior::ArrayItem {
                    name: Some("Item".into()),
                },
            ],
        )
        .unwrap();
        let (doc, order) = node("<Order><Items><Item>a</Item><Item>b</Item><Item>c</Item></Items></Order>");

        let list = ObservableList::from_items(vec!["x".into()]);
        accessor
            .set(&order, &mut Some(PropertyValue::List(list.clone())))
            .unwrap();
        assert!(
            doc.to_xml_string()
                .unwrap()
                .contains("<Items><Item>x</Item></Items>")
        );

        list.push("y".into()).unwrap();
        list.push("z".into()).unwrap();
        accessor
            .set(&order, &mut Some(PropertyValue::List(list)))
            .unwrap();
        assert!(
            doc.to_xml_string()
                .unwrap()
                .contains("<Items><Item>x</Item><Item>y</Item><Item>z</Item></Items>")
        );

        accessor.set(&order, &mut None).unwrap();
        assert!(doc.to_xml_string().unwrap().contains("<Order/>"));
    }

    #[test]
    fn test_keyed_map() {
        let property = PropertyDescriptor::new("Prices", PropertyType::Map(ScalarType::Float));
        let accessor = prepared(
            &property,
            &[Behavior::Key {
                attribute: Some("sku".into()),
            }],
        )
        .unwrap();
        let (doc, order) = node(r#"<Order><Prices><double sku="a">1.5</double><double>9</double></Prices></Order>"#);

        let value = accessor.get(&order, false).unwrap().unwrap();
        let PropertyValue::Map(mut entries) = value else {
            panic!("expected a map");
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(entries.get("a"), Some(&PropertyValue::Float(1.5)));

        entries.insert("b".into(), PropertyValue::Float(2.0));
        accessor
            .set(&order, &mut Some(PropertyValue::Map(entries)))
            .unwrap();
        let xml = doc.to_xml_string().unwrap();
        assert!(xml.contains(r#"<double sku="a">1.5</double>"#));
        assert!(xml.contains(r#"<double sku="b">2</double>"#));
    }

    #[test]
    fn test_missing_wrapper() {
        let property = PropertyDescriptor::new("Lines", PropertyType::List(ScalarType::Integer));
        let accessor = prepared(&property, &[Behavior::ArrayItem { name: None }]).unwrap();
        let (_doc, order) = node("<Order/>");
        assert_eq!(accessor.get(&order, false).unwrap(), None);
        let stub = accessor.get(&order, true).unwrap().unwrap();
        assert!(stub.as_list().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_shapes() {
        let list = PropertyDescriptor::new("Lines", PropertyType::List(ScalarType::Integer));
        assert!(prepared(&list, &[Behavior::Key { attribute: None }]).is_err());
        let scalar = PropertyDescriptor::new("Total", PropertyType::Integer);
        assert!(prepared(&scalar, &[Behavior::Array { name: None }]).is_err());
    }
}
