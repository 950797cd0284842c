use std::rc::Rc;

use xbind_node::{Selector, XmlNode};

use super::{AccessorCore, push_name, remove_all, selector_for, write_first};
use crate::behavior::Behavior;
use crate::error::Result;
use crate::value::PropertyValue;

/// Maps a scalar property to an attribute of the bound element.
#[derive(Debug, Clone)]
pub struct AttributeAccessor {
    core: AccessorCore,
    names: Vec<String>,
    selector: Option<Selector>,
}

impl AttributeAccessor {
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

    /// Attribute names; the first is written, any may be read.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub(super) fn configure(&mut self, behavior: &Behavior) -> Result<()> {
        if let Behavior::Attribute { name } = behavior {
            let name = name.clone().unwrap_or_else(|| self.core.property.clone());
            push_name(&mut self.names, name);
        }
        Ok(())
    }

    pub(super) fn prepare(&mut self) -> Result<()> {
        if self.core.property_type.is_collection() {
            return Err(self
                .core
                .invalid("attributes can only hold scalar values"));
        }
        self.selector = Some(selector_for(
            &self.names,
            &self.core.property,
            Selector::attribute,
        ));
        Ok(())
    }

    fn selector(&self) -> Selector {
        self.selector
            .clone()
            .unwrap_or_else(|| Selector::attribute(self.core.property.as_str()))
    }

    pub(super) fn get(&self, node: &Rc<dyn XmlNode>) -> Result<Option<PropertyValue>> {
        let mut cursor = node.select(&self.selector())?;
        if !cursor.move_next() {
            return Ok(None);
        }
        let Some(attribute) = cursor.current() else {
            return Ok(None);
        };
        match attribute.value()? {
            Some(text) => self
                .core
                .property_type
                .item_type()
                .parse_text(&self.core.property, &text),
            None => Ok(None),
        }
    }

    pub(super) fn set(&self, node: &Rc<dyn XmlNode>, value: Option<&PropertyValue>) -> Result<()> {
        let selector = self.selector();
        match value {
            None => remove_all(node, &selector),
            Some(value) => {
                let text = self
                    .core
                    .property_type
                    .item_type()
                    .format_value(&self.core.property, value)?;
                write_first(node, &selector, &text)
            }
        }
    }
}
