//! Accessors: the units that read and write one property against a node.
//!
//! Every participating property is served by exactly one [`Accessor`]. The
//! variants form a closed set; which one a property gets is decided by the
//! resolver from the property's behavior descriptors.
//!
//! An accessor is built, configured with every descriptor of its family,
//! told whether it is volatile, and then prepared. Preparation validates the
//! configuration against the property type and compiles anything that needs
//! compiling. After that the accessor is frozen and shared.

mod array;
mod attribute;
mod element;
mod ignore;
mod xpath;

use std::fmt;
use std::rc::Rc;

use xbind_node::{Selector, XmlNode};

pub use array::ArrayAccessor;
pub use attribute::AttributeAccessor;
pub use element::ElementAccessor;
pub use xpath::XPathAccessor;

use crate::behavior::{AccessorFamily, Behavior};
use crate::dictionary::PropertyDescriptor;
use crate::error::{ConfigurationError, Result};
use crate::metadata::XmlMetadata;
use crate::value::{PropertyType, PropertyValue};

/// The get/set capability shared by all accessors.
pub trait PropertyAccessor {
    /// Name of the property this accessor serves.
    fn property_name(&self) -> &str;

    /// Ignored accessors perform no I/O.
    fn is_ignored(&self) -> bool;

    /// Volatile properties are re-read even when a value is stored.
    fn is_volatile(&self) -> bool;

    /// Reads the property below `node`.
    ///
    /// Absence is `Ok(None)`. With `must_exist`, collection properties
    /// yield an empty collection instead of `None`.
    fn get(&self, node: &Rc<dyn XmlNode>, must_exist: bool) -> Result<Option<PropertyValue>>;

    /// Writes the property below `node`; `None` removes it.
    fn set(&self, node: &Rc<dyn XmlNode>, value: &mut Option<PropertyValue>) -> Result<()>;
}

/// Identifies an accessor variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorKind {
    /// Child element named after the property or a behavior.
    Element,
    /// Wrapper element holding one element per item.
    Array,
    /// Attribute of the base node.
    Attribute,
    /// XPath expression evaluated against the base node.
    XPath,
    /// Not mapped to XML.
    Ignore,
    /// Element mapping by property name, used when no behavior chose a family.
    Default,
}

impl fmt::Display for AccessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessorKind::Element => write!(f, "element"),
            AccessorKind::Array => write!(f, "array"),
            AccessorKind::Attribute => write!(f, "attribute"),
            AccessorKind::XPath => write!(f, "xpath"),
            AccessorKind::Ignore => write!(f, "ignore"),
            AccessorKind::Default => write!(f, "default"),
        }
    }
}

/// State shared by every non-ignore accessor.
#[derive(Debug, Clone)]
pub struct AccessorCore {
    property: String,
    owner: String,
    property_type: PropertyType,
    volatile: bool,
    prepared: bool,
}

impl AccessorCore {
    fn new(property: &PropertyDescriptor, metadata: &XmlMetadata) -> Self {
        Self {
            property: property.name().to_string(),
            owner: metadata.type_name().to_string(),
            property_type: property.property_type(),
            volatile: false,
            prepared: false,
        }
    }

    /// Name of the property.
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Name of the type declaring the property.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Declared type of the property.
    pub fn property_type(&self) -> PropertyType {
        self.property_type
    }

    fn ensure_configurable(&self) -> Result<()> {
        if self.prepared {
            return Err(ConfigurationError::AccessorPrepared {
                property: self.property.clone(),
            }
            .into());
        }
        Ok(())
    }

    fn invalid(&self, message: impl Into<String>) -> crate::error::AdapterError {
        ConfigurationError::InvalidBehavior {
            property: self.property.clone(),
            message: message.into(),
        }
        .into()
    }
}

/// A resolved accessor.
#[derive(Debug)]
pub enum Accessor {
    /// Child element mapping.
    Element(ElementAccessor),
    /// Wrapper and item element mapping.
    Array(ArrayAccessor),
    /// Attribute mapping.
    Attribute(AttributeAccessor),
    /// XPath mapping.
    XPath(XPathAccessor),
    /// Element mapping by property name.
    Default(ElementAccessor),
    /// The shared ignore accessor.
    Ignore,
}

impl Accessor {
    /// Builds an unconfigured accessor of `family` for a property.
    pub fn create(
        family: AccessorFamily,
        property: &PropertyDescriptor,
        metadata: &XmlMetadata,
    ) -> Self {
        let core = AccessorCore::new(property, metadata);
        match family {
            AccessorFamily::Element => Accessor::Element(ElementAccessor::new(core)),
            AccessorFamily::Array => Accessor::Array(ArrayAccessor::new(core)),
            AccessorFamily::Attribute => Accessor::Attribute(AttributeAccessor::new(core)),
            AccessorFamily::XPath => Accessor::XPath(XPathAccessor::new(core)),
        }
    }

    /// Builds the conventional element-by-name accessor.
    pub fn default_for(property: &PropertyDescriptor, metadata: &XmlMetadata) -> Self {
        Accessor::Default(ElementAccessor::new(AccessorCore::new(property, metadata)))
    }

    /// The shared ignore accessor.
    pub fn ignore() -> Rc<Accessor> {
        ignore::instance()
    }

    /// The variant of this accessor.
    pub fn kind(&self) -> AccessorKind {
        match self {
            Accessor::Element(_) => AccessorKind::Element,
            Accessor::Array(_) => AccessorKind::Array,
            Accessor::Attribute(_) => AccessorKind::Attribute,
            Accessor::XPath(_) => AccessorKind::XPath,
            Accessor::Default(_) => AccessorKind::Default,
            Accessor::Ignore => AccessorKind::Ignore,
        }
    }

    /// The behavior family this accessor accepts descriptors from.
    pub fn family(&self) -> Option<AccessorFamily> {
        match self {
            Accessor::Element(_) => Some(AccessorFamily::Element),
            Accessor::Array(_) => Some(AccessorFamily::Array),
            Accessor::Attribute(_) => Some(AccessorFamily::Attribute),
            Accessor::XPath(_) => Some(AccessorFamily::XPath),
            Accessor::Default(_) | Accessor::Ignore => None,
        }
    }

    fn core(&self) -> Option<&AccessorCore> {
        match self {
            Accessor::Element(a) | Accessor::Default(a) => Some(a.core()),
            Accessor::Array(a) => Some(a.core()),
            Accessor::Attribute(a) => Some(a.core()),
            Accessor::XPath(a) => Some(a.core()),
            Accessor::Ignore => None,
        }
    }

    fn core_mut(&mut self) -> Option<&mut AccessorCore> {
        match self {
            Accessor::Element(a) | Accessor::Default(a) => Some(a.core_mut()),
            Accessor::Array(a) => Some(a.core_mut()),
            Accessor::Attribute(a) => Some(a.core_mut()),
            Accessor::XPath(a) => Some(a.core_mut()),
            Accessor::Ignore => None,
        }
    }

    /// Applies one descriptor of this accessor's family.
    pub fn configure(&mut self, behavior: &Behavior) -> Result<()> {
        if let Some(core) = self.core() {
            core.ensure_configurable()?;
        }
        match self {
            Accessor::Element(a) => a.configure(behavior),
            Accessor::Array(a) => a.configure(behavior),
            Accessor::Attribute(a) => a.configure(behavior),
            Accessor::XPath(a) => a.configure(behavior),
            Accessor::Default(_) | Accessor::Ignore => Ok(()),
        }
    }

    /// Marks the accessor volatile or not.
    pub fn configure_volatile(&mut self, volatile: bool) -> Result<()> {
        if let Some(core) = self.core_mut() {
            core.ensure_configurable()?;
            core.volatile = volatile;
        }
        Ok(())
    }

    /// One-time preparation before first use.
    pub fn prepare(&mut self) -> Result<()> {
        let result = match self {
            Accessor::Element(a) | Accessor::Default(a) => a.prepare(),
            Accessor::Array(a) => a.prepare(),
            Accessor::Attribute(a) => a.prepare(),
            Accessor::XPath(a) => a.prepare(),
            Accessor::Ignore => Ok(()),
        };
        result?;
        if let Some(core) = self.core_mut() {
            core.prepared = true;
        }
        Ok(())
    }

    /// True once the accessor has been prepared and can no longer be configured.
    pub fn is_prepared(&self) -> bool {
        self.core().is_none_or(|core| core.prepared)
    }
}

impl PropertyAccessor for Accessor {
    fn property_name(&self) -> &str {
        self.core().map(AccessorCore::property).unwrap_or_default()
    }

    fn is_ignored(&self) -> bool {
        matches!(self, Accessor::Ignore)
    }

    fn is_volatile(&self) -> bool {
        self.core().is_some_and(|core| core.volatile)
    }

    fn get(&self, node: &Rc<dyn XmlNode>, must_exist: bool) -> Result<Option<PropertyValue>> {
        match self {
            Accessor::Element(a) | Accessor::Default(a) => a.get(node, must_exist),
            Accessor::Array(a) => a.get(node, must_exist),
            Accessor::Attribute(a) => a.get(node),
            Accessor::XPath(a) => a.get(node),
            Accessor::Ignore => Ok(None),
        }
    }

    fn set(&self, node: &Rc<dyn XmlNode>, value: &mut Option<PropertyValue>) -> Result<()> {
        match self {
            Accessor::Element(a) | Accessor::Default(a) => a.set(node, value.as_ref()),
            Accessor::Array(a) => a.set(node, value.as_ref()),
            Accessor::Attribute(a) => a.set(node, value.as_ref()),
            Accessor::XPath(a) => a.set(node, value.as_ref()),
            Accessor::Ignore => Ok(()),
        }
    }
}

/// Adds `name` to `names` unless present.
fn push_name(names: &mut Vec<String>, name: String) {
    if !names.contains(&name) {
        names.push(name);
    }
}

/// Builds a selector from declared names, falling back to `fallback`.
fn selector_for(
    names: &[String],
    fallback: &str,
    make: fn(String) -> Selector,
) -> Selector {
    let mut iter = names.iter();
    let first = iter.next().cloned().unwrap_or_else(|| fallback.to_string());
    iter.fold(make(first), |selector, alias| selector.with_alias(alias.as_str()))
}

/// Removes every node matched by `selector` below `node`.
fn remove_all(node: &Rc<dyn XmlNode>, selector: &Selector) -> Result<()> {
    let mut cursor = node.select(selector)?;
    cursor.remove_all_next()?;
    Ok(())
}

/// Writes `text` into the first match of `selector`, creating it if needed.
fn write_first(node: &Rc<dyn XmlNode>, selector: &Selector, text: &str) -> Result<()> {
    let mut cursor = node.select(selector)?;
    let target = if cursor.move_next() {
        cursor.current().ok_or(xbind_node::NodeError::NoCurrentNode)?
    } else {
        cursor.create()?
    };
    target.set_value(text)?;
    Ok(())
}

/// Writes `texts` into consecutive matches of `selector`, creating missing
/// nodes and removing surplus ones.
fn reconcile(node: &Rc<dyn XmlNode>, selector: &Selector, texts: &[String]) -> Result<Vec<Rc<dyn XmlNode>>> {
    let mut cursor = node.select(selector)?;
    let mut written = Vec::with_capacity(texts.len());
    for text in texts {
        let target = if cursor.move_next() {
            cursor.current().ok_or(xbind_node::NodeError::NoCurrentNode)?
        } else {
            cursor.create()?
        };
        target.set_value(text)?;
        written.push(target);
    }
    cursor.remove_all_next()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::PropertyDescriptor;
    use crate::value::PropertyType;

    fn metadata() -> XmlMetadata {
        XmlMetadata::new("Order")
    }

    #[test]
    fn test_configuration_rejected_after_prepare() {
        let property = PropertyDescriptor::new("Total", PropertyType::Integer);
        let mut accessor = Accessor::create(AccessorFamily::Element, &property, &metadata());
        accessor.configure(&Behavior::element("Sum")).unwrap();
        accessor.prepare().unwrap();
        assert!(accessor.is_prepared());

        let err = accessor.configure(&Behavior::element("Amount")).unwrap_err();
        assert!(err.to_string().contains("already prepared"));
        assert!(accessor.configure_volatile(true).is_err());
    }

    #[test]
    fn test_kinds_and_families() {
        let property = PropertyDescriptor::new("Id", PropertyType::Text);
        let accessor = Accessor::default_for(&property, &metadata());
        assert_eq!(accessor.kind(), AccessorKind::Default);
        assert_eq!(accessor.family(), None);
        assert_eq!(accessor.property_name(), "Id");

        let accessor = Accessor::create(AccessorFamily::Attribute, &property, &metadata());
        assert_eq!(accessor.kind(), AccessorKind::Attribute);
        assert_eq!(accessor.family(), Some(AccessorFamily::Attribute));
        assert!(!accessor.is_volatile());
    }

    #[test]
    fn test_selector_for_uses_fallback() {
        let selector = selector_for(&[], "Total", Selector::element);
        assert_eq!(selector.create_name(), "Total");
        let selector = selector_for(
            &["a".to_string(), "b".to_string()],
            "Total",
            Selector::element,
        );
        assert_eq!(selector.to_string(), "a|b");
    }
}
