//! XML type metadata and the per-instance metadata registry.
//!
//! [`XmlMetadata`] is the XML side of one adapted type: how its base node is
//! selected and, once properties are used, the accessor resolved for each of
//! them. The accessor cache is filled on first use and never invalidated.
//! It is not thread-safe; metadata lives on the thread that adapts objects.
//!
//! [`MetadataRegistry`] tracks which types an adapter has been initialized
//! with. The first type becomes primary; further mixed-in types sharing the
//! same node are registered as secondary.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use xbind_node::{CompiledXPath, PathStep, Selector, XmlCursor, XmlNode};

use crate::accessor::Accessor;
use crate::dictionary::{PropertyDescriptor, TypeDescriptor};
use crate::error::{AdapterError, ConfigurationError, Result};
use crate::resolver;

/// How the base node of an adapted object is found below a document root.
#[derive(Debug, Clone, PartialEq)]
pub enum BaseSelection {
    /// The document element, if it has this name.
    Element(String),
    /// The nodes selected by an XPath expression from the document root.
    XPath(CompiledXPath),
}

impl fmt::Display for BaseSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseSelection::Element(name) => write!(f, "{}", name),
            BaseSelection::XPath(path) => write!(f, "{}", path.expression()),
        }
    }
}

/// XML metadata of one adapted type.
#[derive(Debug)]
pub struct XmlMetadata {
    type_name: String,
    base: BaseSelection,
    accessors: RefCell<HashMap<String, Rc<Accessor>>>,
}

impl XmlMetadata {
    /// Metadata whose root element is named after the type.
    pub fn new(type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        Self {
            base: BaseSelection::Element(type_name.clone()),
            type_name,
            accessors: RefCell::new(HashMap::new()),
        }
    }

    /// Uses `name` as the root element.
    pub fn with_root_element(mut self, name: impl Into<String>) -> Self {
        self.base = BaseSelection::Element(name.into());
        self
    }

    /// Selects the base node with an XPath expression.
    ///
    /// The expression must select elements; a trailing attribute step is
    /// rejected.
    pub fn with_base_xpath(mut self, expression: &str) -> Result<Self> {
        let path = CompiledXPath::compile(expression)?;
        if let Some(steps) = path.steps() {
            if matches!(steps.last(), Some(PathStep::Attribute(_))) {
                return Err(AdapterError::not_supported(format!(
                    "base path '{}' selects an attribute",
                    expression
                )));
            }
        }
        self.base = BaseSelection::XPath(path);
        Ok(self)
    }

    /// Name of the adapted type.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// How the base node is selected.
    pub fn base(&self) -> &BaseSelection {
        &self.base
    }

    /// Opens a cursor over base node candidates below `root`.
    ///
    /// Simple paths are followed step by step so that a missing base node
    /// can still be created on first write.
    pub fn select_base(&self, root: &Rc<dyn XmlNode>) -> Result<Box<dyn XmlCursor>> {
        match &self.base {
            BaseSelection::Element(name) => Ok(root.select(&Selector::element(name.as_str()))?),
            BaseSelection::XPath(path) => match path.steps() {
                Some([parents @ .., last]) => {
                    let mut current = root.clone();
                    for step in parents {
                        let mut cursor = current.select(&step.selector())?;
                        cursor.move_next();
                        current = cursor.save();
                    }
                    Ok(current.select(&last.selector())?)
                }
                _ => Ok(root.select_xpath(path)?),
            },
        }
    }

    /// Returns the accessor for `property`, resolving it on first use.
    ///
    /// A failed resolution caches nothing; the next call tries again and
    /// fails the same way.
    pub fn accessor(&self, property: &PropertyDescriptor) -> Result<Rc<Accessor>> {
        if let Some(accessor) = self.cached_accessor(property.name()) {
            return Ok(accessor);
        }
        let accessor = resolver::resolve(property, self)?;
        self.accessors
            .borrow_mut()
            .insert(property.name().to_string(), accessor.clone());
        Ok(accessor)
    }

    /// The cached accessor for a property name, if resolved already.
    pub fn cached_accessor(&self, property: &str) -> Option<Rc<Accessor>> {
        self.accessors.borrow().get(property).cloned()
    }

    /// Number of properties resolved so far.
    pub fn cached_count(&self) -> usize {
        self.accessors.borrow().len()
    }
}

/// Outcome of registering a type with a [`MetadataRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The first type; it selects the base node.
    Primary,
    /// A type mixed into the primary.
    Secondary,
    /// The type was registered before; nothing changed.
    Existing,
}

/// Initialization state of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    /// No type registered yet.
    Uninitialized,
    /// Only the primary type is registered.
    PrimaryBound,
    /// Primary plus this many secondary types.
    SecondaryBound(usize),
}

impl fmt::Display for InitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitState::Uninitialized => write!(f, "uninitialized"),
            InitState::PrimaryBound => write!(f, "primary"),
            InitState::SecondaryBound(n) => write!(f, "primary+{}", n),
        }
    }
}

/// Primary and secondary XML metadata of one adapter.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    primary: Option<(String, Rc<XmlMetadata>)>,
    secondary: HashMap<String, Rc<XmlMetadata>>,
}

impl MetadataRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `ty`, as primary if nothing is registered yet.
    ///
    /// Every registered type must carry XML metadata. Registering a type a
    /// second time is a no-op.
    pub fn register(&mut self, ty: &TypeDescriptor) -> Result<Registration> {
        if self.contains(ty.name()) {
            return Ok(Registration::Existing);
        }

        let metadata = ty.xml().ok_or_else(|| ConfigurationError::NoXmlMetadata {
            type_name: ty.name().to_string(),
        })?;

        if self.primary.is_none() {
            self.primary = Some((ty.name().to_string(), metadata));
            Ok(Registration::Primary)
        } else {
            self.secondary.insert(ty.name().to_string(), metadata);
            Ok(Registration::Secondary)
        }
    }

    /// Returns true if `type_name` is registered as primary or secondary.
    pub fn contains(&self, type_name: &str) -> bool {
        self.primary
            .as_ref()
            .is_some_and(|(name, _)| name == type_name)
            || self.secondary.contains_key(type_name)
    }

    /// Metadata of the primary type.
    pub fn primary(&self) -> Option<&Rc<XmlMetadata>> {
        self.primary.as_ref().map(|(_, metadata)| metadata)
    }

    /// Name of the primary type.
    pub fn primary_type(&self) -> Option<&str> {
        self.primary.as_ref().map(|(name, _)| name.as_str())
    }

    /// Metadata registered for `type_name`.
    pub fn for_type(&self, type_name: &str) -> Option<Rc<XmlMetadata>> {
        match &self.primary {
            Some((name, metadata)) if name == type_name => Some(metadata.clone()),
            _ => self.secondary.get(type_name).cloned(),
        }
    }

    /// Names of the secondary types, sorted.
    pub fn secondary_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.secondary.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Initialization state implied by the registered types.
    pub fn state(&self) -> InitState {
        match (&self.primary, self.secondary.len()) {
            (None, _) => InitState::Uninitialized,
            (Some(_), 0) => InitState::PrimaryBound,
            (Some(_), n) => InitState::SecondaryBound(n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::Behavior;
    use crate::value::PropertyType;
    use xbind_node::{NodeBackend, XmlDocument};

    #[test]
    fn test_accessor_is_memoized() {
        let metadata = XmlMetadata::new("Order");
        let property = PropertyDescriptor::new("Total", PropertyType::Integer);
        let first = metadata.accessor(&property).unwrap();
        let second = metadata.accessor(&property).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(metadata.cached_count(), 1);
    }

    #[test]
    fn test_conflict_is_not_cached() {
        let metadata = XmlMetadata::new("Order");
        let property = PropertyDescriptor::new("Total", PropertyType::Integer)
            .with_behaviors(vec![Behavior::element("Sum"), Behavior::xpath("Sum")]);
        assert!(metadata.accessor(&property).unwrap_err().is_conflict());
        assert!(metadata.cached_accessor("Total").is_none());
        assert!(metadata.accessor(&property).is_err());
    }

    #[test]
    fn test_base_xpath_rejects_attributes() {
        assert!(XmlMetadata::new("Order").with_base_xpath("Orders/@id").is_err());
        let metadata = XmlMetadata::new("Order")
            .with_base_xpath("Orders/Order")
            .unwrap();
        assert_eq!(metadata.base().to_string(), "Orders/Order");
    }

    #[test]
    fn test_select_base_through_missing_parent() {
        let doc = XmlDocument::new(NodeBackend::Dom);
        let metadata = XmlMetadata::new("Order")
            .with_base_xpath("Orders/Order")
            .unwrap();
        let mut cursor = metadata.select_base(&doc.root()).unwrap();
        assert!(!cursor.move_next());
        let base = cursor.save();
        assert!(!base.exists());
        base.select(&Selector::element("Id"))
            .unwrap()
            .create()
            .unwrap()
            .set_value("1")
            .unwrap();
        assert!(
            doc.to_xml_string()
                .unwrap()
                .ends_with("<Orders><Order><Id>1</Id></Order></Orders>")
        );
    }

    #[test]
    fn test_registry_states() {
        let order = TypeDescriptor::new("Order").with_xml(XmlMetadata::new("Order"));
        let audit = TypeDescriptor::new("Audit").with_xml(XmlMetadata::new("Audit"));
        let plain = TypeDescriptor::new("Plain");

        let mut registry = MetadataRegistry::new();
        assert_eq!(registry.state(), InitState::Uninitialized);
        assert!(registry.register(&plain).is_err());
        assert_eq!(registry.state(), InitState::Uninitialized);

        assert_eq!(registry.register(&order).unwrap(), Registration::Primary);
        assert_eq!(registry.register(&order).unwrap(), Registration::Existing);
        assert_eq!(registry.register(&audit).unwrap(), Registration::Secondary);
        assert_eq!(registry.register(&audit).unwrap(), Registration::Existing);
        assert_eq!(registry.state(), InitState::SecondaryBound(1));
        assert_eq!(registry.primary_type(), Some("Order"));
        assert!(registry.for_type("Audit").is_some());
        assert!(registry.for_type("Plain").is_none());
    }
}
