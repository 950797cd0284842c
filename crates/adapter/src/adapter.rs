//! The XML adapter: the behavior binding an adapted object to an XML node.
//!
//! An [`XmlAdapter`] is attached to an object as its getter, setter, and
//! initializer. It owns the node the object's properties are resolved
//! against and the metadata of every type the object has been presented as.
//!
//! # Initialization
//!
//! The first initialization binds the primary type, which must carry XML
//! metadata. When the adapter was built from a source rather than a node,
//! the base node is resolved at that point:
//!
//! - an element source is the base node itself;
//! - an attribute or text source is rejected;
//! - a document root is searched with the primary type's base selection.
//!   The first match becomes the base node; without a match, a pending node
//!   stands in and is created on first write.
//!
//! Later initializations with other types register them as secondary
//! metadata over the same node.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use xbind_node::{NodeKind, Selector, XmlDocument, XmlNode, XmlSource};

use crate::accessor::{Accessor, PropertyAccessor};
use crate::behavior::Behavior;
use crate::bridge;
use crate::config::AdapterConfig;
use crate::dictionary::{
    DictionaryAdapter, DictionaryInitializer, PropertyDescriptor, PropertyGetter, PropertySetter,
};
use crate::error::{AdapterError, ConfigurationError, LookupError, Result};
use crate::metadata::{InitState, MetadataRegistry, Registration, XmlMetadata};
use crate::object::AdaptedObject;
use crate::value::PropertyValue;

/// Binds adapted objects to XML.
#[derive(Debug)]
pub struct XmlAdapter {
    node: RefCell<Option<Rc<dyn XmlNode>>>,
    source: Option<XmlSource>,
    document: RefCell<Option<XmlDocument>>,
    registry: RefCell<MetadataRegistry>,
    config: AdapterConfig,
}

impl XmlAdapter {
    /// An adapter over a new, empty document.
    pub fn new() -> Self {
        Self::build(None, None, AdapterConfig::default())
    }

    /// An adapter bound directly to `node`.
    pub fn from_node(node: Rc<dyn XmlNode>) -> Self {
        Self::build(Some(node), None, AdapterConfig::default())
    }

    /// An adapter whose base node is found in `source` on initialization.
    pub fn from_source(source: impl Into<XmlSource>) -> Self {
        Self::build(None, Some(source.into()), AdapterConfig::default())
    }

    fn build(
        node: Option<Rc<dyn XmlNode>>,
        source: Option<XmlSource>,
        config: AdapterConfig,
    ) -> Self {
        Self {
            node: RefCell::new(node),
            source,
            document: RefCell::new(None),
            registry: RefCell::new(MetadataRegistry::new()),
            config,
        }
    }

    /// Replaces the configuration after validating it.
    pub fn with_config(mut self, config: AdapterConfig) -> Result<Self> {
        config.validate().map_err(ConfigurationError::InvalidConfig)?;
        self.config = config;
        Ok(self)
    }

    /// Settings the adapter was created with.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// The base node, once known.
    pub fn node(&self) -> Option<Rc<dyn XmlNode>> {
        self.node.borrow().clone()
    }

    /// The document the adapter parsed or created, if it owns one.
    pub fn document(&self) -> Option<XmlDocument> {
        self.document.borrow().clone()
    }

    /// Initialization state of the adapter.
    pub fn state(&self) -> InitState {
        self.registry.borrow().state()
    }

    /// Metadata registered for `type_name`.
    pub fn metadata_for(&self, type_name: &str) -> Option<Rc<XmlMetadata>> {
        self.registry.borrow().for_type(type_name)
    }

    /// Names of the types registered as secondary.
    pub fn secondary_types(&self) -> Vec<String> {
        self.registry
            .borrow()
            .secondary_types()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Retrieves the XML adapter attached to an adapted object.
    ///
    /// `obj` may be an [`AdaptedObject`] or an `Rc<AdaptedObject>`. When the
    /// object has no XML adapter, the result is `None` unless `required` is
    /// set, in which case the reason is reported. An object carrying more
    /// than one XML adapter is always an error.
    pub fn for_object(obj: Option<&dyn Any>, required: bool) -> Result<Option<Rc<XmlAdapter>>> {
        let missing = |err: LookupError| -> Result<Option<Rc<XmlAdapter>>> {
            if required { Err(err.into()) } else { Ok(None) }
        };

        let Some(obj) = obj else {
            return missing(LookupError::ArgumentNull { argument: "obj" });
        };
        let object = match obj.downcast_ref::<AdaptedObject>() {
            Some(object) => object,
            None => match obj.downcast_ref::<Rc<AdaptedObject>>() {
                Some(object) => object.as_ref(),
                None => return missing(LookupError::NotDictionaryAdapter { argument: "obj" }),
            },
        };
        let Some(descriptor) = object.instance_descriptor() else {
            return missing(LookupError::NoInstanceDescriptor);
        };
        if descriptor.getters().is_empty() {
            return missing(LookupError::NoGetters);
        }

        let mut adapters: Vec<Rc<XmlAdapter>> = descriptor
            .getters()
            .iter()
            .filter_map(|getter| getter.clone().into_any().downcast::<XmlAdapter>().ok())
            .collect();

        match adapters.len() {
            0 => missing(LookupError::NoXmlAdapter),
            1 => Ok(adapters.pop()),
            count => Err(LookupError::AmbiguousXmlAdapter { count }.into()),
        }
    }

    fn current_node(&self) -> Result<Rc<dyn XmlNode>> {
        self.node()
            .ok_or_else(|| ConfigurationError::NotInitialized.into())
    }

    /// Opens the source the base node is resolved from.
    fn open_source(&self) -> Result<Rc<dyn XmlNode>> {
        let document = match &self.source {
            Some(XmlSource::Node(node)) => return Ok(node.clone()),
            Some(XmlSource::Document(doc)) => doc.clone(),
            Some(XmlSource::Markup { text, backend }) => XmlDocument::parse(text, *backend)?,
            None => XmlDocument::new(self.config.backend),
        };
        let root = document.root();
        *self.document.borrow_mut() = Some(document);
        Ok(root)
    }

    fn resolve_base_node(&self, metadata: &XmlMetadata) -> Result<Rc<dyn XmlNode>> {
        let source = self.open_source()?;
        match source.kind() {
            NodeKind::Element => {
                tracing::debug!(type_name = metadata.type_name(), "source element is the base node");
                Ok(source)
            }
            kind @ (NodeKind::Attribute | NodeKind::Text | NodeKind::Markup) => Err(AdapterError::not_supported(
                format!("a {} node cannot be the base node", kind),
            )),
            NodeKind::Root => {
                let mut cursor = match &self.config.root_element {
                    Some(name) => source.select(&Selector::element(name.as_str()))?,
                    None => metadata.select_base(&source)?,
                };
                let found = cursor.move_next();
                tracing::debug!(
                    type_name = metadata.type_name(),
                    base = %metadata.base(),
                    found,
                    "resolved base node"
                );
                Ok(cursor.save())
            }
        }
    }

    /// The accessor serving `property` for the dictionary's type, or `None`
    /// if the property is ignored, or not volatile when `require_volatile`.
    fn try_get_accessor(
        &self,
        dictionary: &dyn DictionaryAdapter,
        property: &PropertyDescriptor,
        require_volatile: bool,
    ) -> Result<Option<Rc<Accessor>>> {
        let type_name = dictionary.meta().name();
        let metadata = self
            .metadata_for(type_name)
            .ok_or(ConfigurationError::NotInitialized)?;
        let accessor = metadata.accessor(property)?;
        if accessor.is_ignored() || (require_volatile && !accessor.is_volatile()) {
            return Ok(None);
        }
        Ok(Some(accessor))
    }
}

impl Default for XmlAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl DictionaryInitializer for XmlAdapter {
    fn initialize(&self, dictionary: &dyn DictionaryAdapter, _behaviors: &[Behavior]) -> Result<()> {
        let meta = dictionary.meta();

        if self.state() == InitState::Uninitialized && self.node.borrow().is_none() {
            let metadata = meta.xml().ok_or_else(|| ConfigurationError::NoXmlMetadata {
                type_name: meta.name().to_string(),
            })?;
            let node = self.resolve_base_node(&metadata)?;
            *self.node.borrow_mut() = Some(node);
        }

        let registration = self.registry.borrow_mut().register(meta)?;
        match registration {
            Registration::Primary => {
                tracing::debug!(type_name = meta.name(), "bound primary metadata")
            }
            Registration::Secondary => {
                tracing::debug!(type_name = meta.name(), "registered secondary metadata")
            }
            Registration::Existing => {
                tracing::trace!(type_name = meta.name(), "metadata already registered")
            }
        }
        Ok(())
    }
}

impl PropertyGetter for XmlAdapter {
    fn get_property_value(
        &self,
        dictionary: &dyn DictionaryAdapter,
        key: &str,
        stored: Option<PropertyValue>,
        property: &Rc<PropertyDescriptor>,
        if_exists: bool,
    ) -> Result<Option<PropertyValue>> {
        let Some(accessor) = self.try_get_accessor(dictionary, property, stored.is_some())? else {
            return Ok(stored);
        };

        let node = self.current_node()?;
        let must_exist = !if_exists && stored.is_none();
        tracing::trace!(property = property.name(), must_exist, "reading property");

        let value = accessor.get(&node, must_exist)?;
        if let Some(value) = &value {
            bridge::attach_observers(
                value,
                dictionary,
                property,
                self.config.write_through_collections,
            );
            dictionary.store_property(property, key, value.clone());
        }
        Ok(value)
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

impl PropertySetter for XmlAdapter {
    fn set_property_value(
        &self,
        dictionary: &dyn DictionaryAdapter,
        _key: &str,
        value: &mut Option<PropertyValue>,
        property: &Rc<PropertyDescriptor>,
    ) -> Result<bool> {
        let Some(accessor) = self.try_get_accessor(dictionary, property, false)? else {
            tracing::warn!(
                property = property.name(),
                "assignment to ignored property not written to XML"
            );
            return Ok(true);
        };

        if value.is_some() && dictionary.should_clear_property(property, value.as_ref()) {
            *value = None;
        }

        let node = self.current_node()?;
        tracing::trace!(property = property.name(), clear = value.is_none(), "writing property");
        accessor.set(&node, value)?;
        Ok(true)
    }
}
