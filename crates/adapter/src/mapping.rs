//! JSON mapping documents.
//!
//! A mapping document declares adapted types, their properties, and the
//! behaviors binding them to XML:
//!
//! ```json
//! {
//!   "types": [
//!     {
//!       "name": "Order",
//!       "root": "PurchaseOrder",
//!       "properties": [
//!         { "name": "Id", "type": "integer", "behaviors": [{ "kind": "attribute", "name": "id" }] },
//!         { "name": "Lines", "type": "list<text>", "behaviors": [{ "kind": "array" }], "remove": "if_empty" }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use xbind_node::XmlSource;

use crate::adapter::XmlAdapter;
use crate::behavior::Behavior;
use crate::config::AdapterConfig;
use crate::dictionary::{PropertyDescriptor, RemovePolicy, TypeDescriptor};
use crate::error::{MappingError, Result};
use crate::metadata::XmlMetadata;
use crate::object::AdaptedObject;
use crate::value::PropertyType;

/// Top-level mapping document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingDocument {
    #[serde(default)]
    /// Adapted types.
    pub types: Vec<TypeMapping>,
}

/// One adapted type in a mapping document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeMapping {
    /// Type name, unique within the document.
    pub name: String,

    /// Root element name; defaults to the type name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,

    /// XPath selecting the base node from the document root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_xpath: Option<String>,

    /// Types without XML metadata can only be mixed into others.
    #[serde(default = "default_true")]
    pub xml: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    /// Type-level behaviors.
    pub behaviors: Vec<Behavior>,

    #[serde(default)]
    /// Properties in declaration order.
    pub properties: Vec<PropertyMapping>,
}

/// One property in a mapping document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMapping {
    /// Property name, unique within the type.
    pub name: String,

    /// Storage key; defaults to the property name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(rename = "type", default = "default_property_type")]
    /// Declared type; defaults to text.
    pub property_type: PropertyType,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    /// Behaviors selecting the accessor.
    pub behaviors: Vec<Behavior>,

    #[serde(default)]
    /// When an assigned value removes the property.
    pub remove: RemovePolicy,
}

fn default_true() -> bool {
    true
}

fn default_property_type() -> PropertyType {
    PropertyType::Text
}

/// Type descriptors built from a mapping document.
#[derive(Debug, Clone)]
pub struct Mapping {
    order: Vec<String>,
    types: HashMap<String, Rc<TypeDescriptor>>,
}

impl Mapping {
    /// Parses a mapping document from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let document: MappingDocument = serde_json::from_str(json).map_err(MappingError::from)?;
        Self::from_document(document)
    }

    /// Reads and parses a mapping file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading mapping");
        let json = std::fs::read_to_string(path).map_err(MappingError::from)?;
        Self::from_json(&json)
    }

    /// Builds type descriptors, rejecting duplicate types and properties.
    pub fn from_document(document: MappingDocument) -> Result<Self> {
        let mut order = Vec::with_capacity(document.types.len());
        let mut types = HashMap::with_capacity(document.types.len());

        for mapping in document.types {
            if types.contains_key(&mapping.name) {
                return Err(MappingError::DuplicateType {
                    type_name: mapping.name,
                }
                .into());
            }
            let descriptor = build_type(mapping)?;
            order.push(descriptor.name().to_string());
            types.insert(descriptor.name().to_string(), Rc::new(descriptor));
        }

        Ok(Self { order, types })
    }

    /// The descriptor for `name`.
    pub fn type_descriptor(&self, name: &str) -> Result<Rc<TypeDescriptor>> {
        self.types.get(name).cloned().ok_or_else(|| {
            MappingError::UnknownType {
                type_name: name.to_string(),
            }
            .into()
        })
    }

    /// Type names in declaration order.
    pub fn type_names(&self) -> &[String] {
        &self.order
    }

    /// Creates an object of `type_name` bound to `source`.
    pub fn create(
        &self,
        type_name: &str,
        source: impl Into<XmlSource>,
        config: AdapterConfig,
    ) -> Result<(Rc<AdaptedObject>, Rc<XmlAdapter>)> {
        let meta = self.type_descriptor(type_name)?;
        let adapter = Rc::new(XmlAdapter::from_source(source).with_config(config)?);
        let object = AdaptedObject::bind(meta, adapter.clone())?;
        Ok((object, adapter))
    }
}

fn build_type(mapping: TypeMapping) -> Result<TypeDescriptor> {
    let mut descriptor = TypeDescriptor::new(mapping.name.as_str());

    if mapping.xml {
        let mut metadata = XmlMetadata::new(mapping.name.as_str());
        if let Some(root) = &mapping.root {
            metadata = metadata.with_root_element(root.as_str());
        }
        if let Some(base) = &mapping.base_xpath {
            metadata = metadata.with_base_xpath(base)?;
        }
        descriptor = descriptor.with_xml(metadata);
    }

    for behavior in mapping.behaviors {
        descriptor = descriptor.with_behavior(behavior);
    }

    let mut seen = HashSet::new();
    for property in mapping.properties {
        if !seen.insert(property.name.clone()) {
            return Err(MappingError::DuplicateProperty {
                type_name: mapping.name,
                property: property.name,
            }
            .into());
        }

        let mut built = PropertyDescriptor::new(property.name.as_str(), property.property_type)
            .with_behaviors(property.behaviors)
            .with_remove_policy(property.remove);
        if let Some(key) = property.key {
            built = built.with_key(key);
        }
        descriptor = descriptor.with_property(built);
    }

    Ok(descriptor)
}
