//! Behavior-driven binding of dictionary-backed objects to XML.
//!
//! An adapted object keeps its property values in a dictionary and lets
//! pluggable behaviors serve reads and writes. [`XmlAdapter`] is the
//! behavior that maps those properties onto an XML tree: each property is
//! served by one accessor, chosen from the behavior descriptors declared on
//! it and cached per type.
//!
//! # Architecture
//!
//! - [`behavior`] - behavior descriptors and accessor families
//! - [`accessor`] - element, array, attribute, XPath, ignore, and default accessors
//! - [`resolver`] - descriptor lists to exactly one prepared accessor
//! - [`metadata`] - per-type XML metadata with its accessor cache, and the
//!   primary/secondary registry
//! - [`adapter`] - initialization, base node resolution, get/set routing,
//!   and [`XmlAdapter::for_object`]
//! - [`bridge`] - write-back of lists mutated after a read
//! - [`dictionary`], [`object`] - the host contract and the in-memory host
//! - [`mapping`] - JSON mapping documents
//! - [`value`], [`observe`] - property values and observable lists
//!
//! # Quick Start
//!
//! ```
//! use std::rc::Rc;
//! use xbind_adapter::{
//!     AdaptedObject, Behavior, PropertyDescriptor, PropertyType, PropertyValue, TypeDescriptor,
//!     XmlAdapter, XmlMetadata,
//! };
//! use xbind_node::{NodeBackend, XmlDocument};
//!
//! let order = Rc::new(
//!     TypeDescriptor::new("Order")
//!         .with_property(
//!             PropertyDescriptor::new("Id", PropertyType::Integer)
//!                 .with_behavior(Behavior::attribute("id")),
//!         )
//!         .with_property(PropertyDescriptor::new("Customer", PropertyType::Text))
//!         .with_xml(XmlMetadata::new("Order")),
//! );
//!
//! let doc = XmlDocument::parse(r#"<Order id="7"/>"#, NodeBackend::Dom).unwrap();
//! let object = AdaptedObject::bind(order, Rc::new(XmlAdapter::from_source(doc.clone()))).unwrap();
//!
//! assert_eq!(object.get("Id").unwrap(), Some(PropertyValue::Integer(7)));
//! object.set("Customer", "Ann").unwrap();
//! assert!(doc.to_xml_string().unwrap().contains("<Customer>Ann</Customer>"));
//! ```
//!
//! # Threading
//!
//! Adapters, metadata, and nodes are single-threaded (`Rc`/`RefCell`).
//! Accessor caches are filled lazily on the thread that uses them.

#![warn(missing_docs)]

pub mod accessor;
pub mod adapter;
pub mod behavior;
pub mod bridge;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod mapping;
pub mod metadata;
pub mod object;
pub mod observe;
pub mod resolver;
pub mod value;

pub use accessor::{Accessor, AccessorKind, PropertyAccessor};
pub use adapter::XmlAdapter;
pub use behavior::{AccessorFamily, Behavior};
pub use config::AdapterConfig;
pub use dictionary::{
    DictionaryAdapter, DictionaryInitializer, InstanceDescriptor, PropertyDescriptor,
    PropertyGetter, PropertySetter, RemovePolicy, TypeDescriptor,
};
pub use error::{AdapterError, ConfigurationError, LookupError, MappingError, Result, ValueError};
pub use mapping::{Mapping, MappingDocument, PropertyMapping, TypeMapping};
pub use metadata::{BaseSelection, InitState, MetadataRegistry, Registration, XmlMetadata};
pub use object::AdaptedObject;
pub use observe::{ListChange, ObservableList};
pub use value::{PropertyType, PropertyValue, ScalarType};
