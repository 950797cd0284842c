//! The dictionary-adapter host contract.
//!
//! An adapted object keeps its property values in a dictionary-like store
//! and delegates reads, writes, and initialization to pluggable behaviors.
//! This module describes the adapted types and properties and defines the
//! traits those behaviors implement. [`AdaptedObject`](crate::AdaptedObject)
//! is the in-memory host.

use std::any::Any;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use crate::behavior::Behavior;
use crate::error::Result;
use crate::metadata::XmlMetadata;
use crate::value::{PropertyType, PropertyValue};

/// When a value assigned to a property clears it instead.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovePolicy {
    /// Values are always kept.
    #[default]
    Never,
    /// Empty text and empty collections clear the property.
    IfEmpty,
    /// Values whose text form is one of these clear the property.
    IfEquals(Vec<String>),
}

impl RemovePolicy {
    /// Returns true if `value` should clear the property.
    pub fn should_clear(&self, value: Option<&PropertyValue>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match self {
            RemovePolicy::Never => false,
            RemovePolicy::IfEmpty => value.is_empty(),
            RemovePolicy::IfEquals(texts) => value
                .to_text()
                .is_some_and(|text| texts.iter().any(|t| *t == text)),
        }
    }
}

/// One property of an adapted type.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    name: String,
    key: String,
    property_type: PropertyType,
    behaviors: Vec<Behavior>,
    remove_policy: RemovePolicy,
}

impl PropertyDescriptor {
    /// A property stored under its own name.
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        let name = name.into();
        Self {
            key: name.clone(),
            name,
            property_type,
            behaviors: Vec::new(),
            remove_policy: RemovePolicy::default(),
        }
    }

    /// Stores the property under `key` instead of its name.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Appends a behavior.
    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behaviors.push(behavior);
        self
    }

    /// Appends several behaviors.
    pub fn with_behaviors(mut self, behaviors: impl IntoIterator<Item = Behavior>) -> Self {
        self.behaviors.extend(behaviors);
        self
    }

    /// Sets when an assigned value removes the property.
    pub fn with_remove_policy(mut self, policy: RemovePolicy) -> Self {
        self.remove_policy = policy;
        self
    }

    /// Property name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Storage key of the property.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Declared type.
    pub fn property_type(&self) -> PropertyType {
        self.property_type
    }

    /// Declared behaviors, in declaration order.
    pub fn behaviors(&self) -> &[Behavior] {
        &self.behaviors
    }

    /// When an assigned value removes the property.
    pub fn remove_policy(&self) -> &RemovePolicy {
        &self.remove_policy
    }
}

/// An adapted type: its properties and, optionally, XML metadata.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    name: String,
    properties: Vec<Rc<PropertyDescriptor>>,
    behaviors: Vec<Behavior>,
    xml: Option<Rc<XmlMetadata>>,
}

impl TypeDescriptor {
    /// Creates a type with no properties.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            behaviors: Vec::new(),
            xml: None,
        }
    }

    /// Adds a property.
    pub fn with_property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(Rc::new(property));
        self
    }

    /// Adds a type-level behavior, handed to initializers.
    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behaviors.push(behavior);
        self
    }

    /// Attaches XML metadata, making the type bindable.
    pub fn with_xml(mut self, metadata: XmlMetadata) -> Self {
        self.xml = Some(Rc::new(metadata));
        self
    }

    /// Type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Properties in declaration order.
    pub fn properties(&self) -> &[Rc<PropertyDescriptor>] {
        &self.properties
    }

    /// Looks up a property by name.
    pub fn property(&self, name: &str) -> Option<&Rc<PropertyDescriptor>> {
        self.properties.iter().find(|p| p.name() == name)
    }

    /// Type-level behaviors.
    pub fn behaviors(&self) -> &[Behavior] {
        &self.behaviors
    }

    /// XML metadata of the type, if it has any.
    pub fn xml(&self) -> Option<Rc<XmlMetadata>> {
        self.xml.clone()
    }

    /// True if the type carries XML metadata.
    pub fn has_xml_meta(&self) -> bool {
        self.xml.is_some()
    }
}

/// The object side of the contract, as seen by behaviors.
pub trait DictionaryAdapter {
    /// The adapted type this view of the object presents.
    fn meta(&self) -> &TypeDescriptor;

    /// Behaviors attached to the instance.
    fn instance_descriptor(&self) -> Option<Rc<InstanceDescriptor>>;

    /// Returns true if assigning `value` should clear the property.
    fn should_clear_property(
        &self,
        property: &PropertyDescriptor,
        value: Option<&PropertyValue>,
    ) -> bool {
        property.remove_policy().should_clear(value)
    }

    /// Stores a value read by a getter.
    fn store_property(&self, property: &PropertyDescriptor, key: &str, value: PropertyValue);

    /// Assigns a property through the full setter chain.
    fn set_property(&self, name: &str, value: &mut Option<PropertyValue>) -> Result<bool>;

    /// Weak handle for callbacks that must not keep the object alive.
    fn handle(&self) -> Weak<dyn DictionaryAdapter>;
}

/// A behavior participating in property reads.
pub trait PropertyGetter {
    /// Produces the value of `property`, given what was stored or produced
    /// by earlier getters.
    fn get_property_value(
        &self,
        dictionary: &dyn DictionaryAdapter,
        key: &str,
        stored: Option<PropertyValue>,
        property: &Rc<PropertyDescriptor>,
        if_exists: bool,
    ) -> Result<Option<PropertyValue>>;

    /// Upcast used to find concrete behaviors among the getters.
    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}

/// A behavior participating in property writes.
pub trait PropertySetter {
    /// Handles an assignment. `value` may be rewritten for later setters and
    /// for storage. Returning false stops the chain and skips storage.
    fn set_property_value(
        &self,
        dictionary: &dyn DictionaryAdapter,
        key: &str,
        value: &mut Option<PropertyValue>,
        property: &Rc<PropertyDescriptor>,
    ) -> Result<bool>;
}

/// A behavior notified whenever an object presents a new type.
pub trait DictionaryInitializer {
    /// Called with the type-level behaviors of the presented type.
    fn initialize(
        &self,
        dictionary: &dyn DictionaryAdapter,
        behaviors: &[Behavior],
    ) -> Result<()>;
}

/// The behaviors attached to one adapted instance.
#[derive(Default)]
pub struct InstanceDescriptor {
    getters: Vec<Rc<dyn PropertyGetter>>,
    setters: Vec<Rc<dyn PropertySetter>>,
    initializers: Vec<Rc<dyn DictionaryInitializer>>,
}

impl InstanceDescriptor {
    /// Creates an empty descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a behavior that reads, writes, and initializes.
    pub fn with_behavior<B>(mut self, behavior: Rc<B>) -> Self
    where
        B: PropertyGetter + PropertySetter + DictionaryInitializer + 'static,
    {
        self.getters.push(behavior.clone());
        self.setters.push(behavior.clone());
        self.initializers.push(behavior);
        self
    }

    /// Adds a getter.
    pub fn with_getter(mut self, getter: Rc<dyn PropertyGetter>) -> Self {
        self.getters.push(getter);
        self
    }

    /// Adds a setter.
    pub fn with_setter(mut self, setter: Rc<dyn PropertySetter>) -> Self {
        self.setters.push(setter);
        self
    }

    /// Adds an initializer.
    pub fn with_initializer(mut self, initializer: Rc<dyn DictionaryInitializer>) -> Self {
        self.initializers.push(initializer);
        self
    }

    /// Getters, run in order.
    pub fn getters(&self) -> &[Rc<dyn PropertyGetter>] {
        &self.getters
    }

    /// Setters, run in order.
    pub fn setters(&self) -> &[Rc<dyn PropertySetter>] {
        &self.setters
    }

    /// Initializers, run in order.
    pub fn initializers(&self) -> &[Rc<dyn DictionaryInitializer>] {
        &self.initializers
    }
}

impl std::fmt::Debug for InstanceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceDescriptor")
            .field("getters", &self.getters.len())
            .field("setters", &self.setters.len())
            .field("initializers", &self.initializers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::ObservableList;
    use crate::value::ScalarType;

    #[test]
    fn test_remove_policies() {
        let empty = PropertyValue::from("");
        let zero = PropertyValue::Integer(0);
        let list = PropertyValue::List(ObservableList::new());

        assert!(!RemovePolicy::Never.should_clear(Some(&empty)));
        assert!(RemovePolicy::IfEmpty.should_clear(Some(&empty)));
        assert!(RemovePolicy::IfEmpty.should_clear(Some(&list)));
        assert!(!RemovePolicy::IfEmpty.should_clear(Some(&zero)));
        assert!(!RemovePolicy::IfEmpty.should_clear(None));

        let policy = RemovePolicy::IfEquals(vec!["0".to_string()]);
        assert!(policy.should_clear(Some(&zero)));
        assert!(!policy.should_clear(Some(&PropertyValue::Integer(1))));
        assert!(!policy.should_clear(Some(&list)));
    }

    #[test]
    fn test_remove_policy_serde() {
        let policy: RemovePolicy = serde_json::from_str(r#""if_empty""#).unwrap();
        assert_eq!(policy, RemovePolicy::IfEmpty);
        let policy: RemovePolicy = serde_json::from_str(r#"{"if_equals": ["n/a"]}"#).unwrap();
        assert_eq!(policy, RemovePolicy::IfEquals(vec!["n/a".to_string()]));
    }

    #[test]
    fn test_type_descriptor_lookup() {
        let ty = TypeDescriptor::new("Order")
            .with_property(PropertyDescriptor::new("Id", PropertyType::Integer).with_key("id"))
            .with_property(PropertyDescriptor::new(
                "Tags",
                PropertyType::List(ScalarType::Text),
            ));
        assert_eq!(ty.properties().len(), 2);
        assert_eq!(ty.property("Id").unwrap().key(), "id");
        assert!(ty.property("Missing").is_none());
        assert!(!ty.has_xml_meta());
    }
}
