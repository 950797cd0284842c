//! The in-memory adapted object.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::adapter::XmlAdapter;
use crate::dictionary::{
    DictionaryAdapter, InstanceDescriptor, PropertyDescriptor, TypeDescriptor,
};
use crate::error::{ConfigurationError, Result};
use crate::value::PropertyValue;

#[derive(Debug)]
struct SharedState {
    store: RefCell<HashMap<String, PropertyValue>>,
    descriptor: Rc<InstanceDescriptor>,
}

/// An object whose properties live in a dictionary and are served by the
/// behaviors of its instance descriptor.
///
/// Coercing an object to another type yields a second view that shares the
/// store and behaviors but presents the other type's properties.
#[derive(Debug)]
pub struct AdaptedObject {
    meta: Rc<TypeDescriptor>,
    state: Rc<SharedState>,
    this: Weak<AdaptedObject>,
}

impl AdaptedObject {
    /// Creates an object of type `meta` and runs the initializers.
    pub fn new(meta: Rc<TypeDescriptor>, descriptor: InstanceDescriptor) -> Result<Rc<Self>> {
        let state = Rc::new(SharedState {
            store: RefCell::new(HashMap::new()),
            descriptor: Rc::new(descriptor),
        });
        Self::with_state(meta, state)
    }

    /// Creates an object bound to XML through `adapter`.
    pub fn bind(meta: Rc<TypeDescriptor>, adapter: Rc<XmlAdapter>) -> Result<Rc<Self>> {
        Self::new(meta, InstanceDescriptor::new().with_behavior(adapter))
    }

    fn with_state(meta: Rc<TypeDescriptor>, state: Rc<SharedState>) -> Result<Rc<Self>> {
        let object = Rc::new_cyclic(|this| Self {
            meta,
            state,
            this: this.clone(),
        });
        for initializer in object.state.descriptor.initializers() {
            initializer.initialize(object.as_ref(), object.meta.behaviors())?;
        }
        Ok(object)
    }

    /// Presents the same object as type `meta`.
    pub fn coerce(&self, meta: Rc<TypeDescriptor>) -> Result<Rc<Self>> {
        Self::with_state(meta, self.state.clone())
    }

    /// Type this object is viewed as.
    pub fn type_descriptor(&self) -> &Rc<TypeDescriptor> {
        &self.meta
    }

    fn property(&self, name: &str) -> Result<Rc<PropertyDescriptor>> {
        self.meta.property(name).cloned().ok_or_else(|| {
            ConfigurationError::UnknownProperty {
                type_name: self.meta.name().to_string(),
                property: name.to_string(),
            }
            .into()
        })
    }

    /// Reads a property through the getter chain.
    pub fn get(&self, name: &str) -> Result<Option<PropertyValue>> {
        self.read(name, false)
    }

    /// Reads a property without forcing collection stubs into existence.
    pub fn get_if_exists(&self, name: &str) -> Result<Option<PropertyValue>> {
        self.read(name, true)
    }

    fn read(&self, name: &str, if_exists: bool) -> Result<Option<PropertyValue>> {
        let property = self.property(name)?;
        let key = property.key();
        let mut value = self.stored(key);
        for getter in self.state.descriptor.getters() {
            value = getter.get_property_value(self, key, value, &property, if_exists)?;
        }
        Ok(value)
    }

    /// Assigns a property through the setter chain and stores the result.
    ///
    /// Returns false if a setter vetoed the assignment.
    pub fn set(&self, name: &str, value: impl Into<PropertyValue>) -> Result<bool> {
        self.assign(name, &mut Some(value.into()))
    }

    /// Clears a property.
    pub fn clear(&self, name: &str) -> Result<bool> {
        self.assign(name, &mut None)
    }

    fn assign(&self, name: &str, value: &mut Option<PropertyValue>) -> Result<bool> {
        let property = self.property(name)?;
        let key = property.key();
        for setter in self.state.descriptor.setters() {
            if !setter.set_property_value(self, key, value, &property)? {
                return Ok(false);
            }
        }

        let mut store = self.state.store.borrow_mut();
        match value.clone() {
            Some(value) => store.insert(key.to_string(), value),
            None => store.remove(key),
        };
        Ok(true)
    }

    /// The value currently stored under `key`.
    pub fn stored(&self, key: &str) -> Option<PropertyValue> {
        self.state.store.borrow().get(key).cloned()
    }
}

impl DictionaryAdapter for AdaptedObject {
    fn meta(&self) -> &TypeDescriptor {
        &self.meta
    }

    fn instance_descriptor(&self) -> Option<Rc<InstanceDescriptor>> {
        Some(self.state.descriptor.clone())
    }

    fn store_property(&self, _property: &PropertyDescriptor, key: &str, value: PropertyValue) {
        self.state
            .store
            .borrow_mut()
            .insert(key.to_string(), value);
    }

    fn set_property(&self, name: &str, value: &mut Option<PropertyValue>) -> Result<bool> {
        self.assign(name, value)
    }

    fn handle(&self) -> Weak<dyn DictionaryAdapter> {
        let handle: Weak<dyn DictionaryAdapter> = self.this.clone();
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::cell::Cell;

    use crate::behavior::Behavior;
    use crate::dictionary::{DictionaryInitializer, PropertyGetter, PropertySetter};
    use crate::value::PropertyType;

    /// Upper-cases text on the way in and counts initializations.
    #[derive(Default)]
    struct Shouting {
        initialized: Cell<usize>,
    }

    impl PropertyGetter for Shouting {
        fn get_property_value(
            &self,
            _dictionary: &dyn DictionaryAdapter,
            _key: &str,
            stored: Option<PropertyValue>,
            _property: &Rc<PropertyDescriptor>,
            _if_exists: bool,
        ) -> Result<Option<PropertyValue>> {
            Ok(stored)
        }

        fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
            self
        }
    }

    impl PropertySetter for Shouting {
        fn set_property_value(
            &self,
            _dictionary: &dyn DictionaryAdapter,
            _key: &str,
            value: &mut Option<PropertyValue>,
            _property: &Rc<PropertyDescriptor>,
        ) -> Result<bool> {
            if let Some(PropertyValue::Text(text)) = value {
                if text == "veto" {
                    return Ok(false);
                }
                *text = text.to_uppercase();
            }
            Ok(true)
        }
    }

    impl DictionaryInitializer for Shouting {
        fn initialize(
            &self,
            _dictionary: &dyn DictionaryAdapter,
            _behaviors: &[Behavior],
        ) -> Result<()> {
            self.initialized.set(self.initialized.get() + 1);
            Ok(())
        }
    }

    fn person() -> Rc<TypeDescriptor> {
        Rc::new(
            TypeDescriptor::new("Person")
                .with_property(PropertyDescriptor::new("Name", PropertyType::Text).with_key("n")),
        )
    }

    #[test]
    fn test_setter_chain_and_store() {
        let behavior = Rc::new(Shouting::default());
        let object = AdaptedObject::new(
            person(),
            InstanceDescriptor::new().with_behavior(behavior.clone()),
        )
        .unwrap();
        assert_eq!(behavior.initialized.get(), 1);

        assert!(object.set("Name", "ann").unwrap());
        assert_eq!(object.stored("n"), Some(PropertyValue::from("ANN")));
        assert_eq!(object.get("Name").unwrap(), Some(PropertyValue::from("ANN")));

        assert!(!object.set("Name", "veto").unwrap());
        assert_eq!(object.stored("n"), Some(PropertyValue::from("ANN")));

        assert!(object.clear("Name").unwrap());
        assert_eq!(object.stored("n"), None);
    }

    #[test]
    fn test_unknown_property() {
        let object = AdaptedObject::new(person(), InstanceDescriptor::new()).unwrap();
        let err = object.get("Age").unwrap_err();
        assert!(err.to_string().contains("'Age'"));
    }

    #[test]
    fn test_coerce_shares_store() {
        let behavior = Rc::new(Shouting::default());
        let object = AdaptedObject::new(
            person(),
            InstanceDescriptor::new().with_behavior(behavior.clone()),
        )
        .unwrap();
        object.set("Name", "bo").unwrap();

        let alias = Rc::new(
            TypeDescriptor::new("Named")
                .with_property(PropertyDescriptor::new("Label", PropertyType::Text).with_key("n")),
        );
        let view = object.coerce(alias).unwrap();
        assert_eq!(behavior.initialized.get(), 2);
        assert_eq!(view.get("Label").unwrap(), Some(PropertyValue::from("BO")));
    }

    #[test]
    fn test_handle_does_not_keep_object_alive() {
        let object = AdaptedObject::new(person(), InstanceDescriptor::new()).unwrap();
        let handle = object.handle();
        assert!(handle.upgrade().is_some());
        drop(object);
        assert!(handle.upgrade().is_none());
    }
}
