//! Keeps the tree in step with lists mutated after they were read.
//!
//! A list returned from a get is subscribed to. Structural changes (add,
//! remove, move, reset) go back through the owning object's setter chain:
//! as a clear when the property's remove policy says so, otherwise as a
//! write of the current list when write-through is enabled. Item
//! replacements are not structural and are left alone.

use std::rc::Rc;

use crate::dictionary::{DictionaryAdapter, PropertyDescriptor};
use crate::value::PropertyValue;

/// Subscribes to `value` if it is an observable list.
///
/// The listener holds the object weakly; once the object is dropped,
/// changes are ignored.
pub fn attach_observers(
    value: &PropertyValue,
    dictionary: &dyn DictionaryAdapter,
    property: &Rc<PropertyDescriptor>,
    write_through: bool,
) {
    let PropertyValue::List(list) = value else {
        return;
    };

    let handle = dictionary.handle();
    let property = property.clone();
    list.subscribe(move |list, change| {
        if !change.is_structural() {
            return Ok(());
        }
        let Some(dictionary) = handle.upgrade() else {
            return Ok(());
        };

        let current = PropertyValue::List(list.clone());
        if dictionary.should_clear_property(&property, Some(&current)) {
            tracing::trace!(property = property.name(), ?change, "clearing property after list change");
            dictionary.set_property(property.name(), &mut None)?;
        } else if write_through {
            tracing::trace!(property = property.name(), ?change, "writing list back");
            dictionary.set_property(property.name(), &mut Some(current))?;
        }
        Ok(())
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::{InstanceDescriptor, RemovePolicy, TypeDescriptor};
    use crate::object::AdaptedObject;
    use crate::observe::ObservableList;
    use crate::value::{PropertyType, ScalarType};

    fn tags(policy: RemovePolicy) -> Rc<TypeDescriptor> {
        Rc::new(TypeDescriptor::new("Post").with_property(
            PropertyDescriptor::new("Tags", PropertyType::List(ScalarType::Text))
                .with_remove_policy(policy),
        ))
    }

    #[test]
    fn test_write_through_stores_list() {
        let meta = tags(RemovePolicy::Never);
        let object = AdaptedObject::new(meta.clone(), InstanceDescriptor::new()).unwrap();
        let list = ObservableList::new();
        let property = meta.property("Tags").unwrap().clone();

        attach_observers(&PropertyValue::List(list.clone()), object.as_ref(), &property, true);
        list.push("a".into()).unwrap();
        assert_eq!(object.stored("Tags"), Some(PropertyValue::List(list.clone())));

        list.replace(0, "b".into()).unwrap();
        assert_eq!(list.listener_count(), 1);
    }

    #[test]
    fn test_clear_policy_removes_value() {
        let meta = tags(RemovePolicy::IfEmpty);
        let object = AdaptedObject::new(meta.clone(), InstanceDescriptor::new()).unwrap();
        let list = ObservableList::from_items(vec!["a".into()]);
        object.set("Tags", list.clone()).unwrap();

        let property = meta.property("Tags").unwrap().clone();
        attach_observers(&PropertyValue::List(list.clone()), object.as_ref(), &property, false);
        list.remove(0).unwrap();
        assert_eq!(object.stored("Tags"), None);
    }

    #[test]
    fn test_dropped_object_is_ignored() {
        let meta = tags(RemovePolicy::Never);
        let object = AdaptedObject::new(meta.clone(), InstanceDescriptor::new()).unwrap();
        let list = ObservableList::new();
        let property = meta.property("Tags").unwrap().clone();
        attach_observers(&PropertyValue::List(list.clone()), object.as_ref(), &property, true);
        drop(object);
        assert!(list.push("a".into()).is_ok());
    }

    #[test]
    fn test_scalars_are_not_observed() {
        let meta = tags(RemovePolicy::Never);
        let object = AdaptedObject::new(meta.clone(), InstanceDescriptor::new()).unwrap();
        let property = meta.property("Tags").unwrap().clone();
        attach_observers(&PropertyValue::from("x"), object.as_ref(), &property, true);
    }
}
