//! Accessor resolution.
//!
//! Turns the ordered behavior list of one property into exactly one
//! prepared accessor. The caching of results lives in
//! [`XmlMetadata::accessor`](crate::metadata::XmlMetadata::accessor); this
//! module only decides and builds.
//!
//! # Rules
//!
//! - Any ignore descriptor wins: the result is the shared ignore accessor.
//! - The first descriptor of a family creates that family's accessor, and
//!   later descriptors of the same family configure it further.
//! - A descriptor of a second family is a conflict naming the property.
//! - Volatile descriptors only set a flag.
//! - No family at all yields the default element-by-name accessor.

use std::rc::Rc;

use crate::accessor::Accessor;
use crate::behavior::Behavior;
use crate::dictionary::PropertyDescriptor;
use crate::error::{ConfigurationError, Result};
use crate::metadata::XmlMetadata;

/// Resolves and prepares the accessor for `property`.
pub fn resolve(property: &PropertyDescriptor, metadata: &XmlMetadata) -> Result<Rc<Accessor>> {
    resolve_behaviors(property, property.behaviors(), metadata)
}

/// Resolves against an explicit behavior list instead of the property's own.
pub fn resolve_behaviors(
    property: &PropertyDescriptor,
    behaviors: &[Behavior],
    metadata: &XmlMetadata,
) -> Result<Rc<Accessor>> {
    if behaviors.iter().any(Behavior::is_ignore) {
        tracing::debug!(
            type_name = metadata.type_name(),
            property = property.name(),
            "property is ignored"
        );
        return Ok(Accessor::ignore());
    }

    let mut accessor: Option<Accessor> = None;
    let mut volatile = false;

    for behavior in behaviors {
        if behavior.is_volatile() {
            volatile = true;
            continue;
        }
        let Some(family) = behavior.family() else {
            continue;
        };

        let current =
            accessor.get_or_insert_with(|| Accessor::create(family, property, metadata));

        if let Some(existing) = current.family() {
            if existing != family {
                return Err(ConfigurationError::BehaviorConflict {
                    property: property.name().to_string(),
                    existing,
                    conflicting: family,
                }
                .into());
            }
        }
        current.configure(behavior)?;
    }

    let mut accessor = accessor.unwrap_or_else(|| Accessor::default_for(property, metadata));
    accessor.configure_volatile(volatile)?;
    accessor.prepare()?;

    tracing::debug!(
        type_name = metadata.type_name(),
        property = property.name(),
        kind = %accessor.kind(),
        volatile,
        "resolved accessor"
    );
    Ok(Rc::new(accessor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::{AccessorKind, PropertyAccessor};
    use crate::behavior::AccessorFamily;
    use crate::value::{PropertyType, ScalarType};

    fn metadata() -> XmlMetadata {
        XmlMetadata::new("Order")
    }

    #[test]
    fn test_no_behaviors_gives_default() {
        let property = PropertyDescriptor::new("Total", PropertyType::Integer);
        let accessor = resolve(&property, &metadata()).unwrap();
        assert_eq!(accessor.kind(), AccessorKind::Default);
        assert!(accessor.is_prepared());
    }

    #[test]
    fn test_same_family_combines() {
        let property = PropertyDescriptor::new("Lines", PropertyType::List(ScalarType::Text))
            .with_behaviors(vec![
                Behavior::Array {
                    name: Some("Items".into()),
                },
                Behavior::Volatile,
                Behavior::ArrayItem {
                    name: Some("Item".into()),
                },
            ]);
        let accessor = resolve(&property, &metadata()).unwrap();
        assert!(accessor.is_volatile());
        match accessor.as_ref() {
            Accessor::Array(array) => {
                assert_eq!(array.wrapper_name(), "Items");
                assert_eq!(array.item_name(), "Item");
            }
            other => panic!("unexpected accessor {:?}", other.kind()),
        }
    }

    #[test]
    fn test_conflict_names_both_families() {
        let property = PropertyDescriptor::new("Total", PropertyType::Integer).with_behaviors(
            vec![Behavior::element("Sum"), Behavior::attribute("total")],
        );
        let err = resolve(&property, &metadata()).unwrap_err();
        match err {
            crate::error::AdapterError::Configuration(ConfigurationError::BehaviorConflict {
                property,
                existing,
                conflicting,
            }) => {
                assert_eq!(property, "Total");
                assert_eq!(existing, AccessorFamily::Element);
                assert_eq!(conflicting, AccessorFamily::Attribute);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_ignore_wins_anywhere() {
        let property = PropertyDescriptor::new("Total", PropertyType::Integer).with_behaviors(
            vec![
                Behavior::element("Sum"),
                Behavior::attribute("total"),
                Behavior::Ignore,
            ],
        );
        let accessor = resolve(&property, &metadata()).unwrap();
        assert!(accessor.is_ignored());
        assert!(Rc::ptr_eq(&accessor, &Accessor::ignore()));
    }

    #[test]
    fn test_volatile_alone_keeps_default() {
        let property = PropertyDescriptor::new("Stamp", PropertyType::Text)
            .with_behavior(Behavior::Volatile);
        let accessor = resolve(&property, &metadata()).unwrap();
        assert_eq!(accessor.kind(), AccessorKind::Default);
        assert!(accessor.is_volatile());
    }
}
