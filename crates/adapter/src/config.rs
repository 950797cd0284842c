//! Adapter configuration.

use serde::{Deserialize, Serialize};
use xbind_node::NodeBackend;

/// Settings applied to every object an [`XmlAdapter`](crate::XmlAdapter)
/// serves.
///
/// # Example
///
/// ```
/// use xbind_adapter::AdapterConfig;
/// use xbind_node::NodeBackend;
///
/// let config: AdapterConfig = serde_json::from_str(r#"{"backend": "sxd"}"#).unwrap();
/// assert_eq!(config.backend, NodeBackend::Sxd);
/// assert!(config.write_through_collections);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Backend used when the adapter parses markup or creates a document.
    pub backend: NodeBackend,

    /// Write a list back to the tree after a structural change that does
    /// not clear the property.
    pub write_through_collections: bool,

    /// Root element name overriding the base selection of the primary type.
    pub root_element: Option<String>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            backend: NodeBackend::Dom,
            write_through_collections: true,
            root_element: None,
        }
    }
}

impl AdapterConfig {
    /// Validates the configuration.
    ///
    /// Returns a list of validation errors, or `Ok(())` if valid.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Some(name) = &self.root_element {
            if name.is_empty() {
                errors.push("Root element name cannot be empty".to_string());
            } else if !is_xml_name(name) {
                errors.push(format!("Root element name '{}' is not a valid XML name", name));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration for the sxd backend.
    pub fn sxd() -> Self {
        Self {
            backend: NodeBackend::Sxd,
            ..Self::default()
        }
    }
}

fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
