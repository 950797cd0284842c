//! Error types for the binding core.
//!
//! Errors are grouped by where they come from: looking up the XML facet of
//! an object, misconfigured types and behaviors, value conversion, the node
//! layer, and mapping files.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;
use xbind_node::NodeError;

use crate::behavior::AccessorFamily;

/// The primary error type for adapter operations.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Facet lookup errors
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// Type, behavior, and capability configuration errors
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Value conversion errors
    #[error(transparent)]
    Value(#[from] ValueError),

    /// Node navigation and mutation errors
    #[error(transparent)]
    Node(#[from] NodeError),

    /// Mapping file errors
    #[error(transparent)]
    Mapping(#[from] MappingError),
}

/// Errors raised while retrieving the XML facet of an object.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("argument '{argument}' cannot be null")]
    ArgumentNull { argument: &'static str },

    #[error("argument '{argument}' is not a dictionary adapter")]
    NotDictionaryAdapter { argument: &'static str },

    #[error("dictionary adapter has no instance descriptor")]
    NoInstanceDescriptor,

    #[error("instance descriptor has no property getters")]
    NoGetters,

    #[error("dictionary adapter has no XML adapter among its getters")]
    NoXmlAdapter,

    #[error("dictionary adapter has {count} XML adapters among its getters")]
    AmbiguousXmlAdapter { count: usize },
}

/// Errors caused by type metadata or behavior declarations.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("type '{type_name}' has no XML metadata")]
    NoXmlMetadata { type_name: String },

    #[error(
        "property '{property}' declares conflicting behaviors: {existing} mapping and {conflicting} mapping"
    )]
    BehaviorConflict {
        property: String,
        existing: AccessorFamily,
        conflicting: AccessorFamily,
    },

    #[error("not supported: {message}")]
    NotSupported { message: String },

    #[error("accessor for property '{property}' is already prepared")]
    AccessorPrepared { property: String },

    #[error("invalid behavior on property '{property}': {message}")]
    InvalidBehavior { property: String, message: String },

    #[error("property '{property}' is read-only")]
    ReadOnly { property: String },

    #[error("XML adapter has not been initialized with a type")]
    NotInitialized,

    #[error("type '{type_name}' has no property '{property}'")]
    UnknownProperty { type_name: String, property: String },

    #[error("invalid adapter configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),
}

/// Errors converting between XML text and property values.
#[derive(Error, Debug)]
pub enum ValueError {
    #[error("property '{property}': cannot convert '{text}' to {expected}")]
    Conversion {
        property: String,
        text: String,
        expected: String,
    },

    #[error("property '{property}': expected a {expected} value, found {found}")]
    TypeMismatch {
        property: String,
        expected: String,
        found: String,
    },
}

/// Errors loading or applying a mapping document.
#[derive(Error, Debug)]
pub enum MappingError {
    #[error("mapping JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("mapping IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown type '{type_name}'")]
    UnknownType { type_name: String },

    #[error("type '{type_name}' is declared more than once")]
    DuplicateType { type_name: String },

    #[error("type '{type_name}' declares property '{property}' more than once")]
    DuplicateProperty { type_name: String, property: String },

    #[error("invalid property type '{0}'")]
    InvalidPropertyType(String),
}

impl AdapterError {
    /// Shorthand for an unsupported operation.
    pub fn not_supported(message: impl Into<String>) -> Self {
        ConfigurationError::NotSupported {
            message: message.into(),
        }
        .into()
    }

    /// Returns true for behavior conflicts.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            AdapterError::Configuration(ConfigurationError::BehaviorConflict { .. })
        )
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        AdapterError::Mapping(MappingError::Json(err))
    }
}

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;
