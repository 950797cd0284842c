//! Error types for node navigation and mutation.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use crate::capability::NodeCapability;

/// Errors raised by node and cursor operations.
#[derive(Error, Debug)]
pub enum NodeError {
    /// The backend does not provide the requested capability.
    #[error("not supported: {capability}")]
    NotSupported { capability: NodeCapability },

    /// The operation is not meaningful for this kind of node.
    #[error("unsupported operation '{operation}' on {kind} node")]
    InvalidOperation {
        operation: &'static str,
        kind: crate::node::NodeKind,
    },

    /// An XPath expression failed to compile.
    #[error("invalid XPath expression '{expression}': {message}")]
    InvalidXPath { expression: String, message: String },

    /// An XPath expression failed during evaluation.
    #[error("XPath evaluation failed for '{expression}': {message}")]
    XPathEvaluation { expression: String, message: String },

    /// The XPath expression selects nothing and cannot be used to create nodes.
    #[error("XPath expression '{expression}' cannot create nodes")]
    NotCreatable { expression: String },

    /// Nodes computed by an expression cannot be created through a cursor.
    #[error("cannot create nodes in a computed selection")]
    ComputedSelection,

    /// Markup could not be parsed.
    #[error("XML parse error: {0}")]
    Parse(String),

    /// Low-level quick-xml error.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// IO error while writing markup.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The cursor is not positioned on a node.
    #[error("cursor is not positioned on a node")]
    NoCurrentNode,

    /// A handle refers to a node that is no longer part of the document.
    #[error("node is no longer attached to its document")]
    Detached,

    /// A document can carry only one document element.
    #[error("document already has a document element <{existing}>")]
    DocumentElementExists { existing: String },
}

impl NodeError {
    /// Shorthand for a missing backend capability.
    pub fn unsupported(capability: NodeCapability) -> Self {
        NodeError::NotSupported { capability }
    }
}

impl From<quick_xml::events::attributes::AttrError> for NodeError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        NodeError::Xml(err.into())
    }
}

/// Result type alias for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;
