//! XML node and cursor capability for xbind.
//!
//! This crate provides the positions that adapted objects are bound to:
//! an abstract [`XmlNode`] handle and an [`XmlCursor`] that iterates,
//! creates, and removes matching children or attributes. Two backends
//! implement it:
//!
//! - [`dom`] - an arena document parsed and written with quick-xml.
//!   Navigation and mutation only.
//! - [`sxd`] - a document backed by sxd-document, with XPath selection and
//!   evaluation through sxd-xpath.
//!
//! The backend is chosen at runtime through [`NodeBackend`]; code written
//! against the traits does not need to know which one is active, but may
//! check [`XmlNode::supports`] before relying on XPath.
//!
//! # Example
//!
//! ```
//! use xbind_node::{NodeBackend, Selector, XmlDocument};
//!
//! let doc = XmlDocument::parse("<Order><Id>7</Id></Order>", NodeBackend::Dom).unwrap();
//! let order = doc.document_element().unwrap();
//! let mut ids = order.select(&Selector::element("Id")).unwrap();
//! assert!(ids.move_next());
//! assert_eq!(ids.current().unwrap().value().unwrap().as_deref(), Some("7"));
//! ```
//!
//! # Pending positions
//!
//! Saving a cursor that matched nothing yields a pending node. It reads as
//! empty and is created in its parent on the first write, which lets an
//! adapted object be bound to an element that does not exist yet.

#![warn(missing_docs)]

pub mod capability;
pub mod dom;
pub mod error;
pub mod node;
pub mod pending;
pub mod source;
pub mod sxd;
pub mod xpath;

pub use capability::{NodeBackend, NodeCapability};
pub use dom::{DomDocument, DomNode};
pub use error::{NodeError, Result};
pub use node::{NodeKind, Selector, SelectorKind, XmlCursor, XmlNode, first_value};
pub use pending::{DetachedNode, NodeListCursor, PendingNode};
pub use source::{XmlDocument, XmlSource};
pub use sxd::{SxdDocument, SxdNode};
pub use xpath::{CompiledXPath, PathStep, XPathValue};
