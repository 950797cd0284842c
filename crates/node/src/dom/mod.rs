//! In-memory arena backend.
//!
//! Documents are parsed and written with `quick-xml`. Comments, processing
//! instructions, the DOCTYPE, qualified names and `xmlns` declarations are
//! kept verbatim; selectors match the local part of a name. Namespaces are
//! not resolved. This backend has no XPath engine.

mod document;
mod node;

pub use document::{DomDocument, NodeId};
pub use node::{DomCursor, DomNode};
