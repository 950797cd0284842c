//! `sxd-document` backend with XPath evaluation through `sxd-xpath`.
//!
//! Handles address nodes by index paths into the tree rather than holding
//! borrowed `sxd-document` nodes, so they carry no lifetime and can be
//! stored alongside the adapted object. Each document keeps its live paths
//! current as nodes are removed.

mod document;
mod node;

pub use document::SxdDocument;
pub use node::{SxdCursor, SxdNode};
