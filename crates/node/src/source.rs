//! Documents and raw sources an adapter can be constructed from.

use std::rc::Rc;

use crate::capability::NodeBackend;
use crate::dom::DomDocument;
use crate::error::Result;
use crate::node::XmlNode;
use crate::sxd::SxdDocument;

/// A parsed document from either backend.
#[derive(Debug, Clone)]
pub enum XmlDocument {
    /// Arena document.
    Dom(DomDocument),
    /// sxd-document package.
    Sxd(SxdDocument),
}

impl XmlDocument {
    /// Creates an empty document for `backend`.
    pub fn new(backend: NodeBackend) -> Self {
        match backend {
            NodeBackend::Dom => XmlDocument::Dom(DomDocument::new()),
            NodeBackend::Sxd => XmlDocument::Sxd(SxdDocument::new()),
        }
    }

    /// Parses markup with `backend`.
    pub fn parse(xml: &str, backend: NodeBackend) -> Result<Self> {
        tracing::debug!(%backend, bytes = xml.len(), "parsing document");
        Ok(match backend {
            NodeBackend::Dom => XmlDocument::Dom(DomDocument::parse(xml)?),
            NodeBackend::Sxd => XmlDocument::Sxd(SxdDocument::parse(xml)?),
        })
    }

    /// The backend holding this document.
    pub fn backend(&self) -> NodeBackend {
        match self {
            XmlDocument::Dom(_) => NodeBackend::Dom,
            XmlDocument::Sxd(_) => NodeBackend::Sxd,
        }
    }

    /// Handle to the document root.
    pub fn root(&self) -> Rc<dyn XmlNode> {
        match self {
            XmlDocument::Dom(doc) => Rc::new(doc.root()),
            XmlDocument::Sxd(doc) => Rc::new(doc.root()),
        }
    }

    /// Handle to the document element, if present.
    pub fn document_element(&self) -> Option<Rc<dyn XmlNode>> {
        match self {
            XmlDocument::Dom(doc) => doc
                .document_element()
                .map(|node| Rc::new(node) as Rc<dyn XmlNode>),
            XmlDocument::Sxd(doc) => doc
                .document_element()
                .map(|node| Rc::new(node) as Rc<dyn XmlNode>),
        }
    }

    /// Writes the document as markup.
    pub fn to_xml_string(&self) -> Result<String> {
        match self {
            XmlDocument::Dom(doc) => doc.to_xml_string(),
            XmlDocument::Sxd(doc) => doc.to_xml_string(),
        }
    }
}

impl From<DomDocument> for XmlDocument {
    fn from(doc: DomDocument) -> Self {
        XmlDocument::Dom(doc)
    }
}

impl From<SxdDocument> for XmlDocument {
    fn from(doc: SxdDocument) -> Self {
        XmlDocument::Sxd(doc)
    }
}

/// The raw, document-like source an adapter is bound to lazily.
#[derive(Debug, Clone)]
pub enum XmlSource {
    /// An already-parsed document; its root position is the source.
    Document(XmlDocument),
    /// Markup parsed with the given backend when first opened.
    Markup {
        /// The markup.
        text: String,
        /// Backend used to parse it.
        backend: NodeBackend,
    },
    /// An arbitrary position.
    Node(Rc<dyn XmlNode>),
}

impl XmlSource {
    /// Source over unparsed markup.
    pub fn markup(text: impl Into<String>, backend: NodeBackend) -> Self {
        XmlSource::Markup {
            text: text.into(),
            backend,
        }
    }

    /// Source over a new empty document.
    pub fn empty(backend: NodeBackend) -> Self {
        XmlSource::Document(XmlDocument::new(backend))
    }

    /// Returns the position this source corresponds to.
    ///
    /// Markup is parsed on every call; callers keep the returned handle.
    pub fn open(&self) -> Result<Rc<dyn XmlNode>> {
        match self {
            XmlSource::Document(doc) => Ok(doc.root()),
            XmlSource::Markup { text, backend } => Ok(XmlDocument::parse(text, *backend)?.root()),
            XmlSource::Node(node) => Ok(node.clone()),
        }
    }
}

impl From<XmlDocument> for XmlSource {
    fn from(doc: XmlDocument) -> Self {
        XmlSource::Document(doc)
    }
}

impl From<DomDocument> for XmlSource {
    fn from(doc: DomDocument) -> Self {
        XmlSource::Document(XmlDocument::Dom(doc))
    }
}

impl From<SxdDocument> for XmlSource {
    fn from(doc: SxdDocument) -> Self {
        XmlSource::Document(XmlDocument::Sxd(doc))
    }
}

impl From<Rc<dyn XmlNode>> for XmlSource {
    fn from(node: Rc<dyn XmlNode>) -> Self {
        XmlSource::Node(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Selector;

    #[test]
    fn test_markup_source_opens_root() {
        for backend in [NodeBackend::Dom, NodeBackend::Sxd] {
            let source = XmlSource::markup("<Order><Id>3</Id></Order>", backend);
            let root = source.open().unwrap();
            assert!(root.is_root());
            let mut cursor = root.select(&Selector::element("Order")).unwrap();
            assert!(cursor.move_next(), "backend {}", backend);
        }
    }

    #[test]
    fn test_bad_markup_fails_on_open() {
        let source = XmlSource::markup("<Order>", NodeBackend::Dom);
        assert!(source.open().is_err());
    }

    #[test]
    fn test_document_backend() {
        let doc = XmlDocument::new(NodeBackend::Sxd);
        assert_eq!(doc.backend(), NodeBackend::Sxd);
        assert!(doc.document_element().is_none());
        assert!(doc.root().supports(crate::NodeCapability::XPath));
    }
}
