//! sxd-document packages and index-path addressing.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::{Rc, Weak};

use sxd_document::Package;
use sxd_document::dom::{ChildOfElement, ChildOfRoot, Document, Element, ParentOfChild, Text};
use sxd_xpath::nodeset::Node;

use crate::error::{NodeError, Result};

use super::node::SxdNode;

/// A child-index path registered with its document.
///
/// Paths count every child from the root, text and comments included. The
/// document shifts live anchors when an earlier sibling is removed and
/// clears anchors whose node left the tree.
#[derive(Debug)]
pub(crate) struct Anchor {
    path: RefCell<Option<Vec<usize>>>,
}

impl Anchor {
    /// The current path, or `None` once the node was removed.
    pub(crate) fn path(&self) -> Option<Vec<usize>> {
        self.path.borrow().clone()
    }
}

/// Where an [`SxdNode`] points.
#[derive(Debug, Clone)]
pub(crate) enum Position {
    Root,
    Element(Rc<Anchor>),
    /// Owning element and attribute name.
    Attribute(Rc<Anchor>, String),
    Text(Rc<Anchor>),
}

impl Position {
    /// Path of the node, or of the owning element for attributes.
    pub(crate) fn path(&self) -> Option<Vec<usize>> {
        match self {
            Position::Root => Some(Vec::new()),
            Position::Element(anchor) | Position::Attribute(anchor, _) | Position::Text(anchor) => {
                anchor.path()
            }
        }
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        let same = |a: &Anchor, b: &Anchor| a.path().is_some() && a.path() == b.path();
        match (self, other) {
            (Position::Root, Position::Root) => true,
            (Position::Element(a), Position::Element(b)) | (Position::Text(a), Position::Text(b)) => {
                same(a, b)
            }
            (Position::Attribute(a, x), Position::Attribute(b, y)) => x == y && same(a, b),
            _ => false,
        }
    }
}

/// An XML document backed by `sxd-document`, with XPath support.
///
/// Cloning clones the handle; all clones see the same tree.
#[derive(Clone)]
pub struct SxdDocument {
    pub(crate) package: Rc<Package>,
    anchors: Rc<RefCell<Vec<Weak<Anchor>>>>,
}

impl Default for SxdDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SxdDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SxdDocument")
            .field("document_element", &self.document_element_name())
            .finish()
    }
}

impl SxdDocument {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::from_package(Package::new())
    }

    fn from_package(package: Package) -> Self {
        Self {
            package: Rc::new(package),
            anchors: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Parses markup into a new document.
    pub fn parse(xml: &str) -> Result<Self> {
        let package = sxd_document::parser::parse(xml)
            .map_err(|e| NodeError::Parse(format!("{:?}", e)))?;
        Ok(Self::from_package(package))
    }

    /// Handle to the document root.
    pub fn root(&self) -> SxdNode {
        SxdNode::new(self.clone(), Position::Root)
    }

    /// Handle to the document element, if present.
    pub fn document_element(&self) -> Option<SxdNode> {
        let doc = self.package.as_document();
        doc.root()
            .children()
            .iter()
            .position(|child| matches!(child, ChildOfRoot::Element(_)))
            .map(|index| SxdNode::new(self.clone(), Position::Element(self.anchor(vec![index]))))
    }

    /// Writes the document as markup.
    pub fn to_xml_string(&self) -> Result<String> {
        let doc = self.package.as_document();
        let mut output = Vec::new();
        sxd_document::writer::format_document(&doc, &mut output)?;
        String::from_utf8(output).map_err(|e| NodeError::Parse(format!("invalid UTF-8: {}", e)))
    }

    /// Returns true if both handles share the same tree.
    pub fn same_document(&self, other: &SxdDocument) -> bool {
        Rc::ptr_eq(&self.package, &other.package)
    }

    /// Registers `path` so it follows later removals.
    pub(crate) fn anchor(&self, path: Vec<usize>) -> Rc<Anchor> {
        let anchor = Rc::new(Anchor {
            path: RefCell::new(Some(path)),
        });
        let mut live = self.anchors.borrow_mut();
        live.retain(|weak| weak.strong_count() > 0);
        live.push(Rc::downgrade(&anchor));
        anchor
    }

    /// Updates anchors after child `index` of the node at `parent` was removed.
    pub(crate) fn child_removed(&self, parent: &[usize], index: usize) {
        self.update_anchors(|path| {
            if path.len() <= parent.len() || !path.starts_with(parent) {
                return true;
            }
            let slot = &mut path[parent.len()];
            match (*slot).cmp(&index) {
                Ordering::Less => true,
                Ordering::Equal => false,
                Ordering::Greater => {
                    *slot -= 1;
                    true
                }
            }
        });
    }

    /// Clears anchors below `parent` after its children were replaced.
    pub(crate) fn children_replaced(&self, parent: &[usize]) {
        self.update_anchors(|path| !(path.len() > parent.len() && path.starts_with(parent)));
    }

    /// Applies `keep` to every live path; paths it rejects are cleared.
    fn update_anchors(&self, mut keep: impl FnMut(&mut Vec<usize>) -> bool) {
        self.anchors.borrow_mut().retain(|weak| {
            let Some(anchor) = weak.upgrade() else {
                return false;
            };
            let mut slot = anchor.path.borrow_mut();
            let kept = match slot.as_mut() {
                Some(path) => keep(path),
                None => false,
            };
            if !kept {
                *slot = None;
            }
            kept
        });
    }

    #[cfg(test)]
    fn live_anchors(&self) -> usize {
        self.anchors
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    fn document_element_name(&self) -> Option<String> {
        let doc = self.package.as_document();
        doc.root().children().iter().find_map(|child| match child {
            ChildOfRoot::Element(e) => Some(e.name().local_part().to_string()),
            _ => None,
        })
    }
}

pub(crate) fn element_at<'d>(doc: &Document<'d>, path: &[usize]) -> Option<Element<'d>> {
    let (first, rest) = path.split_first()?;
    let mut element = match doc.root().children().get(*first)? {
        ChildOfRoot::Element(e) => *e,
        _ => return None,
    };
    for index in rest {
        element = match element.children().get(*index)? {
            ChildOfElement::Element(e) => *e,
            _ => return None,
        };
    }
    Some(element)
}

pub(crate) fn text_at<'d>(doc: &Document<'d>, path: &[usize]) -> Option<Text<'d>> {
    let (last, parent) = path.split_last()?;
    match element_at(doc, parent)?.children().get(*last)? {
        ChildOfElement::Text(t) => Some(*t),
        _ => None,
    }
}

/// Concatenated direct text children of an element.
pub(crate) fn text_content(element: Element<'_>) -> String {
    let mut text = String::new();
    for child in element.children() {
        if let ChildOfElement::Text(t) = child {
            text.push_str(t.text());
        }
    }
    text
}

fn element_path(element: Element<'_>) -> Option<Vec<usize>> {
    let mut path = Vec::new();
    let mut current = element;
    loop {
        match current.parent()? {
            ParentOfChild::Root(root) => {
                let index = root
                    .children()
                    .iter()
                    .position(|child| matches!(child, ChildOfRoot::Element(e) if *e == current))?;
                path.push(index);
                path.reverse();
                return Some(path);
            }
            ParentOfChild::Element(parent) => {
                let index = parent
                    .children()
                    .iter()
                    .position(|child| matches!(child, ChildOfElement::Element(e) if *e == current))?;
                path.push(index);
                current = parent;
            }
        }
    }
}

/// Maps an XPath result node back to an addressable position.
///
/// Comments, namespaces and processing instructions have no position.
pub(crate) fn position_of(doc: &SxdDocument, node: Node<'_>) -> Option<Position> {
    match node {
        Node::Root(_) => Some(Position::Root),
        Node::Element(e) => element_path(e).map(|path| Position::Element(doc.anchor(path))),
        Node::Attribute(a) => {
            let path = element_path(a.parent()?)?;
            Some(Position::Attribute(
                doc.anchor(path),
                a.name().local_part().to_string(),
            ))
        }
        Node::Text(t) => {
            let parent = t.parent()?;
            let index = parent
                .children()
                .iter()
                .position(|child| matches!(child, ChildOfElement::Text(x) if *x == t))?;
            let mut path = element_path(parent)?;
            path.push(index);
            Some(Position::Text(doc.anchor(path)))
        }
        _ => None,
    }
}
