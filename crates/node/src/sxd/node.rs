//! Node handles and cursors over an [`SxdDocument`].

use std::rc::Rc;

use sxd_document::dom::{ChildOfElement, ChildOfRoot, Document};
use sxd_xpath::{Context, Value};

use crate::capability::{NodeBackend, NodeCapability};
use crate::error::{NodeError, Result};
use crate::node::{NodeKind, Selector, SelectorKind, XmlCursor, XmlNode};
use crate::pending::{NodeListCursor, PendingNode};
use crate::xpath::{CompiledXPath, XPathValue};

use super::document::{Position, SxdDocument, element_at, position_of, text_at, text_content};

/// A handle to one position in an [`SxdDocument`].
///
/// The handle keeps pointing at its node when siblings before it are
/// removed. Once the node itself is removed, reads find nothing and writes
/// fail with [`NodeError::Detached`].
#[derive(Debug, Clone)]
pub struct SxdNode {
    doc: SxdDocument,
    position: Position,
}

impl SxdNode {
    pub(crate) fn new(doc: SxdDocument, position: Position) -> Self {
        Self { doc, position }
    }

    fn element(doc: &SxdDocument, path: Vec<usize>) -> Self {
        Self::new(doc.clone(), Position::Element(doc.anchor(path)))
    }

    pub(crate) fn position(&self) -> &Position {
        &self.position
    }

    /// The document this handle points into.
    pub fn document(&self) -> &SxdDocument {
        &self.doc
    }

    fn invalid(&self, operation: &'static str) -> NodeError {
        NodeError::InvalidOperation {
            operation,
            kind: self.kind(),
        }
    }

    fn path(&self) -> Result<Vec<usize>> {
        self.position.path().ok_or(NodeError::Detached)
    }
}

impl PartialEq for SxdNode {
    fn eq(&self, other: &Self) -> bool {
        self.doc.same_document(&other.doc) && self.position == other.position
    }
}

impl XmlNode for SxdNode {
    fn kind(&self) -> NodeKind {
        match self.position {
            Position::Root => NodeKind::Root,
            Position::Element(_) => NodeKind::Element,
            Position::Attribute(..) => NodeKind::Attribute,
            Position::Text(_) => NodeKind::Text,
        }
    }

    fn exists(&self) -> bool {
        let doc = self.doc.package.as_document();
        match (&self.position, self.position.path()) {
            (Position::Root, _) => true,
            (_, None) => false,
            (Position::Text(_), Some(path)) => text_at(&doc, &path).is_some(),
            (_, Some(path)) => element_at(&doc, &path).is_some(),
        }
    }

    fn name(&self) -> Option<String> {
        let doc = self.doc.package.as_document();
        match &self.position {
            Position::Element(anchor) => anchor
                .path()
                .and_then(|path| element_at(&doc, &path))
                .map(|e| e.name().local_part().to_string()),
            Position::Attribute(_, name) => Some(name.clone()),
            Position::Root | Position::Text(_) => None,
        }
    }

    fn value(&self) -> Result<Option<String>> {
        let doc = self.doc.package.as_document();
        let Some(path) = self.position.path() else {
            return Ok(None);
        };
        Ok(match &self.position {
            Position::Root => None,
            Position::Element(_) => element_at(&doc, &path).map(text_content),
            Position::Attribute(_, name) => element_at(&doc, &path)
                .and_then(|e| e.attribute_value(name.as_str()).map(str::to_string)),
            Position::Text(_) => text_at(&doc, &path).map(|t| t.text().to_string()),
        })
    }

    fn set_value(&self, value: &str) -> Result<()> {
        let doc = self.doc.package.as_document();
        match &self.position {
            Position::Root => return Err(self.invalid("set_value")),
            Position::Element(_) => {
                let path = self.path()?;
                element_at(&doc, &path)
                    .ok_or(NodeError::Detached)?
                    .set_text(value);
                self.doc.children_replaced(&path);
            }
            Position::Attribute(_, name) => {
                element_at(&doc, &self.path()?)
                    .ok_or(NodeError::Detached)?
                    .set_attribute_value(name.as_str(), value);
            }
            Position::Text(_) => {
                text_at(&doc, &self.path()?)
                    .ok_or(NodeError::Detached)?
                    .set_text(value);
            }
        }
        Ok(())
    }

    fn select(&self, selector: &Selector) -> Result<Box<dyn XmlCursor>> {
        match self.position {
            Position::Element(_) => {}
            Position::Root if selector.kind() == SelectorKind::Element => {}
            _ => return Err(self.invalid("select")),
        }
        Ok(Box::new(SxdCursor {
            parent: self.clone(),
            selector: selector.clone(),
            next: 0,
            current: None,
        }))
    }

    fn select_xpath(&self, path: &CompiledXPath) -> Result<Box<dyn XmlCursor>> {
        match self.evaluate_xpath(path)? {
            XPathValue::Nodes(nodes) => Ok(Box::new(NodeListCursor::new(nodes))),
            _ => Err(NodeError::XPathEvaluation {
                expression: path.expression().to_string(),
                message: "expression does not select nodes".to_string(),
            }),
        }
    }

    fn evaluate_xpath(&self, path: &CompiledXPath) -> Result<XPathValue> {
        let doc = self.doc.package.as_document();
        let context = Context::new();
        let evaluated = match &self.position {
            Position::Root => path.xpath().evaluate(&context, doc.root()),
            Position::Element(_) => {
                let element = element_at(&doc, &self.path()?).ok_or(NodeError::Detached)?;
                path.xpath().evaluate(&context, element)
            }
            Position::Attribute(_, name) => {
                let attribute = element_at(&doc, &self.path()?)
                    .and_then(|e| e.attribute(name.as_str()))
                    .ok_or(NodeError::Detached)?;
                path.xpath().evaluate(&context, attribute)
            }
            Position::Text(_) => {
                let text = text_at(&doc, &self.path()?).ok_or(NodeError::Detached)?;
                path.xpath().evaluate(&context, text)
            }
        };

        let value = evaluated.map_err(|e| NodeError::XPathEvaluation {
            expression: path.expression().to_string(),
            message: format!("{:?}", e),
        })?;

        Ok(match value {
            Value::Boolean(b) => XPathValue::Boolean(b),
            Value::Number(n) => XPathValue::Number(n),
            Value::String(s) => XPathValue::Text(s),
            Value::Nodeset(nodes) => XPathValue::Nodes(
                nodes
                    .document_order()
                    .into_iter()
                    .filter_map(|node| position_of(&self.doc, node))
                    .map(|position| {
                        Rc::new(SxdNode::new(self.doc.clone(), position)) as Rc<dyn XmlNode>
                    })
                    .collect(),
            ),
        })
    }

    fn remove(&self) -> Result<()> {
        let doc = self.doc.package.as_document();
        let Some(path) = self.position.path() else {
            return Ok(());
        };
        let removed = match &self.position {
            Position::Root => return Err(self.invalid("remove")),
            Position::Element(_) => element_at(&doc, &path)
                .map(|element| element.remove_from_parent())
                .is_some(),
            Position::Text(_) => text_at(&doc, &path)
                .map(|text| text.remove_from_parent())
                .is_some(),
            Position::Attribute(_, name) => {
                if let Some(element) = element_at(&doc, &path) {
                    element.remove_attribute(name.as_str());
                }
                false
            }
        };
        if removed {
            if let Some((index, parent)) = path.split_last() {
                self.doc.child_removed(parent, *index);
            }
        }
        Ok(())
    }

    fn capabilities(&self) -> &'static [NodeCapability] {
        NodeBackend::Sxd.capabilities()
    }
}

/// Cursor over the matching children or attributes of an [`SxdNode`].
#[derive(Debug)]
pub struct SxdCursor {
    parent: SxdNode,
    selector: Selector,
    next: usize,
    current: Option<usize>,
}

impl SxdCursor {
    fn child_names(&self, doc: &Document<'_>) -> Vec<Option<String>> {
        let Some(parent) = self.parent.position.path() else {
            return Vec::new();
        };
        if parent.is_empty() {
            return doc
                .root()
                .children()
                .iter()
                .map(|child| match child {
                    ChildOfRoot::Element(e) => Some(e.name().local_part().to_string()),
                    _ => None,
                })
                .collect();
        }

        let Some(element) = element_at(doc, &parent) else {
            return Vec::new();
        };
        match self.selector.kind() {
            SelectorKind::Element => element
                .children()
                .iter()
                .map(|child| match child {
                    ChildOfElement::Element(e) => Some(e.name().local_part().to_string()),
                    _ => None,
                })
                .collect(),
            SelectorKind::Attribute => element
                .attributes()
                .iter()
                .map(|a| Some(a.name().local_part().to_string()))
                .collect(),
        }
    }

    fn find_from(&self, start: usize) -> Option<usize> {
        let doc = self.parent.doc.package.as_document();
        self.child_names(&doc)
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, name)| name.as_deref().is_some_and(|n| self.selector.matches(n)))
            .map(|(index, _)| index)
    }

    fn node_at(&self, index: usize) -> Option<SxdNode> {
        let doc = self.parent.doc.package.as_document();
        let name = self.child_names(&doc).into_iter().nth(index)??;
        match self.selector.kind() {
            SelectorKind::Element => {
                let mut path = self.parent.position.path()?;
                path.push(index);
                Some(SxdNode::element(&self.parent.doc, path))
            }
            SelectorKind::Attribute => match &self.parent.position {
                Position::Element(anchor) => Some(SxdNode::new(
                    self.parent.doc.clone(),
                    Position::Attribute(anchor.clone(), name),
                )),
                _ => None,
            },
        }
    }
}

impl XmlCursor for SxdCursor {
    fn move_next(&mut self) -> bool {
        match self.find_from(self.next) {
            Some(index) => {
                self.current = Some(index);
                self.next = index + 1;
                true
            }
            None => {
                self.current = None;
                false
            }
        }
    }

    fn current(&self) -> Option<Rc<dyn XmlNode>> {
        self.current
            .and_then(|index| self.node_at(index))
            .map(|node| Rc::new(node) as Rc<dyn XmlNode>)
    }

    fn create(&mut self) -> Result<Rc<dyn XmlNode>> {
        let name = self.selector.create_name();
        let doc = self.parent.doc.package.as_document();
        let parent_path = self.parent.path()?;

        let index = if parent_path.is_empty() {
            let root = doc.root();
            let existing = root.children().iter().find_map(|child| match child {
                ChildOfRoot::Element(e) => Some(e.name().local_part().to_string()),
                _ => None,
            });
            if let Some(existing) = existing {
                return Err(NodeError::DocumentElementExists { existing });
            }
            root.append_child(doc.create_element(name));
            root.children().len() - 1
        } else {
            let parent = element_at(&doc, &parent_path).ok_or(NodeError::Detached)?;
            match self.selector.kind() {
                SelectorKind::Element => {
                    parent.append_child(doc.create_element(name));
                    parent.children().len() - 1
                }
                SelectorKind::Attribute => {
                    if parent.attribute(name).is_none() {
                        parent.set_attribute_value(name, "");
                    }
                    parent
                        .attributes()
                        .iter()
                        .position(|a| a.name().local_part() == name)
                        .ok_or(NodeError::NoCurrentNode)?
                }
            }
        };

        tracing::trace!(selector = %self.selector, "created node");
        self.current = Some(index);
        self.next = index + 1;
        self.current().ok_or(NodeError::NoCurrentNode)
    }

    fn remove(&mut self) -> Result<()> {
        let index = self.current.take().ok_or(NodeError::NoCurrentNode)?;
        let node = self.node_at(index).ok_or(NodeError::NoCurrentNode)?;
        node.remove()?;
        self.next = index;
        Ok(())
    }

    fn save(&self) -> Rc<dyn XmlNode> {
        match self.current() {
            Some(node) => node,
            None => Rc::new(PendingNode::new(
                Rc::new(self.parent.clone()),
                self.selector.clone(),
            )),
        }
    }
}
