//! Node handles and cursors over a [`DomDocument`].

use std::fmt;
use std::rc::Rc;

use crate::capability::{NodeBackend, NodeCapability};
use crate::error::{NodeError, Result};
use crate::node::{NodeKind, Selector, SelectorKind, XmlCursor, XmlNode};
use crate::pending::PendingNode;

use super::document::{
    Arena, DomDocument, NodeData, NodeId, attribute_matches, is_namespace_declaration, local_name,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Node(NodeId),
    Attribute(NodeId, String),
}

/// A handle to one position in a [`DomDocument`].
#[derive(Clone)]
pub struct DomNode {
    doc: DomDocument,
    target: Target,
}

impl DomNode {
    pub(crate) fn new(doc: DomDocument, id: NodeId) -> Self {
        Self {
            doc,
            target: Target::Node(id),
        }
    }

    fn attribute(doc: DomDocument, owner: NodeId, name: String) -> Self {
        Self {
            doc,
            target: Target::Attribute(owner, name),
        }
    }

    /// The arena id of this node, or of the owning element for attributes.
    pub fn id(&self) -> NodeId {
        match &self.target {
            Target::Node(id) | Target::Attribute(id, _) => *id,
        }
    }

    /// The document this handle points into.
    pub fn document(&self) -> &DomDocument {
        &self.doc
    }

    fn invalid(&self, operation: &'static str) -> NodeError {
        NodeError::InvalidOperation {
            operation,
            kind: self.kind(),
        }
    }
}

impl PartialEq for DomNode {
    fn eq(&self, other: &Self) -> bool {
        self.doc.same_document(&other.doc) && self.target == other.target
    }
}

impl fmt::Debug for DomNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Target::Node(id) => f.debug_tuple("DomNode").field(id).finish(),
            Target::Attribute(id, name) => f
                .debug_struct("DomNode")
                .field("owner", id)
                .field("attribute", name)
                .finish(),
        }
    }
}

impl XmlNode for DomNode {
    fn kind(&self) -> NodeKind {
        match &self.target {
            Target::Attribute(..) => NodeKind::Attribute,
            Target::Node(id) => match &self.doc.arena.borrow().node(*id).data {
                NodeData::Root => NodeKind::Root,
                NodeData::Element { .. } => NodeKind::Element,
                NodeData::Text(_) => NodeKind::Text,
                NodeData::Comment(_) | NodeData::Instruction(_) | NodeData::DocType(_) => {
                    NodeKind::Markup
                }
            },
        }
    }

    fn exists(&self) -> bool {
        self.doc.arena.borrow().is_attached(self.id())
    }

    fn name(&self) -> Option<String> {
        match &self.target {
            Target::Attribute(_, name) => Some(name.clone()),
            Target::Node(id) => self
                .doc
                .arena
                .borrow()
                .local_element_name(*id)
                .map(str::to_string),
        }
    }

    fn value(&self) -> Result<Option<String>> {
        let arena = self.doc.arena.borrow();
        match &self.target {
            Target::Attribute(owner, name) => Ok(attribute_value(&arena, *owner, name)),
            Target::Node(id) => match &arena.node(*id).data {
                NodeData::Root => Ok(None),
                NodeData::Element { .. } => Ok(Some(arena.text_content(*id))),
                NodeData::Text(text) => Ok(Some(text.clone())),
                NodeData::Comment(_) | NodeData::Instruction(_) | NodeData::DocType(_) => Ok(None),
            },
        }
    }

    fn set_value(&self, value: &str) -> Result<()> {
        let kind = self.kind();
        if kind == NodeKind::Root {
            return Err(self.invalid("set_value"));
        }

        let mut arena = self.doc.arena.borrow_mut();
        if !arena.is_attached(self.id()) {
            return Err(NodeError::Detached);
        }
        match &self.target {
            Target::Attribute(owner, name) => {
                if let NodeData::Element { attributes, .. } = &mut arena.node_mut(*owner).data {
                    match attributes.iter_mut().find(|(key, _)| attribute_matches(key, name)) {
                        Some((_, existing)) => *existing = value.to_string(),
                        None => attributes.push((name.clone(), value.to_string())),
                    }
                }
            }
            Target::Node(id) if kind == NodeKind::Element => {
                arena.set_text_content(*id, value);
            }
            Target::Node(id) => match &mut arena.node_mut(*id).data {
                NodeData::Text(text) => *text = value.to_string(),
                _ => {
                    return Err(NodeError::InvalidOperation {
                        operation: "set_value",
                        kind,
                    });
                }
            },
        }
        Ok(())
    }

    fn select(&self, selector: &Selector) -> Result<Box<dyn XmlCursor>> {
        match self.kind() {
            NodeKind::Element => {}
            NodeKind::Root if selector.kind() == SelectorKind::Element => {}
            _ => return Err(self.invalid("select")),
        }
        Ok(Box::new(DomCursor {
            doc: self.doc.clone(),
            parent: self.id(),
            selector: selector.clone(),
            next: 0,
            current: None,
        }))
    }

    fn remove(&self) -> Result<()> {
        match &self.target {
            Target::Attribute(owner, name) => {
                let mut arena = self.doc.arena.borrow_mut();
                if let NodeData::Element { attributes, .. } = &mut arena.node_mut(*owner).data {
                    attributes.retain(|(key, _)| !attribute_matches(key, name));
                }
                Ok(())
            }
            Target::Node(id) if *id == NodeId::ROOT => Err(self.invalid("remove")),
            Target::Node(id) => {
                self.doc.arena.borrow_mut().detach(*id);
                Ok(())
            }
        }
    }

    fn capabilities(&self) -> &'static [NodeCapability] {
        NodeBackend::Dom.capabilities()
    }
}

fn attribute_value(arena: &Arena, owner: NodeId, name: &str) -> Option<String> {
    match &arena.node(owner).data {
        NodeData::Element { attributes, .. } => attributes
            .iter()
            .find(|(key, _)| attribute_matches(key, name))
            .map(|(_, value)| value.clone()),
        _ => None,
    }
}

/// Cursor over the matching children or attributes of a [`DomNode`].
///
/// `next` is the index in the parent's child (or attribute) list where the
/// following search starts; `current` is the index of the matched entry.
#[derive(Debug)]
pub struct DomCursor {
    doc: DomDocument,
    parent: NodeId,
    selector: Selector,
    next: usize,
    current: Option<usize>,
}

impl DomCursor {
    fn parent_node(&self) -> DomNode {
        DomNode::new(self.doc.clone(), self.parent)
    }

    fn find_from(&self, start: usize) -> Option<usize> {
        let arena = self.doc.arena.borrow();
        let node = arena.node(self.parent);
        match self.selector.kind() {
            SelectorKind::Element => node
                .children
                .iter()
                .enumerate()
                .skip(start)
                .find(|(_, child)| {
                    arena
                        .local_element_name(**child)
                        .is_some_and(|name| self.selector.matches(name))
                })
                .map(|(index, _)| index),
            SelectorKind::Attribute => match &node.data {
                NodeData::Element { attributes, .. } => attributes
                    .iter()
                    .enumerate()
                    .skip(start)
                    .find(|(_, (key, _))| {
                        !is_namespace_declaration(key) && self.selector.matches(local_name(key))
                    })
                    .map(|(index, _)| index),
                _ => None,
            },
        }
    }

    fn node_at(&self, index: usize) -> Option<DomNode> {
        let arena = self.doc.arena.borrow();
        let node = arena.node(self.parent);
        match self.selector.kind() {
            SelectorKind::Element => node
                .children
                .get(index)
                .map(|child| DomNode::new(self.doc.clone(), *child)),
            SelectorKind::Attribute => match &node.data {
                NodeData::Element { attributes, .. } => attributes
                    .get(index)
                    .map(|(key, _)| {
                        DomNode::attribute(self.doc.clone(), self.parent, local_name(key).to_string())
                    }),
                _ => None,
            },
        }
    }
}

impl XmlCursor for DomCursor {
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
        let name = self.selector.create_name().to_string();
        let mut arena = self.doc.arena.borrow_mut();
        if !arena.is_attached(self.parent) {
            return Err(NodeError::Detached);
        }

        let index = match self.selector.kind() {
            SelectorKind::Element => {
                if self.parent == NodeId::ROOT {
                    let existing = arena
                        .node(NodeId::ROOT)
                        .children
                        .iter()
                        .find_map(|id| arena.element_name(*id));
                    if let Some(existing) = existing {
                        return Err(NodeError::DocumentElementExists {
                            existing: existing.to_string(),
                        });
                    }
                }
                arena.append(
                    self.parent,
                    NodeData::Element {
                        name: name.clone(),
                        attributes: Vec::new(),
                    },
                );
                arena.node(self.parent).children.len() - 1
            }
            SelectorKind::Attribute => match &mut arena.node_mut(self.parent).data {
                NodeData::Element { attributes, .. } => {
                    match attributes
                        .iter()
                        .position(|(key, _)| attribute_matches(key, &name))
                    {
                        Some(index) => index,
                        None => {
                            attributes.push((name.clone(), String::new()));
                            attributes.len() - 1
                        }
                    }
                }
                _ => {
                    return Err(NodeError::InvalidOperation {
                        operation: "create attribute",
                        kind: NodeKind::Root,
                    });
                }
            },
        };
        drop(arena);

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
                Rc::new(self.parent_node()),
                self.selector.clone(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> DomDocument {
        DomDocument::parse(
            r#"<Order id="7"><Item>a</Item><Note>n</Note><Item>b</Item><Item>c</Item></Order>"#,
        )
        .unwrap()
    }

    fn values(cursor: &mut dyn XmlCursor) -> Vec<String> {
        let mut out = Vec::new();
        while cursor.move_next() {
            out.push(cursor.current().unwrap().value().unwrap().unwrap());
        }
        out
    }

    #[test]
    fn test_select_iterates_matching_children() {
        let doc = order();
        let element = doc.document_element().unwrap();
        let mut cursor = element.select(&Selector::element("Item")).unwrap();
        assert_eq!(values(cursor.as_mut()), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_remove_continues_with_following_match() {
        let doc = order();
        let element = doc.document_element().unwrap();
        let mut cursor = element.select(&Selector::element("Item")).unwrap();
        assert!(cursor.move_next());
        cursor.remove().unwrap();
        assert!(cursor.move_next());
        assert_eq!(cursor.current().unwrap().value().unwrap().unwrap(), "b");
        cursor.remove_all_next().unwrap();

        let mut check = element.select(&Selector::element("Item")).unwrap();
        assert_eq!(values(check.as_mut()), vec!["b"]);
    }

    #[test]
    fn test_create_appends_and_positions() {
        let doc = order();
        let element = doc.document_element().unwrap();
        let mut cursor = element.select(&Selector::element("Total")).unwrap();
        assert!(!cursor.move_next());
        let created = cursor.create().unwrap();
        created.set_value("12").unwrap();
        assert!(!cursor.move_next());

        let xml = doc.to_xml_string().unwrap();
        assert!(xml.ends_with("<Total>12</Total></Order>"));
    }

    #[test]
    fn test_attribute_cursor() {
        let doc = order();
        let element = doc.document_element().unwrap();
        let mut cursor = element.select(&Selector::attribute("id")).unwrap();
        assert!(cursor.move_next());
        let attr = cursor.current().unwrap();
        assert!(attr.is_attribute());
        assert_eq!(attr.value().unwrap().as_deref(), Some("7"));
        attr.set_value("8").unwrap();
        assert_eq!(attr.value().unwrap().as_deref(), Some("8"));

        let mut missing = element.select(&Selector::attribute("code")).unwrap();
        assert!(!missing.move_next());
        missing.create().unwrap().set_value("x").unwrap();
        assert!(doc.to_xml_string().unwrap().contains(r#"<Order id="8" code="x">"#));
    }

    #[test]
    fn test_root_allows_one_document_element() {
        let doc = DomDocument::new();
        let root = doc.root();
        assert!(root.is_root());
        let mut cursor = root.select(&Selector::element("Order")).unwrap();
        cursor.create().unwrap();
        let err = cursor.create().unwrap_err();
        assert!(matches!(err, NodeError::DocumentElementExists { .. }));
        assert!(root.select(&Selector::attribute("id")).is_err());
    }

    #[test]
    fn test_save_unadvanced_cursor_is_pending() {
        let doc = order();
        let element = doc.document_element().unwrap();
        let cursor = element.select(&Selector::element("Customer")).unwrap();
        let saved = cursor.save();
        assert!(!saved.exists());
        assert_eq!(saved.value().unwrap(), None);

        let mut child = saved.select(&Selector::element("Name")).unwrap();
        assert!(!child.move_next());
        child.create().unwrap().set_value("Ann").unwrap();

        assert!(saved.exists());
        assert!(
            doc.to_xml_string()
                .unwrap()
                .contains("<Customer><Name>Ann</Name></Customer>")
        );
    }

    #[test]
    fn test_xpath_not_supported() {
        let doc = order();
        let element = doc.document_element().unwrap();
        let path = crate::xpath::CompiledXPath::compile("Item").unwrap();
        let err = element.select_xpath(&path).unwrap_err();
        assert!(matches!(
            err,
            NodeError::NotSupported {
                capability: NodeCapability::XPath
            }
        ));
    }

    #[test]
    fn test_prefixed_names_match_local_part() {
        let doc = DomDocument::parse(
            r#"<o:Order xmlns:o="urn:orders" o:code="A"><o:Item>a</o:Item></o:Order>"#,
        )
        .unwrap();
        let element = doc.document_element().unwrap();
        assert_eq!(element.name().as_deref(), Some("Order"));

        let mut items = element.select(&Selector::element("Item")).unwrap();
        assert_eq!(values(items.as_mut()), vec!["a"]);

        let mut attributes = element.select(&Selector::attribute("o")).unwrap();
        assert!(!attributes.move_next());
        let mut code = element.select(&Selector::attribute("code")).unwrap();
        assert!(code.move_next());
        code.current().unwrap().set_value("B").unwrap();
        assert!(
            doc.to_xml_string()
                .unwrap()
                .contains(r#"<o:Order xmlns:o="urn:orders" o:code="B">"#)
        );
    }

    #[test]
    fn test_removed_node_rejects_writes() {
        let doc = order();
        let element = doc.document_element().unwrap();
        let mut cursor = element.select(&Selector::element("Note")).unwrap();
        assert!(cursor.move_next());
        let note = cursor.current().unwrap();
        assert!(note.exists());
        note.remove().unwrap();
        assert!(!note.exists());
        assert!(matches!(note.set_value("x"), Err(NodeError::Detached)));
    }
}
