//! Arena document parsed and written with quick-xml.

use std::cell::RefCell;
use std::io::Cursor;
use std::rc::Rc;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::name::QName;

use crate::error::{NodeError, Result};

use super::node::DomNode;

/// Index of a node in the document arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The document root.
    pub const ROOT: NodeId = NodeId(0);
}

#[derive(Debug, Clone)]
pub(crate) enum NodeData {
    Root,
    /// Names are kept qualified, prefix included.
    Element {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
    /// Raw comment content.
    Comment(String),
    /// Raw processing instruction content, target included.
    Instruction(String),
    /// Raw DOCTYPE content.
    DocType(String),
}

#[derive(Debug, Clone)]
pub(crate) struct ArenaNode {
    pub(crate) data: NodeData,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

/// Backing storage of a [`DomDocument`].
///
/// Nodes are never deallocated; removing a node only unlinks it from its
/// parent, so ids held by cursors stay valid.
#[derive(Debug, Clone)]
pub(crate) struct Arena {
    nodes: Vec<ArenaNode>,
    /// Content of the parsed XML declaration, written back unchanged.
    declaration: Option<String>,
}

impl Arena {
    fn new() -> Self {
        Self {
            nodes: vec![ArenaNode {
                data: NodeData::Root,
                parent: None,
                children: Vec::new(),
            }],
            declaration: None,
        }
    }

    pub(crate) fn node(&self, id: NodeId) -> &ArenaNode {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut ArenaNode {
        &mut self.nodes[id.0]
    }

    pub(crate) fn append(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ArenaNode {
            data,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub(crate) fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != id);
        }
    }

    /// Returns true if `id` is still reachable from the root.
    pub(crate) fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == NodeId::ROOT {
                return true;
            }
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub(crate) fn element_name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Element name without its prefix; selectors match on this.
    pub(crate) fn local_element_name(&self, id: NodeId) -> Option<&str> {
        self.element_name(id).map(local_name)
    }

    /// Concatenated direct text children of a node.
    pub(crate) fn text_content(&self, id: NodeId) -> String {
        let mut text = String::new();
        for child in &self.nodes[id.0].children {
            if let NodeData::Text(t) = &self.nodes[child.0].data {
                text.push_str(t);
            }
        }
        text
    }

    /// Replaces all children of an element with one text node.
    pub(crate) fn set_text_content(&mut self, id: NodeId, value: &str) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
        if !value.is_empty() {
            self.append(id, NodeData::Text(value.to_string()));
        }
    }
}

/// An in-memory XML document with cheap shared handles.
///
/// Cloning a `DomDocument` clones the handle, not the tree.
#[derive(Debug, Clone)]
pub struct DomDocument {
    pub(crate) arena: Rc<RefCell<Arena>>,
}

impl Default for DomDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl DomDocument {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self {
            arena: Rc::new(RefCell::new(Arena::new())),
        }
    }

    /// Parses markup into a new document.
    ///
    /// Whitespace-only text outside the document element is dropped.
    /// Comments, processing instructions, the DOCTYPE and the declaration
    /// are kept and written back.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);

        let mut arena = Arena::new();
        let mut stack = vec![NodeId::ROOT];

        loop {
            let parent = *stack.last().ok_or_else(|| unbalanced(&reader))?;
            match reader.read_event()? {
                Event::Start(e) => {
                    let id = append_element(&mut arena, parent, &e)?;
                    stack.push(id);
                }
                Event::Empty(e) => {
                    append_element(&mut arena, parent, &e)?;
                }
                Event::End(_) => {
                    if stack.len() <= 1 {
                        return Err(unbalanced(&reader));
                    }
                    stack.pop();
                }
                Event::Text(text) => {
                    let text = String::from_utf8_lossy(text.as_ref()).to_string();
                    append_text(&mut arena, parent, &text)?;
                }
                Event::CData(data) => {
                    let text = String::from_utf8_lossy(data.as_ref()).to_string();
                    append_text(&mut arena, parent, &text)?;
                }
                Event::GeneralRef(reference) => {
                    let name = String::from_utf8_lossy(reference.as_ref()).to_string();
                    let text = resolve_entity(&name)?;
                    append_text(&mut arena, parent, &text)?;
                }
                Event::Comment(comment) => {
                    arena.append(parent, NodeData::Comment(lossy(&comment)));
                }
                Event::PI(instruction) => {
                    arena.append(parent, NodeData::Instruction(lossy(&instruction)));
                }
                Event::DocType(doctype) => {
                    arena.append(parent, NodeData::DocType(lossy(&doctype)));
                }
                Event::Decl(decl) => arena.declaration = Some(lossy(&decl)),
                Event::Eof => break,
            }
        }

        if stack.len() != 1 {
            return Err(NodeError::Parse("unexpected end of document".to_string()));
        }

        Ok(Self {
            arena: Rc::new(RefCell::new(arena)),
        })
    }

    /// Handle to the document root.
    pub fn root(&self) -> DomNode {
        DomNode::new(self.clone(), NodeId::ROOT)
    }

    /// Handle to the document element, if present.
    pub fn document_element(&self) -> Option<DomNode> {
        let arena = self.arena.borrow();
        arena
            .node(NodeId::ROOT)
            .children
            .iter()
            .copied()
            .find(|id| arena.element_name(*id).is_some())
            .map(|id| DomNode::new(self.clone(), id))
    }

    /// Writes the document as markup.
    ///
    /// A parsed declaration is written back as it was; new documents get
    /// a UTF-8 declaration.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        let arena = self.arena.borrow();
        let declaration = match &arena.declaration {
            Some(raw) => BytesDecl::from_start(BytesStart::from_content(raw.as_str(), 3)),
            None => BytesDecl::new("1.0", Some("UTF-8"), None),
        };
        writer.write_event(Event::Decl(declaration))?;

        for child in &arena.node(NodeId::ROOT).children {
            write_node(&arena, *child, &mut writer)?;
        }

        let bytes = writer.into_inner().into_inner();
        String::from_utf8(bytes).map_err(|e| NodeError::Parse(format!("invalid UTF-8: {}", e)))
    }

    /// Returns true if both handles share the same tree.
    pub fn same_document(&self, other: &DomDocument) -> bool {
        Rc::ptr_eq(&self.arena, &other.arena)
    }
}

/// Local part of a qualified name.
pub(crate) fn local_name(qualified: &str) -> &str {
    qualified
        .rsplit_once(':')
        .map_or(qualified, |(_, local)| local)
}

/// True for `xmlns` and `xmlns:*` attributes.
pub(crate) fn is_namespace_declaration(key: &str) -> bool {
    key == "xmlns" || key.starts_with("xmlns:")
}

/// Attribute selection skips namespace declarations and ignores prefixes.
pub(crate) fn attribute_matches(key: &str, name: &str) -> bool {
    !is_namespace_declaration(key) && local_name(key) == name
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn unbalanced(reader: &Reader<&[u8]>) -> NodeError {
    NodeError::Parse(format!(
        "unbalanced end tag at byte {}",
        reader.buffer_position()
    ))
}

fn append_element(arena: &mut Arena, parent: NodeId, e: &BytesStart<'_>) -> Result<NodeId> {
    if parent == NodeId::ROOT
        && arena
            .node(NodeId::ROOT)
            .children
            .iter()
            .any(|id| arena.element_name(*id).is_some())
    {
        return Err(NodeError::Parse(
            "document has more than one document element".to_string(),
        ));
    }

    let name = lossy(e.name().as_ref());
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = lossy(attr.key.as_ref());
        let raw = String::from_utf8_lossy(&attr.value).to_string();
        let value = quick_xml::escape::unescape(&raw)
            .map_err(|e| NodeError::Parse(format!("invalid attribute value '{}': {}", raw, e)))?
            .into_owned();
        attributes.push((key, value));
    }

    Ok(arena.append(parent, NodeData::Element { name, attributes }))
}

fn append_text(arena: &mut Arena, parent: NodeId, text: &str) -> Result<()> {
    let blank = text.trim().is_empty();
    if parent == NodeId::ROOT {
        if blank {
            return Ok(());
        }
        return Err(NodeError::Parse(
            "text outside of the document element".to_string(),
        ));
    }

    // Entity references arrive as separate events; merge adjacent text.
    if let Some(last) = arena.node(parent).children.last().copied() {
        if let NodeData::Text(existing) = &mut arena.node_mut(last).data {
            existing.push_str(text);
            return Ok(());
        }
    }
    arena.append(parent, NodeData::Text(text.to_string()));
    Ok(())
}

fn resolve_entity(name: &str) -> Result<String> {
    let resolved = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x") {
                u32::from_str_radix(hex, 16).ok()
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok()
            } else {
                None
            };
            code.and_then(char::from_u32)
        }
    };

    resolved
        .map(|c| c.to_string())
        .ok_or_else(|| NodeError::Parse(format!("unknown entity reference '&{};'", name)))
}

fn write_node(arena: &Arena, id: NodeId, writer: &mut Writer<Cursor<Vec<u8>>>) -> Result<()> {
    let node = arena.node(id);
    match &node.data {
        NodeData::Root => {
            for child in &node.children {
                write_node(arena, *child, writer)?;
            }
        }
        NodeData::Text(text) => {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        NodeData::Comment(raw) => {
            writer.write_event(Event::Comment(BytesText::from_escaped(raw.as_str())))?;
        }
        NodeData::Instruction(raw) => {
            writer.write_event(Event::PI(BytesPI::new(raw.as_str())))?;
        }
        NodeData::DocType(raw) => {
            writer.write_event(Event::DocType(BytesText::from_escaped(raw.as_str())))?;
        }
        NodeData::Element { name, attributes } => {
            let mut element = BytesStart::new(name.as_str());
            for (key, value) in attributes {
                let escaped = escape_attribute(value);
                element.push_attribute(Attribute {
                    key: QName(key.as_bytes()),
                    value: escaped.into_bytes().into(),
                });
            }
            if node.children.is_empty() {
                writer.write_event(Event::Empty(element))?;
            } else {
                writer.write_event(Event::Start(element))?;
                for child in &node.children {
                    write_node(arena, *child, writer)?;
                }
                writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
            }
        }
    }
    Ok(())
}

/// Escapes an attribute value so parsers do not normalize its whitespace.
fn escape_attribute(value: &str) -> String {
    quick_xml::escape::escape(value)
        .replace('\t', "&#9;")
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
}
