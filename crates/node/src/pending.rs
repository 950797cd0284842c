//! Pending positions: nodes that are created on first write.
//!
//! When a cursor is saved before it matched anything, the caller still gets
//! a usable handle. Reads through it report no value and empty selections;
//! the first write creates the node in its parent and binds the handle to it.
//! Pending nodes nest, so writing below a pending node realizes the whole
//! chain top-down.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::capability::NodeCapability;
use crate::error::{NodeError, Result};
use crate::node::{NodeKind, Selector, SelectorKind, XmlCursor, XmlNode};
use crate::xpath::{CompiledXPath, XPathValue};

struct PendingState {
    parent: Rc<dyn XmlNode>,
    selector: Selector,
    realized: RefCell<Option<Rc<dyn XmlNode>>>,
}

impl PendingState {
    fn realized(&self) -> Option<Rc<dyn XmlNode>> {
        self.realized.borrow().clone()
    }

    fn realize(&self) -> Result<Rc<dyn XmlNode>> {
        if let Some(node) = self.realized() {
            return Ok(node);
        }

        let mut cursor = self.parent.select(&self.selector)?;
        let node = if cursor.move_next() {
            cursor.current().ok_or(NodeError::NoCurrentNode)?
        } else {
            cursor.create()?
        };
        tracing::trace!(selector = %self.selector, "realized pending node");
        *self.realized.borrow_mut() = Some(node.clone());
        Ok(node)
    }
}

/// A node that does not exist yet.
#[derive(Clone)]
pub struct PendingNode {
    state: Rc<PendingState>,
}

impl PendingNode {
    /// Creates a pending node for the first match of `selector` below `parent`.
    pub fn new(parent: Rc<dyn XmlNode>, selector: Selector) -> Self {
        Self {
            state: Rc::new(PendingState {
                parent,
                selector,
                realized: RefCell::new(None),
            }),
        }
    }

    /// Returns true once a write has created the node.
    pub fn is_realized(&self) -> bool {
        self.state.realized.borrow().is_some()
    }

    /// Creates the node now if it does not exist yet.
    pub fn realize(&self) -> Result<Rc<dyn XmlNode>> {
        self.state.realize()
    }
}

impl fmt::Debug for PendingNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingNode")
            .field("selector", &self.state.selector)
            .field("realized", &self.is_realized())
            .finish()
    }
}

impl XmlNode for PendingNode {
    fn kind(&self) -> NodeKind {
        match self.state.realized() {
            Some(node) => node.kind(),
            None => match self.state.selector.kind() {
                SelectorKind::Element => NodeKind::Element,
                SelectorKind::Attribute => NodeKind::Attribute,
            },
        }
    }

    fn exists(&self) -> bool {
        self.is_realized()
    }

    fn name(&self) -> Option<String> {
        match self.state.realized() {
            Some(node) => node.name(),
            None => Some(self.state.selector.create_name().to_string()),
        }
    }

    fn value(&self) -> Result<Option<String>> {
        match self.state.realized() {
            Some(node) => node.value(),
            None => Ok(None),
        }
    }

    fn set_value(&self, value: &str) -> Result<()> {
        self.state.realize()?.set_value(value)
    }

    fn select(&self, selector: &Selector) -> Result<Box<dyn XmlCursor>> {
        match self.state.realized() {
            Some(node) => node.select(selector),
            None => Ok(Box::new(PendingCursor {
                owner: self.clone(),
                selector: selector.clone(),
                inner: None,
            })),
        }
    }

    fn select_xpath(&self, path: &CompiledXPath) -> Result<Box<dyn XmlCursor>> {
        match self.state.realized() {
            Some(node) => node.select_xpath(path),
            None if self.supports(NodeCapability::XPath) => {
                Ok(Box::new(NodeListCursor::new(Vec::new())))
            }
            None => Err(NodeError::unsupported(NodeCapability::XPath)),
        }
    }

    fn evaluate_xpath(&self, path: &CompiledXPath) -> Result<XPathValue> {
        match self.state.realized() {
            Some(node) => node.evaluate_xpath(path),
            None if self.supports(NodeCapability::XPath) => Ok(XPathValue::Nodes(Vec::new())),
            None => Err(NodeError::unsupported(NodeCapability::XPath)),
        }
    }

    fn remove(&self) -> Result<()> {
        let realized = self.state.realized.borrow_mut().take();
        if let Some(node) = realized {
            node.remove()?;
        }
        Ok(())
    }

    fn capabilities(&self) -> &'static [NodeCapability] {
        self.state.parent.capabilities()
    }
}

/// Cursor opened below a pending node.
///
/// Matches nothing until the owner is realized; `create` realizes it.
#[derive(Debug)]
struct PendingCursor {
    owner: PendingNode,
    selector: Selector,
    inner: Option<Box<dyn XmlCursor>>,
}

impl PendingCursor {
    fn attach(&mut self) -> Result<()> {
        if self.inner.is_none() {
            if let Some(node) = self.owner.state.realized() {
                self.inner = Some(node.select(&self.selector)?);
            }
        }
        Ok(())
    }
}

impl XmlCursor for PendingCursor {
    fn move_next(&mut self) -> bool {
        if self.attach().is_err() {
            return false;
        }
        match self.inner.as_mut() {
            Some(inner) => inner.move_next(),
            None => false,
        }
    }

    fn current(&self) -> Option<Rc<dyn XmlNode>> {
        self.inner.as_ref().and_then(|inner| inner.current())
    }

    fn create(&mut self) -> Result<Rc<dyn XmlNode>> {
        self.owner.realize()?;
        self.attach()?;
        match self.inner.as_mut() {
            Some(inner) => inner.create(),
            None => Err(NodeError::Detached),
        }
    }

    fn remove(&mut self) -> Result<()> {
        match self.inner.as_mut() {
            Some(inner) => inner.remove(),
            None => Err(NodeError::NoCurrentNode),
        }
    }

    fn save(&self) -> Rc<dyn XmlNode> {
        match self.inner.as_ref() {
            Some(inner) => inner.save(),
            None => Rc::new(PendingNode::new(
                Rc::new(self.owner.clone()),
                self.selector.clone(),
            )),
        }
    }
}

/// Cursor over a fixed list of nodes, such as an XPath node-set.
///
/// Creation is not possible: the nodes were computed, not selected by name.
#[derive(Debug)]
pub struct NodeListCursor {
    nodes: Vec<Rc<dyn XmlNode>>,
    next: usize,
    current: Option<usize>,
}

impl NodeListCursor {
    /// Creates a cursor positioned before the first node.
    pub fn new(nodes: Vec<Rc<dyn XmlNode>>) -> Self {
        Self {
            nodes,
            next: 0,
            current: None,
        }
    }
}

impl XmlCursor for NodeListCursor {
    fn move_next(&mut self) -> bool {
        if self.next < self.nodes.len() {
            self.current = Some(self.next);
            self.next += 1;
            true
        } else {
            self.current = None;
            false
        }
    }

    fn current(&self) -> Option<Rc<dyn XmlNode>> {
        self.current.map(|index| self.nodes[index].clone())
    }

    fn create(&mut self) -> Result<Rc<dyn XmlNode>> {
        Err(NodeError::ComputedSelection)
    }

    fn remove(&mut self) -> Result<()> {
        let index = self.current.take().ok_or(NodeError::NoCurrentNode)?;
        self.nodes[index].remove()
    }

    fn save(&self) -> Rc<dyn XmlNode> {
        match self.current() {
            Some(node) => node,
            None => Rc::new(DetachedNode),
        }
    }
}

/// A handle that refers to nothing; every write fails.
#[derive(Debug, Clone, Copy)]
pub struct DetachedNode;

impl XmlNode for DetachedNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Element
    }

    fn exists(&self) -> bool {
        false
    }

    fn name(&self) -> Option<String> {
        None
    }

    fn value(&self) -> Result<Option<String>> {
        Ok(None)
    }

    fn set_value(&self, _value: &str) -> Result<()> {
        Err(NodeError::Detached)
    }

    fn select(&self, _selector: &Selector) -> Result<Box<dyn XmlCursor>> {
        Ok(Box::new(NodeListCursor::new(Vec::new())))
    }

    fn remove(&self) -> Result<()> {
        Ok(())
    }

    fn capabilities(&self) -> &'static [NodeCapability] {
        &[NodeCapability::Navigation]
    }
}
