//! Observable collections.
//!
//! An [`ObservableList`] notifies subscribers after every mutation made
//! through its own API. Listeners run synchronously on the mutating call,
//! after the list has released its internal borrow, so a listener may read
//! the list or write it back into an adapted object.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::value::PropertyValue;

/// What happened to an [`ObservableList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListChange {
    /// An item was inserted at the index.
    ItemAdded(usize),
    /// The item at the index was removed.
    ItemDeleted(usize),
    /// An item moved between two indices.
    ItemMoved { from: usize, to: usize },
    /// The item at the index was replaced.
    ItemChanged(usize),
    /// The whole list changed.
    Reset,
}

impl ListChange {
    /// Returns true for changes to the shape of the list.
    pub fn is_structural(&self) -> bool {
        !matches!(self, ListChange::ItemChanged(_))
    }
}

type Listener = Rc<dyn Fn(&ObservableList, ListChange) -> Result<()>>;

struct ListState {
    items: RefCell<Vec<PropertyValue>>,
    listeners: RefCell<Vec<Listener>>,
}

/// A shared list of property values with change notification.
///
/// Clones share storage and subscribers.
#[derive(Clone)]
pub struct ObservableList {
    state: Rc<ListState>,
}

impl Default for ObservableList {
    fn default() -> Self {
        Self::new()
    }
}

impl ObservableList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::from_items(Vec::new())
    }

    /// Creates a list holding `items`.
    pub fn from_items(items: Vec<PropertyValue>) -> Self {
        Self {
            state: Rc::new(ListState {
                items: RefCell::new(items),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    /// A snapshot of the items.
    pub fn items(&self) -> Vec<PropertyValue> {
        self.state.items.borrow().clone()
    }

    /// The item at `index`.
    pub fn get(&self, index: usize) -> Option<PropertyValue> {
        self.state.items.borrow().get(index).cloned()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.state.items.borrow().len()
    }

    /// True if the list has no items.
    pub fn is_empty(&self) -> bool {
        self.state.items.borrow().is_empty()
    }

    /// Appends an item.
    pub fn push(&self, item: PropertyValue) -> Result<()> {
        let index = {
            let mut items = self.state.items.borrow_mut();
            items.push(item);
            items.len() - 1
        };
        self.notify(ListChange::ItemAdded(index))
    }

    /// Inserts an item, clamping `index` to the list length.
    pub fn insert(&self, index: usize, item: PropertyValue) -> Result<()> {
        let index = {
            let mut items = self.state.items.borrow_mut();
            let index = index.min(items.len());
            items.insert(index, item);
            index
        };
        self.notify(ListChange::ItemAdded(index))
    }

    /// Removes and returns the item at `index`; out of range is a no-op.
    pub fn remove(&self, index: usize) -> Result<Option<PropertyValue>> {
        let removed = {
            let mut items = self.state.items.borrow_mut();
            if index < items.len() {
                Some(items.remove(index))
            } else {
                None
            }
        };
        if removed.is_some() {
            self.notify(ListChange::ItemDeleted(index))?;
        }
        Ok(removed)
    }

    /// Moves the item at `from` to position `to`.
    pub fn move_item(&self, from: usize, to: usize) -> Result<()> {
        let moved = {
            let mut items = self.state.items.borrow_mut();
            if from < items.len() && to < items.len() && from != to {
                let item = items.remove(from);
                items.insert(to, item);
                true
            } else {
                false
            }
        };
        if moved {
            self.notify(ListChange::ItemMoved { from, to })?;
        }
        Ok(())
    }

    /// Replaces the item at `index`, returning the old one.
    pub fn replace(&self, index: usize, item: PropertyValue) -> Result<Option<PropertyValue>> {
        let old = {
            let mut items = self.state.items.borrow_mut();
            items
                .get_mut(index)
                .map(|slot| std::mem::replace(slot, item))
        };
        if old.is_some() {
            self.notify(ListChange::ItemChanged(index))?;
        }
        Ok(old)
    }

    /// Removes every item.
    pub fn clear(&self) -> Result<()> {
        self.state.items.borrow_mut().clear();
        self.notify(ListChange::Reset)
    }

    /// Registers a listener called after every change.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&ObservableList, ListChange) -> Result<()> + 'static,
    {
        self.state.listeners.borrow_mut().push(Rc::new(listener));
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.state.listeners.borrow().len()
    }

    /// Returns true if both handles share storage.
    pub fn ptr_eq(&self, other: &ObservableList) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    fn notify(&self, change: ListChange) -> Result<()> {
        let listeners: Vec<Listener> = self.state.listeners.borrow().clone();
        for listener in listeners {
            listener(self, change)?;
        }
        Ok(())
    }
}

impl PartialEq for ObservableList {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.state.items.borrow() == *other.state.items.borrow()
    }
}

impl fmt::Debug for ObservableList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.state.items.borrow().iter()).finish()
    }
}

impl From<Vec<PropertyValue>> for ObservableList {
    fn from(items: Vec<PropertyValue>) -> Self {
        Self::from_items(items)
    }
}
