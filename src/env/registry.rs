//! Handle registry for environments backed by live DOM nodes.
//!
//! Every interned node remembers its own handle, so lookups never scan
//! and removed nodes can be forgotten.

use std::cell::{Cell, RefCell};

use rustc_hash::FxHashMap;

use super::ElementRef;

/// A node that can carry its registry handle.
pub(crate) trait HandleSlot: Clone {
    /// Handle stored on the node, if any.
    fn handle(&self) -> Option<u32>;
    /// Store `raw` on the node, or clear it with `None`.
    fn set_handle(&self, raw: Option<u32>);
}

/// Interned nodes keyed by [`ElementRef`].
pub(crate) struct Registry<E> {
    elements: RefCell<FxHashMap<u32, E>>,
    next: Cell<u32>,
}

impl<E> Default for Registry<E> {
    fn default() -> Self {
        Self {
            elements: RefCell::default(),
            next: Cell::new(0),
        }
    }
}

impl<E: HandleSlot> Registry<E> {
    /// Handle for `el`, reusing the one it already carries.
    pub(crate) fn intern(&self, el: E) -> ElementRef {
        let known = el
            .handle()
            .filter(|raw| self.elements.borrow().contains_key(raw));
        if let Some(raw) = known {
            return ElementRef::from_raw(raw);
        }
        let raw = self.next.get();
        self.next.set(raw + 1);
        el.set_handle(Some(raw));
        let _ = self.elements.borrow_mut().insert(raw, el);
        ElementRef::from_raw(raw)
    }

    pub(crate) fn get(&self, el: ElementRef) -> Option<E> {
        self.elements.borrow().get(&el.raw()).cloned()
    }

    /// Forget `el`, returning the node it named.
    pub(crate) fn evict(&self, el: ElementRef) -> Option<E> {
        let element = self.elements.borrow_mut().remove(&el.raw())?;
        element.set_handle(None);
        Some(element)
    }

    pub(crate) fn len(&self) -> usize {
        self.elements.borrow().len()
    }
}
