//! Disposer handles returned by every component `setup`.

use std::fmt;
use std::rc::Rc;

use super::{ElementRef, ListenerId, ObserverId, SharedEnv};

/// Undoes what a component attached: listeners, observers, created
/// elements and any custom disposer such as stopping timers.
///
/// Disposers run in reverse registration order.
#[must_use = "a component stays attached until its Teardown is run"]
#[derive(Default)]
pub struct Teardown {
    disposers: Vec<Box<dyn FnOnce()>>,
}

impl Teardown {
    /// Empty teardown (what a skipped component returns).
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an arbitrary disposer.
    pub fn push(&mut self, disposer: impl FnOnce() + 'static) {
        self.disposers.push(Box::new(disposer));
    }

    /// Detach `id` on teardown.
    pub fn listener(&mut self, env: &SharedEnv, id: ListenerId) {
        let env = Rc::clone(env);
        self.push(move || env.unlisten(id));
    }

    /// Disconnect `id` on teardown.
    pub fn observer(&mut self, env: &SharedEnv, id: ObserverId) {
        let env = Rc::clone(env);
        self.push(move || env.disconnect(id));
    }

    /// Remove a created element on teardown.
    pub fn element(&mut self, env: &SharedEnv, el: ElementRef) {
        let env = Rc::clone(env);
        self.push(move || env.remove_element(el));
    }

    /// Take over every disposer of `other`.
    pub fn merge(&mut self, other: Self) {
        self.disposers.extend(other.disposers);
    }

    /// Number of pending disposers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.disposers.len()
    }

    /// Whether nothing was attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.disposers.is_empty()
    }

    /// Detach everything.
    pub fn run(self) {
        for disposer in self.disposers.into_iter().rev() {
            disposer();
        }
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Teardown")
            .field("disposers", &self.disposers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[test]
    fn runs_in_reverse_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut first = Teardown::new();
        let l = Rc::clone(&log);
        first.push(move || l.borrow_mut().push(1));
        let mut second = Teardown::new();
        let l = Rc::clone(&log);
        second.push(move || l.borrow_mut().push(2));
        first.merge(second);

        assert_eq!(first.len(), 2);
        first.run();
        assert_eq!(*log.borrow(), vec![2, 1]);
    }
}
