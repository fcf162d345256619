//! Fade-in of content blocks as they scroll into view.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::env::{SharedEnv, Teardown, VisibilityEntry};
use crate::options::RevealOptions;

/// Class marking a block as waiting for its reveal.
pub const PENDING_CLASS: &str = "animate-on-scroll";
/// Class applied once a block has been seen.
pub const REVEALED_CLASS: &str = "animate-in";

/// Mark every reveal target and observe it. Each block is revealed the
/// first time it becomes visible and is never observed again.
pub fn setup(env: &SharedEnv, options: &RevealOptions) -> Teardown {
    let targets = env.query_all(&options.selector_list());
    if targets.is_empty() {
        log::debug!("reveal disabled: no targets");
        return Teardown::new();
    }
    for &el in &targets {
        env.add_class(el, PENDING_CLASS);
    }

    let revealed = Rc::new(RefCell::new(FxHashSet::default()));
    let handle = SharedEnv::clone(env);
    let observer = env.observe(
        &options.observer,
        &targets,
        Box::new(move |entries: &[VisibilityEntry]| {
            for entry in entries.iter().filter(|e| e.is_intersecting) {
                if revealed.borrow_mut().insert(entry.target) {
                    handle.add_class(entry.target, REVEALED_CLASS);
                }
                handle.unobserve(entry.observer, entry.target);
            }
        }),
    );
    log::debug!("observing {} reveal targets", targets.len());

    let mut teardown = Teardown::new();
    teardown.observer(env, observer);
    teardown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{Dom, ElementRef, HeadlessEnv};

    fn page() -> (Rc<HeadlessEnv>, Vec<ElementRef>, Teardown) {
        let env = Rc::new(HeadlessEnv::new());
        let details =
            env.add_element(env.root(), "section", &[("id", "details")]);
        let cards = (0..3)
            .map(|_| {
                env.add_element(details, "div", &[("class", "detail-card")])
            })
            .collect();
        let _ = env.add_element(details, "p", &[("class", "lead")]);
        let shared: SharedEnv = env.clone();
        let teardown = setup(&shared, &RevealOptions::default());
        (env, cards, teardown)
    }

    #[test]
    fn marks_targets_only() {
        let (env, cards, _teardown) = page();
        for &card in &cards {
            assert!(env.has_class(card, PENDING_CLASS));
            assert!(env.is_observed(card));
        }
        assert_eq!(env.query_all(".animate-on-scroll").len(), 3);
    }

    #[test]
    fn reveals_once_and_stops_observing() {
        let (env, cards, _teardown) = page();
        env.set_visibility(cards[0], 0.05);
        assert!(!env.has_class(cards[0], REVEALED_CLASS));

        env.set_visibility(cards[0], 0.5);
        assert!(env.has_class(cards[0], REVEALED_CLASS));
        assert!(!env.is_observed(cards[0]));
        assert!(env.is_observed(cards[1]));

        env.set_visibility(cards[0], 0.0);
        assert!(env.has_class(cards[0], REVEALED_CLASS));
        assert!(env.has_class(cards[0], PENDING_CLASS));
    }

    #[test]
    fn teardown_disconnects() {
        let (env, cards, teardown) = page();
        teardown.run();
        assert!(!env.is_observed(cards[1]));
        env.set_visibility(cards[1], 1.0);
        assert!(!env.has_class(cards[1], REVEALED_CLASS));
    }

    #[test]
    fn no_targets_no_observer() {
        let env: SharedEnv = Rc::new(HeadlessEnv::new());
        assert!(setup(&env, &RevealOptions::default()).is_empty());
    }
}
