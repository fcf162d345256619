//! Smooth scrolling for in-page anchors, compensating for the fixed
//! header.

use crate::env::{
    DomEvent, ElementRef, EventKind, ScrollBehavior, SharedEnv, Target,
    Teardown,
};
use crate::options::ScrollOptions;

/// Anchors handled by [`setup`].
pub const ANCHOR_SELECTOR: &str = "a[href^=\"#\"]";

/// Document offset that puts an element `element_top` pixels below the
/// viewport top just under a header of height `header_offset`.
#[must_use]
pub fn offset_position(
    element_top: f64,
    scroll_y: f64,
    header_offset: f64,
) -> f64 {
    element_top + scroll_y - header_offset
}

/// Smoothly scroll to the element `selector` resolves to. Returns `false`
/// when there is no such element.
pub fn scroll_to_selector(
    env: &SharedEnv,
    selector: &str,
    header_offset: f64,
) -> bool {
    let Some(target) = env.query(selector) else {
        return false;
    };
    scroll_to_element(env, target, header_offset);
    true
}

/// Smoothly scroll so `target` sits just under the header.
pub fn scroll_to_element(
    env: &SharedEnv,
    target: ElementRef,
    header_offset: f64,
) {
    let top =
        offset_position(env.element_top(target), env.scroll_y(), header_offset);
    log::trace!("scrolling to {top}px");
    env.scroll_to(top, ScrollBehavior::Smooth);
}

/// Attach the handler to every `href="#..."` anchor.
pub fn setup(env: &SharedEnv, options: &ScrollOptions) -> Teardown {
    let mut teardown = Teardown::new();
    for anchor in env.query_all(ANCHOR_SELECTOR) {
        let handle = SharedEnv::clone(env);
        let header_offset = options.header_offset;
        let id = env.listen(
            Target::Element(anchor),
            EventKind::Click,
            Box::new(move |event| {
                on_anchor_click(&handle, anchor, header_offset, event);
            }),
        );
        teardown.listener(env, id);
    }
    teardown
}

fn on_anchor_click(
    env: &SharedEnv,
    anchor: ElementRef,
    header_offset: f64,
    event: &DomEvent,
) {
    let Some(href) = env.attribute(anchor, "href") else {
        return;
    };
    if href == "#" {
        event.prevent_default();
        return;
    }
    // Unknown targets keep the browser's default jump.
    if scroll_to_selector(env, &href, header_offset) {
        event.prevent_default();
    }
}
