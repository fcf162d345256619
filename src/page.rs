//! Page chrome: header shadow, scroll-to-top button, hero buttons and the
//! venue map link.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::env::{
    require, require_id, ElementRef, EventKind, Handler, ScrollBehavior,
    ScrollBlock, SharedEnv, Target, Teardown,
};
use crate::options::PageChromeOptions;

const HEADER: &str = ".site-header";
const HEADER_SCROLLED: &str = "scrolled";
const SCROLL_TOP_CLASS: &str = "scroll-to-top";
const SCROLL_TOP_VISIBLE: &str = "visible";
const HERO_BUTTONS: &str = ".hero__actions .btn";
const MAP: &str = ".map-placeholder";
const FIRST_TEXT_INPUT: &str = "input[type=\"text\"]";

/// Attach every page-level behavior.
pub fn setup(env: &SharedEnv, options: &PageChromeOptions) -> Teardown {
    let mut teardown = Teardown::new();
    teardown.merge(setup_header(env, options));
    teardown.merge(setup_scroll_to_top(env, options));
    teardown.merge(setup_hero_buttons(env, options));
    teardown.merge(setup_map(env, options));
    teardown
}

fn toggle_class(env: &SharedEnv, el: ElementRef, class: &str, on: bool) {
    if on {
        env.add_class(el, class);
    } else {
        env.remove_class(el, class);
    }
}

// ── Header ───────────────────────────────────────────────────────────────

fn setup_header(env: &SharedEnv, options: &PageChromeOptions) -> Teardown {
    let mut teardown = Teardown::new();
    let header = match require(env, HEADER) {
        Ok(header) => header,
        Err(e) => {
            log::debug!("header state disabled: {e}");
            return teardown;
        }
    };
    let handle = SharedEnv::clone(env);
    let after = options.header_scrolled_after;
    let id = env.listen(
        Target::Window,
        EventKind::Scroll,
        Box::new(move |_| {
            let scrolled = handle.scroll_y() > after;
            toggle_class(&handle, header, HEADER_SCROLLED, scrolled);
        }),
    );
    teardown.listener(env, id);
    teardown
}

// ── Scroll-to-top ────────────────────────────────────────────────────────

fn setup_scroll_to_top(
    env: &SharedEnv,
    options: &PageChromeOptions,
) -> Teardown {
    let mut teardown = Teardown::new();
    let Some(body) = env.body() else {
        return teardown;
    };
    let button = env.create_element("button");
    env.set_text(button, "\u{2191}");
    env.add_class(button, SCROLL_TOP_CLASS);
    env.set_attribute(button, "aria-label", "Scroll to top");
    env.append_child(body, button);
    teardown.element(env, button);

    let handle = SharedEnv::clone(env);
    let after = options.scroll_top_after;
    let id = env.listen(
        Target::Window,
        EventKind::Scroll,
        Box::new(move |_| {
            let visible = handle.scroll_y() > after;
            toggle_class(&handle, button, SCROLL_TOP_VISIBLE, visible);
        }),
    );
    teardown.listener(env, id);

    let handle = SharedEnv::clone(env);
    let id = env.listen(
        Target::Element(button),
        EventKind::Click,
        Box::new(move |_| handle.scroll_to(0.0, ScrollBehavior::Smooth)),
    );
    teardown.listener(env, id);
    teardown
}

// ── Hero buttons ─────────────────────────────────────────────────────────

fn setup_hero_buttons(
    env: &SharedEnv,
    options: &PageChromeOptions,
) -> Teardown {
    let mut teardown = Teardown::new();
    for button in env.query_all(HERO_BUTTONS) {
        let href = env.attribute(button, "href");
        let handle = SharedEnv::clone(env);
        let handler: Handler = match href.as_deref() {
            Some("#register") => {
                let delay = options.cta_focus_delay();
                Box::new(move |event| {
                    event.prevent_default();
                    let Ok(section) = require_id(&handle, "register") else {
                        return;
                    };
                    handle.scroll_into_view(section, ScrollBlock::Start);
                    let env = SharedEnv::clone(&handle);
                    let _ = handle.set_timeout(
                        delay,
                        Box::new(move || {
                            let inputs =
                                env.query_within(section, FIRST_TEXT_INPUT);
                            if let Some(&first) = inputs.first() {
                                env.focus(first);
                            }
                        }),
                    );
                })
            }
            Some("#details") => Box::new(move |event| {
                event.prevent_default();
                if let Ok(section) = require_id(&handle, "details") {
                    handle.scroll_into_view(section, ScrollBlock::Start);
                }
            }),
            _ => continue,
        };
        let id = env.listen(Target::Element(button), EventKind::Click, handler);
        teardown.listener(env, id);
    }
    teardown
}

// ── Map ──────────────────────────────────────────────────────────────────

/// Map search URL for `options.map_address`.
#[must_use]
pub fn map_url(options: &PageChromeOptions) -> String {
    format!(
        "{}{}",
        options.map_search_url,
        encode_uri_component(&options.map_address)
    )
}

/// Characters `encodeURIComponent` escapes: everything except ASCII
/// alphanumerics and `-_.!~*'()`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode `input` the way `encodeURIComponent` does, escaping
/// UTF-8 bytes with uppercase hex.
#[must_use]
pub fn encode_uri_component(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}

fn setup_map(env: &SharedEnv, options: &PageChromeOptions) -> Teardown {
    let mut teardown = Teardown::new();
    let map = match require(env, MAP) {
        Ok(map) => map,
        Err(e) => {
            log::debug!("map link disabled: {e}");
            return teardown;
        }
    };
    let handle = SharedEnv::clone(env);
    let url = map_url(options);
    let id = env.listen(
        Target::Element(map),
        EventKind::Click,
        Box::new(move |_| handle.open_url(&url, "_blank")),
    );
    teardown.listener(env, id);
    teardown
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use std::time::Duration;

    use super::*;
    use crate::env::{Dom, HeadlessEnv, Viewport};

    struct Page {
        env: Rc<HeadlessEnv>,
        header: ElementRef,
        register_btn: ElementRef,
        details_btn: ElementRef,
        register: ElementRef,
        details: ElementRef,
        first_name: ElementRef,
        map: ElementRef,
        teardown: Teardown,
    }

    fn page() -> Page {
        let env = Rc::new(HeadlessEnv::new());
        let root = env.root();
        let header =
            env.add_element(root, "header", &[("class", "site-header")]);
        let hero = env.add_element(root, "section", &[("class", "hero")]);
        let actions =
            env.add_element(hero, "div", &[("class", "hero__actions")]);
        let register_btn =
            env.add_element(
                actions,
                "a",
                &[("class", "btn btn--primary"), ("href", "#register")],
            );
        let details_btn =
            env.add_element(
                actions,
                "a",
                &[("class", "btn btn--secondary"), ("href", "#details")],
            );
        let details = env.add_element(root, "section", &[("id", "details")]);
        env.set_offset_top(details, 700.0);
        let map =
            env.add_element(details, "div", &[("class", "map-placeholder")]);
        let register = env.add_element(root, "section", &[("id", "register")]);
        env.set_offset_top(register, 2000.0);
        let _ = env.add_element(register, "input", &[("type", "email")]);
        let first_name =
            env.add_element(register, "input", &[("type", "text")]);
        let shared: SharedEnv = env.clone();
        let teardown = setup(&shared, &PageChromeOptions::default());
        Page {
            env,
            header,
            register_btn,
            details_btn,
            register,
            details,
            first_name,
            map,
            teardown,
        }
    }

    #[test]
    fn encodes_like_encode_uri_component() {
        assert_eq!(
            encode_uri_component(
                "isolutions AG, The circle 38, Kloten, Switzerland"
            ),
            "isolutions%20AG%2C%20The%20circle%2038%2C%20Kloten%2C%20\
             Switzerland"
        );
        assert_eq!(
            encode_uri_component("a-b_c.d!e~f*g'h(i)"),
            "a-b_c.d!e~f*g'h(i)"
        );
        assert_eq!(
            encode_uri_component("Zürich & co/#?"),
            "Z%C3%BCrich%20%26%20co%2F%23%3F"
        );
    }

    #[test]
    fn header_tracks_scroll_offset() {
        let p = page();
        p.env.scroll_window_to(50.0);
        assert!(!p.env.has_class(p.header, HEADER_SCROLLED));
        p.env.scroll_window_to(51.0);
        assert!(p.env.has_class(p.header, HEADER_SCROLLED));
        p.env.scroll_window_to(0.0);
        assert!(!p.env.has_class(p.header, HEADER_SCROLLED));
    }

    #[test]
    fn scroll_to_top_button() {
        let p = page();
        let button = p.env.query(".scroll-to-top").unwrap();
        assert_eq!(p.env.text(button), "\u{2191}");
        assert_eq!(
            p.env.attribute(button, "aria-label").as_deref(),
            Some("Scroll to top")
        );
        assert_eq!(
            p.env.attribute(button, "class").as_deref(),
            Some("scroll-to-top")
        );

        p.env.scroll_window_to(301.0);
        assert!(p.env.has_class(button, SCROLL_TOP_VISIBLE));
        p.env.click(button);
        assert_eq!(p.env.scroll_y(), 0.0);
        p.env.scroll_window_to(300.0);
        assert!(!p.env.has_class(button, SCROLL_TOP_VISIBLE));
    }

    #[test]
    fn register_button_scrolls_then_focuses_first_text_field() {
        let p = page();
        p.env.click(p.register_btn);
        assert_eq!(
            p.env.scrolled_into_view(),
            vec![(p.register, ScrollBlock::Start)]
        );
        assert_eq!(p.env.focused(), None);

        p.env.advance(Duration::from_millis(499));
        assert_eq!(p.env.focused(), None);
        p.env.advance(Duration::from_millis(1));
        assert_eq!(p.env.focused(), Some(p.first_name));
    }

    #[test]
    fn details_button_scrolls_into_view() {
        let p = page();
        p.env.click(p.details_btn);
        assert_eq!(
            p.env.scrolled_into_view(),
            vec![(p.details, ScrollBlock::Start)]
        );
        assert_eq!(p.env.scroll_y(), 700.0);
    }

    #[test]
    fn map_opens_search_in_new_tab() {
        let p = page();
        p.env.click(p.map);
        let expected = "https://www.google.com/maps/search/?api=1&query=\
                        isolutions%20AG%2C%20The%20circle%2038%2C%20\
                        Kloten%2C%20Switzerland";
        assert_eq!(
            p.env.opened_urls(),
            vec![(expected.to_owned(), "_blank".to_owned())]
        );
    }

    #[test]
    fn teardown_removes_button_and_listeners() {
        let p = page();
        let button = p.env.query(".scroll-to-top").unwrap();
        p.teardown.run();
        assert!(!p.env.is_attached(button));
        assert_eq!(p.env.listener_count(), 0);
    }

    #[test]
    fn missing_header_and_map_are_skipped() {
        let env = Rc::new(HeadlessEnv::new());
        let shared: SharedEnv = env.clone();
        let teardown = setup(&shared, &PageChromeOptions::default());
        // Only the scroll-to-top button listens.
        assert_eq!(env.listener_count(), 2);
        env.scroll_window_to(600.0);
        let button = env.query(".scroll-to-top").unwrap();
        assert!(env.has_class(button, SCROLL_TOP_VISIBLE));
        teardown.run();
        assert_eq!(env.listener_count(), 0);
    }
}
