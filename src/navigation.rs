//! Site navigation: mobile menu, smooth nav links and the active-section
//! highlight.

use std::rc::Rc;

use crate::env::{
    DomEvent, ElementRef, EventKind, SharedEnv, Target, Teardown,
    VisibilityEntry,
};
use crate::options::NavigationOptions;
use crate::scroll;

const NAV: &str = ".nav";
const NAV_LIST: &str = ".nav__list";
const NAV_TOGGLE: &str = ".nav__toggle";
const NAV_LINK: &str = ".nav__link";
const SECTIONS: &str = "section[id]";

const LIST_OPEN: &str = "nav__list--open";
const TOGGLE_OPEN: &str = "nav__toggle--open";
const BODY_OPEN: &str = "nav-open";
const LINK_ACTIVE: &str = "nav__link--active";

/// Elements the navigation works on. Everything is optional; missing
/// pieces disable the behavior that needs them.
struct Navigation {
    env: SharedEnv,
    nav: Option<ElementRef>,
    list: Option<ElementRef>,
    toggle: Option<ElementRef>,
    links: Vec<ElementRef>,
}

impl Navigation {
    fn is_open(&self) -> bool {
        self.list.is_some_and(|list| self.env.has_class(list, LIST_OPEN))
    }

    fn close(&self) {
        self.set_open(false);
    }

    fn toggle_menu(&self) {
        self.set_open(!self.is_open());
    }

    fn set_open(&self, open: bool) {
        let env = &self.env;
        let parts = [
            (self.list, LIST_OPEN),
            (self.toggle, TOGGLE_OPEN),
            (env.body(), BODY_OPEN),
        ];
        for (el, class) in parts {
            let Some(el) = el else { continue };
            if open {
                env.add_class(el, class);
            } else {
                env.remove_class(el, class);
            }
        }
    }

    fn on_link_click(
        &self,
        link: ElementRef,
        header_offset: f64,
        event: &DomEvent,
    ) {
        event.prevent_default();
        let Some(href) = self.env.attribute(link, "href") else {
            return;
        };
        if scroll::scroll_to_selector(&self.env, &href, header_offset) {
            self.close();
        }
    }

    fn highlight(&self, entries: &[VisibilityEntry]) {
        for entry in entries.iter().filter(|e| e.is_intersecting) {
            let Some(id) = self.env.attribute(entry.target, "id") else {
                continue;
            };
            for &link in &self.links {
                self.env.remove_class(link, LINK_ACTIVE);
            }
            if let Some(active) = self.env.query(&format!("[href=\"#{id}\"]")) {
                self.env.add_class(active, LINK_ACTIVE);
            }
        }
    }
}

/// Attach the mobile menu, link scrolling and section tracking.
pub fn setup(env: &SharedEnv, options: &NavigationOptions) -> Teardown {
    let nav = Rc::new(Navigation {
        env: SharedEnv::clone(env),
        nav: env.query(NAV),
        list: env.query(NAV_LIST),
        toggle: env.query(NAV_TOGGLE),
        links: env.query_all(NAV_LINK),
    });

    let mut teardown = Teardown::new();
    for &link in &nav.links {
        let n = Rc::clone(&nav);
        let header_offset = options.header_offset;
        let id = env.listen(
            Target::Element(link),
            EventKind::Click,
            Box::new(move |event| n.on_link_click(link, header_offset, event)),
        );
        teardown.listener(env, id);
    }

    let sections = env.query_all(SECTIONS);
    if !sections.is_empty() {
        let n = Rc::clone(&nav);
        let observer = env.observe(
            &options.section_observer,
            &sections,
            Box::new(move |entries| n.highlight(entries)),
        );
        teardown.observer(env, observer);
    }

    teardown.merge(setup_mobile_menu(env, &nav));
    teardown
}

fn setup_mobile_menu(env: &SharedEnv, nav: &Rc<Navigation>) -> Teardown {
    let mut teardown = Teardown::new();
    let Some(toggle) = nav.toggle else {
        log::debug!("mobile menu disabled: no {NAV_TOGGLE}");
        return teardown;
    };

    let n = Rc::clone(nav);
    let id = env.listen(
        Target::Element(toggle),
        EventKind::Click,
        Box::new(move |_| n.toggle_menu()),
    );
    teardown.listener(env, id);

    let n = Rc::clone(nav);
    let id = env.listen(
        Target::Document,
        EventKind::Click,
        Box::new(move |event| {
            let inside = match (n.nav, event.target) {
                (Some(nav), Some(target)) => n.env.contains(nav, target),
                _ => false,
            };
            if !inside {
                n.close();
            }
        }),
    );
    teardown.listener(env, id);

    let n = Rc::clone(nav);
    let id = env.listen(
        Target::Document,
        EventKind::KeyDown,
        Box::new(move |event| {
            if event.key.as_deref() == Some("Escape") {
                n.close();
            }
        }),
    );
    teardown.listener(env, id);
    teardown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{Dom, HeadlessEnv, Viewport};

    struct Page {
        env: Rc<HeadlessEnv>,
        list: ElementRef,
        toggle: ElementRef,
        links: Vec<ElementRef>,
        sections: Vec<ElementRef>,
        outside: ElementRef,
        teardown: Teardown,
    }

    fn page() -> Page {
        let env = Rc::new(HeadlessEnv::new());
        let header =
            env.add_element(env.root(), "header", &[("class", "site-header")]);
        let nav = env.add_element(header, "nav", &[("class", "nav")]);
        let toggle =
            env.add_element(nav, "button", &[("class", "nav__toggle")]);
        let list = env.add_element(nav, "ul", &[("class", "nav__list")]);
        let links = ["#details", "#agenda", "#register"]
            .into_iter()
            .map(|href| {
                let item = env.add_element(list, "li", &[]);
                env.add_element(
                    item,
                    "a",
                    &[("class", "nav__link"), ("href", href)],
                )
            })
            .collect();
        let sections = ["details", "agenda", "register"]
            .into_iter()
            .enumerate()
            .map(|(i, id)| {
                let s = env.add_element(env.root(), "section", &[("id", id)]);
                env.set_offset_top(s, 600.0 * (i + 1) as f64);
                s
            })
            .collect();
        let outside = env.add_element(env.root(), "p", &[]);
        let shared: SharedEnv = env.clone();
        let teardown = setup(&shared, &NavigationOptions::default());
        Page {
            env,
            list,
            toggle,
            links,
            sections,
            outside,
            teardown,
        }
    }

    impl Page {
        fn is_open(&self) -> bool {
            self.env.has_class(self.list, LIST_OPEN)
        }

        fn active(&self) -> Vec<ElementRef> {
            self.env.query_all(".nav__link--active")
        }
    }

    #[test]
    fn toggle_opens_and_closes() {
        let p = page();
        p.env.click(p.toggle);
        assert!(p.is_open());
        assert!(p.env.has_class(p.toggle, TOGGLE_OPEN));
        assert!(p.env.has_class(p.env.root(), BODY_OPEN));

        p.env.click(p.toggle);
        assert!(!p.is_open());
        assert!(!p.env.has_class(p.toggle, TOGGLE_OPEN));
        assert!(!p.env.has_class(p.env.root(), BODY_OPEN));
    }

    #[test]
    fn outside_click_and_escape_close() {
        let p = page();
        p.env.click(p.toggle);
        p.env.click(p.outside);
        assert!(!p.is_open());

        p.env.click(p.toggle);
        p.env.press_key("Enter");
        assert!(p.is_open());
        p.env.press_key("Escape");
        assert!(!p.is_open());
    }

    #[test]
    fn link_click_scrolls_under_header_and_closes_menu() {
        let p = page();
        p.env.click(p.toggle);
        p.env.click(p.links[1]);
        assert_eq!(p.env.scroll_y(), 1120.0);
        assert!(!p.is_open());
    }

    #[test]
    fn intersecting_section_activates_its_link() {
        let p = page();
        p.env.set_visibility(p.sections[0], 0.5);
        assert_eq!(p.active(), vec![p.links[0]]);

        p.env.set_visibility(p.sections[2], 0.4);
        assert_eq!(p.active(), vec![p.links[2]]);

        // Below the threshold does not count.
        p.env.set_visibility(p.sections[1], 0.2);
        assert_eq!(p.active(), vec![p.links[2]]);
    }

    #[test]
    fn teardown_detaches_everything() {
        let p = page();
        let Page { env, teardown, toggle, sections, .. } = p;
        teardown.run();
        assert_eq!(env.listener_count(), 0);
        assert!(!env.is_observed(sections[0]));
        env.click(toggle);
        assert!(!env.has_class(toggle, TOGGLE_OPEN));
    }

    #[test]
    fn works_without_a_menu() {
        let env = Rc::new(HeadlessEnv::new());
        let link = env.add_element(
            env.root(),
            "a",
            &[("class", "nav__link"), ("href", "#x")],
        );
        let target = env.add_element(env.root(), "section", &[("id", "x")]);
        env.set_offset_top(target, 400.0);
        let shared: SharedEnv = env.clone();
        let _teardown = setup(&shared, &NavigationOptions::default());

        env.click(link);
        assert_eq!(env.scroll_y(), 320.0);
    }
}
