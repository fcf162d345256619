//! The whole page: every behavior wired to one environment.
//!
//! ```
//! # use std::rc::Rc;
//! # use meetup::env::{HeadlessEnv, SharedEnv};
//! # use meetup::MeetupApp;
//! let env: SharedEnv = Rc::new(HeadlessEnv::new());
//! let teardown = MeetupApp::builder().build().mount(&env);
//! teardown.run();
//! ```

use std::rc::Rc;

use crate::env::{SharedEnv, Teardown};
use crate::form::Registrar;
use crate::options::PageOptions;
use crate::{countdown, form, navigation, page, reveal, scroll};

// ── Builder ──────────────────────────────────────────────────────────────

/// Fluent builder for [`MeetupApp`].
#[derive(Default)]
pub struct MeetupAppBuilder {
    options: Option<PageOptions>,
    registrar: Option<Rc<dyn Registrar>>,
}

impl MeetupAppBuilder {
    /// Override the default options.
    #[must_use]
    pub fn with_options(mut self, options: PageOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Submit registrations through `registrar` instead of the simulated
    /// one.
    #[must_use]
    pub fn with_registrar(mut self, registrar: Rc<dyn Registrar>) -> Self {
        self.registrar = Some(registrar);
        self
    }

    /// Consume the builder and produce a [`MeetupApp`].
    #[must_use]
    pub fn build(self) -> MeetupApp {
        MeetupApp {
            options: self.options.unwrap_or_default(),
            registrar: self.registrar,
        }
    }
}

// ── App ──────────────────────────────────────────────────────────────────

/// Every page behavior, configured and ready to mount.
pub struct MeetupApp {
    options: PageOptions,
    registrar: Option<Rc<dyn Registrar>>,
}

impl MeetupApp {
    /// Start a new builder.
    #[must_use]
    pub fn builder() -> MeetupAppBuilder {
        MeetupAppBuilder::default()
    }

    /// Options the app was built with.
    #[must_use]
    pub fn options(&self) -> &PageOptions {
        &self.options
    }

    /// Attach every behavior whose elements are on the page. Components
    /// whose elements are missing are skipped.
    pub fn mount(&self, env: &SharedEnv) -> Teardown {
        let o = &self.options;
        let mut teardown = Teardown::new();
        teardown.merge(navigation::setup(env, &o.navigation));
        teardown.merge(scroll::setup(env, &o.scroll));
        teardown.merge(match &self.registrar {
            Some(registrar) => {
                form::setup_with_registrar(env, &o.form, Rc::clone(registrar))
            }
            None => form::setup(env, &o.form),
        });
        teardown.merge(reveal::setup(env, &o.reveal));
        teardown.merge(page::setup(env, &o.page));
        teardown.merge(countdown::setup(env, &o.countdown));
        log::info!("meetup page mounted ({} disposers)", teardown.len());
        teardown
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use futures::future::{ready, LocalBoxFuture};

    use super::*;
    use crate::env::{Dom, ElementRef, HeadlessEnv, Viewport};
    use crate::form::{RegistrationError, RegistrationRequest};

    /// A trimmed copy of the event page.
    fn event_page(env: &HeadlessEnv) -> Vec<ElementRef> {
        let root = env.root();
        let header =
            env.add_element(root, "header", &[("class", "site-header")]);
        let nav = env.add_element(header, "nav", &[("class", "nav")]);
        let _ = env.add_element(nav, "button", &[("class", "nav__toggle")]);
        let list = env.add_element(nav, "ul", &[("class", "nav__list")]);
        for href in ["#details", "#register"] {
            let _ = env.add_element(
                list,
                "a",
                &[("class", "nav__link"), ("href", href)],
            );
        }

        let hero = env.add_element(root, "section", &[("class", "hero")]);
        let _ = env.add_element(hero, "span", &[("id", "countdown")]);
        let actions =
            env.add_element(hero, "div", &[("class", "hero__actions")]);
        let _ = env.add_element(
            actions,
            "a",
            &[("class", "btn"), ("href", "#register")],
        );

        let details = env.add_element(root, "section", &[("id", "details")]);
        env.set_offset_top(details, 800.0);
        let cards = (0..2)
            .map(|_| {
                env.add_element(details, "div", &[("class", "detail-card")])
            })
            .collect();

        let register = env.add_element(root, "section", &[("id", "register")]);
        env.set_offset_top(register, 2400.0);
        let form = env.add_element(
            register,
            "form",
            &[("id", "registrationForm"), ("class", "registration-form")],
        );
        for name in ["firstName", "lastName", "email"] {
            let group =
                env.add_element(form, "div", &[("class", "form-group")]);
            let _ = env.add_element(
                group,
                "input",
                &[("name", name), ("type", "text"), ("required", "")],
            );
        }
        let button = env.add_element(form, "button", &[("type", "submit")]);
        env.set_text(button, "Register Now");
        cards
    }

    struct Counting(Rc<Cell<usize>>);

    impl Registrar for Counting {
        fn register(
            &self,
            _request: RegistrationRequest,
        ) -> LocalBoxFuture<'static, Result<(), RegistrationError>> {
            self.0.set(self.0.get() + 1);
            Box::pin(ready(Ok(())))
        }
    }

    #[test]
    fn mounts_every_component_and_tears_down_cleanly() {
        let start = Utc.with_ymd_and_hms(2025, 11, 5, 12, 0, 0).unwrap();
        let env = Rc::new(HeadlessEnv::at(start));
        let cards = event_page(&env);
        let shared: SharedEnv = env.clone();
        let teardown = MeetupApp::builder().build().mount(&shared);

        let countdown = env.element_by_id("countdown").unwrap();
        assert_eq!(env.text(countdown), "3h 45m");
        let top = env.query(".scroll-to-top").unwrap();
        assert!(env.has_class(cards[0], "animate-on-scroll"));
        let form = env.query("#registrationForm").unwrap();
        assert!(env.has_class(form, "animate-on-scroll"));

        env.set_visibility(cards[0], 1.0);
        assert!(env.has_class(cards[0], "animate-in"));
        env.scroll_window_to(400.0);
        assert!(env.has_class(top, "visible"));
        assert!(env.listener_count() > 0);
        assert!(env.pending_timers() > 0);

        teardown.run();
        assert_eq!(env.listener_count(), 0);
        assert_eq!(env.pending_timers(), 0);
        assert!(!env.is_attached(top));
        assert!(!env.is_observed(cards[1]));
    }

    #[test]
    fn nav_link_scrolls_under_header() {
        let env = Rc::new(HeadlessEnv::new());
        let _ = event_page(&env);
        let shared: SharedEnv = env.clone();
        let _teardown = MeetupApp::builder().build().mount(&shared);

        let link = env.query(".nav__link[href=\"#details\"]").unwrap();
        env.click(link);
        assert_eq!(env.scroll_y(), 720.0);
    }

    #[test]
    fn custom_registrar_receives_valid_submissions() {
        let env = Rc::new(HeadlessEnv::new());
        let _ = event_page(&env);
        let calls = Rc::new(Cell::new(0));
        let shared: SharedEnv = env.clone();
        let _teardown = MeetupApp::builder()
            .with_registrar(Rc::new(Counting(Rc::clone(&calls))))
            .build()
            .mount(&shared);

        let form = env.element_by_id("registrationForm").unwrap();
        env.submit(form);
        assert_eq!(calls.get(), 0);

        for (name, value) in [
            ("firstName", "Ada"),
            ("lastName", "Lovelace"),
            ("email", "ada@example.com"),
        ] {
            let input = env.query(&format!("input[name=\"{name}\"]")).unwrap();
            env.type_text(input, value);
        }
        env.submit(form);
        assert_eq!(calls.get(), 1);
        assert_eq!(env.query_all(".success-message").len(), 1);

        env.advance(Duration::from_secs(5));
        assert!(env.query_all(".success-message").is_empty());
    }

    #[test]
    fn options_are_kept() {
        let mut options = PageOptions::default();
        options.scroll.header_offset = 64.0;
        let app = MeetupApp::builder().with_options(options.clone()).build();
        assert_eq!(app.options(), &options);
    }
}
