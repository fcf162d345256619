//! Browser environment backed by `web-sys`, and the page entry points.
//!
//! Elements are interned in a registry so behaviors can hold plain
//! [`ElementRef`] handles. Listener, interval and observer closures are
//! owned by [`WebEnv`] and dropped when the corresponding handle is
//! released.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::LocalBoxFuture;
use rustc_hash::FxHashMap;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, Element, Event, EventTarget, HtmlElement, HtmlInputElement,
    HtmlTextAreaElement, IntersectionObserver, IntersectionObserverEntry,
    IntersectionObserverInit, KeyboardEvent, Window,
};

use super::{
    Dom, DomEvent, ElementRef, EventKind, Events, Handler, ListenerId,
    ObserverConfig, ObserverId, Scheduler, ScrollBehavior, ScrollBlock,
    SharedEnv, Target, Teardown, TimerId, Viewport, Visibility,
    VisibilityCallback, VisibilityEntry,
};
use super::registry::{HandleSlot, Registry};
use crate::error::MeetupError;
use crate::options::PageOptions;
use crate::MeetupApp;

/// `id` of the `<script type="application/json">` block holding page
/// options.
pub const OPTIONS_SCRIPT_ID: &str = "meetup-options";

fn js_error(value: &JsValue) -> MeetupError {
    MeetupError::Js(value.as_string().unwrap_or_else(|| format!("{value:?}")))
}

/// Log a failed browser call and carry on.
fn check<T>(result: Result<T, JsValue>, what: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("{what}: {}", js_error(&e));
            None
        }
    }
}

// ── Element registry ─────────────────────────────────────────────────────

/// Attribute holding an interned element's handle.
const HANDLE_ATTR: &str = "data-meetup-handle";

impl HandleSlot for Element {
    fn handle(&self) -> Option<u32> {
        self.get_attribute(HANDLE_ATTR)?.parse().ok()
    }

    fn set_handle(&self, raw: Option<u32>) {
        let result = match raw {
            Some(raw) => self.set_attribute(HANDLE_ATTR, &raw.to_string()),
            None => self.remove_attribute(HANDLE_ATTR),
        };
        let _ = check(result, "handle attribute");
    }
}

// ── WebEnv ───────────────────────────────────────────────────────────────

struct Listener {
    target: EventTarget,
    kind: EventKind,
    closure: Closure<dyn FnMut(Event)>,
}

enum Timer {
    /// The callback frees itself once it has run.
    Once(i32),
    Repeat(i32, Closure<dyn FnMut()>),
}

type ObserverClosure = Closure<dyn FnMut(js_sys::Array, IntersectionObserver)>;

struct Observer {
    observer: IntersectionObserver,
    _closure: ObserverClosure,
}

/// The browser window and document.
pub struct WebEnv {
    window: Window,
    document: Document,
    registry: Rc<Registry<Element>>,
    next_id: Cell<u64>,
    listeners: RefCell<FxHashMap<ListenerId, Listener>>,
    timers: Rc<RefCell<FxHashMap<TimerId, Timer>>>,
    observers: RefCell<FxHashMap<ObserverId, Observer>>,
}

impl WebEnv {
    /// Environment for the current page.
    pub fn new() -> Result<Self, MeetupError> {
        let window = web_sys::window()
            .ok_or_else(|| MeetupError::Js("no global window".into()))?;
        let document = window
            .document()
            .ok_or_else(|| MeetupError::Js("no document".into()))?;
        Ok(Self {
            window,
            document,
            registry: Rc::default(),
            next_id: Cell::new(1),
            listeners: RefCell::default(),
            timers: Rc::default(),
            observers: RefCell::default(),
        })
    }

    /// Whether the document is still parsing.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.document.ready_state() == "loading"
    }

    /// Options from the page's [`OPTIONS_SCRIPT_ID`] block, or defaults.
    #[must_use]
    pub fn page_options(&self) -> PageOptions {
        let Some(json) = self
            .document
            .get_element_by_id(OPTIONS_SCRIPT_ID)
            .and_then(|script| script.text_content())
        else {
            return PageOptions::default();
        };
        PageOptions::from_json_str(&json).unwrap_or_else(|e| {
            log::error!("ignoring #{OPTIONS_SCRIPT_ID}: {e}");
            PageOptions::default()
        })
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn el(&self, el: ElementRef) -> Option<Element> {
        let found = self.registry.get(el);
        if found.is_none() {
            log::warn!("unknown element handle {}", el.raw());
        }
        found
    }

    fn intern_all(&self, list: &web_sys::NodeList) -> Vec<ElementRef> {
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .map(|el| self.registry.intern(el))
            .collect()
    }

    fn event_target(&self, target: Target) -> Option<EventTarget> {
        match target {
            Target::Window => Some(self.window.clone().into()),
            Target::Document => Some(self.document.clone().into()),
            Target::Element(el) => self.el(el).map(Into::into),
        }
    }
}

impl Dom for WebEnv {
    fn body(&self) -> Option<ElementRef> {
        let body: Element = self.document.body()?.into();
        Some(self.registry.intern(body))
    }

    fn element_by_id(&self, id: &str) -> Option<ElementRef> {
        let el = self.document.get_element_by_id(id)?;
        Some(self.registry.intern(el))
    }

    fn query(&self, selector: &str) -> Option<ElementRef> {
        let el = check(self.document.query_selector(selector), selector)??;
        Some(self.registry.intern(el))
    }

    fn query_all(&self, selector: &str) -> Vec<ElementRef> {
        check(self.document.query_selector_all(selector), selector)
            .map(|list| self.intern_all(&list))
            .unwrap_or_default()
    }

    fn query_within(
        &self,
        root: ElementRef,
        selector: &str,
    ) -> Vec<ElementRef> {
        self.el(root)
            .and_then(|root| check(root.query_selector_all(selector), selector))
            .map(|list| self.intern_all(&list))
            .unwrap_or_default()
    }

    fn closest(&self, el: ElementRef, selector: &str) -> Option<ElementRef> {
        let found = check(self.el(el)?.closest(selector), selector)??;
        Some(self.registry.intern(found))
    }

    fn contains(&self, ancestor: ElementRef, node: ElementRef) -> bool {
        match (self.el(ancestor), self.el(node)) {
            (Some(ancestor), Some(node)) => {
                let node: &web_sys::Node = &node;
                ancestor.contains(Some(node))
            }
            _ => false,
        }
    }

    fn attribute(&self, el: ElementRef, name: &str) -> Option<String> {
        self.el(el)?.get_attribute(name)
    }

    fn set_attribute(&self, el: ElementRef, name: &str, value: &str) {
        if let Some(el) = self.el(el) {
            let _ = check(el.set_attribute(name, value), "setAttribute");
        }
    }

    fn remove_attribute(&self, el: ElementRef, name: &str) {
        if let Some(el) = self.el(el) {
            let _ = check(el.remove_attribute(name), "removeAttribute");
        }
    }

    fn has_class(&self, el: ElementRef, class: &str) -> bool {
        self.el(el).is_some_and(|el| el.class_list().contains(class))
    }

    fn add_class(&self, el: ElementRef, class: &str) {
        if let Some(el) = self.el(el) {
            let _ = check(el.class_list().add_1(class), "classList.add");
        }
    }

    fn remove_class(&self, el: ElementRef, class: &str) {
        if let Some(el) = self.el(el) {
            let _ = check(el.class_list().remove_1(class), "classList.remove");
        }
    }

    fn text(&self, el: ElementRef) -> String {
        self.el(el)
            .and_then(|el| el.text_content())
            .unwrap_or_default()
    }

    fn set_text(&self, el: ElementRef, text: &str) {
        if let Some(el) = self.el(el) {
            el.set_text_content(Some(text));
        }
    }

    fn value(&self, el: ElementRef) -> String {
        let Some(el) = self.el(el) else {
            return String::new();
        };
        if let Some(input) = el.dyn_ref::<HtmlInputElement>() {
            input.value()
        } else if let Some(area) = el.dyn_ref::<HtmlTextAreaElement>() {
            area.value()
        } else {
            String::new()
        }
    }

    fn set_value(&self, el: ElementRef, value: &str) {
        let Some(el) = self.el(el) else {
            return;
        };
        if let Some(input) = el.dyn_ref::<HtmlInputElement>() {
            input.set_value(value);
        } else if let Some(area) = el.dyn_ref::<HtmlTextAreaElement>() {
            area.set_value(value);
        }
    }

    fn focus(&self, el: ElementRef) {
        let html = self.el(el).and_then(|el| el.dyn_into::<HtmlElement>().ok());
        if let Some(el) = html {
            let _ = check(el.focus(), "focus");
        }
    }

    fn create_element(&self, tag: &str) -> ElementRef {
        match self.document.create_element(tag) {
            Ok(el) => self.registry.intern(el),
            Err(e) => {
                log::error!("createElement({tag}): {}", js_error(&e));
                // Never interned; every later call on it is ignored.
                ElementRef::from_raw(u32::MAX)
            }
        }
    }

    fn append_child(&self, parent: ElementRef, child: ElementRef) {
        if let (Some(parent), Some(child)) = (self.el(parent), self.el(child)) {
            let _ = check(parent.append_child(&child), "appendChild");
        }
    }

    fn insert_before(&self, reference: ElementRef, node: ElementRef) {
        let (Some(reference), Some(node)) = (self.el(reference), self.el(node))
        else {
            return;
        };
        if let Some(parent) = reference.parent_node() {
            let reference: &web_sys::Node = &reference;
            let _ = check(
                parent.insert_before(&node, Some(reference)),
                "insertBefore",
            );
        }
    }

    fn remove_element(&self, el: ElementRef) {
        match self.registry.evict(el) {
            Some(el) => el.remove(),
            None => log::warn!("unknown element handle {}", el.raw()),
        }
        log::trace!("{} element handles live", self.registry.len());
    }
}

impl Events for WebEnv {
    fn listen(
        &self,
        target: Target,
        kind: EventKind,
        mut handler: Handler,
    ) -> ListenerId {
        let id = ListenerId::from_raw(self.next_id());
        let Some(event_target) = self.event_target(target) else {
            return id;
        };
        let registry = Rc::clone(&self.registry);
        let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let origin = event
                .target()
                .and_then(|t| t.dyn_into::<Element>().ok())
                .map(|el| registry.intern(el));
            let mut dom_event = DomEvent::new(kind, origin);
            dom_event.key =
                event.dyn_ref::<KeyboardEvent>().map(KeyboardEvent::key);
            handler(&dom_event);
            if dom_event.default_prevented() {
                event.prevent_default();
            }
        });
        let added = event_target.add_event_listener_with_callback(
            kind.as_str(),
            closure.as_ref().unchecked_ref(),
        );
        if check(added, "addEventListener").is_some() {
            let _ = self.listeners.borrow_mut().insert(
                id,
                Listener {
                    target: event_target,
                    kind,
                    closure,
                },
            );
        }
        id
    }

    fn unlisten(&self, id: ListenerId) {
        let Some(listener) = self.listeners.borrow_mut().remove(&id) else {
            return;
        };
        let _ = check(
            listener.target.remove_event_listener_with_callback(
                listener.kind.as_str(),
                listener.closure.as_ref().unchecked_ref(),
            ),
            "removeEventListener",
        );
    }
}

fn millis(delay: Duration) -> i32 {
    delay.as_millis().min(i32::MAX as u128) as i32
}

impl Scheduler for WebEnv {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(js_sys::Date::now() as i64)
            .unwrap_or(DateTime::UNIX_EPOCH)
    }

    fn set_timeout(
        &self,
        delay: Duration,
        callback: Box<dyn FnOnce()>,
    ) -> TimerId {
        let id = TimerId::from_raw(self.next_id());
        let timers = Rc::clone(&self.timers);
        let run = Closure::once_into_js(move || {
            let _ = timers.borrow_mut().remove(&id);
            callback();
        });
        let handle = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                run.unchecked_ref(),
                millis(delay),
            );
        if let Some(handle) = check(handle, "setTimeout") {
            let _ = self.timers.borrow_mut().insert(id, Timer::Once(handle));
        }
        id
    }

    fn set_interval(
        &self,
        period: Duration,
        mut callback: Box<dyn FnMut()>,
    ) -> TimerId {
        let id = TimerId::from_raw(self.next_id());
        let closure = Closure::<dyn FnMut()>::new(move || callback());
        let handle = self
            .window
            .set_interval_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                millis(period),
            );
        if let Some(handle) = check(handle, "setInterval") {
            let _ = self
                .timers
                .borrow_mut()
                .insert(id, Timer::Repeat(handle, closure));
        }
        id
    }

    fn clear_timer(&self, id: TimerId) {
        let removed = self.timers.borrow_mut().remove(&id);
        match removed {
            Some(Timer::Once(handle)) => {
                self.window.clear_timeout_with_handle(handle);
            }
            Some(Timer::Repeat(handle, _closure)) => {
                self.window.clear_interval_with_handle(handle);
            }
            None => {}
        }
    }

    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }
}

impl Visibility for WebEnv {
    fn observe(
        &self,
        config: &ObserverConfig,
        targets: &[ElementRef],
        mut callback: VisibilityCallback,
    ) -> ObserverId {
        let id = ObserverId::from_raw(self.next_id());
        let registry = Rc::clone(&self.registry);
        let closure = ObserverClosure::new(
            move |entries: js_sys::Array, _observer: IntersectionObserver| {
                let entries: Vec<VisibilityEntry> = entries
                    .iter()
                    .filter_map(|e| {
                        e.dyn_into::<IntersectionObserverEntry>().ok()
                    })
                    .map(|e| VisibilityEntry {
                        observer: id,
                        target: registry.intern(e.target()),
                        is_intersecting: e.is_intersecting(),
                        ratio: e.intersection_ratio(),
                    })
                    .collect();
                callback(&entries);
            },
        );

        let init = IntersectionObserverInit::new();
        init.set_threshold(&JsValue::from_f64(config.threshold));
        init.set_root_margin(&config.root_margin.to_css());
        let Some(observer) = check(
            IntersectionObserver::new_with_options(
                closure.as_ref().unchecked_ref(),
                &init,
            ),
            "IntersectionObserver",
        ) else {
            return id;
        };
        for el in targets.iter().filter_map(|&el| self.el(el)) {
            observer.observe(&el);
        }
        let _ = self.observers.borrow_mut().insert(
            id,
            Observer {
                observer,
                _closure: closure,
            },
        );
        id
    }

    fn unobserve(&self, observer: ObserverId, target: ElementRef) {
        let observers = self.observers.borrow();
        if let (Some(o), Some(el)) = (observers.get(&observer), self.el(target))
        {
            o.observer.unobserve(&el);
        }
    }

    fn disconnect(&self, observer: ObserverId) {
        let removed = self.observers.borrow_mut().remove(&observer);
        if let Some(o) = removed {
            o.observer.disconnect();
        }
    }
}

impl Viewport for WebEnv {
    fn scroll_y(&self) -> f64 {
        check(self.window.scroll_y(), "scrollY").unwrap_or(0.0)
    }

    fn element_top(&self, el: ElementRef) -> f64 {
        self.el(el)
            .map_or(0.0, |el| el.get_bounding_client_rect().top())
    }

    fn scroll_to(&self, top: f64, behavior: ScrollBehavior) {
        let options = web_sys::ScrollToOptions::new();
        options.set_top(top);
        options.set_behavior(match behavior {
            ScrollBehavior::Smooth => web_sys::ScrollBehavior::Smooth,
            ScrollBehavior::Instant => web_sys::ScrollBehavior::Instant,
        });
        self.window.scroll_to_with_scroll_to_options(&options);
    }

    fn scroll_into_view(&self, el: ElementRef, block: ScrollBlock) {
        let Some(el) = self.el(el) else {
            return;
        };
        let options = web_sys::ScrollIntoViewOptions::new();
        options.set_behavior(web_sys::ScrollBehavior::Smooth);
        options.set_block(match block {
            ScrollBlock::Start => web_sys::ScrollLogicalPosition::Start,
            ScrollBlock::Center => web_sys::ScrollLogicalPosition::Center,
        });
        el.scroll_into_view_with_scroll_into_view_options(&options);
    }

    fn open_url(&self, url: &str, target: &str) {
        let opened = self.window.open_with_url_and_target(url, target);
        let _ = check(opened, "open");
    }
}

// ── Entry points ─────────────────────────────────────────────────────────

thread_local! {
    static MOUNTED: RefCell<Option<Teardown>> = const { RefCell::new(None) };
}

fn install(teardown: Teardown) {
    MOUNTED.with_borrow_mut(|slot| {
        slot.get_or_insert_with(Teardown::new).merge(teardown);
    });
}

/// Set up logging and mount every page behavior, waiting for
/// `DOMContentLoaded` while the document is still parsing.
pub fn start() -> Result<(), MeetupError> {
    console_error_panic_hook::set_once();
    if let Err(e) = console_log::init_with_level(log::Level::Info) {
        log::debug!("logger already set: {e}");
    }

    let web = WebEnv::new()?;
    let app = MeetupApp::builder().with_options(web.page_options()).build();
    let loading = web.is_loading();
    let env: SharedEnv = Rc::new(web);

    if !loading {
        install(app.mount(&env));
        return Ok(());
    }

    let pending = RefCell::new(Some(app));
    let handle = SharedEnv::clone(&env);
    let id = env.listen(
        Target::Document,
        EventKind::DomContentLoaded,
        Box::new(move |_| {
            if let Some(app) = pending.borrow_mut().take() {
                install(app.mount(&handle));
            }
        }),
    );
    let mut waiting = Teardown::new();
    waiting.listener(&env, id);
    install(waiting);
    Ok(())
}

/// Detach everything [`start`] attached.
pub fn unmount() {
    let mounted = MOUNTED.with_borrow_mut(Option::take);
    if let Some(teardown) = mounted {
        teardown.run();
        log::info!("meetup page unmounted");
    }
}
