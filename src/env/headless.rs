//! In-memory environment with a virtual clock.
//!
//! `HeadlessEnv` keeps a small document tree, dispatches events with
//! bubbling, runs timers only when the clock is advanced, drives spawned
//! futures on a [`LocalPool`], and reports visibility changes only when
//! told to. Tests and the native tool build pages with
//! [`add_element`](HeadlessEnv::add_element) and then poke at them.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::executor::{LocalPool, LocalSpawner};
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;
use rustc_hash::FxHashMap;

use super::snapshot::{parse_selector, MarkupWriter, Snapshot};
use super::{
    Dom, DomEvent, ElementRef, EventKind, Events, Handler, ListenerId,
    ObserverConfig, ObserverId, Scheduler, ScrollBehavior, ScrollBlock,
    Target, TimerId, Viewport, Visibility, VisibilityCallback,
    VisibilityEntry,
};

/// Intervals shorter than this are clamped so `advance` always terminates.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

struct Node {
    tag: String,
    attrs: Vec<(String, String)>,
    classes: Vec<String>,
    text: String,
    value: String,
    parent: Option<ElementRef>,
    children: Vec<ElementRef>,
    /// Distance from the document top, in pixels.
    offset_top: f64,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            classes: Vec::new(),
            text: String::new(),
            value: String::new(),
            parent: None,
            children: Vec::new(),
            offset_top: 0.0,
        }
    }
}

impl Node {
    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    fn attr(&self, name: &str) -> Option<&str> {
        if name == "class" {
            return None;
        }
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

struct Listener {
    id: ListenerId,
    target: Target,
    kind: EventKind,
    handler: Rc<RefCell<Handler>>,
}

enum TimerSlot {
    Once(Box<dyn FnOnce()>),
    Repeat {
        period: Duration,
        callback: Rc<RefCell<Box<dyn FnMut()>>>,
    },
}

struct Observer {
    config: ObserverConfig,
    targets: Vec<ElementRef>,
    callback: Rc<RefCell<VisibilityCallback>>,
    /// Last reported intersection state per target.
    last: FxHashMap<ElementRef, bool>,
}

/// In-memory document, window and clock.
pub struct HeadlessEnv {
    nodes: RefCell<Vec<Node>>,
    body: ElementRef,
    focused: Cell<Option<ElementRef>>,
    next_id: Cell<u64>,

    listeners: RefCell<Vec<Listener>>,

    start: DateTime<Utc>,
    elapsed: Cell<Duration>,
    /// `(due, sequence)` → timer, so equal deadlines fire in order.
    queue: RefCell<BTreeMap<(Duration, u64), TimerId>>,
    timers: RefCell<FxHashMap<TimerId, TimerSlot>>,
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,

    observers: RefCell<BTreeMap<ObserverId, Observer>>,

    scroll_y: Cell<f64>,
    into_view: RefCell<Vec<(ElementRef, ScrollBlock)>>,
    opened: RefCell<Vec<(String, String)>>,
}

impl Default for HeadlessEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessEnv {
    /// Empty document whose clock starts at the Unix epoch.
    #[must_use]
    pub fn new() -> Self {
        Self::at(DateTime::UNIX_EPOCH)
    }

    /// Empty document whose clock starts at `start`.
    #[must_use]
    pub fn at(start: DateTime<Utc>) -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            nodes: RefCell::new(vec![Node::new("body")]),
            body: ElementRef::from_raw(0),
            focused: Cell::new(None),
            next_id: Cell::new(1),
            listeners: RefCell::new(Vec::new()),
            start,
            elapsed: Cell::new(Duration::ZERO),
            queue: RefCell::new(BTreeMap::new()),
            timers: RefCell::new(FxHashMap::default()),
            pool: RefCell::new(pool),
            spawner,
            observers: RefCell::new(BTreeMap::new()),
            scroll_y: Cell::new(0.0),
            into_view: RefCell::new(Vec::new()),
            opened: RefCell::new(Vec::new()),
        }
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    // ── Building pages ───────────────────────────────────────────────────

    /// The `<body>` element.
    #[must_use]
    pub fn root(&self) -> ElementRef {
        self.body
    }

    /// Append a new `tag` element under `parent`. A `class` attribute is
    /// split into the class list.
    pub fn add_element(
        &self,
        parent: ElementRef,
        tag: &str,
        attrs: &[(&str, &str)],
    ) -> ElementRef {
        let el = self.create_element(tag);
        for (name, value) in attrs {
            self.set_attribute(el, name, value);
        }
        self.append_child(parent, el);
        el
    }

    /// Place the element `top` pixels below the document top.
    pub fn set_offset_top(&self, el: ElementRef, top: f64) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(el.raw() as usize)
        {
            node.offset_top = top;
        }
    }

    // ── Inspecting pages ─────────────────────────────────────────────────

    /// Element that last received focus.
    #[must_use]
    pub fn focused(&self) -> Option<ElementRef> {
        self.focused.get()
    }

    /// Whether the element is reachable from `<body>`.
    #[must_use]
    pub fn is_attached(&self, el: ElementRef) -> bool {
        let nodes = self.nodes.borrow();
        let mut cursor = Some(el);
        while let Some(current) = cursor {
            if current == self.body {
                return true;
            }
            cursor = nodes.get(current.raw() as usize).and_then(|n| n.parent);
        }
        false
    }

    /// Direct children of `el`.
    #[must_use]
    pub fn children(&self, el: ElementRef) -> Vec<ElementRef> {
        self.nodes
            .borrow()
            .get(el.raw() as usize)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Number of live listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Number of pending timeouts and intervals.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Whether any observer currently watches `el`.
    #[must_use]
    pub fn is_observed(&self, el: ElementRef) -> bool {
        self.observers
            .borrow()
            .values()
            .any(|o| o.targets.contains(&el))
    }

    /// Elements passed to [`Viewport::scroll_into_view`], oldest first.
    #[must_use]
    pub fn scrolled_into_view(&self) -> Vec<(ElementRef, ScrollBlock)> {
        self.into_view.borrow().clone()
    }

    /// URLs passed to [`Viewport::open_url`] with their targets.
    #[must_use]
    pub fn opened_urls(&self) -> Vec<(String, String)> {
        self.opened.borrow().clone()
    }

    // ── Driving events ───────────────────────────────────────────────────

    /// Deliver `event` to `target`, bubbling when the kind bubbles, then
    /// run spawned tasks until they stall.
    pub fn dispatch(&self, target: Target, event: DomEvent) -> DomEvent {
        let path = self.propagation_path(target, event.kind);
        for hop in path {
            let handlers: Vec<Rc<RefCell<Handler>>> = self
                .listeners
                .borrow()
                .iter()
                .filter(|l| l.target == hop && l.kind == event.kind)
                .map(|l| Rc::clone(&l.handler))
                .collect();
            for handler in handlers {
                if let Ok(mut handler) = handler.try_borrow_mut() {
                    (*handler)(&event);
                }
            }
        }
        self.run_until_stalled();
        event
    }

    fn propagation_path(&self, target: Target, kind: EventKind) -> Vec<Target> {
        let Target::Element(el) = target else {
            return vec![target];
        };
        if !kind.bubbles() {
            return vec![target];
        }
        let nodes = self.nodes.borrow();
        let mut path = Vec::new();
        let mut cursor = Some(el);
        while let Some(current) = cursor {
            path.push(Target::Element(current));
            cursor = nodes.get(current.raw() as usize).and_then(|n| n.parent);
        }
        path.push(Target::Document);
        path
    }

    /// Click `el`. Disabled elements ignore clicks.
    pub fn click(&self, el: ElementRef) {
        if self.attribute(el, "disabled").is_some() {
            return;
        }
        let _ = self.dispatch(
            Target::Element(el),
            DomEvent::new(EventKind::Click, Some(el)),
        );
    }

    /// Move focus away from `el`.
    pub fn blur(&self, el: ElementRef) {
        if self.focused.get() == Some(el) {
            self.focused.set(None);
        }
        let _ = self.dispatch(
            Target::Element(el),
            DomEvent::new(EventKind::Blur, Some(el)),
        );
    }

    /// Replace the value of a field as if typed, firing `input`.
    pub fn type_text(&self, el: ElementRef, text: &str) {
        self.set_value(el, text);
        let _ = self.dispatch(
            Target::Element(el),
            DomEvent::new(EventKind::Input, Some(el)),
        );
    }

    /// Submit a form.
    pub fn submit(&self, form: ElementRef) {
        let _ = self.dispatch(
            Target::Element(form),
            DomEvent::new(EventKind::Submit, Some(form)),
        );
    }

    /// Press a key with nothing focused.
    pub fn press_key(&self, key: &str) {
        let _ = self.dispatch(Target::Document, DomEvent::key_down(key));
    }

    /// Scroll the window to `y` and fire `scroll`.
    pub fn scroll_window_to(&self, y: f64) {
        self.scroll_y.set(y.max(0.0));
        let _ = self
            .dispatch(Target::Window, DomEvent::new(EventKind::Scroll, None));
    }

    /// Report that `ratio` of `el` is now visible. Observers hear about it
    /// only when the element crosses their threshold.
    pub fn set_visibility(&self, el: ElementRef, ratio: f64) {
        let deliveries: Vec<_> = self
            .observers
            .borrow_mut()
            .iter_mut()
            .filter(|(_, o)| o.targets.contains(&el))
            .filter_map(|(&id, o)| {
                let intersecting =
                    ratio > 0.0 && ratio >= o.config.threshold;
                let previous = o.last.insert(el, intersecting).unwrap_or(false);
                (previous != intersecting).then(|| {
                    let entry = VisibilityEntry {
                        observer: id,
                        target: el,
                        is_intersecting: intersecting,
                        ratio,
                    };
                    (Rc::clone(&o.callback), entry)
                })
            })
            .collect();
        for (callback, entry) in deliveries {
            if let Ok(mut callback) = callback.try_borrow_mut() {
                (*callback)(&[entry]);
            }
        }
        self.run_until_stalled();
    }

    // ── Driving time ─────────────────────────────────────────────────────

    /// Poll spawned tasks until none can make progress.
    pub fn run_until_stalled(&self) {
        if let Ok(mut pool) = self.pool.try_borrow_mut() {
            pool.run_until_stalled();
        }
    }

    /// Move the clock forward, firing every timer that falls due on the
    /// way in deadline order.
    pub fn advance(&self, by: Duration) {
        let deadline = self.elapsed.get() + by;
        self.run_until_stalled();
        while let Some((due, id)) = self.pop_due(deadline) {
            self.elapsed.set(due);
            self.fire(id, due);
            self.run_until_stalled();
        }
        self.elapsed.set(deadline);
    }

    fn pop_due(&self, deadline: Duration) -> Option<(Duration, TimerId)> {
        let mut queue = self.queue.borrow_mut();
        let (&key, _) = queue.first_key_value()?;
        if key.0 > deadline {
            return None;
        }
        queue.remove(&key).map(|id| (key.0, id))
    }

    fn fire(&self, id: TimerId, due: Duration) {
        let slot = self.timers.borrow_mut().remove(&id);
        match slot {
            None => {}
            Some(TimerSlot::Once(callback)) => callback(),
            Some(TimerSlot::Repeat { period, callback }) => {
                let running = Rc::clone(&callback);
                let _ = self
                    .timers
                    .borrow_mut()
                    .insert(id, TimerSlot::Repeat { period, callback });
                if let Ok(mut run) = running.try_borrow_mut() {
                    (*run)();
                }
                if self.timers.borrow().contains_key(&id) {
                    let seq = self.next_id();
                    let _ =
                        self.queue.borrow_mut().insert((due + period, seq), id);
                }
            }
        }
    }

    fn schedule(&self, delay: Duration, slot: TimerSlot) -> TimerId {
        let id = TimerId::from_raw(self.next_id());
        let seq = self.next_id();
        let due = self.elapsed.get() + delay;
        let _ = self.timers.borrow_mut().insert(id, slot);
        let _ = self.queue.borrow_mut().insert((due, seq), id);
        id
    }

    // ── Tree helpers ─────────────────────────────────────────────────────

    /// Descendants of `root` (excluding it) in document order.
    fn descendants(&self, root: ElementRef) -> Vec<ElementRef> {
        let nodes = self.nodes.borrow();
        let mut out = Vec::new();
        let mut stack: Vec<ElementRef> = nodes
            .get(root.raw() as usize)
            .map(|n| n.children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(el) = stack.pop() {
            out.push(el);
            if let Some(node) = nodes.get(el.raw() as usize) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    fn select(&self, root: ElementRef, selector: &str) -> Vec<ElementRef> {
        let Some(selector) = parse_selector(selector) else {
            return Vec::new();
        };
        self.snapshot(root).select(root, &selector)
    }

    /// Parse the whole tree `el` belongs to.
    fn snapshot(&self, el: ElementRef) -> Snapshot {
        let nodes = self.nodes.borrow();
        let mut top = el;
        while let Some(parent) =
            nodes.get(top.raw() as usize).and_then(|n| n.parent)
        {
            top = parent;
        }
        let tag = nodes
            .get(top.raw() as usize)
            .map_or("body", |n| n.tag.as_str());
        let mut writer = MarkupWriter::new(tag);
        Self::write_node(&nodes, top, &mut writer);
        writer.finish()
    }

    fn write_node(
        nodes: &[Node],
        el: ElementRef,
        writer: &mut MarkupWriter,
    ) {
        let Some(node) = nodes.get(el.raw() as usize) else {
            return;
        };
        let class = node.classes.join(" ");
        let attrs = node
            .attrs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain((!class.is_empty()).then_some(("class", class.as_str())));
        writer.open(&node.tag, el, attrs);
        for &child in &node.children {
            Self::write_node(nodes, child, writer);
        }
        writer.close(&node.tag);
    }

    fn detach(&self, el: ElementRef) {
        let mut nodes = self.nodes.borrow_mut();
        let Some(parent) =
            nodes.get_mut(el.raw() as usize).and_then(|n| n.parent.take())
        else {
            return;
        };
        if let Some(p) = nodes.get_mut(parent.raw() as usize) {
            p.children.retain(|&c| c != el);
        }
    }

    fn with_node<R>(
        &self,
        el: ElementRef,
        f: impl FnOnce(&Node) -> R,
    ) -> Option<R> {
        self.nodes.borrow().get(el.raw() as usize).map(f)
    }

    fn with_node_mut(&self, el: ElementRef, f: impl FnOnce(&mut Node)) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(el.raw() as usize) {
            f(node);
        }
    }

    fn text_of(nodes: &[Node], el: ElementRef, out: &mut String) {
        if let Some(node) = nodes.get(el.raw() as usize) {
            out.push_str(&node.text);
            for &child in &node.children {
                Self::text_of(nodes, child, out);
            }
        }
    }
}

// ── Capability impls ─────────────────────────────────────────────────────

impl Dom for HeadlessEnv {
    fn body(&self) -> Option<ElementRef> {
        Some(self.body)
    }

    fn element_by_id(&self, id: &str) -> Option<ElementRef> {
        let candidates = self.descendants(self.body);
        let nodes = self.nodes.borrow();
        candidates.into_iter().find(|&el| {
            nodes
                .get(el.raw() as usize)
                .is_some_and(|n| n.attr("id") == Some(id))
        })
    }

    fn query(&self, selector: &str) -> Option<ElementRef> {
        self.select(self.body, selector).into_iter().next()
    }

    fn query_all(&self, selector: &str) -> Vec<ElementRef> {
        self.select(self.body, selector)
    }

    fn query_within(
        &self,
        root: ElementRef,
        selector: &str,
    ) -> Vec<ElementRef> {
        self.select(root, selector)
    }

    fn closest(&self, el: ElementRef, selector: &str) -> Option<ElementRef> {
        let selector = parse_selector(selector)?;
        self.snapshot(el).closest(el, &selector)
    }

    fn contains(&self, ancestor: ElementRef, node: ElementRef) -> bool {
        let nodes = self.nodes.borrow();
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = nodes.get(current.raw() as usize).and_then(|n| n.parent);
        }
        false
    }

    fn attribute(&self, el: ElementRef, name: &str) -> Option<String> {
        self.with_node(el, |n| {
            if name == "class" {
                return (!n.classes.is_empty()).then(|| n.classes.join(" "));
            }
            n.attr(name).map(str::to_owned)
        })
        .flatten()
    }

    fn set_attribute(&self, el: ElementRef, name: &str, value: &str) {
        self.with_node_mut(el, |n| {
            if name == "class" {
                n.classes =
                    value.split_whitespace().map(str::to_owned).collect();
                return;
            }
            match n.attrs.iter_mut().find(|(k, _)| k == name) {
                Some((_, v)) => value.clone_into(v),
                None => n.attrs.push((name.to_owned(), value.to_owned())),
            }
        });
    }

    fn remove_attribute(&self, el: ElementRef, name: &str) {
        self.with_node_mut(el, |n| {
            if name == "class" {
                n.classes.clear();
            } else {
                n.attrs.retain(|(k, _)| k != name);
            }
        });
    }

    fn has_class(&self, el: ElementRef, class: &str) -> bool {
        self.with_node(el, |n| n.has_class(class)).unwrap_or(false)
    }

    fn add_class(&self, el: ElementRef, class: &str) {
        self.with_node_mut(el, |n| {
            if !n.has_class(class) {
                n.classes.push(class.to_owned());
            }
        });
    }

    fn remove_class(&self, el: ElementRef, class: &str) {
        self.with_node_mut(el, |n| n.classes.retain(|c| c != class));
    }

    fn text(&self, el: ElementRef) -> String {
        let nodes = self.nodes.borrow();
        let mut out = String::new();
        Self::text_of(&nodes, el, &mut out);
        out
    }

    fn set_text(&self, el: ElementRef, text: &str) {
        let children = self.children(el);
        for child in children {
            self.detach(child);
        }
        self.with_node_mut(el, |n| text.clone_into(&mut n.text));
    }

    fn value(&self, el: ElementRef) -> String {
        self.with_node(el, |n| n.value.clone()).unwrap_or_default()
    }

    fn set_value(&self, el: ElementRef, value: &str) {
        self.with_node_mut(el, |n| value.clone_into(&mut n.value));
    }

    fn focus(&self, el: ElementRef) {
        self.focused.set(Some(el));
    }

    fn create_element(&self, tag: &str) -> ElementRef {
        let mut nodes = self.nodes.borrow_mut();
        let el = ElementRef::from_raw(nodes.len() as u32);
        nodes.push(Node::new(tag));
        el
    }

    fn append_child(&self, parent: ElementRef, child: ElementRef) {
        self.detach(child);
        let mut nodes = self.nodes.borrow_mut();
        if nodes.get(parent.raw() as usize).is_none() {
            return;
        }
        if let Some(c) = nodes.get_mut(child.raw() as usize) {
            c.parent = Some(parent);
        }
        if let Some(p) = nodes.get_mut(parent.raw() as usize) {
            p.children.push(child);
        }
    }

    fn insert_before(&self, reference: ElementRef, node: ElementRef) {
        let Some(parent) = self.with_node(reference, |n| n.parent).flatten()
        else {
            return;
        };
        self.detach(node);
        let mut nodes = self.nodes.borrow_mut();
        if let Some(n) = nodes.get_mut(node.raw() as usize) {
            n.parent = Some(parent);
        }
        if let Some(p) = nodes.get_mut(parent.raw() as usize) {
            let at = p
                .children
                .iter()
                .position(|&c| c == reference)
                .unwrap_or(p.children.len());
            p.children.insert(at, node);
        }
    }

    fn remove_element(&self, el: ElementRef) {
        self.detach(el);
    }
}

impl Events for HeadlessEnv {
    fn listen(
        &self,
        target: Target,
        kind: EventKind,
        handler: Handler,
    ) -> ListenerId {
        let id = ListenerId::from_raw(self.next_id());
        self.listeners.borrow_mut().push(Listener {
            id,
            target,
            kind,
            handler: Rc::new(RefCell::new(handler)),
        });
        id
    }

    fn unlisten(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|l| l.id != id);
    }
}

impl Scheduler for HeadlessEnv {
    fn now(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.elapsed.get())
            .ok()
            .and_then(|d| self.start.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn set_timeout(
        &self,
        delay: Duration,
        callback: Box<dyn FnOnce()>,
    ) -> TimerId {
        self.schedule(delay, TimerSlot::Once(callback))
    }

    fn set_interval(
        &self,
        period: Duration,
        callback: Box<dyn FnMut()>,
    ) -> TimerId {
        let period = period.max(MIN_INTERVAL);
        self.schedule(
            period,
            TimerSlot::Repeat {
                period,
                callback: Rc::new(RefCell::new(callback)),
            },
        )
    }

    fn clear_timer(&self, id: TimerId) {
        let _ = self.timers.borrow_mut().remove(&id);
    }

    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
        if let Err(e) = self.spawner.spawn_local(task) {
            log::error!("failed to spawn task: {e}");
        }
    }
}

impl Visibility for HeadlessEnv {
    fn observe(
        &self,
        config: &ObserverConfig,
        targets: &[ElementRef],
        callback: VisibilityCallback,
    ) -> ObserverId {
        let id = ObserverId::from_raw(self.next_id());
        let _ = self.observers.borrow_mut().insert(
            id,
            Observer {
                config: *config,
                targets: targets.to_vec(),
                callback: Rc::new(RefCell::new(callback)),
                last: FxHashMap::default(),
            },
        );
        id
    }

    fn unobserve(&self, observer: ObserverId, target: ElementRef) {
        if let Some(o) = self.observers.borrow_mut().get_mut(&observer) {
            o.targets.retain(|&t| t != target);
            let _ = o.last.remove(&target);
        }
    }

    fn disconnect(&self, observer: ObserverId) {
        let _ = self.observers.borrow_mut().remove(&observer);
    }
}

impl Viewport for HeadlessEnv {
    fn scroll_y(&self) -> f64 {
        self.scroll_y.get()
    }

    fn element_top(&self, el: ElementRef) -> f64 {
        let top = self.with_node(el, |n| n.offset_top).unwrap_or(0.0);
        top - self.scroll_y.get()
    }

    fn scroll_to(&self, top: f64, _behavior: ScrollBehavior) {
        self.scroll_y.set(top.max(0.0));
    }

    fn scroll_into_view(&self, el: ElementRef, block: ScrollBlock) {
        self.into_view.borrow_mut().push((el, block));
        let top = self.with_node(el, |n| n.offset_top).unwrap_or(0.0);
        self.scroll_y.set(top.max(0.0));
    }

    fn open_url(&self, url: &str, target: &str) {
        self.opened
            .borrow_mut()
            .push((url.to_owned(), target.to_owned()));
    }
}
