//! Environment capability: everything the page behaviors need from a
//! document and a window, expressed as traits.
//!
//! Components never touch `web_sys` directly. They receive a
//! [`SharedEnv`] and go through [`Dom`], [`Events`], [`Scheduler`],
//! [`Visibility`] and [`Viewport`]. Two implementations ship with the
//! crate:
//!
//! - [`HeadlessEnv`] - an in-memory document with a virtual clock, used by
//!   tests and the native tool.
//! - `WebEnv` (feature `web`) - the browser, through `web-sys`.

mod headless;
#[cfg(any(feature = "web", test))]
mod registry;
mod snapshot;
mod teardown;
#[cfg(feature = "web")]
pub mod web;

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use headless::HeadlessEnv;
pub use teardown::Teardown;

use crate::error::MeetupError;

// ── Handles ──────────────────────────────────────────────────────────────

/// Opaque handle to an element owned by an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementRef(u32);

impl ElementRef {
    /// Wrap an environment-specific index.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The environment-specific index.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

macro_rules! handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            /// Wrap an environment-specific id.
            #[must_use]
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// The environment-specific id.
            #[must_use]
            pub const fn raw(self) -> u64 {
                self.0
            }
        }
    };
}

handle!(
    /// Registered event listener.
    ListenerId
);
handle!(
    /// Pending timeout or interval.
    TimerId
);
handle!(
    /// Visibility observer.
    ObserverId
);

/// Where an event listener is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// The global window (scroll events).
    Window,
    /// The document (outside clicks, key presses, DOM ready).
    Document,
    /// A single element.
    Element(ElementRef),
}

// ── Events ───────────────────────────────────────────────────────────────

/// DOM events the page behaviors subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Pointer click.
    Click,
    /// Field lost focus.
    Blur,
    /// Field value edited.
    Input,
    /// Form submitted.
    Submit,
    /// Key pressed.
    KeyDown,
    /// Window scrolled.
    Scroll,
    /// Document finished parsing.
    DomContentLoaded,
}

impl EventKind {
    /// The DOM event type string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Blur => "blur",
            Self::Input => "input",
            Self::Submit => "submit",
            Self::KeyDown => "keydown",
            Self::Scroll => "scroll",
            Self::DomContentLoaded => "DOMContentLoaded",
        }
    }

    /// Whether the event propagates to ancestors and the document.
    #[must_use]
    pub const fn bubbles(self) -> bool {
        matches!(self, Self::Click | Self::Input | Self::Submit | Self::KeyDown)
    }
}

/// An event delivered to a [`Handler`].
#[derive(Debug)]
pub struct DomEvent {
    /// What happened.
    pub kind: EventKind,
    /// The element the event originated on, if any.
    pub target: Option<ElementRef>,
    /// Key name for [`EventKind::KeyDown`] (e.g. `"Escape"`).
    pub key: Option<String>,
    default_prevented: Cell<bool>,
}

impl DomEvent {
    /// Event of `kind` originating on `target`.
    #[must_use]
    pub fn new(kind: EventKind, target: Option<ElementRef>) -> Self {
        Self {
            kind,
            target,
            key: None,
            default_prevented: Cell::new(false),
        }
    }

    /// Key press event.
    #[must_use]
    pub fn key_down(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::new(EventKind::KeyDown, None)
        }
    }

    /// Suppress the browser's default action for this event.
    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    /// Whether a handler called [`prevent_default`](Self::prevent_default).
    #[must_use]
    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

/// Event listener callback.
pub type Handler = Box<dyn FnMut(&DomEvent)>;

// ── Visibility ───────────────────────────────────────────────────────────

/// Margin applied to the viewport before intersection is computed, in
/// pixels. Negative values shrink the viewport.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct RootMargin {
    /// Top edge offset.
    pub top: f64,
    /// Right edge offset.
    pub right: f64,
    /// Bottom edge offset.
    pub bottom: f64,
    /// Left edge offset.
    pub left: f64,
}

impl RootMargin {
    /// Margin with only vertical offsets.
    #[must_use]
    pub const fn vertical(top: f64, bottom: f64) -> Self {
        Self {
            top,
            right: 0.0,
            bottom,
            left: 0.0,
        }
    }

    /// CSS `rootMargin` string, e.g. `"0px 0px -50px 0px"`.
    #[must_use]
    pub fn to_css(&self) -> String {
        format!(
            "{}px {}px {}px {}px",
            self.top, self.right, self.bottom, self.left
        )
    }
}

/// Visibility observer settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct ObserverConfig {
    /// Fraction of the element (0.0-1.0) that must be visible.
    pub threshold: f64,
    /// Viewport adjustment.
    pub root_margin: RootMargin,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            root_margin: RootMargin::default(),
        }
    }
}

/// One visibility change delivered to an observer callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityEntry {
    /// The observer reporting the change.
    pub observer: ObserverId,
    /// The observed element.
    pub target: ElementRef,
    /// Whether the element now crosses the threshold.
    pub is_intersecting: bool,
    /// Visible fraction of the element.
    pub ratio: f64,
}

/// Visibility observer callback.
pub type VisibilityCallback = Box<dyn FnMut(&[VisibilityEntry])>;

// ── Viewport ─────────────────────────────────────────────────────────────

/// How a scroll is animated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    /// Animated scroll.
    Smooth,
    /// Jump.
    Instant,
}

/// Vertical alignment for [`Viewport::scroll_into_view`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBlock {
    /// Align the element's top with the viewport top.
    Start,
    /// Center the element in the viewport.
    Center,
}

// ── Capability traits ────────────────────────────────────────────────────

/// Element lookup and mutation.
pub trait Dom {
    /// The `<body>` element.
    fn body(&self) -> Option<ElementRef>;
    /// Element with the given `id` attribute.
    fn element_by_id(&self, id: &str) -> Option<ElementRef>;
    /// First element in document order matching `selector`.
    fn query(&self, selector: &str) -> Option<ElementRef>;
    /// Every element in document order matching `selector`.
    fn query_all(&self, selector: &str) -> Vec<ElementRef>;
    /// Descendants of `root` matching `selector`, in document order.
    fn query_within(&self, root: ElementRef, selector: &str)
        -> Vec<ElementRef>;
    /// Nearest inclusive ancestor of `el` matching `selector`.
    fn closest(&self, el: ElementRef, selector: &str) -> Option<ElementRef>;
    /// Whether `node` is `ancestor` or one of its descendants.
    fn contains(&self, ancestor: ElementRef, node: ElementRef) -> bool;

    /// Attribute value.
    fn attribute(&self, el: ElementRef, name: &str) -> Option<String>;
    /// Set an attribute.
    fn set_attribute(&self, el: ElementRef, name: &str, value: &str);
    /// Remove an attribute.
    fn remove_attribute(&self, el: ElementRef, name: &str);

    /// Whether the element carries `class`.
    fn has_class(&self, el: ElementRef, class: &str) -> bool;
    /// Add `class` (no-op when present).
    fn add_class(&self, el: ElementRef, class: &str);
    /// Remove `class` (no-op when absent).
    fn remove_class(&self, el: ElementRef, class: &str);

    /// Text content.
    fn text(&self, el: ElementRef) -> String;
    /// Replace text content.
    fn set_text(&self, el: ElementRef, text: &str);
    /// Current value of a form control.
    fn value(&self, el: ElementRef) -> String;
    /// Replace the value of a form control.
    fn set_value(&self, el: ElementRef, value: &str);
    /// Move keyboard focus to the element.
    fn focus(&self, el: ElementRef);

    /// Create a detached element.
    fn create_element(&self, tag: &str) -> ElementRef;
    /// Append `child` as the last child of `parent`.
    fn append_child(&self, parent: ElementRef, child: ElementRef);
    /// Insert `node` as the previous sibling of `reference`.
    fn insert_before(&self, reference: ElementRef, node: ElementRef);
    /// Detach the element from the document.
    fn remove_element(&self, el: ElementRef);
}

/// Event subscription.
pub trait Events {
    /// Attach `handler` for `kind` events on `target`.
    fn listen(
        &self,
        target: Target,
        kind: EventKind,
        handler: Handler,
    ) -> ListenerId;
    /// Detach a listener. Unknown ids are ignored.
    fn unlisten(&self, id: ListenerId);
}

/// Clock, timers and local task spawning.
pub trait Scheduler {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;
    /// Run `callback` once after `delay`.
    fn set_timeout(
        &self,
        delay: Duration,
        callback: Box<dyn FnOnce()>,
    ) -> TimerId;
    /// Run `callback` every `period` until cleared.
    fn set_interval(
        &self,
        period: Duration,
        callback: Box<dyn FnMut()>,
    ) -> TimerId;
    /// Cancel a timeout or interval. Unknown ids are ignored.
    fn clear_timer(&self, id: TimerId);
    /// Drive `task` to completion on the current thread.
    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>);
}

/// Visibility observation (`IntersectionObserver`).
pub trait Visibility {
    /// Start observing `targets`; `callback` receives threshold crossings.
    fn observe(
        &self,
        config: &ObserverConfig,
        targets: &[ElementRef],
        callback: VisibilityCallback,
    ) -> ObserverId;
    /// Stop observing one element.
    fn unobserve(&self, observer: ObserverId, target: ElementRef);
    /// Stop observing everything and drop the callback.
    fn disconnect(&self, observer: ObserverId);
}

/// Scroll position and navigation.
pub trait Viewport {
    /// Vertical scroll offset of the page.
    fn scroll_y(&self) -> f64;
    /// Top edge of the element relative to the viewport.
    fn element_top(&self, el: ElementRef) -> f64;
    /// Scroll the page so that `top` is at the viewport top.
    fn scroll_to(&self, top: f64, behavior: ScrollBehavior);
    /// Smoothly scroll the element into view.
    fn scroll_into_view(&self, el: ElementRef, block: ScrollBlock);
    /// Open `url` in the browsing context named `target`.
    fn open_url(&self, url: &str, target: &str);
}

/// Everything a page behavior may use.
pub trait Environment: Dom + Events + Scheduler + Visibility + Viewport {}

impl<T: Dom + Events + Scheduler + Visibility + Viewport> Environment for T {}

/// Environment handle shared by every component and callback.
pub type SharedEnv = Rc<dyn Environment>;

// ── Helpers ──────────────────────────────────────────────────────────────

/// First element matching `selector`, or [`MeetupError::MissingElement`].
pub fn require(
    env: &SharedEnv,
    selector: &str,
) -> Result<ElementRef, MeetupError> {
    env.query(selector)
        .ok_or_else(|| MeetupError::MissingElement(selector.to_owned()))
}

/// Element with `id`, or [`MeetupError::MissingElement`].
pub fn require_id(
    env: &SharedEnv,
    id: &str,
) -> Result<ElementRef, MeetupError> {
    env.element_by_id(id)
        .ok_or_else(|| MeetupError::MissingElement(format!("#{id}")))
}

/// Future that resolves after `delay`, driven by the environment's
/// timers.
pub fn sleep(env: &SharedEnv, delay: Duration) -> LocalBoxFuture<'static, ()> {
    let (tx, rx) = oneshot::channel::<()>();
    let _ = env.set_timeout(
        delay,
        Box::new(move || {
            let _ = tx.send(());
        }),
    );
    Box::pin(async move {
        let _ = rx.await;
    })
}
