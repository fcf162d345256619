//! Selector matching for [`HeadlessEnv`](super::HeadlessEnv).
//!
//! The element arena is rendered to markup with every element tagged by
//! its handle, parsed into a `scraper` document and queried there, so
//! headless queries follow the same CSS rules a browser does.

use scraper::{Html, Selector};

use super::ElementRef;

/// Attribute carrying the arena handle of each rendered element.
const NODE_ATTR: &str = "data-meetup-node";

/// Parse `selector`, logging and returning `None` when it is invalid.
pub(crate) fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            log::debug!("unsupported selector {selector:?}: {e:?}");
            None
        }
    }
}

/// Builds the markup for one element tree, outermost element first.
pub(crate) struct MarkupWriter {
    out: String,
}

impl MarkupWriter {
    /// Start a document whose outermost arena element is a `top_tag`.
    /// Anything but `<body>` is nested inside a plain body.
    pub(crate) fn new(top_tag: &str) -> Self {
        let mut out = String::from("<!DOCTYPE html><html><head></head>");
        if top_tag != "body" {
            out.push_str("<body>");
        }
        Self { out }
    }

    /// Open `tag` for the element `el`.
    pub(crate) fn open<'a>(
        &mut self,
        tag: &str,
        el: ElementRef,
        attrs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) {
        self.out.push('<');
        self.out.push_str(tag);
        self.push_attr(NODE_ATTR, &el.raw().to_string());
        for (name, value) in attrs {
            if is_attr_name(name) {
                self.push_attr(name, value);
            }
        }
        self.out.push('>');
    }

    /// Close `tag`.
    pub(crate) fn close(&mut self, tag: &str) {
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push('>');
    }

    /// Parse what was written.
    pub(crate) fn finish(self) -> Snapshot {
        Snapshot {
            html: Html::parse_document(&self.out),
        }
    }

    fn push_attr(&mut self, name: &str, value: &str) {
        self.out.push(' ');
        self.out.push_str(name);
        self.out.push_str("=\"");
        for c in value.chars() {
            match c {
                '&' => self.out.push_str("&amp;"),
                '"' => self.out.push_str("&quot;"),
                _ => self.out.push(c),
            }
        }
        self.out.push('"');
    }
}

fn is_attr_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'))
}

/// A parsed copy of one element tree.
pub(crate) struct Snapshot {
    html: Html,
}

impl Snapshot {
    /// Descendants of `root` (excluding it) matching `selector`, in
    /// document order.
    pub(crate) fn select(
        &self,
        root: ElementRef,
        selector: &Selector,
    ) -> Vec<ElementRef> {
        let Some(scope) = self.find(root) else {
            return Vec::new();
        };
        scope
            .select(selector)
            .filter_map(handle)
            .filter(|&el| el != root)
            .collect()
    }

    /// `el` or its nearest ancestor matching `selector`.
    pub(crate) fn closest(
        &self,
        el: ElementRef,
        selector: &Selector,
    ) -> Option<ElementRef> {
        let start = self.find(el)?;
        std::iter::once(start)
            .chain(start.ancestors().filter_map(scraper::ElementRef::wrap))
            .filter(|candidate| selector.matches(candidate))
            .find_map(handle)
    }

    fn find(&self, el: ElementRef) -> Option<scraper::ElementRef<'_>> {
        let by_handle = format!("[{NODE_ATTR}=\"{}\"]", el.raw());
        let selector = Selector::parse(&by_handle).ok()?;
        self.html.select(&selector).next()
    }
}

fn handle(el: scraper::ElementRef<'_>) -> Option<ElementRef> {
    el.value()
        .attr(NODE_ATTR)?
        .parse()
        .ok()
        .map(ElementRef::from_raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_ATTRS: [(&str, &str); 0] = [];

    fn el(raw: u32) -> ElementRef {
        ElementRef::from_raw(raw)
    }

    /// `<body#0><div.hero__actions#1><a.btn#2/></div><input#3/></body>`
    fn snapshot() -> Snapshot {
        let mut w = MarkupWriter::new("body");
        w.open("body", el(0), NO_ATTRS);
        w.open("div", el(1), [("class", "hero__actions")]);
        w.open(
            "a",
            el(2),
            [("class", "btn btn--primary"), ("href", "#register")],
        );
        w.close("a");
        w.close("div");
        w.open(
            "input",
            el(3),
            [("type", "text"), ("required", ""), ("id", "firstName")],
        );
        w.close("input");
        w.close("body");
        w.finish()
    }

    fn select(selector: &str) -> Vec<ElementRef> {
        snapshot().select(el(0), &parse_selector(selector).unwrap())
    }

    #[test]
    fn descendant_combinator() {
        assert_eq!(select(".hero__actions .btn"), vec![el(2)]);
        assert_eq!(select("div a.btn"), vec![el(2)]);
        assert!(select(".hero__actions input").is_empty());
    }

    #[test]
    fn attribute_operators() {
        assert_eq!(select("a[href^=\"#\"]"), vec![el(2)]);
        assert_eq!(select("[href=\"#register\"]"), vec![el(2)]);
        assert!(select("[href=\"#details\"]").is_empty());
        assert_eq!(select("input[required]"), vec![el(3)]);
        assert_eq!(select("input[type=\"text\"]"), vec![el(3)]);
        assert_eq!(select("#firstName"), vec![el(3)]);
    }

    #[test]
    fn selector_lists_keep_document_order() {
        let list = "\n  input,\n  .btn,\n  .section-title\n";
        assert_eq!(select(list), vec![el(2), el(3)]);
    }

    #[test]
    fn scope_excludes_itself_and_closest_includes_itself() {
        let snap = snapshot();
        let div = parse_selector("div").unwrap();
        assert!(snap.select(el(1), &div).is_empty());
        assert_eq!(snap.closest(el(1), &div), Some(el(1)));
        assert_eq!(snap.closest(el(2), &div), Some(el(1)));
        assert_eq!(snap.closest(el(3), &div), None);
    }

    #[test]
    fn detached_trees_are_queried_on_their_own() {
        let mut w = MarkupWriter::new("div");
        w.open("div", el(7), [("class", "success-message")]);
        w.open("h3", el(8), NO_ATTRS);
        w.close("h3");
        w.close("div");
        let snap = w.finish();
        let h3 = parse_selector("h3").unwrap();
        assert_eq!(snap.select(el(7), &h3), vec![el(8)]);
    }

    #[test]
    fn attribute_values_are_escaped() {
        let mut w = MarkupWriter::new("body");
        w.open("body", el(0), NO_ATTRS);
        w.open("a", el(1), [("title", "\"quoted\" & more")]);
        w.close("a");
        w.close("body");
        let snap = w.finish();
        let sel = parse_selector("a[title='\"quoted\" & more']").unwrap();
        assert_eq!(snap.select(el(0), &sel), vec![el(1)]);
    }

    #[test]
    fn invalid_selectors_are_rejected() {
        assert!(parse_selector("").is_none());
        assert!(parse_selector("a[").is_none());
    }
}
