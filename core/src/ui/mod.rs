//! Headless element model for the plugin's UI affordances
//!
//! Factories build [`Element`] trees without touching a live document. The
//! host mounts them into a [`Container`] and renders the result with
//! [`Container::render`] or [`Element::to_html`].

pub mod modal;
pub mod ribbon;

use std::collections::BTreeMap;
use std::fmt::Write;

pub use modal::{show_modal, Modal, ModalContent, ModalOptions};
pub use ribbon::{Ribbon, RibbonOptions};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub classes: Vec<String>,
    pub text: Option<String>,
    /// Raw markup, emitted unescaped. Only set via [`Element::with_trusted_html`].
    html: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Element {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Attach markup that is rendered verbatim
    pub fn with_trusted_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn html(&self) -> Option<&str> {
        self.html.as_deref()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// First descendant (or self) with the given class
    pub fn find_by_class(&self, class: &str) -> Option<&Element> {
        if self.has_class(class) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_by_class(class))
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        let _ = write!(out, "<{}", self.tag);
        if !self.classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", escape_html(&self.classes.join(" ")));
        }
        out.push('>');
        if let Some(text) = &self.text {
            out.push_str(&escape_html(text));
        }
        if let Some(html) = &self.html {
            out.push_str(html);
        }
        for child in &self.children {
            child.write_html(out);
        }
        let _ = write!(out, "</{}>", self.tag);
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Handle to an element mounted in a [`Container`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(u64);

impl ElementId {
    pub fn as_u64(self) -> u64 {
        self.0
    }

    pub fn from_u64(id: u64) -> Self {
        ElementId(id)
    }
}

/// Attachment point for mounted elements, e.g. the document body or the
/// ribbon bar
#[derive(Debug, Default)]
pub struct Container {
    next_id: u64,
    children: BTreeMap<ElementId, Element>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, element: Element) -> ElementId {
        self.next_id += 1;
        let id = ElementId(self.next_id);
        self.children.insert(id, element);
        id
    }

    pub fn remove(&mut self, id: ElementId) -> Option<Element> {
        self.children.remove(&id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.children.contains_key(&id)
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.children.get(&id)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Mounted elements in mount order
    pub fn render(&self) -> String {
        self.children.values().map(Element::to_html).collect()
    }
}
