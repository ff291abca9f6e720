//! Ribbon button factory

use std::fmt;

use super::{Container, Element, ElementId};

pub struct RibbonOptions {
    pub label: String,
    pub icon: Option<String>,
    pub on_click: Box<dyn Fn() + Send>,
}

/// A clickable ribbon entry. The caller owns it; nothing keeps a registry.
pub struct Ribbon {
    label: String,
    icon: Option<String>,
    on_click: Box<dyn Fn() + Send>,
}

impl Ribbon {
    pub fn new(label: impl Into<String>, on_click: impl Fn() + Send + 'static) -> Self {
        Ribbon {
            label: label.into(),
            icon: None,
            on_click: Box::new(on_click),
        }
    }

    pub fn from_options(options: RibbonOptions) -> Self {
        Ribbon {
            label: options.label,
            icon: options.icon,
            on_click: options.on_click,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn element(&self) -> Element {
        let el = Element::new("div")
            .with_class("ribbon-element")
            .with_text(self.label.clone());
        match &self.icon {
            Some(icon) => el.with_class(format!("icon-{}", icon)),
            None => el,
        }
    }

    pub fn click(&self) {
        (self.on_click)();
    }

    pub fn attach(&self, container: &mut Container) -> ElementId {
        container.append(self.element())
    }

    pub fn detach(container: &mut Container, id: ElementId) -> bool {
        container.remove(id).is_some()
    }
}

impl fmt::Debug for Ribbon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ribbon")
            .field("label", &self.label)
            .field("icon", &self.icon)
            .finish_non_exhaustive()
    }
}
