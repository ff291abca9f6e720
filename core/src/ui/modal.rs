//! Modal dialog factory

use super::{Container, Element, ElementId};

const CLOSE_LABEL: &str = "Close";

/// Body of a modal. Text is escaped when rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalContent {
    Text(String),
    /// Markup from a trusted source, rendered verbatim
    TrustedHtml(String),
}

impl From<&str> for ModalContent {
    fn from(s: &str) -> Self {
        ModalContent::Text(s.to_string())
    }
}

impl From<String> for ModalContent {
    fn from(s: String) -> Self {
        ModalContent::Text(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModalOptions {
    pub confirm_button_text: Option<String>,
    pub cancel_button_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modal {
    title: String,
    content: ModalContent,
    options: ModalOptions,
}

impl Modal {
    pub fn new(title: impl Into<String>, content: impl Into<ModalContent>) -> Self {
        Modal {
            title: title.into(),
            content: content.into(),
            options: ModalOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ModalOptions) -> Self {
        self.options = options;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn element(&self) -> Element {
        let body = Element::new("div").with_class("modal-content");
        let body = match &self.content {
            ModalContent::Text(text) => body.with_text(text.clone()),
            ModalContent::TrustedHtml(html) => body.with_trusted_html(html.clone()),
        };

        let mut modal = Element::new("div")
            .with_class("modal")
            .with_child(Element::new("h2").with_text(self.title.clone()))
            .with_child(body);

        if let Some(text) = &self.options.confirm_button_text {
            modal = modal.with_child(
                Element::new("button")
                    .with_class("modal-confirm")
                    .with_text(text.clone()),
            );
        }
        if let Some(text) = &self.options.cancel_button_text {
            modal = modal.with_child(
                Element::new("button")
                    .with_class("modal-cancel")
                    .with_text(text.clone()),
            );
        }

        modal.with_child(
            Element::new("button")
                .with_class("modal-close")
                .with_text(CLOSE_LABEL),
        )
    }

    pub fn mount(&self, container: &mut Container) -> ElementId {
        container.append(self.element())
    }

    /// Close button action: remove the mounted modal
    ///
    /// Returns false if it was already gone.
    pub fn close(container: &mut Container, id: ElementId) -> bool {
        container.remove(id).is_some()
    }
}

/// Construct a modal and mount it in one step
pub fn show_modal(
    container: &mut Container,
    title: impl Into<String>,
    content: impl Into<ModalContent>,
) -> ElementId {
    Modal::new(title, content).mount(container)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_does_not_mount() {
        let modal = Modal::new("Summary", "Three action items");
        let el = modal.element();
        assert!(el.has_class("modal"));
        assert_eq!(el.children.len(), 3);
        assert_eq!(el.children[0].text.as_deref(), Some("Summary"));
        assert_eq!(
            el.find_by_class("modal-close").and_then(|b| b.text.as_deref()),
            Some("Close")
        );
    }

    #[test]
    fn test_text_content_is_escaped() {
        let modal = Modal::new("Reply", "<script>alert(1)</script>");
        let html = modal.element().to_html();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_trusted_html_opt_in() {
        let modal = Modal::new("Reply", ModalContent::TrustedHtml("<ul><li>a</li></ul>".into()));
        let content = modal.element();
        let body = content.find_by_class("modal-content").unwrap();
        assert_eq!(body.html(), Some("<ul><li>a</li></ul>"));
        assert!(content.to_html().contains("<ul><li>a</li></ul>"));
    }

    #[test]
    fn test_mount_then_close() {
        let mut body = Container::new();
        let id = show_modal(&mut body, "Title", "content");
        assert!(body.contains(id));

        assert!(Modal::close(&mut body, id));
        assert!(body.is_empty());
        assert!(!Modal::close(&mut body, id));
    }

    #[test]
    fn test_option_buttons() {
        let modal = Modal::new("Delete note?", "This cannot be undone").with_options(ModalOptions {
            confirm_button_text: Some("Delete".into()),
            cancel_button_text: Some("Keep".into()),
        });
        let el = modal.element();
        assert_eq!(el.children.len(), 5);
        assert_eq!(
            el.find_by_class("modal-confirm").and_then(|b| b.text.as_deref()),
            Some("Delete")
        );
        assert_eq!(
            el.find_by_class("modal-cancel").and_then(|b| b.text.as_deref()),
            Some("Keep")
        );
    }
}
