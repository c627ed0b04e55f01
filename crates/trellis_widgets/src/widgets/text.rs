use trellis_core::MarkupBuilder;

use crate::render::RenderContext;
use crate::widget::{widget_accessors, Widget, WidgetBase, WidgetKey};

/// Displays text, either fixed at build time or read from state
///
/// Each non-blank line becomes its own paragraph.
pub struct TextWidget {
    base: WidgetBase,
    static_text: Option<String>,
}

impl TextWidget {
    /// Text read from the state value under `id`
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            base: WidgetBase::new(id),
            static_text: None,
        }
    }

    pub fn with_text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            base: WidgetBase::new(id),
            static_text: Some(text.into()),
        }
    }

    pub fn static_text(&self) -> Option<&str> {
        self.static_text.as_deref()
    }
}

impl Widget for TextWidget {
    widget_accessors!("text");

    fn render(&self, key: WidgetKey, cx: &RenderContext<'_>, m: &mut MarkupBuilder) {
        let text = match &self.static_text {
            Some(t) => t.clone(),
            None => cx.string_value(key),
        };
        m.tg_open("div").attr("id", &cx.dom_id(key)).tg_content();
        m.paragraphs(&text);
        m.tg_close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::WidgetTree;

    #[test]
    fn test_static_and_dynamic_text() {
        let mut tree = WidgetTree::new();
        let fixed = tree.insert(Box::new(TextWidget::with_text("f", "is 5 < 26?")), None, None);
        let dynamic = tree.insert(Box::new(TextWidget::new("d")), None, None);
        tree.state_mut().put("d", "line one\n\nline two");

        assert_eq!(
            tree.render_markup(fixed),
            "<div id='f'>\n  <p>is 5 &lt; 26?</p>\n</div>\n"
        );
        let html = tree.render_markup(dynamic);
        assert_eq!(html.matches("<p>").count(), 2);
    }
}
