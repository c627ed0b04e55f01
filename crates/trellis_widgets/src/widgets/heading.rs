use trellis_core::MarkupBuilder;

use crate::render::RenderContext;
use crate::widget::{widget_accessors, Widget, WidgetBase, WidgetKey, WidgetSize};

/// A heading whose level follows the widget size
pub struct HeadingWidget {
    base: WidgetBase,
    static_text: Option<String>,
}

impl HeadingWidget {
    pub fn new(id: impl Into<String>, static_text: Option<String>) -> Self {
        Self {
            base: WidgetBase::new(id),
            static_text,
        }
    }
}

fn heading_tag(size: WidgetSize) -> &'static str {
    match size {
        WidgetSize::Huge => "h1",
        WidgetSize::Large => "h2",
        WidgetSize::Medium | WidgetSize::Default => "h3",
        WidgetSize::Small => "h4",
        WidgetSize::Tiny => "h5",
        WidgetSize::Micro => "h6",
    }
}

impl Widget for HeadingWidget {
    widget_accessors!("heading");

    fn render(&self, key: WidgetKey, cx: &RenderContext<'_>, m: &mut MarkupBuilder) {
        let text = match &self.static_text {
            Some(t) => t.clone(),
            None => cx.string_value(key),
        };
        m.tg_open(heading_tag(self.base.size))
            .attr("id", &cx.dom_id(key));
        // Micro headings are small print, right justified
        if self.base.size == WidgetSize::Micro {
            m.style("font-size:50%").a(" class='text-end'");
        }
        m.tg_content();
        m.escape(&text);
        m.tg_close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::WidgetTree;

    #[test]
    fn test_heading_levels() {
        let mut tree = WidgetTree::new();
        let mut big = HeadingWidget::new("big", Some("Animals".into()));
        big.base_mut().size = WidgetSize::Huge;
        let big = tree.insert(Box::new(big), None, None);
        let plain = tree.insert(Box::new(HeadingWidget::new("plain", None)), None, None);
        tree.state_mut().put("plain", "From state");

        assert!(tree.render_markup(big).starts_with("<h1 id='big'>"));
        let html = tree.render_markup(plain);
        assert!(html.starts_with("<h3 id='plain'>"));
        assert!(html.contains("From state"));
    }
}
