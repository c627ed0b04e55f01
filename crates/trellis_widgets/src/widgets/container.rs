use trellis_core::MarkupBuilder;

use crate::render::RenderContext;
use crate::widget::{widget_accessors, Widget, WidgetBase, WidgetKey};

/// A widget that lays out its children on the column grid
pub struct ContainerWidget {
    base: WidgetBase,
}

impl ContainerWidget {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            base: WidgetBase::new(id),
        }
    }
}

impl Widget for ContainerWidget {
    widget_accessors!("container");

    fn is_container(&self) -> bool {
        true
    }

    fn render(&self, key: WidgetKey, cx: &RenderContext<'_>, m: &mut MarkupBuilder) {
        let tree = cx.tree();
        let children = tree.children(key);
        let cells = tree.cells(key);
        assert_eq!(
            children.len(),
            cells.len(),
            "container '{}' has mismatched children and cells",
            self.id()
        );

        m.tg_open("div").attr("id", &cx.dom_id(key)).tg_content();
        let mut row = None;
        for (&child, cell) in children.iter().zip(cells) {
            if row != Some(cell.y) {
                if row.is_some() {
                    m.close_tag();
                }
                m.open_tag("div class='row'");
                row = Some(cell.y);
            }
            m.open_tag(&format!("div class='col-sm-{}'", cell.width));
            cx.render(child, m);
            m.close_tag();
        }
        if row.is_some() {
            m.close_tag();
        }
        m.tg_close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::WidgetTree;
    use crate::widgets::TextWidget;

    #[test]
    fn test_two_half_width_children() {
        let mut tree = WidgetTree::new();
        let page = tree.insert(Box::new(ContainerWidget::new("page")), None, None);
        tree.set_root(page);
        tree.set_columns(page, 6);
        tree.insert(Box::new(TextWidget::with_text("l", "left")), Some(page), None);
        tree.insert(Box::new(TextWidget::with_text("r", "right")), Some(page), None);

        let html = tree.render_markup(page);
        assert_eq!(html.matches("class='row'").count(), 1);
        assert_eq!(html.matches("class='col-sm-6'").count(), 2);
        assert!(html.find("left").unwrap() < html.find("right").unwrap());
    }

    #[test]
    fn test_overflowing_child_starts_new_row() {
        let mut tree = WidgetTree::new();
        let page = tree.insert(Box::new(ContainerWidget::new("page")), None, None);
        tree.set_columns(page, 8);
        tree.insert(Box::new(TextWidget::new("a")), Some(page), None);
        tree.insert(Box::new(TextWidget::new("b")), Some(page), None);

        let html = tree.render_markup(page);
        assert_eq!(html.matches("class='row'").count(), 2);
    }

    #[test]
    fn test_hidden_container_renders_placeholder() {
        let mut tree = WidgetTree::new();
        let page = tree.insert(Box::new(ContainerWidget::new("page")), None, None);
        tree.insert(Box::new(TextWidget::with_text("a", "secret")), Some(page), None);
        tree.set_visible(page, false);

        let html = tree.render_markup(page);
        assert_eq!(html, "<div id='page' hidden></div>\n");
    }
}
