use std::sync::Arc;

use trellis_core::MarkupBuilder;

use crate::error::RequestError;
use crate::render::RenderContext;
use crate::tree::WidgetTree;
use crate::widget::{
    widget_accessors, EventOutcome, Listener, Widget, WidgetAlign, WidgetBase, WidgetEvent,
    WidgetKey, WidgetSize,
};

pub struct ButtonWidget {
    base: WidgetBase,
    label: String,
}

impl ButtonWidget {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            base: WidgetBase::new(id),
            label: label.into(),
        }
    }

    pub fn wrap<F>(listener: F) -> Listener
    where
        F: Fn(&mut WidgetTree, &WidgetEvent) + Send + Sync + 'static,
    {
        Arc::new(move |tree: &mut WidgetTree, event: &mut WidgetEvent| -> Result<EventOutcome, RequestError> {
            listener(tree, event);
            Ok(EventOutcome::none())
        })
    }
}

impl Widget for ButtonWidget {
    widget_accessors!("button");

    fn render(&self, key: WidgetKey, cx: &RenderContext<'_>, m: &mut MarkupBuilder) {
        let dom_id = cx.dom_id(key);
        m.tg_open("div")
            .attr("id", &dom_id)
            .a(" class='py-1'")
            .tg_content();

        let mut class = match self.base.size {
            // Tiny buttons are small link-styled text
            WidgetSize::Tiny | WidgetSize::Micro => String::from("btn btn-link text-decoration-none"),
            WidgetSize::Large | WidgetSize::Huge => String::from("btn btn-primary btn-lg"),
            WidgetSize::Small => String::from("btn btn-primary btn-sm"),
            _ => String::from("btn btn-primary"),
        };
        match self.base.align {
            WidgetAlign::Right => class.push_str(" float-end"),
            WidgetAlign::Center => class.push_str(" mx-auto d-block"),
            _ => {}
        }
        m.tg_open("button").attr("class", &class);
        if matches!(self.base.size, WidgetSize::Tiny | WidgetSize::Micro) {
            m.style("font-size: 0.6em");
        }
        if !self.base.enabled {
            m.a(" disabled");
        }
        m.a(&format!(" onclick='jsButton(\"{dom_id}\")'"));
        m.tg_content();
        m.escape(&self.label);
        m.tg_close();
        m.tg_close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_render() {
        let mut tree = WidgetTree::new();
        let mut button = ButtonWidget::new("launch", "Launch");
        button.base_mut().align = WidgetAlign::Right;
        let key = tree.insert(Box::new(button), None, None);
        tree.set_enabled(key, false);

        let html = tree.render_markup(key);
        assert!(html.contains("class='btn btn-primary float-end' disabled"));
        assert!(html.contains("jsButton(\"launch\")"));
        assert!(html.contains("Launch"));
    }

    #[test]
    fn test_button_listener_stores_nothing() {
        let mut tree = WidgetTree::new();
        let key = tree.insert(Box::new(ButtonWidget::new("b", "B")), None, None);
        let listener = ButtonWidget::wrap(|tree, _| {
            tree.state_mut().put("clicked", true);
        });
        let outcome = listener(&mut tree, &mut WidgetEvent::new(key, "b", "")).unwrap();
        assert_eq!(outcome, EventOutcome::none());
        assert!(tree.state().opt_bool("clicked", false));
    }
}
