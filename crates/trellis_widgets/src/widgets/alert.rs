use trellis_core::MarkupBuilder;

use crate::render::RenderContext;
use crate::widget::{widget_accessors, Widget, WidgetBase, WidgetKey};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AlertClass {
    Success,
    #[default]
    Info,
    Warning,
    Danger,
}

impl AlertClass {
    pub fn css_name(self) -> &'static str {
        match self {
            AlertClass::Success => "success",
            AlertClass::Info => "info",
            AlertClass::Warning => "warning",
            AlertClass::Danger => "danger",
        }
    }

    /// The following class, wrapping around
    pub fn next(self) -> Self {
        match self {
            AlertClass::Success => AlertClass::Info,
            AlertClass::Info => AlertClass::Warning,
            AlertClass::Warning => AlertClass::Danger,
            AlertClass::Danger => AlertClass::Success,
        }
    }
}

/// A colored message box; the message is the widget's state value
pub struct AlertWidget {
    base: WidgetBase,
    pub class: AlertClass,
}

impl AlertWidget {
    pub fn new(id: impl Into<String>, class: AlertClass) -> Self {
        Self {
            base: WidgetBase::new(id),
            class,
        }
    }
}

impl Widget for AlertWidget {
    widget_accessors!("alert");

    fn render(&self, key: WidgetKey, cx: &RenderContext<'_>, m: &mut MarkupBuilder) {
        m.tg_open("div")
            .attr("class", &format!("alert alert-{}", self.class.css_name()))
            .a(" role='alert'")
            .attr("id", &cx.dom_id(key))
            .tg_content();
        m.escape(&cx.string_value(key));
        m.tg_close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::WidgetTree;

    #[test]
    fn test_alert_class_cycle() {
        let mut class = AlertClass::Success;
        for _ in 0..4 {
            class = class.next();
        }
        assert_eq!(class, AlertClass::Success);
    }

    #[test]
    fn test_alert_render() {
        let mut tree = WidgetTree::new();
        let key = tree.insert(Box::new(AlertWidget::new("note", AlertClass::Warning)), None, None);
        tree.state_mut().put("note", "Clicked: launch");
        let html = tree.render_markup(key);
        assert!(html.starts_with("<div class='alert alert-warning' role='alert' id='note'>"));
        assert!(html.contains("Clicked: launch"));

        tree.set_visible(key, false);
        assert_eq!(tree.render_markup(key), "<div id='note' hidden></div>\n");
    }
}
