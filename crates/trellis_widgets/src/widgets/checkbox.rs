use std::sync::Arc;

use trellis_core::MarkupBuilder;

use crate::error::RequestError;
use crate::render::RenderContext;
use crate::tree::WidgetTree;
use crate::widget::{widget_accessors, EventOutcome, Listener, Widget, WidgetBase, WidgetEvent, WidgetKey};

/// A checkbox, or a toggle switch
pub struct CheckboxWidget {
    base: WidgetBase,
    label: String,
    switch: bool,
}

impl CheckboxWidget {
    pub fn new(id: impl Into<String>, label: impl Into<String>, switch: bool) -> Self {
        Self {
            base: WidgetBase::new(id),
            label: label.into(),
            switch,
        }
    }

    pub fn is_switch(&self) -> bool {
        self.switch
    }

    /// Wrap a listener receiving the new checked state, which returns the
    /// state to store or a problem
    pub fn wrap<F>(listener: F) -> Listener
    where
        F: Fn(&mut WidgetTree, &WidgetEvent, bool) -> Result<bool, String> + Send + Sync + 'static,
    {
        Arc::new(move |tree: &mut WidgetTree, event: &mut WidgetEvent| -> Result<EventOutcome, RequestError> {
            let checked = match event.value.as_str() {
                "true" => true,
                "false" => false,
                other => {
                    return Err(RequestError::MalformedValue {
                        id: event.dom_id.clone(),
                        value: other.to_string(),
                    })
                }
            };
            Ok(match listener(tree, event, checked) {
                Ok(stored) => EventOutcome::value(stored),
                Err(problem) => EventOutcome::value(checked).with_problem(problem),
            })
        })
    }
}

impl Widget for CheckboxWidget {
    widget_accessors!("checkbox");

    fn render(&self, key: WidgetKey, cx: &RenderContext<'_>, m: &mut MarkupBuilder) {
        let dom_id = cx.dom_id(key);
        let aux_id = format!("{dom_id}.aux");

        m.tg_open("div").attr("id", &dom_id).tg_content();
        if self.switch {
            m.open_tag("div class='form-check form-switch'");
        } else {
            m.open_tag("div class='form-check'");
        }

        m.tg_open("input class='form-check-input' type='checkbox'")
            .attr("id", &aux_id);
        if self.switch {
            m.a(" role='switch'");
        }
        if cx.bool_value(key) {
            m.a(" checked");
        }
        if !self.base.enabled {
            m.a(" disabled");
        }
        m.a(&format!(" onclick='jsCheckboxClicked(\"{dom_id}\")'"));
        m.tg_close();

        m.tg_open("label class='form-check-label'")
            .attr("for", &aux_id)
            .tg_content();
        m.escape(&self.label);
        m.tg_close();

        m.close_tag();
        if let Some(problem) = cx.problem(key) {
            m.tg_open("div class='form-text text-danger'").tg_content();
            m.escape(&problem);
            m.tg_close();
        }
        m.tg_close();
    }
}
