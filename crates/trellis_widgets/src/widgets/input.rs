use std::sync::Arc;

use serde_json::Value;
use trellis_core::MarkupBuilder;

use crate::error::RequestError;
use crate::render::RenderContext;
use crate::tree::WidgetTree;
use crate::widget::{widget_accessors, EventOutcome, Listener, Widget, WidgetBase, WidgetEvent, WidgetKey};

/// An editable single-line text field
pub struct InputWidget {
    base: WidgetBase,
    label: Option<String>,
    password: bool,
}

impl InputWidget {
    pub fn new(id: impl Into<String>, label: Option<String>, password: bool) -> Self {
        Self {
            base: WidgetBase::new(id),
            label,
            password,
        }
    }

    /// Wrap a validating listener, which returns the value to store or a
    /// problem to show next to the field
    ///
    /// A rejected value is still stored, so the field keeps showing what the
    /// user typed alongside the problem.
    pub fn wrap<F>(listener: F) -> Listener
    where
        F: Fn(&mut WidgetTree, &WidgetEvent, &str) -> Result<String, String> + Send + Sync + 'static,
    {
        Arc::new(move |tree: &mut WidgetTree, event: &mut WidgetEvent| -> Result<EventOutcome, RequestError> {
            let submitted = event.value.clone();
            Ok(match listener(tree, event, &submitted) {
                Ok(accepted) => EventOutcome::value(accepted),
                Err(problem) => EventOutcome::value(Value::String(submitted)).with_problem(problem),
            })
        })
    }

    fn aux_id(dom_id: &str) -> String {
        format!("{dom_id}.aux")
    }
}

impl Widget for InputWidget {
    widget_accessors!("input");

    fn render(&self, key: WidgetKey, cx: &RenderContext<'_>, m: &mut MarkupBuilder) {
        let dom_id = cx.dom_id(key);
        let aux_id = Self::aux_id(&dom_id);
        let problem = cx.problem(key);

        m.tg_open("div").attr("id", &dom_id).a(" class='mb-3'").tg_content();
        if let Some(label) = &self.label {
            m.tg_open("label")
                .attr("for", &aux_id)
                .a(" class='form-label'")
                .tg_content();
            m.escape(label);
            m.tg_close();
        }

        let mut class = String::from("form-control");
        if problem.is_some() {
            class.push_str(" is-invalid");
        }
        m.tg_open("input")
            .a(if self.password { " type='password'" } else { " type='text'" })
            .attr("class", &class)
            .attr("id", &aux_id)
            .attr("value", &cx.string_value(key));
        if !self.base.enabled {
            m.a(" disabled");
        }
        m.a(&format!(" onchange='jsVal(\"{dom_id}\")'"));
        m.tg_close();

        if let Some(problem) = problem {
            m.tg_open("div").a(" class='form-text text-danger'").tg_content();
            m.escape(&problem);
            m.tg_close();
        }
        m.tg_close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bird_listener() -> Listener {
        InputWidget::wrap(|_, _, value| {
            if value == "parrot" {
                Err("No parrots, please!".to_string())
            } else {
                Ok(value.to_string())
            }
        })
    }

    #[test]
    fn test_listener_reports_problem_and_keeps_value() {
        let mut tree = WidgetTree::new();
        let key = tree.insert(Box::new(InputWidget::new("bird", None, false)), None, None);
        let listener = bird_listener();

        let mut event = WidgetEvent::new(key, "bird", "parrot");
        let outcome = listener(&mut tree, &mut event).unwrap();
        assert_eq!(outcome.problem.as_deref(), Some("No parrots, please!"));
        assert_eq!(outcome.value, Some(Value::from("parrot")));

        let mut event = WidgetEvent::new(key, "bird", "sparrow");
        let outcome = listener(&mut tree, &mut event).unwrap();
        assert_eq!(outcome, EventOutcome::value("sparrow"));
    }

    #[test]
    fn test_render_shows_value_label_and_problem() {
        let mut tree = WidgetTree::new();
        let key = tree.insert(
            Box::new(InputWidget::new("bird", Some("Bird".into()), false)),
            None,
            None,
        );
        tree.state_mut().put("bird", "it's a <jay>");
        tree.set_widget_problem(key, Some("Too noisy"));

        let html = tree.render_markup(key);
        assert!(html.starts_with("<div id='bird' class='mb-3'>"));
        assert!(html.contains("<label for='bird.aux' class='form-label'>"));
        assert!(html.contains("it&#x27;s a &lt;jay&gt;"));
        assert!(html.contains("is-invalid"));
        assert!(html.contains("Too noisy"));
        assert!(html.contains("jsVal(\"bird\")"));
    }
}
