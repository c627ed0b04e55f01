//! Rendering context passed down the widget tree
//!
//! A [`RenderContext`] is immutable. Widgets that render a subtree several
//! times (list items) derive a new context with [`RenderContext::with_item`]
//! instead of pushing and popping shared state, so nesting can never become
//! unbalanced.

use serde_json::Value;
use trellis_core::{problem_key, MarkupBuilder, StateProvider};

use crate::tree::WidgetTree;
use crate::widget::WidgetKey;

pub struct RenderContext<'a> {
    tree: &'a WidgetTree,
    id_prefix: String,
    item: Option<&'a StateProvider>,
}

impl<'a> RenderContext<'a> {
    pub fn new(tree: &'a WidgetTree) -> Self {
        Self {
            tree,
            id_prefix: String::new(),
            item: None,
        }
    }

    pub fn tree(&self) -> &'a WidgetTree {
        self.tree
    }

    /// Prefix prepended to every id written into the document
    pub fn id_prefix(&self) -> &str {
        &self.id_prefix
    }

    /// Context for rendering one list item: ids gain `prefix`, and widgets
    /// without a provider of their own read from `provider`
    pub fn with_item<'b>(&'b self, prefix: &str, provider: &'b StateProvider) -> RenderContext<'b> {
        RenderContext {
            tree: self.tree,
            id_prefix: format!("{}{}", self.id_prefix, prefix),
            item: Some(provider),
        }
    }

    /// The id a widget carries in the client document
    pub fn dom_id(&self, key: WidgetKey) -> String {
        format!("{}{}", self.id_prefix, self.tree.widget(key).id())
    }

    /// Value a widget displays
    ///
    /// Looked up in the provider bound to the widget when it was built, else
    /// in the current list item's provider, else in the session state.
    pub fn value(&self, key: WidgetKey) -> Option<&Value> {
        let id = self.tree.widget(key).id();
        if let Some(provider) = self.tree.bound_provider(key) {
            return provider.get(id);
        }
        if let Some(item) = self.item {
            return item.get(id);
        }
        self.tree.state().get(id)
    }

    pub fn string_value(&self, key: WidgetKey) -> String {
        match self.value(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    pub fn bool_value(&self, key: WidgetKey) -> bool {
        match self.value(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s == "true",
            _ => false,
        }
    }

    /// Problem text to display next to a widget, if any
    pub fn problem(&self, key: WidgetKey) -> Option<String> {
        let text = self
            .tree
            .state()
            .opt_string(&problem_key(&self.dom_id(key)), "");
        (!text.is_empty()).then_some(text)
    }

    /// Render a widget, or a placeholder if it is hidden
    pub fn render(&self, key: WidgetKey, m: &mut MarkupBuilder) {
        let widget = self.tree.widget(key);
        if !widget.visible() {
            m.render_invisible(&self.dom_id(key), "div");
            return;
        }
        let token = m.verify_begin();
        widget.render(key, self, m);
        m.verify_end(token, widget.id());
    }
}
