//! Fluent construction of widget trees
//!
//! A [`WidgetManager`] borrows a [`WidgetTree`] for the duration of one
//! build. Attributes such as the id, label, size or listener are staged with
//! single-shot calls and consumed by the next `add_*` call:
//!
//! ```ignore
//! let mut m = WidgetManager::new(&mut tree);
//! m.open();
//! m.col(6);
//! m.id("bird").label("Favourite bird").add_input(check_bird);
//! m.label("Submit").add_button(submit);
//! m.close();
//! m.finish();
//! ```
//!
//! Staging a field that the next `add_*` does not use, staging the same
//! field twice, or leaving a stack unbalanced are programming errors and
//! panic.

use trellis_core::StateProvider;

use crate::tree::{ProviderId, WidgetTree};
use crate::widget::{Listener, Widget, WidgetAlign, WidgetEvent, WidgetKey, WidgetSize};
use crate::widgets::{
    AlertClass, AlertWidget, ButtonWidget, CheckboxWidget, ContainerWidget, FileUploadWidget,
    HeadingWidget, ImageWidget, InputWidget, ListSource, ListWidget, TextWidget, UrlProvider,
};

/// Attributes staged for the next widget
#[derive(Default)]
struct Pending {
    id: Option<String>,
    label: Option<String>,
    size: WidgetSize,
    align: WidgetAlign,
    listener: Option<Listener>,
}

impl Pending {
    fn is_clear(&self) -> bool {
        self.id.is_none()
            && self.label.is_none()
            && self.size == WidgetSize::Default
            && self.align == WidgetAlign::Default
            && self.listener.is_none()
    }

    fn describe(&self) -> String {
        let mut fields = Vec::new();
        if let Some(id) = &self.id {
            fields.push(format!("id '{id}'"));
        }
        if let Some(label) = &self.label {
            fields.push(format!("label '{label}'"));
        }
        if self.size != WidgetSize::Default {
            fields.push(format!("size {:?}", self.size));
        }
        if self.align != WidgetAlign::Default {
            fields.push(format!("align {:?}", self.align));
        }
        if self.listener.is_some() {
            fields.push("listener".to_string());
        }
        fields.join(", ")
    }
}

pub struct WidgetManager<'t> {
    tree: &'t mut WidgetTree,
    containers: Vec<WidgetKey>,
    /// Cumulative id prefixes; the last one is applied
    id_prefixes: Vec<String>,
    providers: Vec<ProviderId>,
    pending: Pending,
}

impl<'t> WidgetManager<'t> {
    pub fn new(tree: &'t mut WidgetTree) -> Self {
        Self {
            tree,
            containers: Vec::new(),
            id_prefixes: Vec::new(),
            providers: Vec::new(),
            pending: Pending::default(),
        }
    }

    pub fn tree(&self) -> &WidgetTree {
        &*self.tree
    }

    pub fn tree_mut(&mut self) -> &mut WidgetTree {
        &mut *self.tree
    }

    // =========================================================================
    // Staging
    // =========================================================================

    /// Stage the id of the next widget; without one an anonymous id is used
    pub fn id(&mut self, id: impl Into<String>) -> &mut Self {
        let id = id.into();
        if let Some(previous) = &self.pending.id {
            panic!("id '{id}' staged while '{previous}' is still pending");
        }
        self.pending.id = Some(id);
        self
    }

    /// Stage a label; text and heading widgets show it as fixed content
    pub fn label(&mut self, label: impl Into<String>) -> &mut Self {
        let label = label.into();
        if let Some(previous) = &self.pending.label {
            panic!("label '{label}' staged while '{previous}' is still pending");
        }
        self.pending.label = Some(label);
        self
    }

    pub fn size(&mut self, size: WidgetSize) -> &mut Self {
        self.pending.size = size;
        self
    }

    pub fn align(&mut self, align: WidgetAlign) -> &mut Self {
        self.pending.align = align;
        self
    }

    /// Stage a low-level listener for the next widget
    pub fn listener(&mut self, listener: Listener) -> &mut Self {
        assert!(
            self.pending.listener.is_none(),
            "listener staged while another is still pending"
        );
        self.pending.listener = Some(listener);
        self
    }

    /// Column width given to the following children of the current container
    pub fn col(&mut self, columns: usize) -> &mut Self {
        let container = self.current_container();
        self.tree.set_columns(container, columns);
        self
    }

    pub fn pending_is_clear(&self) -> bool {
        self.pending.is_clear()
    }

    /// End of a terminal call: every staged field must have been consumed
    pub fn reset(&mut self) {
        if !self.pending.is_clear() {
            panic!("pending fields not used: {}", self.pending.describe());
        }
        self.pending = Pending::default();
    }

    // =========================================================================
    // Containers
    // =========================================================================

    /// Add a grid container and make it current
    pub fn open(&mut self) -> WidgetKey {
        let id = self.take_id();
        self.push_container(Box::new(ContainerWidget::new(id)))
    }

    /// Add a list and make it current; the single widget added to it before
    /// [`close`](Self::close) is the item template
    pub fn open_list(&mut self, source: impl ListSource + 'static) -> WidgetKey {
        let id = self.take_id();
        self.push_container(Box::new(ListWidget::new(id, Box::new(source))))
    }

    fn push_container(&mut self, widget: Box<dyn Widget>) -> WidgetKey {
        let key = self.add_staged(widget);
        self.containers.push(key);
        key
    }

    pub fn close(&mut self) {
        let Some(key) = self.containers.pop() else {
            panic!("close() with no open container");
        };
        if self.tree.widget_as::<ListWidget>(key).is_some() {
            let count = self.tree.children(key).len();
            assert!(
                count == 1,
                "list '{}' must have exactly one item template, has {count}",
                self.tree.widget(key).id()
            );
        }
        assert!(
            self.pending.is_clear(),
            "pending fields at close: {}",
            self.pending.describe()
        );
    }

    /// Rebuild an existing container: its children are discarded and it
    /// becomes current until the matching [`close`](Self::close)
    pub fn with(&mut self, container: WidgetKey) -> &mut Self {
        assert!(
            self.tree.widget(container).is_container(),
            "'{}' is not a container",
            self.tree.widget(container).id()
        );
        self.tree.clear_children(container);
        self.tree.repaint(container);
        self.containers.push(container);
        self
    }

    pub fn current_container(&self) -> WidgetKey {
        match self.containers.last() {
            Some(&key) => key,
            None => panic!("no open container"),
        }
    }

    // =========================================================================
    // Id prefixes and state providers
    // =========================================================================

    pub fn push_id_prefix(&mut self, prefix: &str) {
        let combined = format!("{}{prefix}", self.id_prefix());
        self.id_prefixes.push(combined);
    }

    pub fn pop_id_prefix(&mut self) {
        if self.id_prefixes.pop().is_none() {
            panic!("pop_id_prefix() with no prefix pushed");
        }
    }

    /// Run `build` with `prefix` added to every id it registers
    pub fn with_id_prefix<R>(&mut self, prefix: &str, build: impl FnOnce(&mut Self) -> R) -> R {
        self.push_id_prefix(prefix);
        let depth = self.id_prefixes.len();
        let result = build(self);
        assert_eq!(depth, self.id_prefixes.len(), "unbalanced id prefixes inside '{prefix}'");
        self.pop_id_prefix();
        result
    }

    pub fn id_prefix(&self) -> &str {
        self.id_prefixes.last().map(String::as_str).unwrap_or("")
    }

    /// The id a widget staged with `id` would be registered under
    pub fn resolve_id(&self, id: &str) -> String {
        format!("{}{id}", self.id_prefix())
    }

    /// Bind subsequently added widgets to `provider` until the matching pop
    pub fn push_state_provider(&mut self, provider: StateProvider) -> ProviderId {
        let id = self.tree.add_provider(provider);
        self.providers.push(id);
        id
    }

    pub fn pop_state_provider(&mut self) {
        if self.providers.pop().is_none() {
            panic!("pop_state_provider() with no provider pushed");
        }
    }

    pub fn with_state_provider<R>(
        &mut self,
        provider: StateProvider,
        build: impl FnOnce(&mut Self) -> R,
    ) -> R {
        self.push_state_provider(provider);
        let depth = self.providers.len();
        let result = build(self);
        assert_eq!(depth, self.providers.len(), "unbalanced state providers");
        self.pop_state_provider();
        result
    }

    // =========================================================================
    // Widgets
    // =========================================================================

    /// Text from the staged label, or from state under the widget's id
    pub fn add_text(&mut self) -> WidgetKey {
        let id = self.take_id();
        let widget = match self.pending.label.take() {
            Some(text) => TextWidget::with_text(id, text),
            None => TextWidget::new(id),
        };
        self.add_staged(Box::new(widget))
    }

    pub fn add_heading(&mut self) -> WidgetKey {
        let id = self.take_id();
        let label = self.pending.label.take();
        self.add_staged(Box::new(HeadingWidget::new(id, label)))
    }

    /// Text field whose listener returns the value to store or a problem
    pub fn add_input<F>(&mut self, listener: F) -> WidgetKey
    where
        F: Fn(&mut WidgetTree, &WidgetEvent, &str) -> Result<String, String> + Send + Sync + 'static,
    {
        self.add_text_field(false, InputWidget::wrap(listener))
    }

    pub fn add_password<F>(&mut self, listener: F) -> WidgetKey
    where
        F: Fn(&mut WidgetTree, &WidgetEvent, &str) -> Result<String, String> + Send + Sync + 'static,
    {
        self.add_text_field(true, InputWidget::wrap(listener))
    }

    fn add_text_field(&mut self, password: bool, listener: Listener) -> WidgetKey {
        let id = self.take_id();
        let label = self.pending.label.take();
        let mut widget = InputWidget::new(id, label, password);
        widget.base_mut().set_listener(listener);
        self.add_staged(Box::new(widget))
    }

    pub fn add_button<F>(&mut self, listener: F) -> WidgetKey
    where
        F: Fn(&mut WidgetTree, &WidgetEvent) + Send + Sync + 'static,
    {
        let id = self.take_id();
        let label = self.pending.label.take().unwrap_or_default();
        let mut widget = ButtonWidget::new(id, label);
        widget.base_mut().set_listener(ButtonWidget::wrap(listener));
        self.add_staged(Box::new(widget))
    }

    pub fn add_checkbox<F>(&mut self, listener: F) -> WidgetKey
    where
        F: Fn(&mut WidgetTree, &WidgetEvent, bool) -> Result<bool, String> + Send + Sync + 'static,
    {
        self.add_toggle(false, CheckboxWidget::wrap(listener))
    }

    pub fn add_switch<F>(&mut self, listener: F) -> WidgetKey
    where
        F: Fn(&mut WidgetTree, &WidgetEvent, bool) -> Result<bool, String> + Send + Sync + 'static,
    {
        self.add_toggle(true, CheckboxWidget::wrap(listener))
    }

    fn add_toggle(&mut self, switch: bool, listener: Listener) -> WidgetKey {
        let id = self.take_id();
        let label = self.pending.label.take().unwrap_or_default();
        let mut widget = CheckboxWidget::new(id, label, switch);
        widget.base_mut().set_listener(listener);
        self.add_staged(Box::new(widget))
    }

    /// Image whose URL is derived from the widget's value by `url_provider`
    pub fn add_image(&mut self, url_provider: Option<UrlProvider>) -> WidgetKey {
        let id = self.take_id();
        self.add_staged(Box::new(ImageWidget::new(id, url_provider)))
    }

    pub fn add_file_upload<F>(&mut self, upload: F) -> WidgetKey
    where
        F: Fn(&mut WidgetTree, &WidgetEvent, &[u8]) -> Result<(), String> + Send + Sync + 'static,
    {
        let id = self.take_id();
        let label = self.pending.label.take();
        self.add_staged(Box::new(FileUploadWidget::new(id, label, upload)))
    }

    /// Alert showing the state value under its id
    pub fn add_alert(&mut self, class: AlertClass) -> WidgetKey {
        let id = self.take_id();
        self.add_staged(Box::new(AlertWidget::new(id, class)))
    }

    /// Empty filler occupying one grid cell
    pub fn add_space(&mut self) -> WidgetKey {
        let id = self.tree.allocate_anonymous_id();
        self.add_staged(Box::new(TextWidget::with_text(id, "")))
    }

    /// Add a widget constructed by the caller; its id gets the current prefix
    pub fn add(&mut self, mut widget: Box<dyn Widget>) -> WidgetKey {
        assert!(
            self.pending.id.is_none(),
            "add() uses the widget's own id, but id is staged: {}",
            self.pending.describe()
        );
        let id = self.resolve_id(widget.id());
        widget.base_mut().id = id;
        self.add_staged(widget)
    }

    /// Check that the build is complete: no open containers, prefixes or
    /// providers, and nothing staged
    pub fn finish(self) {
        assert!(
            self.containers.is_empty(),
            "{} container(s) left open",
            self.containers.len()
        );
        assert!(self.id_prefixes.is_empty(), "id prefix left pushed");
        assert!(self.providers.is_empty(), "state provider left pushed");
        assert!(
            self.pending.is_clear(),
            "pending fields at finish: {}",
            self.pending.describe()
        );
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn take_id(&mut self) -> String {
        match self.pending.id.take() {
            Some(id) => self.resolve_id(&id),
            None => self.tree.allocate_anonymous_id(),
        }
    }

    /// Apply the remaining staged attributes, attach, and reset
    fn add_staged(&mut self, mut widget: Box<dyn Widget>) -> WidgetKey {
        let base = widget.base_mut();
        base.size = std::mem::take(&mut self.pending.size);
        base.align = std::mem::take(&mut self.pending.align);
        if let Some(listener) = self.pending.listener.take() {
            base.set_listener(listener);
        }
        let key = self.attach(widget);
        self.reset();
        key
    }

    fn attach(&mut self, widget: Box<dyn Widget>) -> WidgetKey {
        let provider = self.providers.last().copied();
        match self.containers.last().copied() {
            Some(parent) => self.tree.insert(widget, Some(parent), provider),
            None => {
                if let Some(root) = self.tree.root() {
                    panic!(
                        "no open container for '{}'; tree already has root '{}'",
                        widget.id(),
                        self.tree.widget(root).id()
                    );
                }
                let key = self.tree.insert(widget, None, provider);
                self.tree.set_root(key);
                key
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::BasicList;
    use trellis_core::StateMap;

    #[test]
    fn test_id_prefix_round_trip() {
        let mut tree = WidgetTree::new();
        let mut m = WidgetManager::new(&mut tree);
        m.open();
        m.push_id_prefix("row7:");
        let name = m.id("name").add_text();
        assert_eq!(m.tree().widget(name).id(), "row7:name");
        m.pop_id_prefix();
        assert_eq!(m.id_prefix(), "");
        let plain = m.id("name").add_text();
        assert_eq!(m.tree().widget(plain).id(), "name");
        m.close();
        m.finish();
    }

    #[test]
    fn test_nested_prefixes_restore_exactly() {
        let mut tree = WidgetTree::new();
        let mut m = WidgetManager::new(&mut tree);
        m.push_id_prefix("a:");
        m.with_id_prefix("b:", |m| assert_eq!(m.resolve_id("x"), "a:b:x"));
        assert_eq!(m.id_prefix(), "a:");
        m.pop_id_prefix();
        m.finish();
    }

    #[test]
    fn test_pending_fields_cleared_after_add() {
        let mut tree = WidgetTree::new();
        let mut m = WidgetManager::new(&mut tree);
        m.open();
        let key = m
            .id("go")
            .label("Go")
            .size(WidgetSize::Large)
            .align(WidgetAlign::Right)
            .add_button(|_, _| {});
        assert!(m.pending_is_clear());
        assert_eq!(m.tree().widget(key).base().size, WidgetSize::Large);
        m.close();
        m.finish();
    }

    #[test]
    fn test_columns_and_anonymous_ids() {
        let mut tree = WidgetTree::new();
        let mut m = WidgetManager::new(&mut tree);
        let page = m.open();
        m.col(6);
        let a = m.add_text();
        let b = m.add_space();
        m.close();
        m.finish();

        assert!(tree.widget(a).id().starts_with('.'));
        assert_ne!(tree.widget(a).id(), tree.widget(b).id());
        assert_eq!(tree.root(), Some(page));
        let cells = tree.cells(page);
        assert_eq!((cells[0].width, cells[1].width), (6, 6));
        assert_eq!(cells[1].x, 6);
    }

    #[test]
    fn test_state_provider_binds_widgets() {
        let mut tree = WidgetTree::new();
        let mut m = WidgetManager::new(&mut tree);
        m.open();
        let mut record = StateMap::new();
        record.put("name", "Rex");
        let name = m.with_state_provider(StateProvider::new("pet:", record), |m| {
            m.with_id_prefix("pet:", |m| m.id("name").add_text())
        });
        m.close();
        m.finish();
        assert_eq!(tree.widget(name).id(), "pet:name");
        assert_eq!(tree.str_value("pet:name"), "Rex");
    }

    #[test]
    fn test_with_rebuilds_container() {
        let mut tree = WidgetTree::new();
        let mut m = WidgetManager::new(&mut tree);
        let page = m.id("page").open();
        m.id("old").add_text();
        m.close();
        m.finish();
        tree.clear_dirty();

        let mut m = WidgetManager::new(&mut tree);
        m.with(page);
        m.id("new").add_text();
        m.close();
        m.finish();
        assert!(tree.find("old").is_none());
        assert!(tree.find("new").is_some());
        assert!(tree.is_dirty(page));
    }

    #[test]
    fn test_list_template() {
        let mut tree = WidgetTree::new();
        let mut m = WidgetManager::new(&mut tree);
        m.open();
        let list = m.id("animals").open_list(BasicList::new(vec![1, 2], 10));
        m.open();
        m.id("name").add_text();
        m.close();
        m.close();
        m.close();
        m.finish();
        assert_eq!(tree.children(list).len(), 1);
    }

    #[test]
    #[should_panic(expected = "exactly one item template")]
    fn test_list_needs_one_template() {
        let mut tree = WidgetTree::new();
        let mut m = WidgetManager::new(&mut tree);
        m.open();
        m.open_list(BasicList::new(vec![1], 10));
        m.add_text();
        m.add_text();
        m.close();
    }

    #[test]
    #[should_panic(expected = "duplicate id: 'bird'")]
    fn test_duplicate_id_is_fatal() {
        let mut tree = WidgetTree::new();
        let mut m = WidgetManager::new(&mut tree);
        m.open();
        m.id("bird").add_text();
        m.id("bird").add_text();
    }

    #[test]
    #[should_panic(expected = "close() with no open container")]
    fn test_close_on_empty_stack_is_fatal() {
        let mut tree = WidgetTree::new();
        let mut m = WidgetManager::new(&mut tree);
        m.close();
    }

    #[test]
    #[should_panic(expected = "pending fields not used: label 'lost'")]
    fn test_leaked_label_is_fatal() {
        let mut tree = WidgetTree::new();
        let mut m = WidgetManager::new(&mut tree);
        m.open();
        m.label("lost").add_image(None);
    }

    #[test]
    #[should_panic(expected = "still pending")]
    fn test_double_staging_is_fatal() {
        let mut tree = WidgetTree::new();
        let mut m = WidgetManager::new(&mut tree);
        m.id("a").id("b");
    }

    #[test]
    #[should_panic(expected = "container(s) left open")]
    fn test_finish_detects_open_container() {
        let mut tree = WidgetTree::new();
        let mut m = WidgetManager::new(&mut tree);
        m.open();
        m.finish();
    }
}
