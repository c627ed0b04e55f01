//! Arena-backed widget tree with dirty propagation
//!
//! Widgets are stored in a [`SlotMap`] and addressed by [`WidgetKey`]. Each
//! node records its parent, so marking ancestors is a walk up parent links
//! rather than a search. The tree also owns the state map widgets render
//! from and the repaint flags of the current request.
//!
//! # Repainting
//!
//! [`WidgetTree::repaint`] flags a widget dirty, its descendants at least
//! dirty-below, and every strict ancestor dirty-below. [`WidgetTree::build_patch`]
//! then visits only flagged nodes, rendering the dirty ones, and returns the
//! fragments keyed by widget id.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::Value;
use slotmap::SlotMap;
use smallvec::SmallVec;
use trellis_core::{problem_key, MarkupBuilder, StateMap, StateProvider};

use crate::dirty::{DirtyTracker, Repaint};
use crate::grid::GridCell;
use crate::render::RenderContext;
use crate::widget::{is_anonymous_id, Widget, WidgetKey, ANONYMOUS_PREFIX, MAX_COLUMNS};

/// Index of a state provider bound to widgets at build time
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProviderId(usize);

struct WidgetNode {
    widget: Box<dyn Widget>,
    parent: Option<WidgetKey>,
    children: SmallVec<[WidgetKey; 4]>,
    cells: SmallVec<[GridCell; 4]>,
    /// Width given to the next child attached
    columns: usize,
    provider: Option<ProviderId>,
}

/// Rendered fragments to send to the client, keyed by widget id
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Patch {
    fragments: BTreeMap<String, String>,
}

impl Patch {
    pub fn insert(&mut self, id: impl Into<String>, markup: String) {
        self.fragments.insert(id.into(), markup);
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.fragments.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.fragments.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.fragments.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

#[derive(Default)]
pub struct WidgetTree {
    nodes: SlotMap<WidgetKey, WidgetNode>,
    ids: FxHashMap<String, WidgetKey>,
    root: Option<WidgetKey>,
    state: StateMap,
    providers: Vec<StateProvider>,
    dirty: DirtyTracker,
    anonymous_ids: usize,
}

impl WidgetTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: StateMap) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Add a widget, attaching it to `parent` if given
    ///
    /// # Panics
    ///
    /// If the id is already registered or `parent` is not a container.
    pub fn insert(
        &mut self,
        widget: Box<dyn Widget>,
        parent: Option<WidgetKey>,
        provider: Option<ProviderId>,
    ) -> WidgetKey {
        let id = widget.id().to_string();
        if self.ids.contains_key(&id) {
            panic!("attempt to add widget with duplicate id: '{id}'");
        }
        if let Some(p) = parent {
            let parent_widget = self.widget(p);
            assert!(
                parent_widget.is_container(),
                "cannot add '{id}' to '{}', which is not a container",
                parent_widget.id()
            );
        }
        let key = self.nodes.insert(WidgetNode {
            widget,
            parent,
            children: SmallVec::new(),
            cells: SmallVec::new(),
            columns: MAX_COLUMNS,
            provider,
        });
        self.ids.insert(id, key);
        if let Some(p) = parent {
            let node = &mut self.nodes[p];
            let cell = GridCell::after(node.cells.last(), node.columns);
            node.children.push(key);
            node.cells.push(cell);
        }
        key
    }

    pub fn set_root(&mut self, key: WidgetKey) {
        assert!(
            self.nodes[key].parent.is_none(),
            "root widget must not have a parent"
        );
        self.root = Some(key);
    }

    pub fn root(&self) -> Option<WidgetKey> {
        self.root
    }

    /// Set the column width given to children subsequently added to `key`
    pub fn set_columns(&mut self, key: WidgetKey, columns: usize) {
        assert!(
            (1..=MAX_COLUMNS).contains(&columns),
            "column count {columns} outside 1..={MAX_COLUMNS}"
        );
        self.nodes[key].columns = columns;
    }

    /// Remove all descendants of a container, unregistering their ids
    pub fn clear_children(&mut self, key: WidgetKey) {
        let children = std::mem::take(&mut self.nodes[key].children);
        for child in children {
            self.remove_subtree(child);
        }
        let node = &mut self.nodes[key];
        node.cells.clear();
        node.columns = MAX_COLUMNS;
    }

    fn remove_subtree(&mut self, key: WidgetKey) {
        if let Some(node) = self.nodes.remove(key) {
            self.ids.remove(node.widget.id());
            self.dirty.forget(key);
            for child in node.children {
                self.remove_subtree(child);
            }
        }
    }

    /// Discard every widget, keeping the state map
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.ids.clear();
        self.root = None;
        self.providers.clear();
        self.dirty.clear_all();
        self.anonymous_ids = 0;
    }

    /// A fresh id for a widget the caller did not name
    pub fn allocate_anonymous_id(&mut self) -> String {
        self.anonymous_ids += 1;
        format!("{ANONYMOUS_PREFIX}{}", self.anonymous_ids)
    }

    pub fn find(&self, id: &str) -> Option<WidgetKey> {
        self.ids.get(id).copied()
    }

    /// Key of a widget that must exist
    pub fn get(&self, id: &str) -> WidgetKey {
        match self.find(id) {
            Some(key) => key,
            None => panic!("can't find widget with id: '{id}'"),
        }
    }

    pub fn contains(&self, key: WidgetKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn widget(&self, key: WidgetKey) -> &dyn Widget {
        &*self.nodes[key].widget
    }

    pub fn widget_mut(&mut self, key: WidgetKey) -> &mut dyn Widget {
        &mut *self.nodes[key].widget
    }

    /// Downcast a widget to its concrete type
    pub fn widget_as<T: Widget>(&self, key: WidgetKey) -> Option<&T> {
        self.nodes.get(key)?.widget.as_any().downcast_ref::<T>()
    }

    pub fn widget_as_mut<T: Widget>(&mut self, key: WidgetKey) -> Option<&mut T> {
        self.nodes.get_mut(key)?.widget.as_any_mut().downcast_mut::<T>()
    }

    pub fn parent(&self, key: WidgetKey) -> Option<WidgetKey> {
        self.nodes[key].parent
    }

    pub fn children(&self, key: WidgetKey) -> &[WidgetKey] {
        &self.nodes[key].children
    }

    pub fn cells(&self, key: WidgetKey) -> &[GridCell] {
        &self.nodes[key].cells
    }

    /// Whether `ancestor` lies on the path from `key` to the root (inclusive)
    pub fn is_within(&self, key: WidgetKey, ancestor: WidgetKey) -> bool {
        let mut current = Some(key);
        while let Some(k) = current {
            if k == ancestor {
                return true;
            }
            current = self.nodes[k].parent;
        }
        false
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.keys().map(String::as_str)
    }

    // =========================================================================
    // State
    // =========================================================================

    pub fn state(&self) -> &StateMap {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut StateMap {
        &mut self.state
    }

    pub fn add_provider(&mut self, provider: StateProvider) -> ProviderId {
        self.providers.push(provider);
        ProviderId(self.providers.len() - 1)
    }

    pub fn provider(&self, id: ProviderId) -> &StateProvider {
        &self.providers[id.0]
    }

    pub fn provider_mut(&mut self, id: ProviderId) -> &mut StateProvider {
        &mut self.providers[id.0]
    }

    pub(crate) fn bound_provider(&self, key: WidgetKey) -> Option<&StateProvider> {
        self.nodes[key].provider.map(|p| &self.providers[p.0])
    }

    /// Current value of a widget, outside of any list item
    pub fn value(&self, key: WidgetKey) -> Option<&Value> {
        let id = self.widget(key).id();
        match self.bound_provider(key) {
            Some(provider) => provider.get(id),
            None => self.state.get(id),
        }
    }

    /// Store a widget's value; returns whether it changed
    pub fn write_value(&mut self, key: WidgetKey, value: Value) -> bool {
        if self.value(key) == Some(&value) {
            return false;
        }
        let id = self.nodes[key].widget.id().to_string();
        match self.nodes[key].provider {
            Some(p) => self.providers[p.0].put(&id, value),
            None => {
                self.state.put(id, value);
            }
        }
        true
    }

    /// String value of the widget with `id`, or of the raw state key if no
    /// such widget exists
    pub fn str_value(&self, id: &str) -> String {
        let value = match self.find(id) {
            Some(key) => self.value(key),
            None => self.state.get(id),
        };
        match value {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    pub fn int_value(&self, id: &str) -> i64 {
        match self.find(id) {
            Some(key) => self.value(key).and_then(Value::as_i64).unwrap_or(0),
            None => self.state.opt_int(id, 0),
        }
    }

    pub fn bool_value(&self, id: &str) -> bool {
        match self.find(id) {
            Some(key) => self.value(key).and_then(Value::as_bool).unwrap_or(false),
            None => self.state.opt_bool(id, false),
        }
    }

    /// Values of all named widgets that have one
    pub fn read_values(&self) -> StateMap {
        let mut values = StateMap::new();
        for (id, &key) in &self.ids {
            if is_anonymous_id(id) {
                continue;
            }
            if let Some(v) = self.value(key) {
                values.put(id.clone(), v.clone());
            }
        }
        values
    }

    /// Restore values previously returned by [`read_values`](Self::read_values),
    /// skipping ids with no widget
    pub fn set_values(&mut self, values: &StateMap) {
        for (id, value) in values.iter() {
            if let Some(key) = self.find(id) {
                if self.write_value(key, value.clone()) {
                    self.repaint(key);
                }
            }
        }
    }

    // =========================================================================
    // Problems
    // =========================================================================

    pub fn problem(&self, key: WidgetKey) -> Option<String> {
        let text = self
            .state
            .opt_string(&problem_key(self.widget(key).id()), "");
        (!text.is_empty()).then_some(text)
    }

    /// Set or clear the problem shown with a widget, repainting it on change
    pub fn set_widget_problem(&mut self, key: WidgetKey, problem: Option<&str>) -> bool {
        let id = self.widget(key).id().to_string();
        self.set_dom_problem(key, &id, problem)
    }

    pub fn clear_widget_problem(&mut self, key: WidgetKey) -> bool {
        self.set_widget_problem(key, None)
    }

    /// Set or clear the problem stored under a document id (which may carry a
    /// list item prefix), repainting `owner` on change
    pub fn set_dom_problem(&mut self, owner: WidgetKey, dom_id: &str, problem: Option<&str>) -> bool {
        let key = problem_key(dom_id);
        let text = problem.unwrap_or("");
        if self.state.opt_string(&key, "") == text {
            return false;
        }
        if text.is_empty() {
            self.state.delete(&key);
        } else {
            self.state.put(key, text);
        }
        self.repaint(owner);
        true
    }

    /// Number of widgets in the subtree at `key` showing a problem
    pub fn widget_error_count(&self, key: WidgetKey) -> usize {
        let own = usize::from(self.problem(key).is_some());
        own + self
            .children(key)
            .iter()
            .map(|&c| self.widget_error_count(c))
            .sum::<usize>()
    }

    pub fn set_visible(&mut self, key: WidgetKey, visible: bool) {
        if self.widget(key).visible() != visible {
            self.widget_mut(key).base_mut().visible = visible;
            self.repaint(key);
        }
    }

    pub fn set_enabled(&mut self, key: WidgetKey, enabled: bool) {
        if self.widget(key).enabled() != enabled {
            self.widget_mut(key).base_mut().enabled = enabled;
            self.repaint(key);
        }
    }

    // =========================================================================
    // Repainting
    // =========================================================================

    /// Flag a widget for re-rendering in the current request's patch
    pub fn repaint(&mut self, key: WidgetKey) {
        if !self.dirty.mark_dirty(key) {
            return;
        }
        tracing::trace!(target: "trellis::repaint", widget = %self.widget(key).id(), "repaint");

        let mut pending: Vec<WidgetKey> = self.nodes[key].children.to_vec();
        while let Some(k) = pending.pop() {
            self.dirty.mark_below(k);
            pending.extend_from_slice(&self.nodes[k].children);
        }

        let mut current = self.nodes[key].parent;
        while let Some(k) = current {
            self.dirty.mark_below(k);
            current = self.nodes[k].parent;
        }
    }

    pub fn repaint_id(&mut self, id: &str) {
        let key = self.get(id);
        self.repaint(key);
    }

    pub fn repaint_flag(&self, key: WidgetKey) -> Option<Repaint> {
        self.dirty.flag(key)
    }

    pub fn is_dirty(&self, key: WidgetKey) -> bool {
        self.dirty.is_dirty(key)
    }

    pub fn has_dirty(&self) -> bool {
        self.dirty.has_dirty()
    }

    /// Forget all repaint flags; called when a request finishes
    pub fn clear_dirty(&mut self) {
        self.dirty.clear_all();
    }

    /// Render every flagged widget that must be sent to the client
    pub fn build_patch(&self) -> Patch {
        let mut patch = Patch::default();
        if let Some(root) = self.root {
            self.collect_patch(root, &mut patch);
        }
        tracing::trace!(target: "trellis::repaint", fragments = patch.len(), "built patch");
        patch
    }

    fn collect_patch(&self, key: WidgetKey, patch: &mut Patch) {
        let Some(flag) = self.dirty.flag(key) else {
            return;
        };
        let widget = self.widget(key);
        if widget.renders_as_unit() {
            patch.insert(widget.id(), self.render_markup(key));
            return;
        }
        if flag == Repaint::Dirty {
            patch.insert(widget.id(), self.render_markup(key));
        }
        for &child in &self.nodes[key].children {
            self.collect_patch(child, patch);
        }
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Render one widget and its subtree
    pub fn render_markup(&self, key: WidgetKey) -> String {
        let mut m = MarkupBuilder::new();
        RenderContext::new(self).render(key, &mut m);
        m.into_string()
    }

    /// Render the whole tree into `m`
    pub fn render_root(&self, m: &mut MarkupBuilder) {
        match self.root {
            Some(root) => RenderContext::new(self).render(root, m),
            None => {
                m.comment("no page");
            }
        }
    }
}
