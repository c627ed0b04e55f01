//! Paged lists of items
//!
//! A [`ListWidget`] owns a single child, the item template, built once with
//! the widget manager. At render time the template is drawn once per element
//! on the current page, each time with an id prefix of
//! `<list id>:<element id>:` and the element's own state provider. Events
//! from the rendered copies arrive with those prefixed ids and are routed
//! back to the template's widgets by the list's listener.

use std::sync::Arc;

use trellis_core::{MarkupBuilder, StateProvider};

use crate::error::{RequestError, Result};
use crate::render::RenderContext;
use crate::tree::WidgetTree;
use crate::widget::{widget_accessors, EventOutcome, Widget, WidgetBase, WidgetEvent, WidgetKey};

/// Page links shown at most
const PAGE_WINDOW: usize = 5;

/// A sequence of element ids displayable a page at a time
pub trait ListSource: Send {
    /// Element ids on the current page
    fn page_elements(&self) -> Vec<i64>;
    fn current_page(&self) -> usize;
    fn total_pages(&self) -> usize;
    fn set_current_page(&mut self, page: usize);

    /// State provider for rendering one element. Template widgets bound to
    /// an explicit provider at build time ignore it.
    fn item_provider(&self, element_id: i64) -> StateProvider;
}

/// A list over an in-memory vector of element ids
pub struct BasicList {
    element_ids: Vec<i64>,
    elements_per_page: usize,
    current_page: usize,
    items: Option<Box<dyn Fn(i64) -> StateProvider + Send>>,
}

impl BasicList {
    pub fn new(element_ids: Vec<i64>, elements_per_page: usize) -> Self {
        assert!(elements_per_page > 0, "elements_per_page must be positive");
        Self {
            element_ids,
            elements_per_page,
            current_page: 0,
            items: None,
        }
    }

    /// Supply per-element state
    pub fn with_items(mut self, items: impl Fn(i64) -> StateProvider + Send + 'static) -> Self {
        self.items = Some(Box::new(items));
        self
    }

    pub fn element_ids(&self) -> &[i64] {
        &self.element_ids
    }
}

impl ListSource for BasicList {
    fn page_elements(&self) -> Vec<i64> {
        let start = (self.current_page * self.elements_per_page).min(self.element_ids.len());
        let end = (start + self.elements_per_page).min(self.element_ids.len());
        self.element_ids[start..end].to_vec()
    }

    fn current_page(&self) -> usize {
        self.current_page
    }

    fn total_pages(&self) -> usize {
        self.element_ids.len().div_ceil(self.elements_per_page).max(1)
    }

    fn set_current_page(&mut self, page: usize) {
        assert!(
            page < self.total_pages(),
            "page {page} out of range; total is {}",
            self.total_pages()
        );
        self.current_page = page;
    }

    fn item_provider(&self, element_id: i64) -> StateProvider {
        match &self.items {
            Some(items) => items(element_id),
            None => StateProvider::default(),
        }
    }
}

pub struct ListWidget {
    base: WidgetBase,
    source: Box<dyn ListSource>,
    pub with_page_controls: bool,
}

impl ListWidget {
    pub fn new(id: impl Into<String>, source: Box<dyn ListSource>) -> Self {
        let mut base = WidgetBase::new(id);
        base.set_listener(Arc::new(list_listener));
        Self {
            base,
            source,
            with_page_controls: true,
        }
    }

    pub fn source(&self) -> &dyn ListSource {
        &*self.source
    }

    pub fn source_mut(&mut self) -> &mut dyn ListSource {
        &mut *self.source
    }

    /// Switch page; returns whether the page changed
    pub fn set_page(&mut self, page: usize) -> bool {
        if page == self.source.current_page() {
            return false;
        }
        self.source.set_current_page(page);
        true
    }

    fn render_pagination(&self, dom_id: &str, m: &mut MarkupBuilder) {
        let pages = self.source.total_pages();
        if pages < 2 {
            return;
        }
        let current = self.source.current_page();
        let window = pages.min(PAGE_WINDOW);
        let start = current.saturating_sub(window / 2).min(pages - window);

        m.open_tag("div class='row'");
        m.open_tag("nav aria-label='Page navigation'");
        m.open_tag("ul class='pagination d-flex justify-content-center'");
        self.render_page_link(dom_id, m, "&lt;&lt;", 0, true);
        self.render_page_link(dom_id, m, "&lt;", current.saturating_sub(1), true);
        for page in start..start + window {
            self.render_page_link(dom_id, m, &(page + 1).to_string(), page, false);
        }
        self.render_page_link(dom_id, m, "&gt;", (current + 1).min(pages - 1), true);
        self.render_page_link(dom_id, m, "&gt;&gt;", pages - 1, true);
        m.close_tag();
        m.close_tag();
        m.close_tag();
    }

    fn render_page_link(&self, dom_id: &str, m: &mut MarkupBuilder, label: &str, target: usize, edge: bool) {
        m.a("<li class='page-item'><a class='page-link");
        if target == self.source.current_page() {
            m.a(if edge { " disabled'" } else { " active'" });
        } else {
            m.a(&format!("' onclick='jsButton(\"{dom_id}:page:{target}\")'"));
        }
        m.a(">").a(label).a("</a></li>").cr();
    }
}

impl Widget for ListWidget {
    widget_accessors!("list");

    fn is_container(&self) -> bool {
        true
    }

    fn renders_as_unit(&self) -> bool {
        true
    }

    fn render(&self, key: WidgetKey, cx: &RenderContext<'_>, m: &mut MarkupBuilder) {
        let dom_id = cx.dom_id(key);
        m.tg_open("div").attr("id", &dom_id).tg_content();
        if self.with_page_controls {
            self.render_pagination(&dom_id, m);
        }

        let tree = cx.tree();
        let template = match tree.children(key) {
            [template] => *template,
            other => panic!(
                "list '{}' needs exactly one item template, has {}",
                self.id(),
                other.len()
            ),
        };
        let width = tree.cells(key)[0].width;

        m.open_tag("div class='row'");
        for element in self.source.page_elements() {
            let provider = self.source.item_provider(element);
            let item_prefix = format!("{}:{}:", self.id(), element);
            let item_cx = cx.with_item(&item_prefix, &provider);
            m.open_tag(&format!("div class='col-sm-{width}'"));
            item_cx.render(template, m);
            m.close_tag();
        }
        m.close_tag();

        if self.with_page_controls {
            self.render_pagination(&dom_id, m);
        }
        m.tg_close();
    }
}

/// Routes page-control clicks and events from rendered item widgets
fn list_listener(tree: &mut WidgetTree, event: &mut WidgetEvent) -> Result<EventOutcome> {
    let key = event.widget;

    if event.args.read_if("page") {
        let Some(list) = tree.widget_as_mut::<ListWidget>(key) else {
            return Err(RequestError::BadRequest(format!("'{}' is not a list", event.dom_id)));
        };
        let pages = list.source.total_pages() as i64;
        let Some(page) = event.args.read_int_within_range(0, pages) else {
            return Err(RequestError::BadRequest(format!("bad page number in {}", event.args)));
        };
        if list.set_page(page as usize) {
            tree.repaint(key);
        }
        return Ok(EventOutcome::none());
    }

    let Some(element) = event.args.read_int() else {
        return Err(RequestError::BadRequest(format!("no element id in {}", event.args)));
    };
    // Only elements the client can currently see may receive events
    let on_page = tree
        .widget_as::<ListWidget>(key)
        .is_some_and(|list| list.source.page_elements().contains(&element));
    if !on_page {
        return Err(RequestError::BadRequest(format!(
            "element {element} is not on the current page of '{}'",
            tree.widget(key).id()
        )));
    }
    let Some(target) = event.args.find_widget_id_as_prefix(tree) else {
        return Err(RequestError::UnknownWidget(event.dom_id.clone()));
    };
    if !tree.is_within(target, key) || target == key {
        return Err(RequestError::BadRequest(format!(
            "'{}' is not inside list '{}'",
            tree.widget(target).id(),
            tree.widget(key).id()
        )));
    }
    let target_widget = tree.widget(target);
    if !target_widget.enabled() {
        return Err(RequestError::Disabled(event.dom_id.clone()));
    }
    let Some(listener) = target_widget.listener() else {
        return Err(RequestError::NoListener(event.dom_id.clone()));
    };

    let mut item_event = WidgetEvent {
        widget: target,
        dom_id: event.dom_id.clone(),
        value: event.value.clone(),
        args: event.args.clone(),
        element: Some(element),
    };
    let outcome = listener(tree, &mut item_event)?;
    tree.set_dom_problem(key, &event.dom_id, outcome.problem.as_deref());
    Ok(EventOutcome::none())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::WidgetArgs;
    use crate::widgets::{ButtonWidget, ContainerWidget, TextWidget};
    use trellis_core::StateMap;

    fn names() -> BasicList {
        BasicList::new((1..=12).collect(), 5).with_items(|id| {
            let mut state = StateMap::new();
            state.put("name", format!("animal {id}"));
            StateProvider::new("", state)
        })
    }

    fn list_tree() -> (WidgetTree, WidgetKey, WidgetKey) {
        let mut tree = WidgetTree::new();
        let page = tree.insert(Box::new(ContainerWidget::new("page")), None, None);
        tree.set_root(page);
        let list = tree.insert(Box::new(ListWidget::new("animals", Box::new(names()))), Some(page), None);
        tree.set_columns(list, 4);
        let card = tree.insert(Box::new(ContainerWidget::new("card")), Some(list), None);
        tree.insert(Box::new(TextWidget::new("name")), Some(card), None);
        let mut button = ButtonWidget::new("pick", "Pick");
        button.base_mut().set_listener(ButtonWidget::wrap(|tree, event| {
            tree.state_mut().put("picked", event.element.unwrap_or(-1));
        }));
        let pick = tree.insert(Box::new(button), Some(card), None);
        (tree, list, pick)
    }

    fn event(tree: &WidgetTree, list: WidgetKey, id: &str) -> WidgetEvent {
        let mut args = WidgetArgs::new(id);
        assert_eq!(args.find_widget_id_as_prefix(tree), Some(list));
        WidgetEvent {
            widget: list,
            dom_id: id.to_string(),
            value: String::new(),
            args,
            element: None,
        }
    }

    #[test]
    fn test_basic_list_paging() {
        let mut list = names();
        assert_eq!(list.total_pages(), 3);
        assert_eq!(list.page_elements(), vec![1, 2, 3, 4, 5]);
        list.set_current_page(2);
        assert_eq!(list.page_elements(), vec![11, 12]);
        assert_eq!(BasicList::new(vec![], 5).total_pages(), 1);
    }

    #[test]
    fn test_items_render_with_prefixed_ids() {
        let (tree, list, _) = list_tree();
        let html = tree.render_markup(list);
        assert!(html.contains("id='animals:3:name'"));
        assert!(html.contains("animal 3"));
        assert!(!html.contains("animals:6:name"));
        assert_eq!(html.matches("class='col-sm-4'").count(), 5);
        assert!(html.contains("jsButton(\"animals:page:1\")"));
    }

    #[test]
    fn test_page_event_switches_page() {
        let (mut tree, list, _) = list_tree();
        let mut ev = event(&tree, list, "animals:page:1");
        list_listener(&mut tree, &mut ev).unwrap();

        assert!(tree.is_dirty(list));
        let widget = tree.widget_as::<ListWidget>(list).unwrap();
        assert_eq!(widget.source().current_page(), 1);
        assert!(tree.build_patch().get("animals").unwrap().contains("animal 6"));

        let mut ev = event(&tree, list, "animals:page:9");
        assert!(list_listener(&mut tree, &mut ev).is_err());
    }

    #[test]
    fn test_item_event_reaches_template_widget() {
        let (mut tree, list, _) = list_tree();
        let mut ev = event(&tree, list, "animals:4:pick");
        list_listener(&mut tree, &mut ev).unwrap();
        assert_eq!(tree.state().opt_int("picked", 0), 4);

        let mut ev = event(&tree, list, "animals:4:nothing");
        assert_eq!(
            list_listener(&mut tree, &mut ev),
            Err(RequestError::UnknownWidget("animals:4:nothing".into()))
        );
    }

    #[test]
    fn test_item_event_needs_element_on_current_page() {
        let (mut tree, list, _) = list_tree();
        let mut ev = event(&tree, list, "animals:7:pick");
        assert!(matches!(
            list_listener(&mut tree, &mut ev),
            Err(RequestError::BadRequest(_))
        ));
        assert!(!tree.state().contains("picked"));

        let mut ev = event(&tree, list, "animals:page:1");
        list_listener(&mut tree, &mut ev).unwrap();
        let mut ev = event(&tree, list, "animals:7:pick");
        list_listener(&mut tree, &mut ev).unwrap();
        assert_eq!(tree.state().opt_int("picked", 0), 7);
    }

    #[test]
    fn test_negative_element_ids_are_dispatched() {
        let (mut tree, list, _) = list_tree();
        let widget = tree.widget_as_mut::<ListWidget>(list).unwrap();
        widget.source = Box::new(BasicList::new(vec![-3, 8], 5));
        let mut ev = event(&tree, list, "animals:-3:pick");
        list_listener(&mut tree, &mut ev).unwrap();
        assert_eq!(tree.state().opt_int("picked", 0), -3);
    }

    #[test]
    fn test_bound_template_widget_keeps_its_provider() {
        let (mut tree, list, _) = list_tree();
        let card = tree.get("card");
        let mut shared = StateMap::new();
        shared.put("zoo", "City zoo");
        let pid = tree.add_provider(StateProvider::new("", shared));
        tree.insert(Box::new(TextWidget::new("zoo")), Some(card), Some(pid));
        tree.state_mut().put("zoo", "session zoo").put("name", "session name");

        let html = tree.render_markup(list);
        assert_eq!(html.matches("City zoo").count(), 5);
        assert!(html.contains("id='animals:2:zoo'"));
        assert!(html.contains("animal 2"));
        assert!(!html.contains("session zoo"));
        assert!(!html.contains("session name"));
    }

    #[test]
    fn test_dirty_template_repaints_whole_list() {
        let (mut tree, list, pick) = list_tree();
        tree.repaint(pick);
        let patch = tree.build_patch();
        assert_eq!(patch.ids().collect::<Vec<_>>(), vec!["animals"]);
        assert!(tree.is_dirty(pick));
        assert!(!tree.is_dirty(list));
    }
}
