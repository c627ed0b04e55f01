//! The widget trait and attributes shared by every widget

use std::any::Any;
use std::sync::Arc;

use serde_json::Value;
use slotmap::new_key_type;
use trellis_core::MarkupBuilder;

use crate::args::WidgetArgs;
use crate::error::Result;
use crate::render::RenderContext;
use crate::tree::WidgetTree;

new_key_type! {
    /// Stable arena index of a widget within one [`WidgetTree`]
    pub struct WidgetKey;
}

/// Number of columns in the layout grid
pub const MAX_COLUMNS: usize = 12;

/// Prefix of ids allocated for widgets the caller did not name
pub const ANONYMOUS_PREFIX: char = '.';

pub fn is_anonymous_id(id: &str) -> bool {
    id.starts_with(ANONYMOUS_PREFIX)
}

/// Size hint; what it means depends on the widget
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WidgetSize {
    #[default]
    Default,
    Micro,
    Tiny,
    Small,
    Medium,
    Large,
    Huge,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WidgetAlign {
    #[default]
    Default,
    Center,
    Left,
    Right,
}

/// An event delivered to a widget's listener
#[derive(Clone, Debug)]
pub struct WidgetEvent {
    /// The widget receiving the event
    pub widget: WidgetKey,
    /// Id as it appeared in the client document (may carry a list item prefix)
    pub dom_id: String,
    /// Value sent by the client, empty if none
    pub value: String,
    /// Remaining colon-separated arguments following the widget's id
    pub args: WidgetArgs,
    /// Element id of the list item the event came from, if any
    pub element: Option<i64>,
}

impl WidgetEvent {
    pub fn new(widget: WidgetKey, dom_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            widget,
            dom_id: dom_id.into(),
            value: value.into(),
            args: WidgetArgs::default(),
            element: None,
        }
    }
}

/// What a listener wants done after handling an event
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventOutcome {
    /// Value to store under the widget's id
    pub value: Option<Value>,
    /// Problem text to display with the widget; `None` clears any previous one
    pub problem: Option<String>,
}

impl EventOutcome {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Self {
            value: Some(value.into()),
            problem: None,
        }
    }

    pub fn with_problem(mut self, problem: impl Into<String>) -> Self {
        self.problem = Some(problem.into());
        self
    }
}

/// Low-level listener: receives the raw event and decides what to store
///
/// An `Err` is a problem with the request itself rather than with the value
/// submitted; it is logged and answered with an empty patch.
pub type Listener =
    Arc<dyn Fn(&mut WidgetTree, &mut WidgetEvent) -> Result<EventOutcome> + Send + Sync>;

/// Attributes common to all widgets
#[derive(Clone, Default)]
pub struct WidgetBase {
    pub id: String,
    pub visible: bool,
    pub enabled: bool,
    pub size: WidgetSize,
    pub align: WidgetAlign,
    listener: Option<Listener>,
}

impl WidgetBase {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        assert!(!id.is_empty(), "widget id is empty");
        Self {
            id,
            visible: true,
            enabled: true,
            size: WidgetSize::Default,
            align: WidgetAlign::Default,
            listener: None,
        }
    }

    pub fn listener(&self) -> Option<Listener> {
        self.listener.clone()
    }

    /// Install the listener; a widget can have at most one
    pub fn set_listener(&mut self, listener: Listener) {
        if self.listener.is_some() {
            panic!("widget '{}' already has a listener", self.id);
        }
        self.listener = Some(listener);
    }
}

impl std::fmt::Debug for WidgetBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetBase")
            .field("id", &self.id)
            .field("visible", &self.visible)
            .field("enabled", &self.enabled)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

/// A node of a session's UI
///
/// Widgets never hold their own values: [`render`](Widget::render) reads
/// everything it shows through the [`RenderContext`]. Children live in the
/// [`WidgetTree`] arena, not inside the widget.
pub trait Widget: Any + Send {
    fn base(&self) -> &WidgetBase;
    fn base_mut(&mut self) -> &mut WidgetBase;

    /// Write this widget's markup; the outermost element must carry the widget's id
    fn render(&self, key: WidgetKey, cx: &RenderContext<'_>, m: &mut MarkupBuilder);

    /// Short type name for logging
    fn kind(&self) -> &'static str;

    /// Whether children may be attached
    fn is_container(&self) -> bool {
        false
    }

    /// Whether descendants are rendered only as part of this widget, never
    /// on their own
    fn renders_as_unit(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn id(&self) -> &str {
        &self.base().id
    }

    fn visible(&self) -> bool {
        self.base().visible
    }

    fn enabled(&self) -> bool {
        self.base().enabled
    }

    fn listener(&self) -> Option<Listener> {
        self.base().listener()
    }
}

/// Implements the boilerplate accessors of [`Widget`]
macro_rules! widget_accessors {
    ($kind:literal) => {
        fn base(&self) -> &$crate::widget::WidgetBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut $crate::widget::WidgetBase {
            &mut self.base
        }

        fn kind(&self) -> &'static str {
            $kind
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    };
}

pub(crate) use widget_accessors;
