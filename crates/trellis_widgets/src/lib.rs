//! Trellis widget model
//!
//! Widgets live in a [`WidgetTree`], an arena owned by one session. Event
//! listeners mutate the tree's state map and call [`WidgetTree::repaint`];
//! [`WidgetTree::build_patch`] then renders only the widgets that changed.
//!
//! Trees are normally assembled with a [`WidgetManager`].

pub mod args;
pub mod dirty;
pub mod error;
pub mod grid;
pub mod manager;
pub mod render;
pub mod tree;
pub mod widget;
pub mod widgets;

pub use args::WidgetArgs;
pub use dirty::{DirtyTracker, Repaint};
pub use error::{RequestError, Result};
pub use grid::GridCell;
pub use manager::WidgetManager;
pub use render::RenderContext;
pub use tree::{Patch, ProviderId, WidgetTree};
pub use widget::{
    is_anonymous_id, EventOutcome, Listener, Widget, WidgetAlign, WidgetBase, WidgetEvent,
    WidgetKey, WidgetSize, ANONYMOUS_PREFIX, MAX_COLUMNS,
};
pub use widgets::{
    AlertClass, AlertWidget, BasicList, ButtonWidget, CheckboxWidget, ContainerWidget,
    FileUploadWidget, HeadingWidget, ImageWidget, InputWidget, ListSource, ListWidget, TextWidget,
    UploadListener, UrlProvider,
};
