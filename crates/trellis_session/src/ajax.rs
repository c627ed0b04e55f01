//! The AJAX protocol
//!
//! A request names at most one widget (`w`), an optional value (`v`) and
//! optional client information (`i`, a JSON object). The response is the
//! [`Patch`] of every widget repainted while handling it, serialized as a
//! compact JSON object from widget id to markup.

use serde::{Deserialize, Serialize};
use trellis_core::StateMap;
use trellis_widgets::{
    FileUploadWidget, Patch, RequestError, WidgetArgs, WidgetEvent, WidgetKey, WidgetTree,
};

use crate::session::SessionState;

/// Query key of the target widget id
pub const KEY_WIDGET: &str = "w";
/// Query key of the submitted value
pub const KEY_VALUE: &str = "v";
/// Query key of the client information JSON
pub const KEY_INFO: &str = "i";

/// A parsed AJAX request
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AjaxRequest {
    pub widget: Option<String>,
    pub value: Option<String>,
    pub info: Option<String>,
}

impl AjaxRequest {
    pub fn widget(id: impl Into<String>) -> Self {
        Self {
            widget: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    /// Build from raw query pairs
    ///
    /// Each event carries a single value. The widget is only taken if exactly
    /// one id and at most one value were sent; a value is optional since
    /// buttons send none.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut widgets = Vec::new();
        let mut values = Vec::new();
        let mut infos = Vec::new();
        for (key, value) in pairs {
            match key {
                KEY_WIDGET => widgets.push(value),
                KEY_VALUE => values.push(value),
                KEY_INFO => infos.push(value),
                _ => {}
            }
        }
        let mut request = Self::default();
        if widgets.len() == 1 && values.len() <= 1 {
            request.widget = Some(widgets[0].to_string());
            request.value = values.first().map(|v| v.to_string());
        }
        if infos.len() == 1 {
            request.info = Some(infos[0].to_string());
        }
        request
    }
}

/// What the browser reported about its display
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub device_pixel_ratio: f64,
    pub screen_width: i64,
    pub screen_height: i64,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            device_pixel_ratio: 1.25,
            screen_width: 2560,
            screen_height: 1440,
        }
    }
}

impl ClientInfo {
    /// Parse the `i` parameter: `{"dp": <ratio>, "sw": <width>, "sh": <height>}`
    pub fn parse(text: &str) -> trellis_core::Result<Self> {
        let map = StateMap::parse(text)?;
        Ok(Self {
            device_pixel_ratio: map.opt_float("dp", 1.0),
            screen_width: map.opt_int("sw", 2000),
            screen_height: map.opt_int("sh", 0),
        })
    }
}

/// Apply one AJAX request to a locked session
pub(crate) fn process(state: &mut SessionState, request: &AjaxRequest) {
    if let Some(info) = &request.info {
        match ClientInfo::parse(info) {
            Ok(client) => state.client_info = client,
            Err(e) => {
                tracing::warn!(target: "trellis::ajax", error = %e, "ignoring malformed client info");
            }
        }
        if request.widget.is_none() {
            return;
        }
    }

    let Some(id) = request.widget.as_deref() else {
        state.set_request_problem(&RequestError::BadRequest("no widget id".into()));
        return;
    };
    let value = request.value.clone().unwrap_or_default();
    if let Err(e) = dispatch(&mut state.tree, id, value) {
        state.set_request_problem(&e);
    }
}

/// Find the widget an id refers to
///
/// An id with no exact match may name a widget followed by arguments, as
/// with `animals:page:3` or `animals:17:name`; the longest matching prefix
/// wins and the rest is left in the returned cursor.
pub(crate) fn resolve(tree: &WidgetTree, id: &str) -> Option<(WidgetKey, WidgetArgs)> {
    if let Some(key) = tree.find(id) {
        let mut args = WidgetArgs::new(id);
        args.set_cursor(args.count());
        return Some((key, args));
    }
    let mut args = WidgetArgs::new(id);
    let key = args.find_widget_id_as_prefix(tree)?;
    Some((key, args))
}

fn dispatch(tree: &mut WidgetTree, id: &str, value: String) -> Result<(), RequestError> {
    let Some((key, args)) = resolve(tree, id) else {
        return Err(RequestError::UnknownWidget(id.to_string()));
    };
    let widget = tree.widget(key);
    if !widget.enabled() {
        return Err(RequestError::Disabled(id.to_string()));
    }
    let Some(listener) = widget.listener() else {
        return Err(RequestError::NoListener(id.to_string()));
    };
    tracing::debug!(target: "trellis::ajax", widget = %id, kind = widget.kind(), "dispatching event");

    let mut event = WidgetEvent::new(key, id, value);
    event.args = args;
    let outcome = listener(tree, &mut event)?;

    if let Some(value) = outcome.value {
        if tree.write_value(key, value) {
            tree.repaint(key);
        }
    }
    // Always updated, so a previous problem is cleared
    tree.set_widget_problem(key, outcome.problem.as_deref());
    Ok(())
}

/// Deliver uploaded bytes, or the reason there are none, to a file upload widget
pub(crate) fn process_upload(
    state: &mut SessionState,
    widget_id: &str,
    data: Result<&[u8], String>,
    max_bytes: usize,
) {
    let Some(key) = state.tree.find(widget_id) else {
        state.set_request_problem(&RequestError::UnknownWidget(widget_id.to_string()));
        return;
    };
    if !state.tree.widget(key).enabled() {
        state.set_request_problem(&RequestError::Disabled(widget_id.to_string()));
        return;
    }
    let Some(listener) = state
        .tree
        .widget_as::<FileUploadWidget>(key)
        .map(FileUploadWidget::upload_listener)
    else {
        state.set_request_problem(&RequestError::BadRequest(format!(
            "'{widget_id}' is not a file upload widget"
        )));
        return;
    };
    let tree = &mut state.tree;

    let problem = match data {
        Err(problem) => Some(problem),
        Ok(bytes) if bytes.len() > max_bytes => Some(too_big_problem(max_bytes)),
        Ok(bytes) => {
            tracing::debug!(target: "trellis::ajax", widget = %widget_id, bytes = bytes.len(), "upload received");
            let event = WidgetEvent::new(key, widget_id, "");
            listener(tree, &event, bytes).err()
        }
    };
    tree.set_widget_problem(key, problem.as_deref());
}

/// Problem shown with an upload widget when the file exceeds `max_bytes`
pub fn too_big_problem(max_bytes: usize) -> String {
    format!("The uploaded file is too big. Please choose a file smaller than {max_bytes} bytes")
}

/// Serialize a patch as the response body
pub fn response_body(patch: &Patch) -> String {
    serde_json::to_string(patch).unwrap_or_else(|_| "{}".to_string())
}
