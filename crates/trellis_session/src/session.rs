//! Per-user sessions
//!
//! A [`Session`] owns one widget tree and its state behind a mutex. Every
//! request against the session holds the lock from widget lookup until the
//! patch is built, so two requests for the same session never interleave,
//! while requests for different sessions run in parallel.

use std::any::Any;
use std::fmt::Display;

use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use trellis_core::{MarkupBuilder, StateMap};
use trellis_widgets::{Patch, WidgetManager, WidgetTree};

use crate::ajax::{self, AjaxRequest, ClientInfo};

/// Id of the container every page is built into
pub const PAGE_ROOT_ID: &str = "page";

/// Persisted form of a session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
}

pub struct Session {
    id: String,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: Mutex::new(SessionState::new()),
        }
    }

    pub fn from_record(record: SessionRecord) -> Self {
        Self::new(record.id)
    }

    pub fn record(&self) -> SessionRecord {
        SessionRecord {
            id: self.id.clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Acquire the session for the duration of one request
    ///
    /// The lock is released when the guard drops, including while unwinding.
    pub fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock()
    }

    /// Handle an AJAX request and return the patch to send back
    ///
    /// Any problem with the request itself yields an empty patch.
    pub fn handle_ajax(&self, request: &AjaxRequest) -> Patch {
        let mut request_scope = self.begin_request();
        ajax::process(&mut request_scope, request);
        request_scope.patch()
    }

    /// Handle a file upload for the widget `widget_id`
    ///
    /// `data` is the uploaded content, or the reason it could not be read.
    pub fn handle_upload(
        &self,
        widget_id: &str,
        data: Result<&[u8], String>,
        max_bytes: usize,
    ) -> Patch {
        let mut request_scope = self.begin_request();
        ajax::process_upload(&mut request_scope, widget_id, data, max_bytes);
        request_scope.patch()
    }

    fn begin_request(&self) -> RequestScope<'_> {
        RequestScope {
            state: self.lock(),
            session_id: &self.id,
        }
    }
}

/// The session lock held for one request
///
/// Dropping it discards the request's repaint flags and problem, also when a
/// listener or a render panics, so the next request starts clean.
struct RequestScope<'a> {
    state: MutexGuard<'a, SessionState>,
    session_id: &'a str,
}

impl RequestScope<'_> {
    /// The response patch; empty if the request had a problem
    fn patch(&self) -> Patch {
        if self.state.ok() {
            self.state.tree.build_patch()
        } else {
            Patch::default()
        }
    }
}

impl std::ops::Deref for RequestScope<'_> {
    type Target = SessionState;

    fn deref(&self) -> &SessionState {
        &self.state
    }
}

impl std::ops::DerefMut for RequestScope<'_> {
    fn deref_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }
}

impl Drop for RequestScope<'_> {
    fn drop(&mut self) {
        self.state.discard_request(self.session_id);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish()
    }
}

/// Everything a session guards with its lock
pub struct SessionState {
    pub tree: WidgetTree,
    pub client_info: ClientInfo,
    app_data: Option<Box<dyn Any + Send>>,
    browser_path: Option<String>,
    page_name: Option<String>,
    request_problem: Option<String>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            tree: WidgetTree::new(),
            client_info: ClientInfo::default(),
            app_data: None,
            browser_path: None,
            page_name: None,
            request_problem: None,
        }
    }

    pub fn state(&self) -> &StateMap {
        self.tree.state()
    }

    pub fn state_mut(&mut self) -> &mut StateMap {
        self.tree.state_mut()
    }

    // =========================================================================
    // Request problems
    // =========================================================================

    /// Record a problem with the current request; only the first is kept
    pub fn set_request_problem(&mut self, problem: impl Display) {
        if self.request_problem.is_none() {
            let text = format!("Problem with ajax request: {problem}");
            tracing::debug!(target: "trellis::ajax", problem = %text, "request problem");
            self.request_problem = Some(text);
        }
    }

    pub fn request_problem(&self) -> Option<&str> {
        self.request_problem.as_deref()
    }

    pub fn ok(&self) -> bool {
        self.request_problem.is_none()
    }

    /// Reset per-request state, logging any request problem
    fn discard_request(&mut self, session_id: &str) {
        if let Some(problem) = self.request_problem.take() {
            tracing::warn!(target: "trellis::ajax", session = %session_id, "{problem}");
        }
        self.tree.clear_dirty();
    }

    // =========================================================================
    // Pages
    // =========================================================================

    /// Replace the widget tree with a freshly built page
    ///
    /// The state map survives. The new root is marked dirty, so a rebuild
    /// during an AJAX request sends the whole page.
    pub fn build_page(&mut self, name: &str, build: impl FnOnce(&mut WidgetManager<'_>)) {
        self.tree.reset();
        let mut m = WidgetManager::new(&mut self.tree);
        m.id(PAGE_ROOT_ID).open();
        build(&mut m);
        m.close();
        m.finish();
        self.tree.repaint_id(PAGE_ROOT_ID);
        self.page_name = Some(name.to_string());
        tracing::debug!(page = name, widgets = self.tree.len(), "built page");
    }

    pub fn page_name(&self) -> Option<&str> {
        self.page_name.as_deref()
    }

    /// Render the whole page for a full document response
    pub fn render_page(&mut self, m: &mut MarkupBuilder) {
        self.tree.render_root(m);
        self.tree.clear_dirty();
    }

    /// URL shown in the browser's address bar, e.g. `/animal/17/edit`
    pub fn browser_path(&self) -> Option<&str> {
        self.browser_path.as_deref()
    }

    pub fn set_browser_path(&mut self, path: impl Into<String>) {
        self.browser_path = Some(path.into());
    }

    // =========================================================================
    // Application data
    // =========================================================================

    pub fn set_app_data<T: Any + Send>(&mut self, data: T) {
        self.app_data = Some(Box::new(data));
    }

    pub fn app_data<T: Any>(&self) -> Option<&T> {
        self.app_data.as_ref()?.downcast_ref::<T>()
    }

    pub fn app_data_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.app_data.as_mut()?.downcast_mut::<T>()
    }

    pub fn clear_app_data(&mut self) {
        self.app_data = None;
    }
}
