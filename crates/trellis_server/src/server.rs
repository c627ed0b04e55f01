//! HTTP front end
//!
//! Three kinds of request reach a session:
//! - `GET /ajax?w=..&v=..&i=..` answers with a JSON patch
//! - `POST /upload/<widget id>` delivers a file to an upload widget
//! - anything else is a page (empty path or a registered page name), a
//!   resource served by a registered handler, or a static file
//!
//! Session work is synchronous and runs on the blocking pool; the session
//! lock is never held across an await point.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use trellis_core::MarkupBuilder;
use trellis_session::{
    response_body, too_big_problem, AjaxRequest, PageDelegate, PageRequester, PathParse,
    ServerConfig, Session, SessionManager, SessionState,
};
use trellis_widgets::FileUploadWidget;

/// Cookie carrying the session id
pub const SESSION_COOKIE: &str = "trellis_session";

/// Header used when neither the configuration nor the resources supply one
const BUILTIN_HEADER: &str = include_str!("../resources/header.html");
const BUILTIN_BASE_JS: &str = include_str!("../resources/base.js");

/// Room for multipart framing on top of the largest accepted file
const UPLOAD_FRAMING_BYTES: usize = 64 * 1024;

// =============================================================================
// Resources
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource {
    pub content_type: &'static str,
    pub data: Vec<u8>,
}

impl Resource {
    /// A resource whose content type follows from the extension of `name`
    pub fn named(name: &str, data: Vec<u8>) -> Self {
        Self {
            content_type: content_type_for(name),
            data,
        }
    }
}

/// Serves the paths below a registered prefix
pub type ResourceHandler = Arc<dyn Fn(&Session, &str) -> Option<Resource> + Send + Sync>;

pub fn content_type_for(name: &str) -> &'static str {
    let extension = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    match extension.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "js" => "text/javascript; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        _ => "application/octet-stream",
    }
}

/// The session id in a `Cookie` header, if any
pub fn session_id_from_cookies(cookies: &str) -> Option<&str> {
    cookies
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// What a non-AJAX request turned into
#[derive(Debug)]
pub enum Reply {
    Page(String),
    Resource(Resource),
    NotFound,
}

// =============================================================================
// Server
// =============================================================================

pub struct TrellisServer<D: PageDelegate> {
    config: ServerConfig,
    sessions: Arc<dyn SessionManager>,
    pages: PageRequester<D>,
    header: String,
    handlers: Vec<(String, ResourceHandler)>,
}

impl<D: PageDelegate + 'static> TrellisServer<D> {
    pub fn new(
        config: ServerConfig,
        sessions: Arc<dyn SessionManager>,
        pages: PageRequester<D>,
    ) -> Result<Self> {
        let header = load_header(&config)?;
        Ok(Self {
            config,
            sessions,
            pages,
            header,
            handlers: Vec::new(),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve paths starting with `prefix` (no leading slash) with `handler`
    ///
    /// # Panics
    ///
    /// If a handler for the same prefix exists.
    pub fn add_resource_handler(&mut self, prefix: &str, handler: ResourceHandler) {
        let prefix = prefix.trim_start_matches('/').to_string();
        assert!(
            self.handlers.iter().all(|(p, _)| *p != prefix),
            "duplicate resource handler for prefix '{prefix}'"
        );
        self.handlers.push((prefix, handler));
    }

    /// The session named by the request's cookie, or a new one; the second
    /// value is the cookie to set when the session is new
    pub fn determine_session(&self, headers: &HeaderMap) -> (Arc<Session>, Option<HeaderValue>) {
        let existing = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(session_id_from_cookies)
            .and_then(|id| self.sessions.find_session(id));
        if let Some(session) = existing {
            return (session, None);
        }
        let session = self.sessions.create_session();
        let cookie = format!(
            "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax",
            session.id()
        );
        let cookie = match HeaderValue::from_str(&cookie) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, "session cookie is not a valid header");
                None
            }
        };
        (session, cookie)
    }

    /// Whether a path should be answered with a page
    pub fn is_page_path(&self, path: &str) -> bool {
        let parse = PathParse::new(path);
        let first = parse.peek();
        first.is_empty() || self.pages.is_page(first)
    }

    /// Answer a page, resource or static file request
    pub fn serve_path(&self, session: &Session, path: &str) -> Reply {
        if self.is_page_path(path) {
            return Reply::Page(self.full_page(session, path));
        }
        let relative = path.trim_start_matches('/');
        for (prefix, handler) in &self.handlers {
            if let Some(rest) = relative.strip_prefix(prefix.as_str()) {
                return match handler(session, rest) {
                    Some(resource) => Reply::Resource(resource),
                    None => Reply::NotFound,
                };
            }
        }
        match self.read_static(relative) {
            Some(resource) => Reply::Resource(resource),
            None => {
                tracing::debug!(path = %path, "no such resource");
                Reply::NotFound
            }
        }
    }

    /// Route `path`, rebuild the session's page and render the whole document
    pub fn full_page(&self, session: &Session, path: &str) -> String {
        let mut state = session.lock();
        let page = self.pages.process(&mut state, path);
        tracing::info!(session = %session.id(), page = page.name(), "serving page");

        let mut m = MarkupBuilder::new();
        self.write_header(&mut m);
        state.render_page(&mut m);
        m.a("<script>jsGetDisplayProperties();</script>").cr();
        self.write_footer(&state, &mut m);
        m.into_string()
    }

    fn write_header(&self, m: &mut MarkupBuilder) {
        m.a(&self.header);
        m.open_tag("body");
        let mut class = String::from(if self.config.full_width {
            "container-fluid"
        } else {
            "container"
        });
        if self.config.top_padding != 0 {
            class.push_str(&format!(" pt-{}", self.config.top_padding));
        }
        m.comment("page container");
        m.open_tag(&format!("div class='{class}'"));
    }

    fn write_footer(&self, state: &SessionState, m: &mut MarkupBuilder) {
        m.close_tag();
        if let Some(path) = state.browser_path() {
            // A JSON string is a valid JS literal; `<\/` keeps it inside the script
            let literal = serde_json::to_string(path)
                .unwrap_or_else(|_| "\"/\"".to_string())
                .replace("</", "<\\/");
            m.a("<script type='text/javascript'>").cr();
            m.a(&format!("history.replaceState(null, '', location.origin + {literal});"))
                .cr();
            m.a("</script>").cr();
        }
        m.close_tag();
        m.a("</html>").cr();
    }

    fn read_static(&self, relative: &str) -> Option<Resource> {
        let parse = PathParse::new(relative);
        let parts = parse.parts();
        if parts.is_empty() || parts.iter().any(|p| p.starts_with('.') || p.contains('\\')) {
            return None;
        }
        let mut file = self.config.resources_dir.clone();
        file.extend(parts);
        match std::fs::read(&file) {
            Ok(data) => Some(Resource::named(relative, data)),
            Err(_) if relative == "base.js" => {
                Some(Resource::named(relative, BUILTIN_BASE_JS.as_bytes().to_vec()))
            }
            Err(e) => {
                tracing::debug!(file = %file.display(), error = %e, "static resource unavailable");
                None
            }
        }
    }

    // =========================================================================
    // Serving
    // =========================================================================

    pub fn router(self: Arc<Self>) -> Router {
        let body_limit = self.config.max_upload_bytes.saturating_add(UPLOAD_FRAMING_BYTES);
        Router::new()
            .route("/ajax", get(handle_ajax::<D>))
            .route("/upload/:widget", post(handle_upload::<D>))
            .fallback(handle_path::<D>)
            .layer(DefaultBodyLimit::max(body_limit))
            .with_state(self)
    }

    /// Serve until `shutdown` completes
    pub async fn serve(
        self: Arc<Self>,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let app = self.router();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .context("serving HTTP")
    }
}

fn load_header(config: &ServerConfig) -> Result<String> {
    let file: Option<PathBuf> = match &config.header_file {
        Some(file) => Some(file.clone()),
        None => Some(config.resources_dir.join("header.html")).filter(|f| f.exists()),
    };
    let template = match file {
        Some(file) => std::fs::read_to_string(&file)
            .with_context(|| format!("reading header {}", file.display()))?,
        None => BUILTIN_HEADER.to_string(),
    };
    let mut title = MarkupBuilder::new();
    title.escape(&config.app_name);
    Ok(template.replace("{{title}}", title.as_str()))
}

// =============================================================================
// Handlers
// =============================================================================

type ServerState<D> = State<Arc<TrellisServer<D>>>;

/// Run session work on the blocking pool
async fn run_blocking<T: Send + 'static>(work: impl FnOnce() -> T + Send + 'static) -> Option<T> {
    match tokio::task::spawn_blocking(work).await {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!(error = %e, "request handler failed");
            None
        }
    }
}

fn respond(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Body>,
    cookie: Option<HeaderValue>,
) -> Response {
    let mut response = (status, [(header::CONTENT_TYPE, content_type)], body.into()).into_response();
    if let Some(cookie) = cookie {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

fn internal_error(cookie: Option<HeaderValue>) -> Response {
    respond(
        StatusCode::INTERNAL_SERVER_ERROR,
        "text/plain; charset=utf-8",
        "internal error",
        cookie,
    )
}

async fn handle_ajax<D: PageDelegate + 'static>(
    State(server): ServerState<D>,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let request = AjaxRequest::from_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    let (session, cookie) = server.determine_session(&headers);
    let body = run_blocking(move || response_body(&session.handle_ajax(&request))).await;
    match body {
        Some(body) => respond(StatusCode::OK, "application/json", body, cookie),
        None => internal_error(cookie),
    }
}

async fn handle_upload<D: PageDelegate + 'static>(
    State(server): ServerState<D>,
    headers: HeaderMap,
    Path(widget_id): Path<String>,
    multipart: Multipart,
) -> Response {
    let max_bytes = server.config.max_upload_bytes;
    let field = FileUploadWidget::input_name(&widget_id);
    let data = read_upload(multipart, &field, max_bytes).await;
    let (session, cookie) = server.determine_session(&headers);
    let body = run_blocking(move || {
        let data = data.as_deref().map_err(|problem| problem.clone());
        response_body(&session.handle_upload(&widget_id, data, max_bytes))
    })
    .await;
    match body {
        Some(body) => respond(StatusCode::OK, "application/json", body, cookie),
        None => internal_error(cookie),
    }
}

async fn read_upload(
    mut multipart: Multipart,
    field_name: &str,
    max_bytes: usize,
) -> std::result::Result<Vec<u8>, String> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err("No file was uploaded".to_string()),
            Err(e) => return Err(upload_problem(e, max_bytes)),
        };
        if field.name() != Some(field_name) {
            continue;
        }
        return match field.bytes().await {
            Ok(bytes) => Ok(bytes.to_vec()),
            Err(e) => Err(upload_problem(e, max_bytes)),
        };
    }
}

fn upload_problem(e: MultipartError, max_bytes: usize) -> String {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_big_problem(max_bytes)
    } else {
        tracing::warn!(error = %e, "failed to read upload");
        "Trouble reading the uploaded file".to_string()
    }
}

async fn handle_path<D: PageDelegate + 'static>(
    State(server): ServerState<D>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let path = uri.path().to_string();
    let (session, cookie) = server.determine_session(&headers);
    let reply = run_blocking(move || server.serve_path(&session, &path)).await;
    match reply {
        Some(Reply::Page(html)) => respond(StatusCode::OK, "text/html; charset=utf-8", html, cookie),
        Some(Reply::Resource(resource)) => {
            respond(StatusCode::OK, resource.content_type, resource.data, cookie)
        }
        Some(Reply::NotFound) => respond(
            StatusCode::NOT_FOUND,
            "text/plain; charset=utf-8",
            "not found",
            cookie,
        ),
        None => internal_error(cookie),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::DemoApp;
    use trellis_session::InMemorySessionManager;

    fn server(resources: &std::path::Path) -> TrellisServer<crate::demo::DemoDelegate> {
        let demo = DemoApp::new(8);
        let config = ServerConfig::testing()
            .with_resources_dir(resources)
            .with_app_name("Zoo <Demo>");
        let mut server = TrellisServer::new(
            config,
            Arc::new(InMemorySessionManager::new()),
            demo.page_requester(),
        )
        .unwrap();
        demo.install_resources(&mut server);
        server
    }

    #[test]
    fn test_session_cookie_parsing() {
        assert_eq!(
            session_id_from_cookies("theme=dark; trellis_session=abc123"),
            Some("abc123")
        );
        assert_eq!(session_id_from_cookies("trellis_session="), None);
        assert_eq!(session_id_from_cookies("other=1"), None);
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("base.js"), "text/javascript; charset=utf-8");
        assert_eq!(content_type_for("upload3.PNG"), "image/png");
        assert_eq!(content_type_for("README"), "application/octet-stream");
    }

    #[test]
    fn test_new_session_gets_cookie_and_is_found_again() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(dir.path());
        let (session, cookie) = server.determine_session(&HeaderMap::new());
        let cookie = cookie.unwrap();
        assert!(cookie.to_str().unwrap().starts_with("trellis_session="));

        let mut headers = HeaderMap::new();
        let value = format!("{SESSION_COOKIE}={}", session.id());
        headers.insert(header::COOKIE, HeaderValue::from_str(&value).unwrap());
        let (again, cookie) = server.determine_session(&headers);
        assert!(Arc::ptr_eq(&session, &again));
        assert!(cookie.is_none());
    }

    #[test]
    fn test_page_paths() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(dir.path());
        assert!(server.is_page_path("/"));
        assert!(server.is_page_path("/feed"));
        assert!(server.is_page_path("/animal/3/edit"));
        assert!(!server.is_page_path("/favicon.ico"));
        assert!(!server.is_page_path("/r/upload1.png"));
    }

    #[test]
    fn test_full_page_has_header_and_browser_path() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(dir.path());
        let session = Session::new("s");
        let html = server.full_page(&session, "/animal/2");
        assert!(html.contains("<title>Zoo &lt;Demo&gt;</title>"));
        assert!(html.contains("<div class='container pt-3'>"));
        assert!(html.contains("id='page'"));
        assert!(html.contains("location.origin + \"/animal/2\""));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_static_files_and_not_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("site.css"), "body {}").unwrap();
        let server = server(dir.path());
        let session = Session::new("s");

        match server.serve_path(&session, "/site.css") {
            Reply::Resource(resource) => {
                assert_eq!(resource.content_type, "text/css; charset=utf-8");
                assert_eq!(resource.data, b"body {}");
            }
            other => panic!("unexpected {other:?}"),
        }
        match server.serve_path(&session, "/base.js") {
            Reply::Resource(resource) => {
                assert!(String::from_utf8(resource.data).unwrap().contains("function jsVal"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(server.serve_path(&session, "/../secret"), Reply::NotFound));
        assert!(matches!(server.serve_path(&session, "/missing.png"), Reply::NotFound));
        assert!(matches!(server.serve_path(&session, "/r/nothing.png"), Reply::NotFound));
    }

    #[test]
    #[should_panic(expected = "duplicate resource handler")]
    fn test_duplicate_resource_handler() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = server(dir.path());
        server.add_resource_handler("r/", Arc::new(|_: &Session, _: &str| None));
    }
}
