//! Trellis sessions
//!
//! A [`Session`] owns one widget tree. The server looks sessions up through
//! a [`SessionManager`], hands AJAX requests to [`Session::handle_ajax`] and
//! page requests to a [`PageRequester`], which picks and builds a [`Page`].

pub mod ajax;
pub mod blob_cache;
pub mod config;
pub mod error;
pub mod manager;
pub mod page;
pub mod path;
pub mod session;

pub use ajax::{
    response_body, too_big_problem, AjaxRequest, ClientInfo, KEY_INFO, KEY_VALUE, KEY_WIDGET,
};
pub use blob_cache::{Blob, BlobCache, BlobSource, BLOB_URL_PREFIX};
pub use config::{ServerConfig, SessionStore};
pub use error::{Result, SessionError};
pub use manager::{
    random_session_id, FileSystemSessionManager, FlushHandle, InMemorySessionManager,
    SessionManager,
};
pub use page::{Page, PageDelegate, PageInstance, PageRequester};
pub use path::{PageArgs, PathParse};
pub use session::{Session, SessionRecord, SessionState, PAGE_ROOT_ID};
