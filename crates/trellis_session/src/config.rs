//! Server configuration and presets

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

/// Where sessions are kept between requests
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStore {
    /// Sessions are lost when the server stops
    #[default]
    Memory,
    /// Session ids are written to a JSON file and restored at startup
    File,
}

/// Configuration for a Trellis server
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: SocketAddr,
    /// Directory holding static resources and `header.html`.
    pub resources_dir: PathBuf,
    /// HTML emitted before the page content; a built-in header if unset.
    pub header_file: Option<PathBuf>,
    pub session_store: SessionStore,
    /// Session map file used by [`SessionStore::File`].
    pub session_file: PathBuf,
    /// How often a modified session map is written (ms).
    pub flush_interval_ms: u64,
    /// Maximum number of blobs kept in memory.
    pub blob_cache_capacity: usize,
    /// Use the full browser width instead of a centered column.
    pub full_width: bool,
    /// Padding above the page content, in rem.
    pub top_padding: u8,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: usize,
    /// Shown in the document title.
    pub app_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl ServerConfig {
    /// Local development: in-memory sessions on the loopback interface.
    pub fn development() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            resources_dir: PathBuf::from("resources"),
            header_file: None,
            session_store: SessionStore::Memory,
            session_file: PathBuf::from("cache/session_map.json"),
            flush_interval_ms: 5_000,
            blob_cache_capacity: 1_000,
            full_width: false,
            top_padding: 3,
            max_upload_bytes: 10_000_000,
            app_name: "trellis".to_string(),
        }
    }

    /// Configuration for test runs: an ephemeral port and small limits.
    pub fn testing() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 0)),
            flush_interval_ms: 50,
            blob_cache_capacity: 16,
            max_upload_bytes: 64 * 1024,
            app_name: "trellis_test".to_string(),
            ..Self::development()
        }
    }

    /// Load from a TOML file; missing fields take development defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| SessionError::io(path, e))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Set the listen address.
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    pub fn with_resources_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resources_dir = dir.into();
        self
    }

    pub fn with_session_store(mut self, store: SessionStore) -> Self {
        self.session_store = store;
        self
    }

    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = path.into();
        self
    }

    pub fn with_max_upload_bytes(mut self, max: usize) -> Self {
        self.max_upload_bytes = max;
        self
    }

    /// Set the application name.
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }
}
