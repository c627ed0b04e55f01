//! Session registries
//!
//! The server only relies on the [`SessionManager`] contract. Lookups take
//! the registry's read lock and creation its write lock; neither is held
//! while a request is being handled.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::error::{Result, SessionError};
use crate::session::{Session, SessionRecord};

pub trait SessionManager: Send + Sync {
    fn find_session(&self, id: &str) -> Option<Arc<Session>>;
    fn create_session(&self) -> Arc<Session>;
    /// Note that a session's persistent data changed
    fn set_modified(&self, session: &Session);
    fn discard_all_sessions(&self);
}

/// A random, URL-safe session id
pub fn random_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}

type SessionMap = FxHashMap<String, Arc<Session>>;

/// Insert a session under an id not yet in use
fn insert_new_session(sessions: &mut SessionMap) -> Arc<Session> {
    loop {
        let id = random_session_id();
        if sessions.contains_key(&id) {
            continue;
        }
        let session = Arc::new(Session::new(id.clone()));
        sessions.insert(id, Arc::clone(&session));
        tracing::info!(session = %session.id(), "created session");
        return session;
    }
}

// =============================================================================
// In memory
// =============================================================================

/// Sessions that live as long as the process
#[derive(Default)]
pub struct InMemorySessionManager {
    sessions: RwLock<SessionMap>,
}

impl InMemorySessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionManager for InMemorySessionManager {
    fn find_session(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    fn create_session(&self) -> Arc<Session> {
        insert_new_session(&mut self.sessions.write())
    }

    fn set_modified(&self, _session: &Session) {}

    fn discard_all_sessions(&self) {
        tracing::info!("discarding all sessions");
        self.sessions.write().clear();
    }
}

// =============================================================================
// File system
// =============================================================================

struct FileStore {
    path: PathBuf,
    sessions: RwLock<SessionMap>,
    modified: AtomicBool,
}

impl FileStore {
    /// Write the session map if it changed; returns whether it was written
    fn flush(&self) -> Result<bool> {
        if !self.modified.swap(false, Ordering::SeqCst) {
            return Ok(false);
        }
        let records: BTreeMap<String, SessionRecord> = self
            .sessions
            .read()
            .iter()
            .map(|(id, session)| (id.clone(), session.record()))
            .collect();
        let text = serde_json::to_string_pretty(&records)?;
        if let Err(e) = write_file(&self.path, &text) {
            self.modified.store(true, Ordering::SeqCst);
            return Err(e);
        }
        tracing::debug!(path = %self.path.display(), sessions = records.len(), "flushed session map");
        Ok(true)
    }
}

fn write_file(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SessionError::io(parent, e))?;
    }
    std::fs::write(path, text).map_err(|e| SessionError::io(path, e))
}

/// Sessions whose ids are kept in a JSON file and restored at startup
///
/// Changes are written by [`flush`](Self::flush), normally called
/// periodically by the thread behind a [`FlushHandle`].
pub struct FileSystemSessionManager {
    store: Arc<FileStore>,
}

impl FileSystemSessionManager {
    /// Open the session map at `path`, restoring any sessions it records
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut sessions = SessionMap::default();
        if path.exists() {
            let text = std::fs::read_to_string(&path).map_err(|e| SessionError::io(&path, e))?;
            let records: BTreeMap<String, SessionRecord> = serde_json::from_str(&text)?;
            for (id, record) in records {
                sessions.insert(id, Arc::new(Session::from_record(record)));
            }
            tracing::info!(path = %path.display(), sessions = sessions.len(), "restored sessions");
        }
        Ok(Self {
            store: Arc::new(FileStore {
                path,
                sessions: RwLock::new(sessions),
                modified: AtomicBool::new(false),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.store.path
    }

    pub fn len(&self) -> usize {
        self.store.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write pending changes now; returns whether anything was written
    pub fn flush(&self) -> Result<bool> {
        self.store.flush()
    }

    /// Flush on a background thread every `interval` until the handle drops
    pub fn start_flushing(&self, interval: Duration) -> FlushHandle {
        let shutdown = Arc::new(AtomicBool::new(false));
        let store = Arc::clone(&self.store);
        let stop = Arc::clone(&shutdown);
        let thread = thread::spawn(move || loop {
            if !stop.load(Ordering::SeqCst) {
                thread::park_timeout(interval);
            }
            // Read before flushing, so changes made before the stop request are written
            let stopping = stop.load(Ordering::SeqCst);
            if let Err(e) = store.flush() {
                tracing::error!(error = %e, "failed to flush session map");
            }
            if stopping {
                break;
            }
        });
        FlushHandle {
            shutdown,
            thread: Some(thread),
        }
    }
}

impl SessionManager for FileSystemSessionManager {
    fn find_session(&self, id: &str) -> Option<Arc<Session>> {
        self.store.sessions.read().get(id).cloned()
    }

    fn create_session(&self) -> Arc<Session> {
        let session = insert_new_session(&mut self.store.sessions.write());
        self.store.modified.store(true, Ordering::SeqCst);
        session
    }

    fn set_modified(&self, _session: &Session) {
        self.store.modified.store(true, Ordering::SeqCst);
    }

    fn discard_all_sessions(&self) {
        tracing::info!("discarding all sessions");
        self.store.sessions.write().clear();
        self.store.modified.store(true, Ordering::SeqCst);
    }
}

/// Handle to the background flush thread
///
/// Dropping it stops the thread after one last flush.
pub struct FlushHandle {
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl FlushHandle {
    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .map(|t| !t.is_finished())
            .unwrap_or(false)
    }

    /// Stop the thread and wait for it to finish
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            let _ = thread.join();
        }
    }
}

impl Drop for FlushHandle {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_create_and_find() {
        let manager = InMemorySessionManager::new();
        let session = manager.create_session();
        let found = manager.find_session(session.id()).unwrap();
        assert!(Arc::ptr_eq(&session, &found));
        assert!(manager.find_session("missing").is_none());

        manager.discard_all_sessions();
        assert!(manager.is_empty());
    }

    #[test]
    fn test_session_ids_are_distinct_and_url_safe() {
        let manager = InMemorySessionManager::new();
        let a = manager.create_session();
        let b = manager.create_session();
        assert_ne!(a.id(), b.id());
        assert!(a.id().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache/session_map.json");

        let manager = FileSystemSessionManager::open(&path).unwrap();
        assert!(!manager.flush().unwrap());
        let id = manager.create_session().id().to_string();
        assert!(manager.flush().unwrap());
        assert!(!manager.flush().unwrap());

        let restored = FileSystemSessionManager::open(&path).unwrap();
        assert_eq!(restored.len(), 1);
        assert!(restored.find_session(&id).is_some());
    }

    #[test]
    fn test_flush_thread_writes_and_stops() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        let manager = FileSystemSessionManager::open(&path).unwrap();
        let handle = manager.start_flushing(Duration::from_millis(10));
        assert!(handle.is_running());

        manager.create_session();
        handle.stop();
        // The final pass after the stop request writes the change
        assert!(path.exists());
    }
}
