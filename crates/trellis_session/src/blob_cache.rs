//! Bounded cache of binary blobs (typically images)
//!
//! Blobs are looked up by id or by name and read through from a
//! [`BlobSource`] on a miss. The cache keeps at most `capacity` blobs and
//! evicts the least recently used one on overflow.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::Result;

/// URL path prefix under which blobs are served
pub const BLOB_URL_PREFIX: &str = "/r/";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub id: i64,
    pub name: String,
    pub data: Vec<u8>,
}

/// Where blobs come from on a cache miss
pub trait BlobSource: Send + Sync {
    fn read_blob(&self, id: i64) -> Result<Option<Blob>>;
    fn read_blob_with_name(&self, name: &str) -> Result<Option<Blob>>;
}

impl<T: BlobSource + ?Sized> BlobSource for Arc<T> {
    fn read_blob(&self, id: i64) -> Result<Option<Blob>> {
        (**self).read_blob(id)
    }

    fn read_blob_with_name(&self, name: &str) -> Result<Option<Blob>> {
        (**self).read_blob_with_name(name)
    }
}

struct CacheInner {
    by_id: LruCache<i64, Arc<Blob>>,
    ids_by_name: FxHashMap<String, i64>,
}

impl CacheInner {
    fn insert(&mut self, blob: Arc<Blob>) {
        if let Some((_, displaced)) = self.by_id.push(blob.id, Arc::clone(&blob)) {
            if displaced.id != blob.id || displaced.name != blob.name {
                self.ids_by_name.remove(&displaced.name);
            }
        }
        self.ids_by_name.insert(blob.name.clone(), blob.id);
    }
}

pub struct BlobCache {
    source: Box<dyn BlobSource>,
    inner: Mutex<CacheInner>,
}

impl BlobCache {
    pub fn new(source: impl BlobSource + 'static, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            source: Box::new(source),
            inner: Mutex::new(CacheInner {
                by_id: LruCache::new(capacity),
                ids_by_name: FxHashMap::default(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn blob_with_id(&self, id: i64) -> Option<Arc<Blob>> {
        if let Some(blob) = self.inner.lock().by_id.get(&id) {
            return Some(Arc::clone(blob));
        }
        tracing::debug!(blob = id, "blob not cached; reading");
        self.load(self.source.read_blob(id))
    }

    pub fn blob_with_name(&self, name: &str) -> Option<Arc<Blob>> {
        {
            let mut inner = self.inner.lock();
            if let Some(id) = inner.ids_by_name.get(name).copied() {
                if let Some(blob) = inner.by_id.get(&id) {
                    return Some(Arc::clone(blob));
                }
            }
        }
        tracing::debug!(blob = name, "blob not cached; reading");
        self.load(self.source.read_blob_with_name(name))
    }

    /// URL of a blob, or an empty string if there is no such blob
    pub fn blob_url(&self, id: i64) -> String {
        match self.blob_with_id(id) {
            Some(blob) => format!("{BLOB_URL_PREFIX}{}", blob.name),
            None => String::new(),
        }
    }

    fn load(&self, read: Result<Option<Blob>>) -> Option<Arc<Blob>> {
        match read {
            Ok(Some(blob)) => {
                let blob = Arc::new(blob);
                self.inner.lock().insert(Arc::clone(&blob));
                Some(blob)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read blob");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSource {
        reads: AtomicUsize,
    }

    impl CountingSource {
        fn blob(id: i64) -> Blob {
            Blob {
                id,
                name: format!("img{id}.png"),
                data: vec![id as u8],
            }
        }
    }

    impl BlobSource for CountingSource {
        fn read_blob(&self, id: i64) -> Result<Option<Blob>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            match id {
                0 => Ok(None),
                -1 => Err(SessionError::Blob("disk on fire".into())),
                _ => Ok(Some(CountingSource::blob(id))),
            }
        }

        fn read_blob_with_name(&self, name: &str) -> Result<Option<Blob>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let id = name
                .trim_start_matches("img")
                .trim_end_matches(".png")
                .parse()
                .ok();
            Ok(id.map(CountingSource::blob))
        }
    }

    #[test]
    fn test_read_through_then_cached() {
        let source = Arc::new(CountingSource::default());
        let cache = BlobCache::new(Arc::clone(&source), 4);

        assert_eq!(cache.blob_with_id(3).unwrap().data, vec![3]);
        assert_eq!(cache.blob_with_id(3).unwrap().name, "img3.png");
        assert_eq!(cache.blob_with_name("img3.png").unwrap().id, 3);
        assert_eq!(source.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let source = Arc::new(CountingSource::default());
        let cache = BlobCache::new(Arc::clone(&source), 2);
        cache.blob_with_id(1);
        cache.blob_with_id(2);
        cache.blob_with_id(1);
        cache.blob_with_id(3);

        assert_eq!(cache.len(), 2);
        let before = source.reads.load(Ordering::SeqCst);
        cache.blob_with_id(1);
        assert_eq!(source.reads.load(Ordering::SeqCst), before);
        cache.blob_with_name("img2.png");
        assert_eq!(source.reads.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn test_missing_blobs() {
        let cache = BlobCache::new(Arc::new(CountingSource::default()), 4);
        assert_eq!(cache.blob_url(0), "");
        assert_eq!(cache.blob_url(-1), "");
        assert_eq!(cache.blob_url(5), "/r/img5.png");
        assert!(!cache.is_empty());
    }
}
