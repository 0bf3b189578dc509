use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::Mutex;
use crate::chunked_reader::ChunkedReader;
use crate::chunked_writer::ChunkedWriter;
use crate::downloader::Downloader;

pub type HandleId = u64;

/// Anything the registry can release on removal.
pub trait Closeable {
    fn close(&self);
}

impl Closeable for ChunkedReader {
    fn close(&self) {
        ChunkedReader::close(self)
    }
}

impl Closeable for ChunkedWriter {
    fn close(&self) {
        ChunkedWriter::close(self)
    }
}

impl Closeable for Downloader {
    fn close(&self) {
        Downloader::close(self)
    }
}

#[derive(Clone)]
pub enum Handle {
    Reader(Arc<ChunkedReader>),
    Writer(Arc<ChunkedWriter>),
    Downloader(Arc<Downloader>),
}

impl Handle {
    pub fn kind(&self) -> &'static str {
        match self {
            Handle::Reader(_) => "reader",
            Handle::Writer(_) => "writer",
            Handle::Downloader(_) => "downloader",
        }
    }

    pub fn as_reader(&self) -> Option<&Arc<ChunkedReader>> {
        match self {
            Handle::Reader(reader) => Some(reader),
            _ => None,
        }
    }

    pub fn as_writer(&self) -> Option<&Arc<ChunkedWriter>> {
        match self {
            Handle::Writer(writer) => Some(writer),
            _ => None,
        }
    }

    pub fn as_downloader(&self) -> Option<&Arc<Downloader>> {
        match self {
            Handle::Downloader(downloader) => Some(downloader),
            _ => None,
        }
    }
}

impl Closeable for Handle {
    fn close(&self) {
        match self {
            Handle::Reader(reader) => Closeable::close(reader.as_ref()),
            Handle::Writer(writer) => Closeable::close(writer.as_ref()),
            Handle::Downloader(downloader) => Closeable::close(downloader.as_ref()),
        }
    }
}

impl From<ChunkedReader> for Handle {
    fn from(reader: ChunkedReader) -> Self {
        Handle::Reader(Arc::new(reader))
    }
}

impl From<ChunkedWriter> for Handle {
    fn from(writer: ChunkedWriter) -> Self {
        Handle::Writer(Arc::new(writer))
    }
}

impl From<Downloader> for Handle {
    fn from(downloader: Downloader) -> Self {
        Handle::Downloader(Arc::new(downloader))
    }
}

/// Table of live handles keyed by opaque ids.
///
/// Ids start at 1 and are never reused. A removed handle is closed exactly
/// once, outside the table lock.
pub struct HandleRegistry {
    next_id: AtomicU64,
    handles: Mutex<HashMap<HandleId, Handle>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Process-wide registry.
    pub fn global() -> &'static HandleRegistry {
        static REGISTRY: OnceLock<HandleRegistry> = OnceLock::new();
        REGISTRY.get_or_init(HandleRegistry::new)
    }

    pub fn register(&self, handle: impl Into<Handle>) -> HandleId {
        let handle = handle.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(id, kind = handle.kind(), "handle registered");
        self.handles.lock().insert(id, handle);
        id
    }

    pub fn get(&self, id: HandleId) -> Option<Handle> {
        self.handles.lock().get(&id).cloned()
    }

    pub fn reader(&self, id: HandleId) -> Option<Arc<ChunkedReader>> {
        self.get(id).and_then(|handle| handle.as_reader().cloned())
    }

    pub fn writer(&self, id: HandleId) -> Option<Arc<ChunkedWriter>> {
        self.get(id).and_then(|handle| handle.as_writer().cloned())
    }

    pub fn downloader(&self, id: HandleId) -> Option<Arc<Downloader>> {
        self.get(id).and_then(|handle| handle.as_downloader().cloned())
    }

    /// Detaches and closes `id`. Removing an unknown id is a no-op.
    pub fn remove(&self, id: HandleId) -> Option<Handle> {
        let handle = self.handles.lock().remove(&id);
        if let Some(handle) = &handle {
            handle.close();
            tracing::debug!(id, kind = handle.kind(), "handle removed");
        }
        handle
    }

    /// Removes and closes every live handle.
    pub fn clear(&self) {
        let handles: Vec<(HandleId, Handle)> = self.handles.lock().drain().collect();
        if !handles.is_empty() {
            tracing::info!(count = handles.len(), "closing all handles");
        }
        for (_, handle) in handles {
            handle.close();
        }
    }

    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.lock().is_empty()
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
