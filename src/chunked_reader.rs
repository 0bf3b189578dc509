use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use parking_lot::Mutex;
use crate::blob_configuration::BlobConfiguration;
use crate::error::BlobError;

/// Snapshot of a reader's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderInfo {
    pub file_size: u64,
    pub bytes_read: u64,
    pub is_eof: bool,
}

/// Sequential reader that hands out one bounded chunk per call.
///
/// File I/O runs on the blocking pool behind a per-handle lock, so chunks are
/// produced in file order even when `read_next_chunk` is called from several
/// tasks at once. Counters and flags are atomics and can be read at any time.
pub struct ChunkedReader {
    path: String,
    buffer_size: usize,
    file_size: u64,
    file: Mutex<Option<File>>,
    bytes_read: AtomicU64,
    is_eof: AtomicBool,
    is_closed: AtomicBool,
}

impl ChunkedReader {
    pub fn open(path: impl AsRef<Path>, buffer_size: usize, config: &BlobConfiguration) -> crate::error::Result<ChunkedReader> {
        let path = path.as_ref();
        let display = path.display().to_string();

        if !config.accepts_buffer_size(buffer_size) {
            return Err(BlobError::invalid_argument(format!(
                "Buffer size must be {}-{}: {}",
                config.min_buffer_size, config.max_buffer_size, buffer_size
            )));
        }

        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BlobError::file_not_found(format!("File does not exist: {}", display)).with_path(display));
            }
            Err(e) => return Err(BlobError::from_io(&e, &display).with_path(display)),
        };

        if !metadata.is_file() {
            return Err(BlobError::invalid_argument(format!("Path is not a file: {}", display)).with_path(display));
        }

        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BlobError::file_not_found(format!("File was removed during open: {}", display)).with_path(display));
            }
            Err(e) => return Err(BlobError::from_io(&e, &display).with_path(display)),
        };

        let file_size = file.metadata().map(|m| m.len()).unwrap_or(metadata.len());

        Ok(ChunkedReader {
            path: display,
            buffer_size,
            file_size,
            file: Mutex::new(Some(file)),
            bytes_read: AtomicU64::new(0),
            is_eof: AtomicBool::new(false),
            is_closed: AtomicBool::new(false),
        })
    }

    /// Reads the next chunk, or `None` once the end of the file is reached.
    pub async fn read_next_chunk(self: &Arc<Self>) -> crate::error::Result<Option<Vec<u8>>> {
        if self.is_closed() {
            return Err(BlobError::reader_closed("Reader is closed"));
        }
        if self.is_eof() {
            return Ok(None);
        }

        let reader = self.clone();
        match tokio::task::spawn_blocking(move || reader.read_chunk_blocking()).await {
            Ok(result) => result,
            Err(e) => Err(BlobError::io_error(format!("Read task failed: {}", e))),
        }
    }

    fn read_chunk_blocking(&self) -> crate::error::Result<Option<Vec<u8>>> {
        let mut guard = self.file.lock();
        if self.is_closed() {
            guard.take();
            return Err(BlobError::reader_closed("Reader is closed"));
        }
        if self.is_eof() {
            return Ok(None);
        }
        let Some(file) = guard.as_mut() else {
            return Err(BlobError::reader_closed("Reader is closed"));
        };

        let mut buffer = vec![0u8; self.buffer_size];
        let len = loop {
            match file.read(&mut buffer) {
                Ok(len) => break len,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(BlobError::from_io(&e, &self.path)),
            }
        };

        if len == 0 {
            self.is_eof.store(true, Ordering::Release);
            return Ok(None);
        }

        self.bytes_read.fetch_add(len as u64, Ordering::AcqRel);
        buffer.truncate(len);

        // closed while reading: the descriptor is ours to release
        if self.is_closed() {
            guard.take();
        }
        Ok(Some(buffer))
    }

    /// Idempotent. An in-flight read releases the descriptor when it finishes.
    pub fn close(&self) {
        if self.is_closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(mut guard) = self.file.try_lock() {
            guard.take();
        }
        tracing::debug!(path = %self.path, bytes_read = self.bytes_read(), "reader closed");
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Acquire)
    }

    pub fn is_eof(&self) -> bool {
        self.is_eof.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.is_closed.load(Ordering::Acquire)
    }

    pub fn info(&self) -> ReaderInfo {
        ReaderInfo {
            file_size: self.file_size(),
            bytes_read: self.bytes_read(),
            is_eof: self.is_eof(),
        }
    }
}
