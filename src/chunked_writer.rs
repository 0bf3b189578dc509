use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use parking_lot::Mutex;
use crate::error::BlobError;

/// Snapshot of a writer's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterInfo {
    pub bytes_written: u64,
}

/// Sequential buffered writer.
///
/// Each `write` commits the whole buffer or fails; `bytes_written` only moves
/// on success. Writes awaited one after another land in call order.
pub struct ChunkedWriter {
    path: String,
    append: bool,
    stream: Mutex<Option<BufWriter<File>>>,
    bytes_written: AtomicU64,
    is_closed: AtomicBool,
}

impl ChunkedWriter {
    pub fn open(path: impl AsRef<Path>, append: bool) -> crate::error::Result<ChunkedWriter> {
        let path = path.as_ref();
        let display = path.display().to_string();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && parent.symlink_metadata().is_err() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| BlobError::from_io(&e, parent.display()).with_path(display.clone()))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)
            .map_err(|e| BlobError::from_io(&e, &display).with_path(display.clone()))?;

        Ok(ChunkedWriter {
            path: display,
            append,
            stream: Mutex::new(Some(BufWriter::new(file))),
            bytes_written: AtomicU64::new(0),
            is_closed: AtomicBool::new(false),
        })
    }

    /// Writes the entire buffer and returns its length.
    pub async fn write(self: &Arc<Self>, data: Vec<u8>) -> crate::error::Result<usize> {
        if self.is_closed() {
            return Err(BlobError::writer_closed("Writer is closed"));
        }

        let writer = self.clone();
        match tokio::task::spawn_blocking(move || writer.write_blocking(&data)).await {
            Ok(result) => result,
            Err(e) => Err(BlobError::io_error(format!("Write task failed: {}", e))),
        }
    }

    fn write_blocking(&self, data: &[u8]) -> crate::error::Result<usize> {
        let mut guard = self.stream.lock();
        if self.is_closed() {
            release(&self.path, guard.take());
            return Err(BlobError::writer_closed("Writer is closed"));
        }
        let Some(stream) = guard.as_mut() else {
            return Err(BlobError::writer_closed("Writer is closed"));
        };

        stream.write_all(data).map_err(|e| BlobError::from_io(&e, &self.path))?;
        self.bytes_written.fetch_add(data.len() as u64, Ordering::AcqRel);

        if self.is_closed() {
            release(&self.path, guard.take());
        }
        Ok(data.len())
    }

    pub async fn flush(self: &Arc<Self>) -> crate::error::Result<()> {
        if self.is_closed() {
            return Err(BlobError::writer_closed("Writer is closed"));
        }

        let writer = self.clone();
        match tokio::task::spawn_blocking(move || writer.flush_blocking()).await {
            Ok(result) => result,
            Err(e) => Err(BlobError::io_error(format!("Flush task failed: {}", e))),
        }
    }

    fn flush_blocking(&self) -> crate::error::Result<()> {
        let mut guard = self.stream.lock();
        if self.is_closed() {
            release(&self.path, guard.take());
            return Err(BlobError::writer_closed("Writer is closed"));
        }
        match guard.as_mut() {
            Some(stream) => stream.flush().map_err(|e| BlobError::from_io(&e, &self.path)),
            None => Err(BlobError::writer_closed("Writer is closed")),
        }
    }

    /// Idempotent. Flushes best-effort and never fails.
    pub fn close(&self) {
        if self.is_closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(mut guard) = self.stream.try_lock() {
            release(&self.path, guard.take());
        }
        tracing::debug!(path = %self.path, bytes_written = self.bytes_written(), "writer closed");
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_append(&self) -> bool {
        self.append
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.is_closed.load(Ordering::Acquire)
    }

    pub fn info(&self) -> WriterInfo {
        WriterInfo {
            bytes_written: self.bytes_written(),
        }
    }
}

fn release(path: &str, stream: Option<BufWriter<File>>) {
    if let Some(mut stream) = stream {
        if let Err(e) = stream.flush() {
            tracing::warn!(path = %path, error = %e, "flush on close failed");
        }
    }
}
