use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use reqwest::Client;
use tokio::sync::watch::Receiver;
use crate::blob_configuration::BlobConfiguration;
use crate::chunked_reader::{ChunkedReader, ReaderInfo};
use crate::chunked_writer::{ChunkedWriter, WriterInfo};
use crate::download_progress::DownloadProgress;
use crate::download_status::DownloadStatus;
use crate::downloader::Downloader;
use crate::error::BlobError;
use crate::file_info::FileInfo;
use crate::handle_registry::{HandleId, HandleRegistry};
use crate::hash::HashAlgorithm;
use crate::paths::Dirs;
use crate::{file_ops, hash};

/// Entry points keyed by handle id.
///
/// `open_*` and `create_download` are synchronous and only allocate a handle;
/// everything touching storage or the network is async and runs off the
/// caller's task. Dropping the service closes every handle it registered.
pub struct BlobService {
    config: Arc<BlobConfiguration>,
    client: Client,
    registry: Arc<HandleRegistry>,
}

impl BlobService {
    pub fn new() -> crate::error::Result<Self> {
        Self::with_configuration(BlobConfiguration::default())
    }

    pub fn with_configuration(config: BlobConfiguration) -> crate::error::Result<Self> {
        Self::with_registry(config, Arc::new(HandleRegistry::new()))
    }

    pub fn with_registry(config: BlobConfiguration, registry: Arc<HandleRegistry>) -> crate::error::Result<Self> {
        let client = config.http_client()?;
        Ok(Self {
            config: Arc::new(config),
            client,
            registry,
        })
    }

    pub fn configuration(&self) -> &BlobConfiguration {
        &self.config
    }

    pub fn registry(&self) -> &Arc<HandleRegistry> {
        &self.registry
    }

    pub fn dirs(&self) -> &'static Dirs {
        Dirs::get()
    }

    pub fn open_read(&self, path: impl AsRef<Path>, buffer_size: usize) -> crate::error::Result<HandleId> {
        let reader = ChunkedReader::open(path, buffer_size, &self.config)?;
        Ok(self.registry.register(reader))
    }

    pub fn open_read_default(&self, path: impl AsRef<Path>) -> crate::error::Result<HandleId> {
        self.open_read(path, self.config.default_buffer_size)
    }

    pub fn open_write(&self, path: impl AsRef<Path>, append: bool) -> crate::error::Result<HandleId> {
        let writer = ChunkedWriter::open(path, append)?;
        Ok(self.registry.register(writer))
    }

    /// Registers a download without touching the network.
    pub fn create_download(
        &self,
        url: impl Into<String>,
        dest_path: impl Into<String>,
        headers: HashMap<String, String>) -> HandleId {
        let downloader = Downloader::new(url, dest_path, headers, self.client.clone());
        self.registry.register(downloader)
    }

    /// Idempotent; unknown ids are ignored.
    pub fn close_handle(&self, id: HandleId) {
        self.registry.remove(id);
    }

    pub async fn read_next_chunk(&self, id: HandleId) -> crate::error::Result<Option<Vec<u8>>> {
        self.reader(id)?.read_next_chunk().await
    }

    pub fn reader_info(&self, id: HandleId) -> crate::error::Result<ReaderInfo> {
        Ok(self.reader(id)?.info())
    }

    /// Callers must await each write before issuing the next one; unawaited
    /// writes on one handle have no ordering guarantee.
    pub async fn write(&self, id: HandleId, data: Vec<u8>) -> crate::error::Result<usize> {
        self.writer(id)?.write(data).await
    }

    pub async fn flush(&self, id: HandleId) -> crate::error::Result<()> {
        self.writer(id)?.flush().await
    }

    pub fn writer_info(&self, id: HandleId) -> crate::error::Result<WriterInfo> {
        Ok(self.writer(id)?.info())
    }

    pub async fn start_download<F>(&self, id: HandleId, on_progress: F) -> crate::error::Result<()>
    where
        F: FnMut(DownloadProgress) + Send,
    {
        let downloader = self.downloader(id)?;
        downloader
            .start(on_progress)
            .await
            .map_err(|e| match e.path {
                Some(_) => e,
                None => e.with_path(downloader.dest_path()),
            })
    }

    pub fn subscribe_download(&self, id: HandleId) -> crate::error::Result<Receiver<DownloadProgress>> {
        Ok(self.downloader(id)?.subscribe())
    }

    pub fn download_status(&self, id: HandleId) -> crate::error::Result<DownloadStatus> {
        Ok(self.downloader(id)?.status())
    }

    /// Fire-and-forget; unknown ids are ignored.
    pub fn cancel_download(&self, id: HandleId) {
        if let Some(downloader) = self.registry.downloader(id) {
            downloader.cancel();
        }
    }

    /// `algorithm` is `"sha256"` or `"md5"`.
    pub async fn hash_file(&self, path: impl AsRef<Path>, algorithm: &str) -> crate::error::Result<String> {
        let algorithm: HashAlgorithm = algorithm.parse()?;
        hash::hash_file_with_chunk_size(path, algorithm, self.config.hash_chunk_size).await
    }

    pub async fn exists(&self, path: impl AsRef<Path>) -> crate::error::Result<bool> {
        file_ops::exists(path).await
    }

    pub async fn stat(&self, path: impl AsRef<Path>) -> crate::error::Result<FileInfo> {
        file_ops::stat(path).await
    }

    pub async fn unlink(&self, path: impl AsRef<Path>) -> crate::error::Result<()> {
        file_ops::unlink(path).await
    }

    pub async fn mkdir(&self, path: impl AsRef<Path>) -> crate::error::Result<()> {
        file_ops::mkdir(path).await
    }

    pub async fn ls(&self, path: impl AsRef<Path>) -> crate::error::Result<Vec<FileInfo>> {
        file_ops::ls(path).await
    }

    pub async fn cp(&self, src: impl AsRef<Path>, dest: impl AsRef<Path>) -> crate::error::Result<()> {
        file_ops::cp(src, dest).await
    }

    pub async fn mv(&self, src: impl AsRef<Path>, dest: impl AsRef<Path>) -> crate::error::Result<()> {
        file_ops::mv(src, dest).await
    }

    /// Closes every live handle.
    pub fn shutdown(&self) {
        self.registry.clear();
    }

    fn reader(&self, id: HandleId) -> crate::error::Result<Arc<ChunkedReader>> {
        self.registry
            .reader(id)
            .ok_or_else(|| BlobError::reader_closed(format!("Reader handle not found: {}", id)))
    }

    fn writer(&self, id: HandleId) -> crate::error::Result<Arc<ChunkedWriter>> {
        self.registry
            .writer(id)
            .ok_or_else(|| BlobError::writer_closed(format!("Writer handle not found: {}", id)))
    }

    fn downloader(&self, id: HandleId) -> crate::error::Result<Arc<Downloader>> {
        self.registry
            .downloader(id)
            .ok_or_else(|| BlobError::download_failed(format!("Download handle not found: {}", id)))
    }
}

impl Drop for BlobService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
