use std::path::Path;
use tokio::fs;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use crate::error::BlobError;

/// Destination file a download body is streamed into.
pub(crate) struct DownloadStream {
    path: String,
    file: File,
}

impl DownloadStream {
    /// Creates missing parent directories and truncates any existing file.
    pub async fn create(path: &str) -> crate::error::Result<DownloadStream> {
        let dest = Path::new(path);
        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() && parent.symlink_metadata().is_err() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    BlobError::download_failed(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }
        }

        match OpenOptions::new().create(true).write(true).truncate(true).open(dest).await {
            Ok(file) => Ok(DownloadStream {
                path: path.to_string(),
                file,
            }),
            Err(e) => Err(BlobError::download_failed(format!("Failed to open {}: {}", path, e))),
        }
    }

    pub async fn write_async(&mut self, buffer: &[u8]) -> crate::error::Result<()> {
        self.file
            .write_all(buffer)
            .await
            .map_err(|e| BlobError::download_failed(format!("Failed to write {}: {}", self.path, e)))
    }

    pub async fn flush_async(&mut self) -> crate::error::Result<()> {
        self.file
            .flush()
            .await
            .map_err(|e| BlobError::download_failed(format!("Failed to flush {}: {}", self.path, e)))
    }
}
