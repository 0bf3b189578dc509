//! Streams a URL to disk through a download handle.
//!
//! Usage: cargo run --example download_file -- <url> <dest>

use std::collections::HashMap;
use buffered_blob::BlobService;
use buffered_blob::download_status::DownloadStatus;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let url = args.next().unwrap_or_else(|| "https://httpbin.org/bytes/102400".to_string());
    let dest = args.next().unwrap_or_else(|| "./downloads/test_file.bin".to_string());

    let service = BlobService::new().expect("Invalid blob configuration");
    let id = service.create_download(url, dest.clone(), HashMap::new());

    let result = service
        .start_download(id, |progress| {
            tracing::info!(
                "Downloading: {:.1}% ({} / {} bytes)",
                progress.progress * 100.0,
                progress.bytes_downloaded,
                progress.total_bytes
            );
        })
        .await;

    match result {
        Ok(()) => {
            let digest = service.hash_file(&dest, "sha256").await;
            tracing::info!(status = %DownloadStatus::Completed, ?digest, "saved {}", dest);
        }
        Err(e) => tracing::error!("{}", e),
    }

    service.close_handle(id);
}
