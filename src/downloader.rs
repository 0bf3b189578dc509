use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, AtomicU8, Ordering};
use futures::StreamExt;
use reqwest::Client;
use tokio::sync::watch::Receiver;
use tokio_util::sync::CancellationToken;
use crate::download_progress::{DownloadProgress, DownloadTracker};
use crate::download_status::DownloadStatus;
use crate::download_stream::DownloadStream;
use crate::error::BlobError;

/// One HTTP GET streamed into a destination file.
///
/// A downloader runs at most once: `Created → Running → Completed | Failed |
/// Cancelled`. Cancellation wins over any error the aborted transfer produces,
/// and a partial destination file is left in place.
pub struct Downloader {
    url: String,
    dest_path: String,
    headers: HashMap<String, String>,
    client: Client,
    cancel_token: CancellationToken,
    status: AtomicU8,
    bytes_downloaded: AtomicU64,
    total_bytes: AtomicI64,
    tracker: DownloadTracker,
}

impl Downloader {
    pub fn new(
        url: impl Into<String>,
        dest_path: impl Into<String>,
        headers: HashMap<String, String>,
        client: Client) -> Downloader {
        Downloader {
            url: url.into(),
            dest_path: dest_path.into(),
            headers,
            client,
            cancel_token: CancellationToken::new(),
            status: AtomicU8::new(DownloadStatus::Created.into()),
            bytes_downloaded: AtomicU64::new(0),
            total_bytes: AtomicI64::new(-1),
            tracker: DownloadTracker::new(),
        }
    }

    /// Runs the transfer, calling `on_progress` after every body chunk and once
    /// more when the file is complete. The callback is never called after this
    /// future resolves.
    pub async fn start<F>(&self, mut on_progress: F) -> crate::error::Result<()>
    where
        F: FnMut(DownloadProgress) + Send,
    {
        if self.is_cancelled() {
            self.transition(DownloadStatus::Created, DownloadStatus::Cancelled);
            return Err(self.cancelled_error());
        }

        if !self.transition(DownloadStatus::Created, DownloadStatus::Running) {
            if self.is_cancelled() {
                return Err(self.cancelled_error());
            }
            let status = self.status();
            let reason = if status.is_terminal() { "already finished" } else { "already running" };
            return Err(BlobError::invalid_argument(format!(
                "Download {} ({}): {}",
                reason,
                status,
                self.url
            )));
        }

        tracing::info!(url = %self.url, dest = %self.dest_path, "download started");

        let result = tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => Err(self.cancelled_error()),
            result = self.transfer(&mut on_progress) => result,
        };

        match result {
            Ok(()) => {
                self.status.store(DownloadStatus::Completed.into(), Ordering::Release);
                tracing::info!(url = %self.url, bytes = self.bytes_downloaded(), "download completed");
                Ok(())
            }
            Err(_) if self.is_cancelled() => {
                self.status.store(DownloadStatus::Cancelled.into(), Ordering::Release);
                tracing::info!(url = %self.url, bytes = self.bytes_downloaded(), "download cancelled");
                Err(self.cancelled_error())
            }
            Err(e) => {
                self.status.store(DownloadStatus::Failed.into(), Ordering::Release);
                tracing::warn!(url = %self.url, error = %e, "download failed");
                Err(e)
            }
        }
    }

    async fn transfer<F>(&self, on_progress: &mut F) -> crate::error::Result<()>
    where
        F: FnMut(DownloadProgress) + Send,
    {
        let mut request = self.client.get(&self.url);
        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| BlobError::download_failed(format!("{}: {}", e, self.url)))?;

        let status = response.status();
        tracing::debug!(url = %self.url, status = status.as_u16(), "response received");
        if !status.is_success() {
            return Err(BlobError::download_failed(format!("HTTP {}: {}", status, self.url)));
        }

        let total_bytes = response.content_length().map(|length| length as i64).unwrap_or(-1);
        self.total_bytes.store(total_bytes, Ordering::Release);
        self.tracker.publish(DownloadProgress::new(0, total_bytes));

        let mut stream = DownloadStream::create(&self.dest_path).await?;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let bytes = chunk.map_err(|e| BlobError::download_failed(format!("{}: {}", e, self.url)))?;
            if self.is_cancelled() {
                return Err(self.cancelled_error());
            }

            stream.write_async(&bytes).await?;
            let downloaded = self.bytes_downloaded.fetch_add(bytes.len() as u64, Ordering::AcqRel) + bytes.len() as u64;
            let progress = DownloadProgress::new(downloaded, total_bytes);
            self.tracker.publish(progress);
            on_progress(progress);
        }

        stream.flush_async().await?;
        drop(stream);

        let progress = DownloadProgress::finished(self.bytes_downloaded(), total_bytes);
        self.tracker.publish(progress);
        on_progress(progress);
        Ok(())
    }

    /// Idempotent and non-blocking. A pending `start` resolves with
    /// `DOWNLOAD_CANCELLED` on its next poll.
    pub fn cancel(&self) {
        if !self.cancel_token.is_cancelled() {
            tracing::debug!(url = %self.url, "cancel requested");
        }
        self.cancel_token.cancel();
        self.transition(DownloadStatus::Created, DownloadStatus::Cancelled);
    }

    pub fn close(&self) {
        self.cancel();
    }

    fn transition(&self, from: DownloadStatus, to: DownloadStatus) -> bool {
        self.status
            .compare_exchange(from.into(), to.into(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn cancelled_error(&self) -> BlobError {
        BlobError::download_cancelled(format!("Download was cancelled: {}", self.url))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn dest_path(&self) -> &str {
        &self.dest_path
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn status(&self) -> DownloadStatus {
        DownloadStatus::from(self.status.load(Ordering::Acquire))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    pub fn bytes_downloaded(&self) -> u64 {
        self.bytes_downloaded.load(Ordering::Acquire)
    }

    pub fn total_bytes(&self) -> i64 {
        self.total_bytes.load(Ordering::Acquire)
    }

    pub fn progress(&self) -> DownloadProgress {
        self.tracker.latest()
    }

    pub fn subscribe(&self) -> Receiver<DownloadProgress> {
        self.tracker.subscribe()
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use httpmock::prelude::*;
    use parking_lot::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use crate::download_progress::DownloadProgress;
    use crate::download_status::DownloadStatus;
    use crate::downloader::Downloader;
    use crate::error::ErrorCode;

    fn downloader(url: String, dest: &std::path::Path, headers: HashMap<String, String>) -> Arc<Downloader> {
        Arc::new(Downloader::new(url, dest.display().to_string(), headers, reqwest::Client::new()))
    }

    /// Serves headers and the first bytes of a body, then stalls.
    async fn stalled_server(prefix: &'static [u8], declared_length: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\n\r\n",
                declared_length
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(prefix).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        format!("http://{}/stall", addr)
    }

    /// Serves `parts` with chunked transfer encoding, so no length is declared.
    async fn chunked_server(parts: &'static [&'static [u8]]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n")
                .await
                .unwrap();
            for part in parts {
                socket.write_all(format!("{:x}\r\n", part.len()).as_bytes()).await.unwrap();
                socket.write_all(part).await.unwrap();
                socket.write_all(b"\r\n").await.unwrap();
                socket.flush().await.unwrap();
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            socket.write_all(b"0\r\n\r\n").await.unwrap();
            socket.flush().await.unwrap();
        });
        format!("http://{}/chunked", addr)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unknown_length_keeps_progress_at_zero() {
        let url = chunked_server(&[b"hello", b" world"]).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("chunked.txt");
        let downloader = downloader(url, &dest, HashMap::new());

        let updates = Arc::new(Mutex::new(Vec::<DownloadProgress>::new()));
        let sink = updates.clone();
        downloader.start(move |progress| sink.lock().push(progress)).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"hello world");
        assert_eq!(downloader.status(), DownloadStatus::Completed);
        assert_eq!(downloader.total_bytes(), -1);
        assert_eq!(downloader.bytes_downloaded(), 11);

        let updates = updates.lock();
        assert!(updates.len() >= 2);
        assert!(updates.iter().all(|p| p.total_bytes == -1 && p.progress == 0.0));
        assert_eq!(updates.last().unwrap().bytes_downloaded, 11);
        assert_eq!(downloader.progress().progress, 0.0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_download_writes_file_and_reports_progress() {
        let server = MockServer::start_async().await;
        let mock = server.mock_async(|when, then| {
            when.method(GET).path("/file.txt").header("authorization", "Bearer token");
            then.status(200).body("hello world");
        }).await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested").join("file.txt");
        let headers = HashMap::from([("authorization".to_string(), "Bearer token".to_string())]);
        let downloader = downloader(server.url("/file.txt"), &dest, headers);

        let updates = Arc::new(Mutex::new(Vec::<DownloadProgress>::new()));
        let sink = updates.clone();
        downloader.start(move |progress| sink.lock().push(progress)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello world");
        assert_eq!(downloader.status(), DownloadStatus::Completed);
        assert_eq!(downloader.bytes_downloaded(), 11);
        assert_eq!(downloader.total_bytes(), 11);

        let updates = updates.lock();
        assert!(updates.len() >= 2);
        assert!(updates.windows(2).all(|w| w[0].bytes_downloaded <= w[1].bytes_downloaded));
        let last = updates.last().unwrap();
        assert_eq!(last.bytes_downloaded, 11);
        assert_eq!(last.progress, 1.0);
        assert_eq!(downloader.progress().bytes_downloaded, 11);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_http_error_fails_without_progress() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(GET).path("/missing");
            then.status(404).body("not here");
        }).await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing.bin");
        let downloader = downloader(server.url("/missing"), &dest, HashMap::new());

        let calls = Arc::new(Mutex::new(0usize));
        let counter = calls.clone();
        let err = downloader.start(move |_| *counter.lock() += 1).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::DownloadFailed);
        assert!(err.message.contains("404"));
        assert_eq!(*calls.lock(), 0);
        assert_eq!(downloader.status(), DownloadStatus::Failed);
        assert!(!dest.exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cancel_before_start_skips_network() {
        let server = MockServer::start_async().await;
        let mock = server.mock_async(|when, then| {
            when.method(GET).path("/never");
            then.status(200).body("payload");
        }).await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("never.bin");
        let downloader = downloader(server.url("/never"), &dest, HashMap::new());

        downloader.cancel();
        downloader.cancel();
        assert!(downloader.is_cancelled());
        assert_eq!(downloader.status(), DownloadStatus::Cancelled);

        let err = downloader.start(|_| {}).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DownloadCancelled);
        mock.assert_hits_async(0).await;
        assert!(!dest.exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cancel_mid_transfer_resolves_promptly() {
        let url = stalled_server(b"0123456789", 1_000_000).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("partial.bin");
        let downloader = downloader(url, &dest, HashMap::new());

        let handle = downloader.clone();
        let result = tokio::time::timeout(
            Duration::from_secs(10),
            downloader.start(move |_| handle.cancel()),
        ).await.expect("cancelled download should not hang");

        let err = result.unwrap_err();
        assert_eq!(err.code, ErrorCode::DownloadCancelled);
        assert_eq!(downloader.status(), DownloadStatus::Cancelled);
        assert_eq!(downloader.total_bytes(), 1_000_000);
        assert!(dest.exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cancel_while_waiting_for_response() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(GET).path("/slow");
            then.status(200).body("late").delay(Duration::from_secs(30));
        }).await;

        let dir = tempfile::tempdir().unwrap();
        let downloader = downloader(server.url("/slow"), &dir.path().join("slow.bin"), HashMap::new());

        let canceller = downloader.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            canceller.cancel();
        });

        let result = tokio::time::timeout(Duration::from_secs(10), downloader.start(|_| {}))
            .await
            .expect("cancelled download should not hang");
        assert_eq!(result.unwrap_err().code, ErrorCode::DownloadCancelled);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_second_start_is_rejected() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(GET).path("/slow");
            then.status(200).body("done").delay(Duration::from_millis(500));
        }).await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("once.bin");
        let downloader = downloader(server.url("/slow"), &dest, HashMap::new());

        let first = {
            let downloader = downloader.clone();
            tokio::spawn(async move { downloader.start(|_| {}).await })
        };
        while downloader.status() == DownloadStatus::Created {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let err = downloader.start(|_| {}).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
        assert!(err.message.contains("already running"));

        first.await.unwrap().unwrap();
        assert_eq!(downloader.bytes_downloaded(), 4);
        assert!(downloader.status().is_terminal());

        let err = downloader.start(|_| {}).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
        assert!(err.message.contains("already finished"));
        assert_eq!(downloader.bytes_downloaded(), 4);
        assert_eq!(std::fs::read(&dest).unwrap(), b"done");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_connection_refused_is_download_failed() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dir = tempfile::tempdir().unwrap();
        let downloader = downloader(format!("http://{}/gone", addr), &dir.path().join("gone.bin"), HashMap::new());
        let err = downloader.start(|_| {}).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DownloadFailed);
        assert_eq!(downloader.status(), DownloadStatus::Failed);
    }
}
