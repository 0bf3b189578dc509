use tokio::sync::watch::{channel, Receiver, Sender};

/// Cumulative progress of one download.
///
/// `total_bytes` is `-1` until the response headers declare a length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownloadProgress {
    pub bytes_downloaded: u64,
    pub total_bytes: i64,
    pub progress: f64,
}

impl DownloadProgress {
    pub fn new(bytes_downloaded: u64, total_bytes: i64) -> DownloadProgress {
        let progress = if total_bytes > 0 {
            (bytes_downloaded as f64 / total_bytes as f64).clamp(0f64, 1f64)
        } else {
            0f64
        };
        DownloadProgress {
            bytes_downloaded,
            total_bytes,
            progress,
        }
    }

    /// Progress reported once the body has been fully written.
    pub fn finished(bytes_downloaded: u64, total_bytes: i64) -> DownloadProgress {
        DownloadProgress {
            bytes_downloaded,
            total_bytes,
            progress: if total_bytes > 0 { 1f64 } else { 0f64 },
        }
    }
}

impl Default for DownloadProgress {
    fn default() -> Self {
        DownloadProgress::new(0, -1)
    }
}

/// Publishes the latest progress to any number of pollers.
pub(crate) struct DownloadTracker {
    sender: Sender<DownloadProgress>,
}

impl DownloadTracker {
    pub fn new() -> DownloadTracker {
        let (sender, _receiver) = channel(DownloadProgress::default());
        DownloadTracker {
            sender
        }
    }

    pub fn subscribe(&self) -> Receiver<DownloadProgress> {
        self.sender.subscribe()
    }

    pub fn publish(&self, progress: DownloadProgress) {
        self.sender.send_replace(progress);
    }

    pub fn latest(&self) -> DownloadProgress {
        *self.sender.borrow()
    }
}

#[cfg(test)]
mod test {
    use crate::download_progress::{DownloadProgress, DownloadTracker};

    #[test]
    fn test_progress_ratio() {
        assert_eq!(DownloadProgress::new(50, 200).progress, 0.25);
        assert_eq!(DownloadProgress::new(50, -1).progress, 0.0);
        assert_eq!(DownloadProgress::new(50, 0).progress, 0.0);
        assert_eq!(DownloadProgress::finished(10, -1).progress, 0.0);
        assert_eq!(DownloadProgress::finished(10, 10).progress, 1.0);
    }

    #[test]
    fn test_tracker_keeps_latest() {
        let tracker = DownloadTracker::new();
        let receiver = tracker.subscribe();
        tracker.publish(DownloadProgress::new(1, 4));
        tracker.publish(DownloadProgress::new(3, 4));
        assert_eq!(receiver.borrow().bytes_downloaded, 3);
        assert_eq!(tracker.latest().progress, 0.75);
    }
}
