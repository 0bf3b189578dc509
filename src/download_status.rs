use std::fmt::{Display, Formatter};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DownloadStatus {
    Created,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl DownloadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadStatus::Completed | DownloadStatus::Failed | DownloadStatus::Cancelled)
    }
}

impl Display for DownloadStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DownloadStatus::Created => write!(f, "Created"),
            DownloadStatus::Running => write!(f, "Running"),
            DownloadStatus::Completed => write!(f, "Completed"),
            DownloadStatus::Failed => write!(f, "Failed"),
            DownloadStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl From<DownloadStatus> for u8 {
    fn from(status: DownloadStatus) -> u8 {
        match status {
            DownloadStatus::Created => 0,
            DownloadStatus::Running => 1,
            DownloadStatus::Completed => 2,
            DownloadStatus::Failed => 3,
            DownloadStatus::Cancelled => 4,
        }
    }
}

impl From<u8> for DownloadStatus {
    fn from(value: u8) -> Self {
        match value {
            1 => DownloadStatus::Running,
            2 => DownloadStatus::Completed,
            3 => DownloadStatus::Failed,
            4 => DownloadStatus::Cancelled,
            _ => DownloadStatus::Created,
        }
    }
}
