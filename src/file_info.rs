use std::fmt::{Display, Formatter};
use std::fs::Metadata;
use std::path::Path;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
    Unknown,
}

impl Display for FileType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FileType::File => write!(f, "file"),
            FileType::Directory => write!(f, "directory"),
            FileType::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub path: String,
    pub name: String,
    pub size: u64,
    pub file_type: FileType,
    /// Milliseconds since the Unix epoch, 0 when the platform cannot tell.
    pub last_modified: i64,
}

impl FileInfo {
    pub(crate) fn from_metadata(path: &Path, metadata: &Metadata) -> FileInfo {
        let file_type = if metadata.is_file() {
            FileType::File
        } else if metadata.is_dir() {
            FileType::Directory
        } else {
            FileType::Unknown
        };
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let last_modified = metadata
            .modified()
            .map(|time| DateTime::<Utc>::from(time).timestamp_millis())
            .unwrap_or(0);

        FileInfo {
            path: absolute.display().to_string(),
            name: path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default(),
            size: if file_type == FileType::File { metadata.len() } else { 0 },
            file_type,
            last_modified,
        }
    }
}
