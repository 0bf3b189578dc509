use std::fmt::{Display, Formatter};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    FileNotFound,
    PermissionDenied,
    FileAlreadyExists,
    NotAFile,
    NotADirectory,
    DirectoryNotEmpty,
    IoError,
    InvalidArgument,
    DownloadFailed,
    DownloadCancelled,
    ReaderClosed,
    WriterClosed,
    Unknown,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 13] = [
        ErrorCode::FileNotFound,
        ErrorCode::PermissionDenied,
        ErrorCode::FileAlreadyExists,
        ErrorCode::NotAFile,
        ErrorCode::NotADirectory,
        ErrorCode::DirectoryNotEmpty,
        ErrorCode::IoError,
        ErrorCode::InvalidArgument,
        ErrorCode::DownloadFailed,
        ErrorCode::DownloadCancelled,
        ErrorCode::ReaderClosed,
        ErrorCode::WriterClosed,
        ErrorCode::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::FileNotFound => "FILE_NOT_FOUND",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::FileAlreadyExists => "FILE_ALREADY_EXISTS",
            ErrorCode::NotAFile => "NOT_A_FILE",
            ErrorCode::NotADirectory => "NOT_A_DIRECTORY",
            ErrorCode::DirectoryNotEmpty => "DIRECTORY_NOT_EMPTY",
            ErrorCode::IoError => "IO_ERROR",
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::DownloadFailed => "DOWNLOAD_FAILED",
            ErrorCode::DownloadCancelled => "DOWNLOAD_CANCELLED",
            ErrorCode::ReaderClosed => "READER_CLOSED",
            ErrorCode::WriterClosed => "WRITER_CLOSED",
            ErrorCode::Unknown => "UNKNOWN",
        }
    }

    /// Maps a wire code back to its variant. Anything unrecognised is `Unknown`.
    pub fn from_code(code: &str) -> ErrorCode {
        ErrorCode::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == code)
            .unwrap_or(ErrorCode::Unknown)
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error crossing the handle boundary.
///
/// `Display` renders the wire form `[ERROR_CODE] message`, which
/// [`BlobError::parse`] turns back into the same code and message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct BlobError {
    pub code: ErrorCode,
    pub message: String,
    pub path: Option<String>,
}

pub type Result<T> = core::result::Result<T, BlobError>;

impl BlobError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn file_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::FileNotFound, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArgument, message)
    }

    pub fn io_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::IoError, message)
    }

    pub fn reader_closed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ReaderClosed, message)
    }

    pub fn writer_closed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::WriterClosed, message)
    }

    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DownloadFailed, message)
    }

    pub fn download_cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DownloadCancelled, message)
    }

    /// Classifies an `io::Error` and prefixes its text with `context`.
    pub fn from_io(err: &io::Error, context: impl Display) -> Self {
        let code = match err.kind() {
            io::ErrorKind::NotFound => ErrorCode::FileNotFound,
            io::ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
            io::ErrorKind::AlreadyExists => ErrorCode::FileAlreadyExists,
            io::ErrorKind::NotADirectory => ErrorCode::NotADirectory,
            io::ErrorKind::IsADirectory => ErrorCode::NotAFile,
            io::ErrorKind::DirectoryNotEmpty => ErrorCode::DirectoryNotEmpty,
            _ => ErrorCode::IoError,
        };
        Self::new(code, format!("{}: {}", context, err))
    }

    /// Parses `[ERROR_CODE] message`.
    ///
    /// The prefix must be `[`, one or more of `A-Z` or `_`, then `]`. Input
    /// without a valid prefix yields `Unknown` carrying the whole text.
    pub fn parse(input: &str) -> BlobError {
        match split_code(input) {
            Some((code, rest)) => {
                let message = if rest.is_empty() { input } else { rest };
                BlobError::new(ErrorCode::from_code(code), message)
            }
            None => BlobError::new(ErrorCode::Unknown, input),
        }
    }
}

fn split_code(input: &str) -> Option<(&str, &str)> {
    let body = input.strip_prefix('[')?;
    let end = body.find(']')?;
    let code = &body[..end];
    if code.is_empty() || !code.bytes().all(|b| b.is_ascii_uppercase() || b == b'_') {
        return None;
    }
    Some((code, body[end + 1..].trim_start()))
}

impl From<io::Error> for BlobError {
    fn from(err: io::Error) -> Self {
        BlobError::from_io(&err, "I/O failure")
    }
}
