use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use crate::blob_configuration::HASH_CHUNK_SIZE;
use crate::error::{BlobError, ErrorCode};
use crate::hash::HashAlgorithm;

/// Streams `path` through `algorithm` and returns the lowercase hex digest.
pub async fn hash_file(path: impl AsRef<Path>, algorithm: HashAlgorithm) -> crate::error::Result<String> {
    hash_file_with_chunk_size(path, algorithm, HASH_CHUNK_SIZE).await
}

pub async fn hash_file_with_chunk_size(
    path: impl AsRef<Path>,
    algorithm: HashAlgorithm,
    chunk_size: usize) -> crate::error::Result<String> {
    if chunk_size == 0 {
        return Err(BlobError::invalid_argument("Hash chunk size must be positive"));
    }
    let path: PathBuf = path.as_ref().to_path_buf();
    match tokio::task::spawn_blocking(move || calculate_file_hash(&path, algorithm, chunk_size)).await {
        Ok(result) => result,
        Err(e) => Err(BlobError::io_error(format!("Hash task failed: {}", e))),
    }
}

#[tracing::instrument(level = "debug", skip(path, chunk_size), fields(path = %path.display()))]
fn calculate_file_hash(path: &Path, algorithm: HashAlgorithm, chunk_size: usize) -> crate::error::Result<String> {
    let display = path.display().to_string();
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

    let mut file = File::open(path).map_err(|e| BlobError::from_io(&e, &display).with_path(display.clone()))?;
    let mut hasher = algorithm.hasher();
    let mut buffer = vec![0u8; chunk_size];
    loop {
        match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(len) => hasher.update(&buffer[..len]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(BlobError::new(ErrorCode::IoError, format!("Failed to read {}: {}", display, e)).with_path(display));
            }
        }
    }

    let digest = hasher.finalize_hex();
    tracing::debug!(digest = %digest, "file hashed");
    Ok(digest)
}
