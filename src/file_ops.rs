//! One-shot filesystem calls that share the handle layer's error codes.

use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use crate::error::{BlobError, ErrorCode};
use crate::file_info::FileInfo;

fn display(path: &Path) -> String {
    path.display().to_string()
}

fn io_failure(err: std::io::Error, path: &Path) -> BlobError {
    BlobError::from_io(&err, path.display()).with_path(display(path))
}

async fn metadata_or_not_found(path: &Path, what: &str) -> crate::error::Result<std::fs::Metadata> {
    match fs::metadata(path).await {
        Ok(metadata) => Ok(metadata),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(BlobError::file_not_found(format!("{} does not exist: {}", what, path.display())).with_path(display(path)))
        }
        Err(e) => Err(io_failure(e, path)),
    }
}

async fn create_parent(path: &Path) -> crate::error::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await.map_err(|e| io_failure(e, parent))?;
        }
    }
    Ok(())
}

pub async fn exists(path: impl AsRef<Path>) -> crate::error::Result<bool> {
    Ok(fs::metadata(path.as_ref()).await.is_ok())
}

pub async fn stat(path: impl AsRef<Path>) -> crate::error::Result<FileInfo> {
    let path = path.as_ref();
    let metadata = metadata_or_not_found(path, "File").await?;
    Ok(FileInfo::from_metadata(path, &metadata))
}

/// Removes a file or an empty directory.
pub async fn unlink(path: impl AsRef<Path>) -> crate::error::Result<()> {
    let path = path.as_ref();
    let metadata = metadata_or_not_found(path, "File").await?;
    let result = if metadata.is_dir() {
        fs::remove_dir(path).await
    } else {
        fs::remove_file(path).await
    };
    result.map_err(|e| io_failure(e, path))
}

/// Creates `path` and any missing parents; an existing directory is fine.
pub async fn mkdir(path: impl AsRef<Path>) -> crate::error::Result<()> {
    let path = path.as_ref();
    if let Ok(metadata) = fs::metadata(path).await {
        if !metadata.is_dir() {
            return Err(BlobError::invalid_argument(format!("Path exists and is not a directory: {}", path.display()))
                .with_path(display(path)));
        }
        return Ok(());
    }
    fs::create_dir_all(path).await.map_err(|e| io_failure(e, path))
}

pub async fn ls(path: impl AsRef<Path>) -> crate::error::Result<Vec<FileInfo>> {
    let path = path.as_ref();
    let metadata = metadata_or_not_found(path, "Directory").await?;
    if !metadata.is_dir() {
        return Err(BlobError::new(ErrorCode::NotADirectory, format!("Path is not a directory: {}", path.display()))
            .with_path(display(path)));
    }

    let mut entries = fs::read_dir(path).await.map_err(|e| io_failure(e, path))?;
    let mut infos = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| io_failure(e, path))? {
        let entry_path = entry.path();
        match fs::metadata(&entry_path).await {
            Ok(metadata) => infos.push(FileInfo::from_metadata(&entry_path, &metadata)),
            // dangling symlink or removed since listing
            Err(e) => tracing::debug!(path = %entry_path.display(), error = %e, "skipping entry"),
        }
    }
    infos.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(infos)
}

/// Copies a regular file, replacing the destination.
pub async fn cp(src: impl AsRef<Path>, dest: impl AsRef<Path>) -> crate::error::Result<()> {
    let (src, dest) = (src.as_ref(), dest.as_ref());
    let metadata = metadata_or_not_found(src, "Source").await?;
    if !metadata.is_file() {
        return Err(BlobError::invalid_argument(format!("Source is not a file: {}", src.display())).with_path(display(src)));
    }
    create_parent(dest).await?;
    fs::copy(src, dest).await.map_err(|e| io_failure(e, dest))?;
    Ok(())
}

/// Renames `src` to `dest`, copying files across devices when rename fails.
pub async fn mv(src: impl AsRef<Path>, dest: impl AsRef<Path>) -> crate::error::Result<()> {
    let (src, dest) = (src.as_ref(), dest.as_ref());
    let metadata = metadata_or_not_found(src, "Source").await?;
    create_parent(dest).await?;

    let rename_error = match fs::rename(src, dest).await {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };

    if !metadata.is_file() {
        return Err(BlobError::io_error(format!("Failed to move {}: {}", src.display(), rename_error)).with_path(display(src)));
    }

    tracing::debug!(src = %src.display(), error = %rename_error, "rename failed, copying instead");
    fs::copy(src, dest).await.map_err(|e| io_failure(e, dest))?;
    fs::remove_file(src).await.map_err(|e| {
        BlobError::io_error(format!(
            "Move partially failed: copied but could not delete source {}: {}",
            src.display(),
            e
        )).with_path(display(src))
    })
}

#[cfg(test)]
mod test {
    use crate::error::ErrorCode;
    use crate::file_info::FileType;
    use crate::file_ops::{cp, exists, ls, mkdir, mv, stat, unlink};

    #[tokio::test]
    async fn test_stat_and_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("info.txt");
        std::fs::write(&path, b"12345").unwrap();

        assert!(exists(&path).await.unwrap());
        assert!(!exists(dir.path().join("nope")).await.unwrap());

        let info = stat(&path).await.unwrap();
        assert_eq!(info.name, "info.txt");
        assert_eq!(info.size, 5);
        assert_eq!(info.file_type, FileType::File);
        assert!(info.last_modified > 0);

        let info = stat(dir.path()).await.unwrap();
        assert_eq!(info.file_type, FileType::Directory);
        assert_eq!(info.size, 0);

        let err = stat(dir.path().join("nope")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::FileNotFound);
    }

    #[tokio::test]
    async fn test_mkdir_ls_unlink() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("x").join("y");
        mkdir(&nested).await.unwrap();
        mkdir(&nested).await.unwrap();
        std::fs::write(nested.join("b.txt"), b"b").unwrap();
        std::fs::write(nested.join("a.txt"), b"aa").unwrap();

        let names: Vec<String> = ls(&nested).await.unwrap().into_iter().map(|info| info.name).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);

        let file = nested.join("a.txt");
        assert_eq!(mkdir(&file).await.unwrap_err().code, ErrorCode::InvalidArgument);
        assert_eq!(ls(&file).await.unwrap_err().code, ErrorCode::NotADirectory);
        assert_eq!(ls(dir.path().join("missing")).await.unwrap_err().code, ErrorCode::FileNotFound);

        unlink(&file).await.unwrap();
        assert!(!file.exists());
        assert_eq!(unlink(&file).await.unwrap_err().code, ErrorCode::FileNotFound);
        assert_eq!(unlink(&nested).await.unwrap_err().code, ErrorCode::DirectoryNotEmpty);
    }

    #[tokio::test]
    async fn test_cp_and_mv() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.txt");
        std::fs::write(&src, b"payload").unwrap();

        let copy = dir.path().join("copies").join("copy.txt");
        cp(&src, &copy).await.unwrap();
        assert_eq!(std::fs::read(&copy).unwrap(), b"payload");
        assert!(src.exists());

        let moved = dir.path().join("moved").join("moved.txt");
        mv(&src, &moved).await.unwrap();
        assert!(!src.exists());
        assert_eq!(std::fs::read(&moved).unwrap(), b"payload");

        assert_eq!(cp(&src, &copy).await.unwrap_err().code, ErrorCode::FileNotFound);
        assert_eq!(cp(dir.path(), &copy).await.unwrap_err().code, ErrorCode::InvalidArgument);
        assert_eq!(mv(&src, &moved).await.unwrap_err().code, ErrorCode::FileNotFound);
    }
}
