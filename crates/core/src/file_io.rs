use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),
    #[error("not a regular file: {0}")]
    NotAFile(PathBuf),
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn classify(path: &Path, e: std::io::Error) -> FileError {
    match e.kind() {
        std::io::ErrorKind::NotFound => FileError::NotFound(path.to_path_buf()),
        std::io::ErrorKind::PermissionDenied => FileError::PermissionDenied(path.to_path_buf()),
        _ => FileError::Io(e),
    }
}

/// Read a local `.map` file into memory.
/// The extension is not checked; sourcemaps are often saved as `.json`.
pub async fn read_map_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, FileError> {
    let path_ref = path.as_ref();

    let meta = fs::metadata(path_ref).await.map_err(|e| classify(path_ref, e))?;
    if !meta.is_file() {
        return Err(FileError::NotAFile(path_ref.to_path_buf()));
    }

    fs::read(path_ref).await.map_err(|e| classify(path_ref, e))
}
