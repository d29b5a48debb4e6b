use std::path::{Path, PathBuf};
use tokio::fs;
use crate::utils::{OptimizerError, OptimizerResult, ValidationError};

/// Get file size in bytes
pub async fn get_file_size(path: impl AsRef<Path>) -> OptimizerResult<u64> {
    fs::metadata(path.as_ref())
        .await
        .map(|m| m.len())
        .map_err(|e| OptimizerError::io(format!("Failed to get file size: {}", e)))
}

/// Get file extension as lowercase string, empty when the path has none
pub fn get_extension(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// Last path component, or the whole input if there is none.
pub fn extract_filename(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path)
}

/// Ensures `path` exists and is a regular file.
pub async fn validate_input_path(path: impl AsRef<Path>) -> OptimizerResult<u64> {
    let path = path.as_ref();
    let metadata = fs::metadata(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ValidationError::path_not_found(path).into(),
        _ => OptimizerError::from(e),
    })?;

    if !metadata.is_file() {
        return Err(ValidationError::not_a_file(path).into());
    }
    Ok(metadata.len())
}

/// Moves `from` to `to`, falling back to copy + delete across filesystems.
pub async fn move_file(from: &Path, to: &Path) -> OptimizerResult<()> {
    if fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    fs::copy(from, to)
        .await
        .map_err(|e| OptimizerError::io(format!("Failed to move {} to {}: {}", from.display(), to.display(), e)))?;
    fs::remove_file(from).await?;
    Ok(())
}

/// Sibling of `path` in the system temp directory, unique per call.
pub fn staging_path(path: &Path) -> PathBuf {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
    let ext = get_extension(path);
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("image-dropper-{}-{}-{}.{}", std::process::id(), seq, stem, ext))
}
