use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use filetime::FileTime;
use tracing::debug;

use crate::errors::{Result, WebDavError};
use crate::urn::SEPARATOR;

/// Names of the entries of a local directory, sorted, with a trailing `/` on
/// subdirectories so they line up with remote listings
pub async fn list_dir(directory: &Path) -> Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(directory)
        .await
        .map_err(|e| WebDavError::local_io(directory, e))?;

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| WebDavError::local_io(directory, e))?
    {
        let mut name = entry.file_name().to_string_lossy().into_owned();
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| WebDavError::local_io(entry.path(), e))?;
        if file_type.is_dir() {
            name.push(SEPARATOR);
        }
        names.push(name);
    }

    names.sort();
    Ok(names)
}

pub async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false)
}

pub async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Size of a local file in bytes
pub async fn file_size(path: &Path) -> Result<u64> {
    tokio::fs::metadata(path)
        .await
        .map(|metadata| metadata.len())
        .map_err(|e| WebDavError::local_io(path, e))
}

/// Modification time of a local file, truncated to whole seconds
pub async fn modified_time(path: &Path) -> Result<DateTime<Utc>> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| WebDavError::local_io(path, e))?;
    let mtime = FileTime::from_last_modification_time(&metadata);

    Utc.timestamp_opt(mtime.unix_seconds(), 0)
        .single()
        .ok_or_else(|| {
            WebDavError::local_io(
                path,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "modification time out of range",
                ),
            )
        })
}

/// Sets the modification time of a local file
pub fn set_modified_time(path: &Path, modified: DateTime<Utc>) -> Result<()> {
    debug!("Aligning mtime of {} to {}", path.display(), modified);
    filetime::set_file_mtime(path, FileTime::from_unix_time(modified.timestamp(), 0))
        .map_err(|e| WebDavError::local_io(path, e))
}

/// Creates a directory and any missing parents
pub async fn create_dir_all(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| WebDavError::local_io(path, e))
}

/// Removes a directory with everything in it
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    tokio::fs::remove_dir_all(path)
        .await
        .map_err(|e| WebDavError::local_io(path, e))
}
