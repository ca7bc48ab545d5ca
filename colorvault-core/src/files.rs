/*!
File classification and small file utilities used around extraction.
*/

use crate::{Result, VaultError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Extensions recognised as images, including the leading dot.
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp"];

/// Extensions recognised as archives, including the leading dot.
pub const ARCHIVE_EXTENSIONS: &[&str] = &[".zip", ".cbz", ".rar", ".cbr"];

/// Lower-cased extension of `name` including the leading `.`.
///
/// Only the last path segment is inspected. Returns an empty string when
/// the name has no dot.
///
/// ```rust
/// use colorvault_core::files::file_extension;
///
/// assert_eq!(file_extension("Scan.JPG"), ".jpg");
/// assert_eq!(file_extension("archive.tar.gz"), ".gz");
/// assert_eq!(file_extension("README"), "");
/// ```
pub fn file_extension(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rfind('.') {
        Some(index) => base[index..].to_lowercase(),
        None => String::new(),
    }
}

/// True when `name` has an image extension (case-insensitive).
pub fn is_image_file(name: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&file_extension(name).as_str())
}

/// True when `name` has an archive extension (case-insensitive).
pub fn is_archive_file(name: &str) -> bool {
    ARCHIVE_EXTENSIONS.contains(&file_extension(name).as_str())
}

/// Copy a picked file into the documents directory under `file_name`.
///
/// The documents directory is created if it does not exist yet. Returns the
/// destination path.
pub fn copy_to_documents(source: &Path, documents_dir: &Path, file_name: &str) -> Result<PathBuf> {
    if file_name.is_empty() || file_name.contains(['/', '\\']) {
        return Err(VaultError::validation(format!(
            "Invalid destination file name: '{file_name}'"
        )));
    }

    fs::create_dir_all(documents_dir)?;
    let destination = documents_dir.join(file_name);
    fs::copy(source, &destination).map_err(|e| {
        VaultError::storage(format!(
            "Failed to copy {} to {}: {}",
            source.display(),
            destination.display(),
            e
        ))
    })?;

    Ok(destination)
}

/// Size of the file at `path` in bytes, or 0 if it cannot be read.
pub fn file_size(path: &Path) -> u64 {
    match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) => {
            warn!("Failed to read size of {}: {}", path.display(), e);
            0
        }
    }
}

/// Human-readable size, e.g. `1536 -> "1.5 KB"`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;
    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    let rounded = format!("{size:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit_index])
}
