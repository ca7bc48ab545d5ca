/*!
Rar archive adapter (also used for `.cbr` comic-book archives).
*/

use super::ArchiveDecoder;
use crate::{Result, VaultError};
use std::path::Path;
use walkdir::WalkDir;

#[derive(Debug, Clone, Default)]
pub struct RarDecoder;

impl RarDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveDecoder for RarDecoder {
    fn unpack(&self, archive: &Path, dest: &Path) -> Result<usize> {
        let archive_str = archive
            .to_str()
            .ok_or_else(|| VaultError::archive("RAR path contains invalid UTF-8"))?;
        let dest_str = dest
            .to_str()
            .ok_or_else(|| VaultError::archive("Destination path contains invalid UTF-8"))?;

        rar::Archive::extract_all(archive_str, dest_str, "")
            .map_err(|e| VaultError::archive(format!("Failed to extract RAR: {e:?}")))?;

        // The rar crate does not report a count.
        let count = WalkDir::new(dest)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .count();

        Ok(count)
    }

    fn format_name(&self) -> &str {
        "rar"
    }
}
