/*!
Zip archive adapter (also used for `.cbz` comic-book archives).
*/

use super::ArchiveDecoder;
use crate::{Result, VaultError};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// Zip decoder backed by the `zip` crate.
///
/// Entries whose names would land outside the destination directory are
/// skipped.
#[derive(Debug, Clone, Default)]
pub struct ZipDecoder;

impl ZipDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveDecoder for ZipDecoder {
    fn unpack(&self, archive: &Path, dest: &Path) -> Result<usize> {
        let file = fs::File::open(archive)?;
        let mut zip = zip::ZipArchive::new(file)
            .map_err(|e| VaultError::archive(format!("Invalid or corrupt zip: {e}")))?;

        let mut count = 0;
        for i in 0..zip.len() {
            let mut entry = zip
                .by_index(i)
                .map_err(|e| VaultError::archive(format!("Failed to read entry {i}: {e}")))?;

            let entry_path = match entry.enclosed_name() {
                Some(p) => p.to_path_buf(),
                None => {
                    warn!("Skipping unsafe zip entry name: {}", entry.name());
                    continue;
                }
            };
            let output_path = dest.join(&entry_path);

            if entry.is_dir() {
                fs::create_dir_all(&output_path)?;
                continue;
            }

            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut outfile = fs::File::create(&output_path)?;
            io::copy(&mut entry, &mut outfile).map_err(|e| {
                VaultError::archive(format!(
                    "Failed to decompress {}: {}",
                    entry_path.display(),
                    e
                ))
            })?;
            count += 1;
        }

        debug!("Unpacked {} files from {}", count, archive.display());
        Ok(count)
    }

    fn format_name(&self) -> &str {
        "zip"
    }
}
