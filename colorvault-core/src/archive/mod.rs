/*!
Archive decoding adapters.

Extraction is split the same way storage is: the extractor only knows the
[`ArchiveDecoder`] port, and each container format is an adapter behind it.
Zip (and comic-book `.cbz`) is always available; rar/cbr needs the `rar`
cargo feature.
*/

#[cfg(feature = "rar")]
pub mod rar_archive;
pub mod zip_archive;

use crate::{files, Result, VaultError};
use std::path::Path;

#[cfg(feature = "rar")]
pub use rar_archive::RarDecoder;
pub use zip_archive::ZipDecoder;

/// Container formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// `.zip` and `.cbz`
    Zip,
    /// `.rar` and `.cbr`
    Rar,
}

impl ArchiveFormat {
    /// Detect the format from a file name or path.
    pub fn from_name(name: &str) -> Option<Self> {
        match files::file_extension(name).as_str() {
            ".zip" | ".cbz" => Some(Self::Zip),
            ".rar" | ".cbr" => Some(Self::Rar),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        Self::from_name(&path.to_string_lossy())
    }
}

/// Decompression abstraction for archive files.
///
/// Implementations must fully decompress `archive` into `dest` before
/// returning. `dest` already exists and is empty.
pub trait ArchiveDecoder {
    /// Decompress every entry of `archive` into `dest`.
    ///
    /// # Returns
    /// The number of files written
    fn unpack(&self, archive: &Path, dest: &Path) -> Result<usize>;

    /// Name of the container format(s) this decoder handles
    fn format_name(&self) -> &str;
}

impl<D: ArchiveDecoder + ?Sized> ArchiveDecoder for Box<D> {
    fn unpack(&self, archive: &Path, dest: &Path) -> Result<usize> {
        (**self).unpack(archive, dest)
    }

    fn format_name(&self) -> &str {
        (**self).format_name()
    }
}

/// Decoder that picks an adapter from the archive's extension.
///
/// Locations without a recognised extension (content URIs, renamed
/// downloads) are treated as zip.
#[derive(Debug, Clone, Default)]
pub struct AutoDecoder {
    zip: ZipDecoder,
    #[cfg(feature = "rar")]
    rar: RarDecoder,
}

impl AutoDecoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArchiveDecoder for AutoDecoder {
    fn unpack(&self, archive: &Path, dest: &Path) -> Result<usize> {
        match ArchiveFormat::from_path(archive).unwrap_or(ArchiveFormat::Zip) {
            ArchiveFormat::Zip => self.zip.unpack(archive, dest),
            #[cfg(feature = "rar")]
            ArchiveFormat::Rar => self.rar.unpack(archive, dest),
            #[cfg(not(feature = "rar"))]
            ArchiveFormat::Rar => Err(VaultError::UnsupportedFormat(format!(
                "{} (rebuild with the `rar` feature to read rar/cbr archives)",
                archive.display()
            ))),
        }
    }

    fn format_name(&self) -> &str {
        if cfg!(feature = "rar") {
            "zip+rar"
        } else {
            "zip"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_detection() {
        assert_eq!(ArchiveFormat::from_name("book.CBZ"), Some(ArchiveFormat::Zip));
        assert_eq!(ArchiveFormat::from_name("pics.zip"), Some(ArchiveFormat::Zip));
        assert_eq!(ArchiveFormat::from_name("book.cbr"), Some(ArchiveFormat::Rar));
        assert_eq!(ArchiveFormat::from_name("pics.RAR"), Some(ArchiveFormat::Rar));
        assert_eq!(ArchiveFormat::from_name("pics.7z"), None);
        assert_eq!(ArchiveFormat::from_path(Path::new("/a/b.cbz")), Some(ArchiveFormat::Zip));
    }

    #[cfg(not(feature = "rar"))]
    #[test]
    fn test_rar_unsupported_without_feature() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("book.cbr");
        std::fs::write(&archive, b"Rar!").unwrap();

        let err = AutoDecoder::new()
            .unpack(&archive, temp_dir.path())
            .unwrap_err();
        assert!(matches!(err, VaultError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_unknown_extension_falls_back_to_zip() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("download");
        std::fs::write(&archive, b"definitely not a zip").unwrap();

        let dest = temp_dir.path().join("out");
        std::fs::create_dir(&dest).unwrap();
        let err = AutoDecoder::new().unpack(&archive, &dest).unwrap_err();
        assert!(matches!(err, VaultError::Archive(_)));
    }
}
