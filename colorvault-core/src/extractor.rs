/*!
Archive image extraction.

Turns one archive into the image references it contains: the archive is
fully decompressed into a fresh scratch directory, the directory is walked
depth-first, and every file with an image extension becomes an
[`ImageReference`] tagged with the archive's display name.
*/

use crate::archive::{ArchiveDecoder, AutoDecoder};
use crate::config::VaultConfig;
use crate::model::{ArchiveReference, ImageReference};
use crate::{files, ids, Result, VaultError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Name prefix shared by every scratch directory this component creates.
pub const SCRATCH_PREFIX: &str = "temp_extract_";

/// Extracts images from archives into uniquely named scratch directories.
///
/// Scratch directories are left on disk after a successful extraction since
/// the returned references point into them. Call
/// [`cleanup_scratch`](Self::cleanup_scratch) once the images are no longer
/// needed.
///
/// # Example
/// ```rust,no_run
/// use colorvault_core::{ArchiveImageExtractor, ArchiveReference};
///
/// let extractor = ArchiveImageExtractor::with_scratch_root("/tmp/colorvault");
/// let images = extractor.extract(&ArchiveReference::from_path("/downloads/vol1.cbz"))?;
/// for image in &images {
///     println!("{} from {:?}", image.display_name, image.source_archive);
/// }
/// # Ok::<(), colorvault_core::VaultError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ArchiveImageExtractor<D = AutoDecoder>
where
    D: ArchiveDecoder,
{
    decoder: D,
    scratch_root: PathBuf,
}

impl ArchiveImageExtractor<AutoDecoder> {
    /// Extractor using the extension-dispatching decoder.
    pub fn with_scratch_root<P: Into<PathBuf>>(scratch_root: P) -> Self {
        Self::new(AutoDecoder::new(), scratch_root)
    }
}

impl<D> ArchiveImageExtractor<D>
where
    D: ArchiveDecoder,
{
    /// Create an extractor with the given decoder.
    ///
    /// # Arguments
    /// * `decoder` - Adapter that decompresses archives
    /// * `scratch_root` - Directory under which scratch directories are created
    pub fn new<P: Into<PathBuf>>(decoder: D, scratch_root: P) -> Self {
        Self {
            decoder,
            scratch_root: scratch_root.into(),
        }
    }

    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    /// Extract every image contained in `archive`.
    ///
    /// Either all images are returned or an error is: if the archive cannot
    /// be opened or decompressed, the scratch directory is removed and a
    /// [`VaultError::Extraction`] naming the archive is returned.
    /// Unreadable entries found while scanning are logged and skipped.
    pub fn extract(&self, archive: &ArchiveReference) -> Result<Vec<ImageReference>> {
        #[cfg(feature = "metrics")]
        let timer = crate::observability::ExtractionTimer::start();

        let result = self.extract_inner(archive);

        #[cfg(feature = "metrics")]
        {
            match &result {
                Ok(images) => timer.finish(images.len()),
                Err(_) => timer.finish_with_error(),
            }
        }

        result
    }

    fn extract_inner(&self, archive: &ArchiveReference) -> Result<Vec<ImageReference>> {
        let scratch = self
            .create_scratch_dir()
            .map_err(|e| VaultError::extraction(archive.display_name.clone(), e))?;

        let unpacked = match self.decoder.unpack(&archive.location, &scratch) {
            Ok(count) => count,
            Err(e) => {
                if let Err(cleanup_err) = fs::remove_dir_all(&scratch) {
                    warn!(
                        "Failed to remove scratch directory {} after failed extraction: {}",
                        scratch.display(),
                        cleanup_err
                    );
                }
                return Err(VaultError::extraction(archive.display_name.clone(), e));
            }
        };

        let images: Vec<ImageReference> = find_images(&scratch)
            .iter()
            .map(|path| ImageReference::from_archive(path, archive.display_name.clone()))
            .collect();

        info!(
            "Extracted {} images ({} files) from {} into {}",
            images.len(),
            unpacked,
            archive.display_name,
            scratch.display()
        );
        Ok(images)
    }

    /// Create a fresh scratch directory that no other extraction shares.
    fn create_scratch_dir(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.scratch_root)?;
        let path = self
            .scratch_root
            .join(format!("{}{}", SCRATCH_PREFIX, ids::scratch_suffix()));
        // create_dir, not create_dir_all: an existing directory must fail
        fs::create_dir(&path)?;
        Ok(path)
    }

    /// Delete every scratch directory under the scratch root.
    ///
    /// Never fails: a missing root, or a directory deleted concurrently by
    /// someone else, is not an error.
    ///
    /// # Returns
    /// The number of scratch directories removed by this call
    pub fn cleanup_scratch(&self) -> usize {
        let entries = match fs::read_dir(&self.scratch_root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return 0,
            Err(e) => {
                warn!(
                    "Failed to list scratch root {}: {}",
                    self.scratch_root.display(),
                    e
                );
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let is_scratch = entry.file_name().to_string_lossy().starts_with(SCRATCH_PREFIX);
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if !is_scratch || !is_dir {
                continue;
            }

            match fs::remove_dir_all(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(
                    "Failed to remove scratch directory {}: {}",
                    entry.path().display(),
                    e
                ),
            }
        }

        #[cfg(feature = "metrics")]
        crate::observability::VaultMetrics::global().record_scratch_removed(removed);

        info!(
            "Removed {} scratch directories from {}",
            removed,
            self.scratch_root.display()
        );
        removed
    }
}

/// Build an extractor whose scratch root comes from `config`
pub fn create_extractor_from_config(config: &VaultConfig) -> Result<ArchiveImageExtractor> {
    config.validate()?;
    Ok(ArchiveImageExtractor::with_scratch_root(
        config.resolved_scratch_dir(),
    ))
}

/// Find image files under `dir`, depth-first.
///
/// Each directory's entries are visited in file-name order and
/// subdirectories are descended into where they appear, so the result is
/// stable for an unchanged tree. Symbolic links are not followed.
pub fn find_images(dir: &Path) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        if files::is_image_file(&entry.file_name().to_string_lossy()) {
            images.push(entry.into_path());
        } else {
            debug!("Skipping non-image file {}", entry.path().display());
        }
    }

    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReferenceKind;
    use tempfile::TempDir;

    /// Decoder that lays out a fixed tree instead of reading an archive.
    struct TreeDecoder {
        files: Vec<&'static str>,
    }

    impl ArchiveDecoder for TreeDecoder {
        fn unpack(&self, _archive: &Path, dest: &Path) -> Result<usize> {
            for name in &self.files {
                let path = dest.join(name);
                fs::create_dir_all(path.parent().unwrap())?;
                fs::write(&path, name.as_bytes())?;
            }
            Ok(self.files.len())
        }

        fn format_name(&self) -> &str {
            "tree"
        }
    }

    struct FailingDecoder;

    impl ArchiveDecoder for FailingDecoder {
        fn unpack(&self, _archive: &Path, dest: &Path) -> Result<usize> {
            fs::write(dest.join("half-written.png"), b"partial")?;
            Err(VaultError::archive("unexpected end of archive"))
        }

        fn format_name(&self) -> &str {
            "failing"
        }
    }

    fn relative_names(images: &[ImageReference], root: &Path) -> Vec<String> {
        images
            .iter()
            .map(|image| {
                let path = Path::new(&image.location);
                let scratch = path
                    .ancestors()
                    .find(|p| p.parent() == Some(root))
                    .unwrap();
                path.strip_prefix(scratch)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_extract_depth_first_order_and_filtering() {
        let temp_dir = TempDir::new().unwrap();
        let decoder = TreeDecoder {
            files: vec![
                "readme.txt",
                "f.BMP",
                "b/d/e.gif",
                "b/c.jpg",
                "b/notes.md",
                "a.png",
            ],
        };
        let extractor = ArchiveImageExtractor::new(decoder, temp_dir.path());

        let images = extractor
            .extract(&ArchiveReference::new("/ignored.zip", "book.zip"))
            .unwrap();

        assert_eq!(
            relative_names(&images, temp_dir.path()),
            vec!["a.png", "b/c.jpg", "b/d/e.gif", "f.BMP"]
        );
        for image in &images {
            assert_eq!(image.kind, ReferenceKind::Image);
            assert_eq!(image.source_archive.as_deref(), Some("book.zip"));
            assert!(files::is_image_file(&image.display_name));
            assert!(Path::new(&image.location).is_file());
        }
        assert_eq!(images[2].display_name, "e.gif");
    }

    #[test]
    fn test_extract_without_images_returns_empty() {
        let temp_dir = TempDir::new().unwrap();
        let decoder = TreeDecoder {
            files: vec!["a.txt", "nested/b.pdf"],
        };
        let extractor = ArchiveImageExtractor::new(decoder, temp_dir.path());

        let images = extractor
            .extract(&ArchiveReference::new("/ignored.zip", "docs.zip"))
            .unwrap();
        assert!(images.is_empty());
    }

    #[test]
    fn test_extract_failure_is_all_or_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = ArchiveImageExtractor::new(FailingDecoder, temp_dir.path());

        let err = extractor
            .extract(&ArchiveReference::new("/ignored.cbz", "broken.cbz"))
            .unwrap_err();

        match &err {
            VaultError::Extraction { archive, .. } => assert_eq!(archive, "broken.cbz"),
            other => panic!("Expected Extraction error, got {other:?}"),
        }
        assert!(err.to_string().contains("unexpected end of archive"));

        // the partially written scratch directory is gone
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_each_extraction_gets_its_own_scratch_dir() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = ArchiveImageExtractor::new(
            TreeDecoder {
                files: vec!["x.png"],
            },
            temp_dir.path(),
        );

        let first = extractor.extract(&ArchiveReference::new("/a.zip", "a.zip")).unwrap();
        let second = extractor.extract(&ArchiveReference::new("/a.zip", "a.zip")).unwrap();

        assert_ne!(first[0].location, second[0].location);
        assert_ne!(first[0].id, second[0].id);
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_cleanup_scratch_only_removes_scratch_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = ArchiveImageExtractor::new(
            TreeDecoder {
                files: vec!["x.png"],
            },
            temp_dir.path(),
        );
        extractor.extract(&ArchiveReference::new("/a.zip", "a.zip")).unwrap();
        extractor.extract(&ArchiveReference::new("/b.zip", "b.zip")).unwrap();

        fs::create_dir(temp_dir.path().join("keep_me")).unwrap();
        fs::write(temp_dir.path().join("temp_extract_file.txt"), b"not a dir").unwrap();

        assert_eq!(extractor.cleanup_scratch(), 2);
        assert!(temp_dir.path().join("keep_me").is_dir());
        assert!(temp_dir.path().join("temp_extract_file.txt").is_file());

        // idempotent
        assert_eq!(extractor.cleanup_scratch(), 0);
    }

    #[test]
    fn test_cleanup_scratch_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = ArchiveImageExtractor::with_scratch_root(temp_dir.path().join("never-created"));
        assert_eq!(extractor.cleanup_scratch(), 0);
    }

    /// Decoder that lays out a tree and then locks one subdirectory.
    #[cfg(unix)]
    struct LockingDecoder;

    #[cfg(unix)]
    impl ArchiveDecoder for LockingDecoder {
        fn unpack(&self, _archive: &Path, dest: &Path) -> Result<usize> {
            use std::os::unix::fs::PermissionsExt;

            for name in ["a.png", "locked/hidden.png", "z/c.jpg"] {
                let path = dest.join(name);
                fs::create_dir_all(path.parent().unwrap())?;
                fs::write(&path, name.as_bytes())?;
            }
            fs::set_permissions(dest.join("locked"), fs::Permissions::from_mode(0o000))?;
            Ok(3)
        }

        fn format_name(&self) -> &str {
            "locking"
        }
    }

    /// Whether directory permissions are enforced for this process (not root).
    #[cfg(unix)]
    fn permissions_enforced(dir: &Path) -> bool {
        use std::os::unix::fs::PermissionsExt;

        let check_dir = dir.join("permission-check");
        fs::create_dir(&check_dir).unwrap();
        fs::set_permissions(&check_dir, fs::Permissions::from_mode(0o000)).unwrap();
        let enforced = fs::read_dir(&check_dir).is_err();
        fs::set_permissions(&check_dir, fs::Permissions::from_mode(0o755)).unwrap();
        fs::remove_dir(&check_dir).unwrap();
        enforced
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdirectory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        if !permissions_enforced(temp_dir.path()) {
            eprintln!("skipping: directory permissions are not enforced for this user");
            return;
        }

        let scratch_root = temp_dir.path().join("scratch");
        let extractor = ArchiveImageExtractor::new(LockingDecoder, &scratch_root);
        let result = extractor.extract(&ArchiveReference::new("/ignored.zip", "mixed.zip"));

        // unlock before asserting so the temp dir can always be removed
        for scratch in fs::read_dir(&scratch_root).unwrap().flatten() {
            let locked = scratch.path().join("locked");
            if locked.exists() {
                fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            }
        }

        let images = result.unwrap();
        assert_eq!(relative_names(&images, &scratch_root), vec!["a.png", "z/c.jpg"]);
        for image in &images {
            assert_eq!(image.source_archive.as_deref(), Some("mixed.zip"));
        }
    }

    #[test]
    fn test_find_images_on_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        assert!(find_images(&temp_dir.path().join("missing")).is_empty());
    }
}
