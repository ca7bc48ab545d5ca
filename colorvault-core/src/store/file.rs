/*!
Local filesystem key-value backend.
*/

use super::KeyValueBackend;
use crate::{Result, VaultError};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const VALUE_EXTENSION: &str = "json";

/// Filesystem key-value backend
///
/// Each key is stored as `<base_dir>/<key>.json`. Writes go to a temporary
/// file in the same directory which is then renamed over the old value, so
/// a crash leaves either the old or the new value, never a torn one.
///
/// # Example
/// ```rust
/// use colorvault_core::store::{FileBackend, KeyValueBackend};
///
/// # let dir = tempfile::TempDir::new()?;
/// let backend = FileBackend::new(dir.path());
/// backend.set("favorites", r#"["a","b"]"#)?;
/// assert_eq!(backend.get("favorites")?.as_deref(), Some(r#"["a","b"]"#));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileBackend {
    base_dir: PathBuf,
}

impl FileBackend {
    /// Create a backend rooted at `base_dir`. The directory is created on
    /// first write.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve the file holding `key`
    fn key_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.base_dir.join(format!("{key}.{VALUE_EXTENSION}")))
    }
}

/// Keys become file names, so they may not contain separators or start
/// with a dot (temporary files do).
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.starts_with('.') || key.contains(['/', '\\', '\0']) {
        return Err(VaultError::validation(format!("Invalid storage key: '{key}'")));
    }
    Ok(())
}

impl KeyValueBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(VaultError::storage(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;

        fs::create_dir_all(&self.base_dir).map_err(|e| {
            VaultError::storage(format!(
                "Failed to create directory {}: {}",
                self.base_dir.display(),
                e
            ))
        })?;

        let mut temp = NamedTempFile::new_in(&self.base_dir)?;
        temp.write_all(value.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|e| {
            VaultError::storage(format!("Failed to write {}: {}", path.display(), e.error))
        })?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VaultError::storage(format!(
                "Failed to delete {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.base_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(VaultError::storage(format!(
                    "Failed to list {}: {}",
                    self.base_dir.display(),
                    e
                )))
            }
        };

        let mut keys = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(VALUE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_key(stem).is_ok() {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_backend_basic_operations() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path());

        assert_eq!(backend.get("favorites").unwrap(), None);

        backend.set("favorites", "[\"a\"]").unwrap();
        assert_eq!(backend.get("favorites").unwrap().as_deref(), Some("[\"a\"]"));
        assert!(temp_dir.path().join("favorites.json").is_file());

        backend.set("favorites", "[]").unwrap();
        assert_eq!(backend.get("favorites").unwrap().as_deref(), Some("[]"));

        backend.remove("favorites").unwrap();
        assert_eq!(backend.get("favorites").unwrap(), None);
        // removing again is fine
        backend.remove("favorites").unwrap();
    }

    #[test]
    fn test_file_backend_creates_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path().join("nested/store"));

        assert!(backend.list_keys().unwrap().is_empty());
        backend.set("userPreferences", "{}").unwrap();
        assert_eq!(backend.list_keys().unwrap(), vec!["userPreferences"]);
    }

    #[test]
    fn test_list_keys_ignores_foreign_files() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path());

        backend.set("b", "1").unwrap();
        backend.set("a", "2").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "x").unwrap();
        fs::write(temp_dir.path().join(".tmpABC.json"), "x").unwrap();
        fs::create_dir(temp_dir.path().join("dir.json")).unwrap();

        assert_eq!(backend.list_keys().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_invalid_keys_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path());

        for key in ["", "../escape", "a/b", ".hidden"] {
            assert!(
                matches!(backend.set(key, "v"), Err(VaultError::Validation(_))),
                "key {key:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_multi_operations_through_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path());
        backend.set("one", "1").unwrap();
        backend.set("two", "2").unwrap();

        let keys = backend.list_keys().unwrap();
        let values = backend.multi_get(&keys).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0], ("one".to_string(), Some("1".to_string())));

        backend
            .multi_remove(&["one".to_string(), "missing".to_string(), "two".to_string()])
            .unwrap();
        assert!(backend.list_keys().unwrap().is_empty());
    }
}
