/*!
Key-value persistence for results, favorites, the processing log and
preferences.

This module defines the backend abstraction (port) and its adapters. The
[`HistoryStore`] built on top of it only ever talks to the
[`KeyValueBackend`] trait, so tests and embedders can substitute any
backend.
*/

pub mod file;
pub mod history;

use crate::config::{StoreBackend, VaultConfig};
use crate::{Result, VaultError};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

pub use file::FileBackend;
pub use history::{keys, HistoryStore, DEFAULT_HISTORY_LIMIT};

/// Key-value backend abstraction
///
/// Values are strings (the store writes JSON). Implementations must be
/// consistent per key; no guarantee is made across keys.
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueBackend {
    /// Read the value stored under `key`
    ///
    /// # Returns
    /// `None` when the key is absent
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<()>;

    /// All keys currently stored, in ascending order
    fn list_keys(&self) -> Result<Vec<String>>;

    /// Read several keys at once, preserving the order of `keys`
    fn multi_get(&self, keys: &[String]) -> Result<Vec<(String, Option<String>)>> {
        keys.iter()
            .map(|key| Ok((key.clone(), self.get(key)?)))
            .collect()
    }

    /// Remove several keys
    ///
    /// Every key is attempted even if an earlier one fails; the first
    /// failure is returned.
    fn multi_remove(&self, keys: &[String]) -> Result<()> {
        let mut first_error = None;
        for key in keys {
            if let Err(e) = self.remove(key) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl<B: KeyValueBackend + ?Sized> KeyValueBackend for Box<B> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        (**self).list_keys()
    }

    fn multi_get(&self, keys: &[String]) -> Result<Vec<(String, Option<String>)>> {
        (**self).multi_get(keys)
    }

    fn multi_remove(&self, keys: &[String]) -> Result<()> {
        (**self).multi_remove(keys)
    }
}

/// Memory-based backend
///
/// Stores values in an ordered map. Clones share the same map, so a test
/// can keep a handle and inspect what the store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    data: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>> {
        self.data
            .lock()
            .map_err(|_| VaultError::storage("Memory backend lock poisoned"))
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    fn multi_get(&self, keys: &[String]) -> Result<Vec<(String, Option<String>)>> {
        let data = self.lock()?;
        Ok(keys
            .iter()
            .map(|key| (key.clone(), data.get(key).cloned()))
            .collect())
    }

    fn multi_remove(&self, keys: &[String]) -> Result<()> {
        let mut data = self.lock()?;
        for key in keys {
            data.remove(key);
        }
        Ok(())
    }
}

/// Backend type produced by [`create_store_from_config`]
pub type DynBackend = Box<dyn KeyValueBackend + Send + Sync>;

/// Build a history store as described by `config`
///
/// # Example
/// ```rust
/// use colorvault_core::{create_store_from_config, VaultConfig};
///
/// let store = create_store_from_config(&VaultConfig::in_memory())?;
/// assert!(store.get_results().is_empty());
/// # Ok::<(), colorvault_core::VaultError>(())
/// ```
pub fn create_store_from_config(config: &VaultConfig) -> Result<HistoryStore<DynBackend>> {
    config.validate()?;

    let backend: DynBackend = match config.backend {
        StoreBackend::File => Box::new(FileBackend::new(config.resolved_data_dir())),
        StoreBackend::Memory => Box::new(MemoryBackend::new()),
    };

    Ok(HistoryStore::new(backend).with_history_limit(config.history_limit))
}
