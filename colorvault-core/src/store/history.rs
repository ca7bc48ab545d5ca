/*!
Persistent result history, favorites, processing log and preferences.

Every public operation is fail-soft. A backend or serialization fault is
logged and the caller gets a safe default (an empty collection, `false`, or
the default preferences) instead of an error. Readers cannot tell "nothing
stored" from "could not read"; the log carries the difference.
*/

use super::KeyValueBackend;
use crate::model::{
    deserialize_id, ColorizedImage, HistoryEntry, KeyInfo, StorageInfo, UserPreferences,
};
use crate::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

/// Stable backend keys, one per logical collection.
pub mod keys {
    /// Colorized results, most recent first
    pub const RESULTS: &str = "colorizedImages";
    pub const PREFERENCES: &str = "userPreferences";
    /// Bounded processing log, most recent first
    pub const HISTORY: &str = "processingHistory";
    pub const FAVORITES: &str = "favorites";

    pub const ALL: [&str; 4] = [RESULTS, PREFERENCES, HISTORY, FAVORITES];
}

/// Favorite id as stored, which may be a string or a legacy number.
#[derive(Deserialize)]
struct StoredId(#[serde(deserialize_with = "deserialize_id")] String);

/// Number of processing log entries retained by default.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Typed store over a [`KeyValueBackend`].
///
/// Construct one at start-up and pass it by reference. Writes to the same
/// collection are read-modify-write without locking; callers that may issue
/// them concurrently must serialize them.
///
/// # Example
/// ```rust
/// use colorvault_core::{HistoryStore, MemoryBackend};
/// use serde_json::json;
///
/// let store = HistoryStore::new(MemoryBackend::new());
/// store.add_favorite("img-1");
/// assert!(store.is_favorite("img-1"));
///
/// store.append_history_entry(&json!({"action": "colorize", "count": 2}));
/// assert_eq!(store.get_history().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct HistoryStore<B: KeyValueBackend> {
    backend: B,
    history_limit: usize,
}

impl<B: KeyValueBackend> HistoryStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Retain at most `limit` processing log entries (minimum 1).
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.backend.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.backend.set(key, &raw)
    }

    /// Read a list, degrading to empty when absent or unreadable.
    ///
    /// Elements are decoded one at a time; an element that does not decode
    /// is logged and skipped instead of dropping the whole list.
    fn read_list<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let raw = match self.read::<Vec<Value>>(key) {
            Ok(items) => items.unwrap_or_default(),
            Err(e) => {
                self.record_fault();
                warn!("Failed to read {}, using empty list: {}", key, e);
                return Vec::new();
            }
        };

        let total = raw.len();
        let items: Vec<T> = raw
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match serde_json::from_value(value) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!("Skipping unreadable element {} of {}: {}", index, key, e);
                    None
                }
            })
            .collect();
        if items.len() < total {
            self.record_fault();
        }
        items
    }

    /// Turn a write outcome into the fail-soft success flag.
    fn report(&self, operation: &str, result: Result<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                self.record_fault();
                error!("Failed to {}: {}", operation, e);
                false
            }
        }
    }

    fn record_fault(&self) {
        #[cfg(feature = "metrics")]
        crate::observability::VaultMetrics::global().record_store_fault();
    }

    /// Replace the whole result collection.
    pub fn save_results(&self, items: &[ColorizedImage]) -> bool {
        let result = self.write(keys::RESULTS, items);
        self.report("save colorized images", result)
    }

    /// All stored results, most recent first.
    pub fn get_results(&self) -> Vec<ColorizedImage> {
        self.read_list(keys::RESULTS)
    }

    /// Put `item` at the front of the result collection.
    pub fn add_result(&self, item: ColorizedImage) -> bool {
        let mut items = self.get_results();
        items.insert(0, item);
        self.save_results(&items)
    }

    /// Drop every result whose id is `id`. Succeeds when nothing matches.
    pub fn remove_result(&self, id: &str) -> bool {
        let mut items = self.get_results();
        items.retain(|item| item.id() != id);
        self.save_results(&items)
    }

    /// Stamp `payload` with an id and timestamp and put it at the front of
    /// the processing log, keeping only the most recent entries.
    ///
    /// `payload` must serialize to a JSON object.
    pub fn append_history_entry<T: Serialize + ?Sized>(&self, payload: &T) -> bool {
        let entry = match HistoryEntry::stamp(payload) {
            Ok(entry) => entry,
            Err(e) => return self.report("add to processing history", Err(e)),
        };

        let mut history: Vec<HistoryEntry> = self.read_list(keys::HISTORY);
        history.insert(0, entry);
        history.truncate(self.history_limit);

        let result = self.write(keys::HISTORY, &history);
        self.report("add to processing history", result)
    }

    /// The processing log, newest first.
    pub fn get_history(&self) -> Vec<HistoryEntry> {
        self.read_list(keys::HISTORY)
    }

    /// Delete the whole processing log.
    pub fn clear_history_log(&self) -> bool {
        let result = self.backend.remove(keys::HISTORY);
        self.report("clear processing history", result)
    }

    /// Mark `id` as a favorite. Adding an existing favorite is a no-op.
    pub fn add_favorite(&self, id: &str) -> bool {
        let mut favorites = self.get_favorites();
        if favorites.iter().any(|f| f == id) {
            debug!("{} is already a favorite", id);
            return true;
        }
        favorites.push(id.to_string());
        let result = self.write(keys::FAVORITES, &favorites);
        self.report("add to favorites", result)
    }

    pub fn remove_favorite(&self, id: &str) -> bool {
        let mut favorites = self.get_favorites();
        favorites.retain(|f| f != id);
        let result = self.write(keys::FAVORITES, &favorites);
        self.report("remove from favorites", result)
    }

    pub fn get_favorites(&self) -> Vec<String> {
        self.read_list::<StoredId>(keys::FAVORITES)
            .into_iter()
            .map(|stored| stored.0)
            .collect()
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.get_favorites().iter().any(|f| f == id)
    }

    /// Stored preferences, or [`UserPreferences::default`] when unset or
    /// unreadable.
    pub fn get_preferences(&self) -> UserPreferences {
        match self.read::<UserPreferences>(keys::PREFERENCES) {
            Ok(prefs) => prefs.unwrap_or_default(),
            Err(e) => {
                self.record_fault();
                warn!("Failed to read user preferences, using defaults: {}", e);
                UserPreferences::default()
            }
        }
    }

    pub fn save_preferences(&self, prefs: &UserPreferences) -> bool {
        let result = self.write(keys::PREFERENCES, prefs);
        self.report("save user preferences", result)
    }

    /// Remove all four collections.
    ///
    /// Reports `false` if any removal failed; the collections that were
    /// removed stay removed.
    pub fn clear_all(&self) -> bool {
        let all: Vec<String> = keys::ALL.iter().map(|k| k.to_string()).collect();
        let result = self.backend.multi_remove(&all);
        self.report("clear all data", result)
    }

    /// Size and element count of every key in the backend.
    ///
    /// List values report their length; any other value counts as one
    /// item. An unreadable backend yields an empty snapshot.
    pub fn storage_info(&self) -> StorageInfo {
        match self.try_storage_info() {
            Ok(info) => info,
            Err(e) => {
                self.record_fault();
                warn!("Failed to collect storage info: {}", e);
                StorageInfo::default()
            }
        }
    }

    fn try_storage_info(&self) -> Result<StorageInfo> {
        let all_keys = self.backend.list_keys()?;
        let values = self.backend.multi_get(&all_keys)?;

        let mut info = StorageInfo {
            key_count: all_keys.len(),
            ..StorageInfo::default()
        };
        for (key, value) in values {
            let key_info = match value {
                Some(raw) => KeyInfo {
                    size: raw.len() as u64,
                    item_count: item_count(&raw),
                },
                None => KeyInfo::default(),
            };
            info.total_size_bytes += key_info.size;
            info.per_key.insert(key, key_info);
        }
        Ok(info)
    }
}

fn item_count(raw: &str) -> usize {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items.len(),
        _ => 1,
    }
}
