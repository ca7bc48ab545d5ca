/*!
Data model shared by the extractor, the history store and their callers.

Field names on the wire follow the layout the mobile client has always
persisted (`uri`, `name`, `type`, `source`, camelCase preference keys), so
values written by older clients keep loading.
*/

use crate::{ids, Result, VaultError};
use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// What a picked or extracted file is.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Image,
    Archive,
}

/// A reference to one image file on the device.
///
/// Created by archive extraction or by direct file selection. Never mutated
/// after creation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ImageReference {
    /// Unique token for this reference
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    /// Opaque path or URI of the file
    #[serde(rename = "uri")]
    pub location: String,

    /// Base filename shown to the user
    #[serde(rename = "name")]
    pub display_name: String,

    #[serde(rename = "type")]
    pub kind: ReferenceKind,

    /// Display name of the archive this image was extracted from
    #[serde(rename = "source", default, skip_serializing_if = "Option::is_none")]
    pub source_archive: Option<String>,
}

impl ImageReference {
    /// Create a reference for a directly selected image.
    pub fn new<S1, S2>(location: S1, display_name: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            id: ids::new_reference_id(),
            location: location.into(),
            display_name: display_name.into(),
            kind: ReferenceKind::Image,
            source_archive: None,
        }
    }

    /// Create a reference for an image found inside an archive.
    pub fn from_archive<S: Into<String>>(path: &Path, archive_name: S) -> Self {
        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            id: ids::new_reference_id(),
            location: path.to_string_lossy().into_owned(),
            display_name,
            kind: ReferenceKind::Image,
            source_archive: Some(archive_name.into()),
        }
    }
}

/// Input to extraction. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReference {
    pub location: PathBuf,
    pub display_name: String,
}

impl ArchiveReference {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(location: P, display_name: S) -> Self {
        Self {
            location: location.into(),
            display_name: display_name.into(),
        }
    }

    /// Build a reference whose display name is the file's base name.
    pub fn from_path<P: Into<PathBuf>>(location: P) -> Self {
        let location = location.into();
        let display_name = location
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| location.to_string_lossy().into_owned());
        Self {
            location,
            display_name,
        }
    }
}

/// One colorized result kept in the result collection.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColorizedImage {
    /// The image that was sent for colorization
    #[serde(flatten)]
    pub image: ImageReference,

    /// URI of the colorized output (typically a `data:` URI)
    pub colorized_uri: String,

    /// When the result was produced
    pub timestamp: DateTime<Utc>,

    /// Server-side path of the stored result, when the service reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
}

impl ColorizedImage {
    pub fn new<S: Into<String>>(image: ImageReference, colorized_uri: S) -> Self {
        Self {
            image,
            colorized_uri: colorized_uri.into(),
            timestamp: Utc::now(),
            result_path: None,
        }
    }

    pub fn with_result_path<S: Into<String>>(mut self, result_path: S) -> Self {
        self.result_path = Some(result_path.into());
        self
    }

    /// Results are identified by the id of their source image.
    pub fn id(&self) -> &str {
        &self.image.id
    }
}

/// One record in the bounded processing log.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// Creation time in Unix milliseconds; unique per process
    pub id: u64,

    pub timestamp: DateTime<Utc>,

    /// Caller-supplied fields describing the event
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl HistoryEntry {
    /// Stamp a payload with a fresh id and the current time.
    ///
    /// The payload must serialize to a JSON object. Any `id` or `timestamp`
    /// key it carries is replaced by the stamped value.
    pub fn stamp<T: Serialize + ?Sized>(payload: &T) -> Result<Self> {
        let mut payload = match serde_json::to_value(payload)? {
            Value::Object(map) => map,
            other => {
                return Err(VaultError::validation(format!(
                    "History payload must be a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };
        payload.remove("id");
        payload.remove("timestamp");

        Ok(Self {
            id: ids::next_history_id(),
            timestamp: Utc::now(),
            payload,
        })
    }

    /// Look up a payload field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }
}

/// Read an id stored either as a string or as a JSON number.
///
/// Older clients generated numeric ids such as `1700000000000.123`; those
/// are kept in their JSON text form.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(id) => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(de::Error::custom(format!(
            "expected a string or numeric id, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColoringQuality {
    Low,
    Medium,
    #[default]
    High,
}

impl fmt::Display for ColoringQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(name)
    }
}

impl FromStr for ColoringQuality {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(VaultError::validation(format!(
                "Unknown coloring quality '{other}' (expected low, medium or high)"
            ))),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Light => "light",
            Self::Dark => "dark",
        })
    }
}

impl FromStr for Theme {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(VaultError::validation(format!(
                "Unknown theme '{other}' (expected light or dark)"
            ))),
        }
    }
}

/// User preferences. `Default` is what a fresh install reports.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub coloring_quality: ColoringQuality,
    pub auto_save: bool,
    pub notifications: bool,
    pub theme: Theme,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            coloring_quality: ColoringQuality::High,
            auto_save: true,
            notifications: true,
            theme: Theme::Light,
        }
    }
}

/// Size and element count of one stored key.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct KeyInfo {
    pub size: u64,
    pub item_count: usize,
}

/// Diagnostic snapshot of everything in the key-value backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    pub total_size_bytes: u64,
    pub per_key: BTreeMap<String, KeyInfo>,
    pub key_count: usize,
}
