/*!
# ColorVault Core

Core library behind the ColorVault image colorization client.

This crate provides the parts of the client that are more than UI glue:

- Extracting images from zip/cbz (and, with the `rar` feature, rar/cbr)
  archives into isolated scratch directories
- A fail-soft persistent store for colorized results, favorites, a bounded
  processing log and user preferences
- File classification helpers shared by the picker and the extractor

## Architecture

Both components follow a ports-and-adapters layout:
- The extractor talks to an [`ArchiveDecoder`]; zip and rar are adapters
- The history store talks to a [`KeyValueBackend`]; files and memory are adapters
- Construct each once at start-up and pass it by reference

## Usage

```rust
use colorvault_core::{
    ArchiveImageExtractor, ArchiveReference, ColorizedImage, HistoryStore, MemoryBackend,
};

# let scratch = tempfile::TempDir::new()?;
let extractor = ArchiveImageExtractor::with_scratch_root(scratch.path());
let store = HistoryStore::new(MemoryBackend::new());

# let archive_path = scratch.path().join("empty.zip");
# zip::ZipWriter::new(std::fs::File::create(&archive_path)?).finish()?;
let images = extractor.extract(&ArchiveReference::from_path(&archive_path))?;
for image in images {
    store.add_result(ColorizedImage::new(image, "data:image/png;base64,..."));
}
store.append_history_entry(&serde_json::json!({"action": "extract"}));
extractor.cleanup_scratch();
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/

pub mod archive;
pub mod config;
pub mod error;
pub mod extractor;
pub mod files;
pub mod ids;
pub mod model;
pub mod observability;
pub mod store;

#[cfg(test)]
mod error_tests;

pub use archive::{ArchiveDecoder, ArchiveFormat, AutoDecoder, ZipDecoder};
pub use config::{StoreBackend, VaultConfig};
pub use error::{Result, VaultError};
pub use extractor::{create_extractor_from_config, ArchiveImageExtractor, SCRATCH_PREFIX};
pub use files::{file_extension, is_archive_file, is_image_file};
pub use model::{
    ArchiveReference, ColoringQuality, ColorizedImage, HistoryEntry, ImageReference, KeyInfo,
    ReferenceKind, StorageInfo, Theme, UserPreferences,
};
pub use store::{
    create_store_from_config, FileBackend, HistoryStore, KeyValueBackend, MemoryBackend,
};
