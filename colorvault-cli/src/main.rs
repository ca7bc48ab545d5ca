/*!
ColorVault CLI - Command-line interface for the ColorVault core.

This CLI extracts images from comic and photo archives, and inspects or
edits the persisted colorization history (results, favorites, processing
log and preferences) kept in the local data directory.
*/

use anyhow::{anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colorvault_core::{
    config::StoreBackend,
    create_extractor_from_config, create_store_from_config, file_extension,
    files::format_file_size,
    is_archive_file, is_image_file,
    observability::{init_observability_with_directive, DEFAULT_LOG_DIRECTIVE},
    store::DynBackend,
    ArchiveReference, ColoringQuality, HistoryStore, Theme, VaultConfig,
};
use serde_json::json;
use std::path::PathBuf;
use tabled::{Table, Tabled};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "colorvault")]
#[command(about = "CLI for ColorVault archive extraction and colorization history")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Store backend to use
    #[arg(
        short,
        long,
        global = true,
        value_enum,
        default_value = "file",
        env = "COLORVAULT_BACKEND"
    )]
    backend: BackendType,

    /// Directory holding the stored data
    #[arg(short, long, global = true, env = "COLORVAULT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Root for extraction scratch directories (defaults to the data directory)
    #[arg(long, global = true, env = "COLORVAULT_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum BackendType {
    File,
    Memory,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the images contained in an archive
    Extract {
        /// Path to a zip/cbz (or rar/cbr) archive
        archive: PathBuf,
        /// Display name recorded on the images (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Remove all extraction scratch directories
    Cleanup,
    /// Show how file names are classified
    Classify {
        /// File names to classify
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Inspect or edit colorized results
    Results {
        #[command(subcommand)]
        action: ResultsAction,
    },
    /// Inspect or clear the processing log
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Manage favorite image ids
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Show or change user preferences
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },
    /// Show storage usage per key
    Info,
    /// Delete every stored key
    ClearAll {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum ResultsAction {
    /// List stored results, most recent first
    List,
    /// Remove the result with the given image id
    Remove { id: String },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List processing log entries, most recent first
    List,
    /// Clear the processing log
    Clear,
}

#[derive(Subcommand)]
enum FavoritesAction {
    List,
    Add { id: String },
    Remove { id: String },
    /// Report whether an id is a favorite
    Check { id: String },
}

#[derive(Subcommand)]
enum PrefsAction {
    Show,
    /// Update the given fields, keeping the others
    Set {
        #[arg(long)]
        quality: Option<ColoringQuality>,
        #[arg(long)]
        auto_save: Option<bool>,
        #[arg(long)]
        notifications: Option<bool>,
        #[arg(long)]
        theme: Option<Theme>,
    },
}

#[derive(Tabled)]
struct ImageRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Location")]
    location: String,
}

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Colorized")]
    timestamp: String,
    #[tabled(rename = "Favorite")]
    favorite: String,
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Details")]
    details: String,
}

#[derive(Tabled)]
struct ClassifyRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Extension")]
    extension: String,
    #[tabled(rename = "Image")]
    image: bool,
    #[tabled(rename = "Archive")]
    archive: bool,
}

#[derive(Tabled)]
struct KeyRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Items")]
    items: usize,
    #[tabled(rename = "Size")]
    size: String,
}

type Store = HistoryStore<DynBackend>;

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs)?;

    let config = create_vault_config(&cli);

    match cli.command {
        Commands::Extract { archive, name } => extract_archive(&config, archive, name)?,
        Commands::Cleanup => cleanup_scratch(&config)?,
        Commands::Classify { names } => classify_names(&names),
        Commands::Results { action } => {
            let store = create_store_from_config(&config)?;
            match action {
                ResultsAction::List => list_results(&store),
                ResultsAction::Remove { id } => {
                    ensure(store.remove_result(&id), "remove result")?;
                    println!("✓ Result {id} removed");
                }
            }
        }
        Commands::History { action } => {
            let store = create_store_from_config(&config)?;
            match action {
                HistoryAction::List => list_history(&store),
                HistoryAction::Clear => {
                    ensure(store.clear_history_log(), "clear processing history")?;
                    println!("✓ Processing history cleared");
                }
            }
        }
        Commands::Favorites { action } => {
            let store = create_store_from_config(&config)?;
            manage_favorites(&store, action)?;
        }
        Commands::Prefs { action } => {
            let store = create_store_from_config(&config)?;
            manage_preferences(&store, action)?;
        }
        Commands::Info => show_storage_info(&create_store_from_config(&config)?),
        Commands::ClearAll { force } => clear_all(&config, force)?,
    }

    Ok(())
}

/// Log to stderr so tables on stdout stay clean.
fn init_logging(verbose: bool, json: bool) -> Result<(), anyhow::Error> {
    let directive = if verbose {
        "colorvault=debug"
    } else {
        DEFAULT_LOG_DIRECTIVE
    };
    init_observability_with_directive(directive, json)?;
    Ok(())
}

fn create_vault_config(cli: &Cli) -> VaultConfig {
    let mut config = match cli.backend {
        BackendType::File => VaultConfig::default_file(),
        BackendType::Memory => VaultConfig::in_memory(),
    };
    config.data_dir = cli.data_dir.clone();
    config.scratch_dir = cli.scratch_dir.clone();

    if config.backend == StoreBackend::Memory {
        warn!("Memory backend selected; nothing will be kept after this command exits");
    }
    config
}

/// Turn a fail-soft store result into a command failure.
fn ensure(ok: bool, operation: &str) -> Result<(), anyhow::Error> {
    if ok {
        Ok(())
    } else {
        Err(anyhow!("Failed to {operation}; see the log for details"))
    }
}

fn extract_archive(
    config: &VaultConfig,
    archive_path: PathBuf,
    name: Option<String>,
) -> Result<(), anyhow::Error> {
    if !archive_path.is_file() {
        bail!("Archive not found: {}", archive_path.display());
    }
    let archive = match name {
        Some(name) => ArchiveReference::new(archive_path, name),
        None => ArchiveReference::from_path(archive_path),
    };
    info!("Extracting {}", archive.display_name);

    let extractor = create_extractor_from_config(config)?;
    let images = extractor.extract(&archive)?;

    let store = create_store_from_config(config)?;
    let logged = store.append_history_entry(&json!({
        "action": "extract",
        "archive": archive.display_name,
        "imageCount": images.len(),
    }));
    if !logged {
        warn!("Extraction succeeded but could not be recorded in the processing history");
    }

    if images.is_empty() {
        println!("No images found in {}", archive.display_name);
        return Ok(());
    }

    let rows: Vec<ImageRow> = images
        .into_iter()
        .map(|image| ImageRow {
            id: image.id,
            name: image.display_name,
            location: image.location,
        })
        .collect();
    let count = rows.len();
    println!("{}", Table::new(rows));
    println!(
        "{count} images extracted under {}",
        extractor.scratch_root().display()
    );
    Ok(())
}

fn cleanup_scratch(config: &VaultConfig) -> Result<(), anyhow::Error> {
    let extractor = create_extractor_from_config(config)?;
    let removed = extractor.cleanup_scratch();
    println!("✓ Removed {removed} scratch directories");
    Ok(())
}

fn classify_names(names: &[String]) {
    let rows: Vec<ClassifyRow> = names
        .iter()
        .map(|name| ClassifyRow {
            name: name.clone(),
            extension: file_extension(name),
            image: is_image_file(name),
            archive: is_archive_file(name),
        })
        .collect();
    println!("{}", Table::new(rows));
}

fn list_results(store: &Store) {
    let results = store.get_results();
    if results.is_empty() {
        println!("No results found");
        return;
    }

    let favorites = store.get_favorites();
    let rows: Vec<ResultRow> = results
        .iter()
        .map(|result| ResultRow {
            id: result.id().to_string(),
            name: result.image.display_name.clone(),
            source: result.image.source_archive.clone().unwrap_or_default(),
            timestamp: format_timestamp(result.timestamp),
            favorite: if favorites.iter().any(|f| f == result.id()) {
                "★".to_string()
            } else {
                String::new()
            },
        })
        .collect();
    println!("{}", Table::new(rows));
}

fn list_history(store: &Store) {
    let history = store.get_history();
    if history.is_empty() {
        println!("No processing history");
        return;
    }

    let rows: Vec<HistoryRow> = history
        .iter()
        .map(|entry| HistoryRow {
            id: entry.id,
            timestamp: format_timestamp(entry.timestamp),
            details: serde_json::Value::Object(entry.payload.clone()).to_string(),
        })
        .collect();
    println!("{}", Table::new(rows));
}

fn manage_favorites(store: &Store, action: FavoritesAction) -> Result<(), anyhow::Error> {
    match action {
        FavoritesAction::List => {
            let favorites = store.get_favorites();
            if favorites.is_empty() {
                println!("No favorites");
            }
            for id in favorites {
                println!("{id}");
            }
        }
        FavoritesAction::Add { id } => {
            ensure(store.add_favorite(&id), "add favorite")?;
            println!("✓ {id} added to favorites");
        }
        FavoritesAction::Remove { id } => {
            ensure(store.remove_favorite(&id), "remove favorite")?;
            println!("✓ {id} removed from favorites");
        }
        FavoritesAction::Check { id } => {
            if store.is_favorite(&id) {
                println!("{id} is a favorite");
            } else {
                println!("{id} is not a favorite");
            }
        }
    }
    Ok(())
}

fn manage_preferences(store: &Store, action: PrefsAction) -> Result<(), anyhow::Error> {
    let mut prefs = store.get_preferences();

    if let PrefsAction::Set {
        quality,
        auto_save,
        notifications,
        theme,
    } = action
    {
        if let Some(quality) = quality {
            prefs.coloring_quality = quality;
        }
        if let Some(auto_save) = auto_save {
            prefs.auto_save = auto_save;
        }
        if let Some(notifications) = notifications {
            prefs.notifications = notifications;
        }
        if let Some(theme) = theme {
            prefs.theme = theme;
        }
        ensure(store.save_preferences(&prefs), "save preferences")?;
        println!("✓ Preferences saved");
    }

    println!("Preferences:");
    println!("  Coloring quality: {}", prefs.coloring_quality);
    println!("  Auto save: {}", prefs.auto_save);
    println!("  Notifications: {}", prefs.notifications);
    println!("  Theme: {}", prefs.theme);
    Ok(())
}

fn show_storage_info(store: &Store) {
    let info = store.storage_info();
    if info.key_count == 0 {
        println!("Storage is empty");
        return;
    }

    let rows: Vec<KeyRow> = info
        .per_key
        .iter()
        .map(|(key, key_info)| KeyRow {
            key: key.clone(),
            items: key_info.item_count,
            size: format_file_size(key_info.size),
        })
        .collect();
    println!("{}", Table::new(rows));
    println!(
        "{} keys, {} total",
        info.key_count,
        format_file_size(info.total_size_bytes)
    );
}

fn clear_all(config: &VaultConfig, force: bool) -> Result<(), anyhow::Error> {
    if !force {
        print!("Are you sure you want to delete all stored data? (y/N): ");
        use std::io::{self, Write};
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().to_lowercase().starts_with('y') {
            println!("Clear cancelled");
            return Ok(());
        }
    }

    let store = create_store_from_config(config)?;
    ensure(store.clear_all(), "clear stored data")?;
    println!("✓ All stored data cleared");
    Ok(())
}

fn format_timestamp(timestamp: chrono::DateTime<chrono::Utc>) -> String {
    timestamp
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
