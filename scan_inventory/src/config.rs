//! Runtime configuration with platform-specific defaults

use crate::query::DEFAULT_DEBOUNCE;
use std::path::PathBuf;
use std::time::Duration;

const APP_DIR: &str = "scan_inventory";

/// Where data lives and how the search view behaves
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryConfig {
    pub database_path: PathBuf,
    pub export_dir: PathBuf,
    pub search_debounce: Duration,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            export_dir: default_export_dir(),
            search_debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl InventoryConfig {
    /// Defaults, with any provided value taking precedence
    pub fn with_overrides(
        database_path: Option<PathBuf>,
        export_dir: Option<PathBuf>,
        debounce_ms: Option<u64>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            database_path: database_path.unwrap_or(defaults.database_path),
            export_dir: export_dir.unwrap_or(defaults.export_dir),
            search_debounce: debounce_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.search_debounce),
        }
    }
}

/// Returns the default database path: ~/.local/share/scan_inventory/inventory.db
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("inventory.db")
}

/// Returns the default export directory: ~/Documents/scan_inventory/exports
pub fn default_export_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::data_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("exports")
}
