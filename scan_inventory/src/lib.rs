//! Scan Inventory - barcode-driven product inventory
//!
//! Scanned or manually entered products are reconciled by barcode into a
//! SQLite database, browsed through live (debounced) search views, and
//! exported to spreadsheet-readable CSV files.

pub mod capture;
pub mod config;
pub mod database;
pub mod entry;
pub mod error;
pub mod export;
pub mod inventory;
pub mod product;
pub mod query;
pub mod reconciler;
pub mod store;

pub use capture::{BarcodeSource, ChannelBarcodeSource, LineBarcodeSource};
pub use config::InventoryConfig;
pub use entry::{EntryError, ProductEntry};
pub use error::{InventoryError, Result};
pub use export::{CsvExporter, Exporter};
pub use inventory::{Inventory, Notice, Outcome};
pub use product::Product;
pub use query::{QuerySource, SearchProjection, SearchResults};
pub use reconciler::{Reconciler, Reconciliation};
pub use store::{ProductQuery, ProductStore, Subscription};
