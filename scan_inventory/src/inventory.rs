//! Inventory service: the operations a front end triggers, each paired with
//! a short message suitable for a transient status line.

use crate::capture::BarcodeSource;
use crate::entry::ProductEntry;
use crate::error::Result;
use crate::export::Exporter;
use crate::product::Product;
use crate::reconciler::{Reconciler, Reconciliation};
use crate::store::{ProductQuery, ProductStore};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Transient, dismissible outcome message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Info(msg) | Notice::Error(msg) => msg,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Error(_))
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Result of a user action plus the message to show for it
#[derive(Debug)]
pub struct Outcome<T> {
    pub result: Result<T>,
    pub notice: Notice,
}

impl<T> Outcome<T> {
    fn new(result: Result<T>, success: impl Into<String>, failure: &str) -> Self {
        let notice = match &result {
            Ok(_) => Notice::Info(success.into()),
            Err(e) => {
                log::error!("{}: {}", failure, e);
                Notice::Error(format!("{}: {}", failure, e))
            }
        };
        Self { result, notice }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Store, reconciler and exporter wired together
#[derive(Clone)]
pub struct Inventory {
    store: ProductStore,
    reconciler: Reconciler,
    exporter: Arc<dyn Exporter>,
}

impl Inventory {
    pub fn new(store: ProductStore, exporter: impl Exporter + 'static) -> Self {
        Self {
            reconciler: Reconciler::new(store.clone()),
            store,
            exporter: Arc::new(exporter),
        }
    }

    pub fn store(&self) -> &ProductStore {
        &self.store
    }

    /// Validate a form entry and reconcile it into the inventory
    pub async fn add(&self, entry: &ProductEntry) -> Outcome<Reconciliation> {
        let result = match entry.parse() {
            Ok(candidate) => self.reconciler.reconcile(candidate).await,
            Err(e) => Err(e.into()),
        };
        Outcome::new(result, "Product added successfully", "Failed to add product")
    }

    pub async fn update(&self, product: Product) -> Outcome<()> {
        let result = self.store.update(product).await;
        Outcome::new(result, "Product updated successfully", "Failed to update product")
    }

    pub async fn delete(&self, product: &Product) -> Outcome<()> {
        let result = self.store.delete(product).await;
        Outcome::new(result, "Product deleted successfully", "Failed to delete product")
    }

    pub async fn clear(&self) -> Outcome<()> {
        let result = self.store.delete_all().await;
        Outcome::new(result, "All products deleted", "Failed to delete products")
    }

    /// Export the current full listing without blocking other tasks
    pub async fn export(&self, suggested_name: Option<String>) -> Outcome<PathBuf> {
        let result = self.export_snapshot(suggested_name).await;
        let success = match &result {
            Ok(path) => format!("Export written to {}", path.display()),
            Err(_) => String::new(),
        };
        Outcome::new(result, success, "Failed to export")
    }

    async fn export_snapshot(&self, suggested_name: Option<String>) -> Result<PathBuf> {
        let products = self.store.fetch(ProductQuery::All).await?;
        let exporter = Arc::clone(&self.exporter);
        tokio::task::spawn_blocking(move || exporter.export(&products, suggested_name.as_deref()))
            .await?
    }

    /// Reconcile every barcode from `source` until it is exhausted
    ///
    /// Fields other than the barcode come from `template`; its name is used
    /// only when a barcode is new. Failures are reported through `on_scan`
    /// and do not stop the loop. Returns the number of barcodes processed.
    pub async fn scan<S, F>(&self, source: &mut S, template: &ProductEntry, mut on_scan: F) -> usize
    where
        S: BarcodeSource,
        F: FnMut(&str, &Outcome<Reconciliation>),
    {
        let mut processed = 0;
        while let Some(barcode) = source.next_barcode().await {
            let entry = ProductEntry {
                barcode: barcode.clone(),
                ..template.clone()
            };
            let outcome = self.add(&entry).await;
            on_scan(&barcode, &outcome);
            processed += 1;
        }
        log::info!("Barcode source exhausted after {} scans", processed);
        processed
    }
}
