//! Async product store with live queries.
//!
//! One SQLite connection per store, shared behind `Arc<Mutex<_>>` and only
//! ever touched from tokio's blocking pool. Every committed write bumps a
//! `watch` counter; live subscriptions re-run their query under the same
//! mutex when it moves, so they only ever see committed state.

use crate::database::{self, DbResult};
use crate::error::{InventoryError, Result};
use crate::product::Product;
use rusqlite::{Connection, Transaction};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// What a product listing shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductQuery {
    /// Every product
    All,
    /// Case-sensitive substring of name or barcode
    Search(String),
    /// Exact category match
    Category(String),
}

impl ProductQuery {
    /// Run the query once against a connection
    pub fn fetch(&self, conn: &Connection) -> DbResult<Vec<Product>> {
        match self {
            ProductQuery::All => database::list_products(conn),
            ProductQuery::Search(text) => database::search_products(conn, text),
            ProductQuery::Category(category) => database::list_products_by_category(conn, category),
        }
    }
}

/// Cloneable handle to the product database
///
/// Constructed once by the composition root and passed to every consumer.
#[derive(Clone)]
pub struct ProductStore {
    conn: Arc<Mutex<Connection>>,
    changes: Arc<watch::Sender<u64>>,
}

impl ProductStore {
    /// Open (or create) the database file and initialise the schema
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
                log::info!("Created directory: {}", parent.display());
            }
        }
        let conn = Connection::open(path)?;
        let journal_mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        log::info!("Opened database: {} (journal {})", path.display(), journal_mode);
        Self::from_connection(conn)
    }

    /// Private in-memory database, used by tests and dry runs
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        database::init_schema(&conn)?;
        let (changes, _) = watch::channel(0);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            changes: Arc::new(changes),
        })
    }

    /// Run a read on the blocking pool
    async fn read<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = lock(&conn)?;
            f(&guard)
        })
        .await?
    }

    /// Run a write on the blocking pool and notify live queries once it succeeded
    ///
    /// The notification is sent from the blocking task while the lock is
    /// still held, so it happens even if the caller stops waiting.
    async fn write<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let changes = Arc::clone(&self.changes);
        tokio::task::spawn_blocking(move || {
            let mut guard = lock(&conn)?;
            let value = f(&mut guard)?;
            changes.send_modify(|version| *version = version.wrapping_add(1));
            Ok(value)
        })
        .await?
    }

    /// Run `f` inside one SQLite transaction; committed only if `f` succeeds
    pub async fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
    {
        self.write(move |conn| {
            let tx = conn.transaction()?;
            let value = f(&tx)?;
            tx.commit()?;
            Ok(value)
        })
        .await
    }

    /// Insert a product, returning its id (see [`database::insert_product`])
    pub async fn insert(&self, product: Product) -> Result<i64> {
        self.write(move |conn| Ok(database::insert_product(conn, &product)?))
            .await
    }

    /// Replace the record sharing `product.id`; no-op if absent
    pub async fn update(&self, product: Product) -> Result<()> {
        let changed = self
            .write(move |conn| Ok(database::update_product(conn, &product)?))
            .await?;
        if changed == 0 {
            log::debug!("Update ignored: no product with that id");
        }
        Ok(())
    }

    pub async fn delete(&self, product: &Product) -> Result<()> {
        self.delete_by_id(product.id).await
    }

    pub async fn delete_by_id(&self, id: i64) -> Result<()> {
        self.write(move |conn| Ok(database::delete_product_by_id(conn, id)?))
            .await?;
        Ok(())
    }

    /// Remove every product. Irreversible.
    pub async fn delete_all(&self) -> Result<()> {
        self.write(|conn| Ok(database::delete_all_products(conn)?))
            .await?;
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Product>> {
        self.read(move |conn| Ok(database::get_product_by_id(conn, id)?))
            .await
    }

    /// Lookup by barcode; with duplicates the lowest id wins
    pub async fn get_by_barcode(&self, barcode: &str) -> Result<Option<Product>> {
        let barcode = barcode.to_string();
        self.read(move |conn| Ok(database::get_product_by_barcode(conn, &barcode)?))
            .await
    }

    pub async fn count(&self) -> Result<i64> {
        self.read(|conn| Ok(database::get_product_count(conn)?)).await
    }

    /// Adds `delta` to every product with this barcode, returning how many were touched
    pub async fn increment_quantity_by_barcode(&self, barcode: &str, delta: i64) -> Result<usize> {
        let barcode = barcode.to_string();
        self.write(move |conn| {
            Ok(database::increment_quantity_by_barcode(conn, &barcode, delta)?)
        })
        .await
    }

    /// One-shot snapshot of a query
    pub async fn fetch(&self, query: ProductQuery) -> Result<Vec<Product>> {
        self.read(move |conn| Ok(query.fetch(conn)?)).await
    }

    /// Live listing of every product, newest first
    pub fn list_all(&self) -> Subscription<Vec<Product>> {
        self.subscribe(ProductQuery::All)
    }

    /// Live case-sensitive search over name and barcode
    pub fn search(&self, text: &str) -> Subscription<Vec<Product>> {
        self.subscribe(ProductQuery::Search(text.to_string()))
    }

    pub fn list_by_category(&self, category: &str) -> Subscription<Vec<Product>> {
        self.subscribe(ProductQuery::Category(category.to_string()))
    }

    /// Live list of non-empty categories, ascending
    pub fn distinct_categories(&self) -> Subscription<Vec<String>> {
        self.live(database::distinct_categories)
    }

    pub fn subscribe(&self, query: ProductQuery) -> Subscription<Vec<Product>> {
        log::debug!("Subscribing to {:?}", query);
        self.live(move |conn| query.fetch(conn))
    }

    /// Spawn a task that re-runs `fetch` after every committed write
    ///
    /// Must be called from within a tokio runtime.
    fn live<T, F>(&self, fetch: F) -> Subscription<T>
    where
        T: Send + 'static,
        F: Fn(&Connection) -> DbResult<T> + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::channel(1);
        let store = self.clone();
        let fetch = Arc::new(fetch);
        let mut changes = self.changes.subscribe();

        let task = tokio::spawn(async move {
            loop {
                // Mark the current version seen before querying so that a write
                // landing mid-query still triggers another round.
                changes.borrow_and_update();
                let fetch = Arc::clone(&fetch);
                let snapshot = store.read(move |conn| Ok((*fetch)(conn)?)).await;
                if tx.send(snapshot).await.is_err() {
                    break;
                }
                tokio::select! {
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tx.closed() => break,
                }
            }
        });

        Subscription {
            rx,
            task,
            cancelled: false,
        }
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<std::sync::MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| InventoryError::Worker("database connection mutex poisoned".to_string()))
}

/// Handle to a live query
///
/// Yields an initial snapshot, then a fresh one after every committed write.
/// Rapid writes may be coalesced into a single snapshot. The stream only
/// ends when cancelled or dropped.
pub struct Subscription<T> {
    rx: mpsc::Receiver<Result<T>>,
    task: JoinHandle<()>,
    cancelled: bool,
}

impl<T> Subscription<T> {
    /// Wait for the next snapshot; `None` once cancelled
    pub async fn next(&mut self) -> Option<Result<T>> {
        if self.cancelled {
            return None;
        }
        self.rx.recv().await
    }

    /// Stop the live query. Nothing is delivered after this returns.
    pub fn cancel(&mut self) {
        if !self.cancelled {
            self.cancelled = true;
            self.rx.close();
            self.task.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
