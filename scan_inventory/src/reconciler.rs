//! Upsert-by-barcode reconciliation.
//!
//! "One barcode, one line": a candidate whose barcode is already stored only
//! adds its quantity to the existing line; every other field of the candidate
//! is dropped. Unknown barcodes become new lines.
//!
//! Lookup and mutation run inside a single transaction on the store's only
//! connection, so two scans of the same barcode can never both insert and
//! never lose an increment.

use crate::database;
use crate::error::Result;
use crate::product::Product;
use crate::store::ProductStore;
use rusqlite::Connection;

/// What reconciling a candidate did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// New line created with this id
    Inserted { id: i64 },
    /// Quantity merged into the existing line with this id
    Merged { id: i64, added: i64 },
}

impl Reconciliation {
    /// Id of the line the candidate ended up in
    pub fn id(&self) -> i64 {
        match *self {
            Reconciliation::Inserted { id } | Reconciliation::Merged { id, .. } => id,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Reconciliation::Inserted { .. })
    }
}

/// Apply the reconciliation rule on an open connection or transaction
pub fn reconcile_on(conn: &Connection, candidate: &Product) -> Result<Reconciliation> {
    match database::get_product_by_barcode(conn, &candidate.barcode)? {
        Some(existing) => {
            database::increment_quantity_by_barcode(conn, &candidate.barcode, candidate.quantity)?;
            Ok(Reconciliation::Merged {
                id: existing.id,
                added: candidate.quantity,
            })
        }
        None => {
            // A stray id on the candidate would turn the insert into a replace.
            let fresh = Product {
                id: 0,
                ..candidate.clone()
            };
            let id = database::insert_product(conn, &fresh)?;
            Ok(Reconciliation::Inserted { id })
        }
    }
}

/// Write-side entry point for scanned and manually entered products
#[derive(Clone)]
pub struct Reconciler {
    store: ProductStore,
}

impl Reconciler {
    pub fn new(store: ProductStore) -> Self {
        Self { store }
    }

    /// Insert `candidate` or merge its quantity into the line with the same barcode
    pub async fn reconcile(&self, candidate: Product) -> Result<Reconciliation> {
        let barcode = candidate.barcode.clone();
        let outcome = self
            .store
            .transaction(move |tx| reconcile_on(tx, &candidate))
            .await?;

        match outcome {
            Reconciliation::Inserted { id } => {
                log::info!("Barcode {}: new product {}", barcode, id)
            }
            Reconciliation::Merged { id, added } => {
                log::info!("Barcode {}: added {} to product {}", barcode, added, id)
            }
        }
        Ok(outcome)
    }

    pub fn store(&self) -> &ProductStore {
        &self.store
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
