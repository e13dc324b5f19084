//! Entry boundary: turns raw form/CLI fields into a product candidate.
//!
//! Validation happens here, before a record ever reaches the reconciler.
//! The store itself accepts whatever it is given.

use crate::product::Product;
use chrono::Utc;
use thiserror::Error;

/// Reasons an entry is rejected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntryError {
    #[error("Product name is required")]
    BlankName,
    #[error("Barcode is required")]
    BlankBarcode,
    #[error("Price must not be negative (got {0})")]
    NegativePrice(f64),
}

/// Raw, unvalidated product fields as typed by the user
#[derive(Debug, Clone, Default)]
pub struct ProductEntry {
    pub barcode: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub quantity: String,
    pub category: String,
    pub notes: String,
}

impl ProductEntry {
    pub fn new(barcode: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            barcode: barcode.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Validate and convert into an unsaved [`Product`] stamped with the current time.
    ///
    /// An empty or unparsable price becomes `0.0`, an empty or unparsable
    /// quantity becomes `1`.
    pub fn parse(&self) -> Result<Product, EntryError> {
        let barcode = self.barcode.trim();
        if barcode.is_empty() {
            return Err(EntryError::BlankBarcode);
        }
        let name = self.name.trim();
        if name.is_empty() {
            return Err(EntryError::BlankName);
        }

        let price = parse_price(&self.price);
        if price < 0.0 {
            return Err(EntryError::NegativePrice(price));
        }

        Ok(Product::new(barcode, name)
            .with_description(self.description.trim())
            .with_price(price)
            .with_quantity(parse_quantity(&self.quantity))
            .with_category(self.category.trim())
            .with_notes(self.notes.trim())
            .with_timestamp(Utc::now()))
    }
}

fn parse_price(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .unwrap_or(0.0)
}

fn parse_quantity(raw: &str) -> i64 {
    raw.trim().parse().unwrap_or(1)
}
