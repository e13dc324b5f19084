//! The product record stored in the inventory.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One inventory line.
///
/// `id` is `0` until the store assigns one. `timestamp` is the creation time
/// and is never rewritten by updates or quantity merges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub barcode: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub notes: String,
}

fn default_quantity() -> i64 {
    1
}

impl Product {
    /// New, unsaved product with the default field values (quantity 1, price 0.0)
    pub fn new(barcode: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: 0,
            barcode: barcode.into(),
            name: name.into(),
            description: String::new(),
            price: 0.0,
            quantity: default_quantity(),
            timestamp: Utc::now(),
            category: String::new(),
            notes: String::new(),
        }
    }

    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// True once the store has assigned an id
    pub fn is_saved(&self) -> bool {
        self.id != 0
    }
}

/// Timestamps are persisted as Unix milliseconds so that ORDER BY is numeric.
pub(crate) fn timestamp_to_millis(timestamp: &DateTime<Utc>) -> i64 {
    timestamp.timestamp_millis()
}

/// Inverse of [`timestamp_to_millis`]; out-of-range values clamp to the epoch.
pub(crate) fn millis_to_timestamp(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_default()
}
