//! Spreadsheet export.
//!
//! The inventory is written as CSV, which every spreadsheet application opens
//! directly. One header row, then one row per product in the order given.

use crate::error::Result;
use crate::product::Product;
use chrono::{DateTime, Local, Utc};
use std::path::{Path, PathBuf};

/// Column headers, in output order
pub const HEADERS: [&str; 9] = [
    "ID",
    "Barcode",
    "Product Name",
    "Description",
    "Price",
    "Quantity",
    "Category",
    "Notes",
    "Timestamp",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const FILE_NAME_FORMAT: &str = "%Y%m%d_%H%M%S";
const EXTENSION: &str = "csv";

/// Writes a snapshot of products to a tabular file
pub trait Exporter: Send + Sync {
    /// Write `products` and return the path of the created file
    ///
    /// Without a suggested name a timestamped default is used.
    fn export(&self, products: &[Product], suggested_name: Option<&str>) -> Result<PathBuf>;
}

/// CSV exporter writing into a fixed directory
#[derive(Debug, Clone)]
pub struct CsvExporter {
    output_dir: PathBuf,
}

impl CsvExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Path inside the output directory for a suggested name
    ///
    /// Only the final component of the name is used, so a suggestion can never
    /// point outside the directory. `.csv` is appended unless already present.
    fn target_path(&self, suggested_name: Option<&str>) -> PathBuf {
        let file_name = suggested_name
            .map(str::trim)
            .and_then(|name| Path::new(name).file_name())
            .and_then(|name| name.to_str())
            .map(str::trim)
            .filter(|name| !name.is_empty());
        let name = match file_name {
            Some(name) if has_csv_extension(name) => name.to_string(),
            Some(name) => format!("{}.{}", name, EXTENSION),
            None => default_file_name(Local::now()),
        };
        self.output_dir.join(name)
    }
}

fn has_csv_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(EXTENSION))
}

impl Exporter for CsvExporter {
    fn export(&self, products: &[Product], suggested_name: Option<&str>) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.target_path(suggested_name);

        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(HEADERS)?;
        for product in products {
            writer.write_record(&[
                product.id.to_string(),
                product.barcode.clone(),
                product.name.clone(),
                product.description.clone(),
                product.price.to_string(),
                product.quantity.to_string(),
                product.category.clone(),
                product.notes.clone(),
                format_timestamp(&product.timestamp),
            ])?;
        }
        writer.flush()?;

        log::info!("Exported {} products to {}", products.len(), path.display());
        Ok(path)
    }
}

/// `products_export_YYYYMMDD_HHMMSS.csv`
pub fn default_file_name(now: DateTime<Local>) -> String {
    format!(
        "products_export_{}.{}",
        now.format(FILE_NAME_FORMAT),
        EXTENSION
    )
}

/// Creation time in local time, `YYYY-MM-DD HH:MM:SS`
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, TimeZone};

    #[test]
    fn test_default_file_name_is_timestamped() {
        let now = Local.with_ymd_and_hms(2026, 2, 1, 14, 5, 9).unwrap();
        assert_eq!(default_file_name(now), "products_export_20260201_140509.csv");
    }

    #[test]
    fn test_timestamp_format_has_seconds_resolution() {
        let ts = Utc.with_ymd_and_hms(2026, 2, 1, 14, 5, 9).unwrap();
        let formatted = format_timestamp(&ts);
        let parsed = NaiveDateTime::parse_from_str(&formatted, TIMESTAMP_FORMAT).unwrap();
        assert_eq!(parsed, ts.with_timezone(&Local).naive_local());
    }

    #[test]
    fn test_suggested_name_gets_csv_extension() {
        let exporter = CsvExporter::new("/tmp/out");
        assert_eq!(
            exporter.target_path(Some("weekly")),
            PathBuf::from("/tmp/out/weekly.csv")
        );
        assert_eq!(
            exporter.target_path(Some("weekly.CSV")),
            PathBuf::from("/tmp/out/weekly.CSV")
        );
        assert_eq!(
            exporter.target_path(Some("weekly.tsv")),
            PathBuf::from("/tmp/out/weekly.tsv.csv")
        );
        assert_eq!(
            exporter.target_path(Some("stock_v1.2")),
            PathBuf::from("/tmp/out/stock_v1.2.csv")
        );
    }

    #[test]
    fn test_suggested_name_stays_inside_output_dir() {
        let exporter = CsvExporter::new("/tmp/out");
        assert_eq!(
            exporter.target_path(Some("/etc/escaped.csv")),
            PathBuf::from("/tmp/out/escaped.csv")
        );
        assert_eq!(
            exporter.target_path(Some("../../escaped")),
            PathBuf::from("/tmp/out/escaped.csv")
        );
        let fallback = exporter.target_path(Some(".."));
        assert_eq!(fallback.parent(), Some(Path::new("/tmp/out")));
        assert!(fallback
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("products_export_"));
    }

    #[test]
    fn test_blank_suggested_name_uses_default() {
        let exporter = CsvExporter::new("/tmp/out");
        let path = exporter.target_path(Some("  "));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("products_export_"));
        assert!(name.ends_with(".csv"));
    }
}
