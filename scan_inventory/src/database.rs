//! Database operations for the product inventory
//!
//! Uses parameterized queries exclusively (no SQL string concatenation).
//! Every function takes a plain `&Connection`, so the same code runs inside
//! a `Transaction` (which derefs to `Connection`) when callers need atomicity.

use crate::product::{millis_to_timestamp, timestamp_to_millis, Product};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Result type for database operations
pub type DbResult<T> = rusqlite::Result<T>;

/// Column list shared by every SELECT so that [`product_from_row`] stays in sync
const PRODUCT_COLUMNS: &str =
    "id, barcode, name, description, price, quantity, timestamp, category, notes";

/// Newest first; id breaks ties between records created in the same millisecond
const NEWEST_FIRST: &str = "ORDER BY timestamp DESC, id DESC";

/// Initialize the database schema
///
/// Creates the `products` table if it doesn't exist. `barcode` is indexed
/// but not UNIQUE: only `id` is a key. `quantity` must stay an INTEGER, so an
/// increment that overflows fails instead of storing a REAL.
pub fn init_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            barcode TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            price REAL NOT NULL DEFAULT 0.0,
            quantity INTEGER NOT NULL DEFAULT 1 CHECK (typeof(quantity) = 'integer'),
            timestamp INTEGER NOT NULL,
            category TEXT NOT NULL DEFAULT '',
            notes TEXT NOT NULL DEFAULT ''
        );

        CREATE INDEX IF NOT EXISTS idx_products_barcode ON products(barcode);
        CREATE INDEX IF NOT EXISTS idx_products_category ON products(category);
        CREATE INDEX IF NOT EXISTS idx_products_timestamp ON products(timestamp);
        ",
    )?;

    log::info!("Database schema initialized");
    Ok(())
}

fn product_from_row(row: &Row<'_>) -> DbResult<Product> {
    Ok(Product {
        id: row.get(0)?,
        barcode: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        price: row.get(4)?,
        quantity: row.get(5)?,
        timestamp: millis_to_timestamp(row.get(6)?),
        category: row.get(7)?,
        notes: row.get(8)?,
    })
}

/// Insert a product and return its id
///
/// An unset id (`0`) gets a freshly assigned one. A non-zero id replaces the
/// stored record with that id, if any (INSERT OR REPLACE).
pub fn insert_product(conn: &Connection, product: &Product) -> DbResult<i64> {
    let millis = timestamp_to_millis(&product.timestamp);
    if product.id == 0 {
        let mut stmt = conn.prepare_cached(
            "INSERT INTO products
             (barcode, name, description, price, quantity, timestamp, category, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        stmt.execute(params![
            &product.barcode,
            &product.name,
            &product.description,
            product.price,
            product.quantity,
            millis,
            &product.category,
            &product.notes,
        ])?;
    } else {
        let mut stmt = conn.prepare_cached(
            "INSERT OR REPLACE INTO products
             (id, barcode, name, description, price, quantity, timestamp, category, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        stmt.execute(params![
            product.id,
            &product.barcode,
            &product.name,
            &product.description,
            product.price,
            product.quantity,
            millis,
            &product.category,
            &product.notes,
        ])?;
    }

    let id = conn.last_insert_rowid();
    log::debug!("Inserted product {} (barcode {})", id, product.barcode);
    Ok(id)
}

/// Update the record sharing `product.id`
///
/// The creation timestamp is never rewritten. Returns the number of rows
/// changed (0 when no such id exists; callers treat that as a no-op).
pub fn update_product(conn: &Connection, product: &Product) -> DbResult<usize> {
    let mut stmt = conn.prepare_cached(
        "UPDATE products
         SET barcode = ?2, name = ?3, description = ?4, price = ?5,
             quantity = ?6, category = ?7, notes = ?8
         WHERE id = ?1",
    )?;
    stmt.execute(params![
        product.id,
        &product.barcode,
        &product.name,
        &product.description,
        product.price,
        product.quantity,
        &product.category,
        &product.notes,
    ])
}

/// Delete a single product by id (no-op if absent)
pub fn delete_product_by_id(conn: &Connection, id: i64) -> DbResult<usize> {
    conn.execute("DELETE FROM products WHERE id = ?1", params![id])
}

/// Delete every product
pub fn delete_all_products(conn: &Connection) -> DbResult<usize> {
    let removed = conn.execute("DELETE FROM products", [])?;
    log::info!("Cleared {} products", removed);
    Ok(removed)
}

/// Get product by id
pub fn get_product_by_id(conn: &Connection, id: i64) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
    conn.query_row(&sql, params![id], product_from_row)
        .optional()
}

/// Get a product by barcode
///
/// If several records share the barcode, the one with the lowest id wins.
pub fn get_product_by_barcode(conn: &Connection, barcode: &str) -> DbResult<Option<Product>> {
    let sql = format!(
        "SELECT {} FROM products WHERE barcode = ?1 ORDER BY id ASC LIMIT 1",
        PRODUCT_COLUMNS
    );
    conn.query_row(&sql, params![barcode], product_from_row)
        .optional()
}

/// Get total count of products in database
pub fn get_product_count(conn: &Connection) -> DbResult<i64> {
    conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))
}

/// All products, newest first
pub fn list_products(conn: &Connection) -> DbResult<Vec<Product>> {
    let sql = format!("SELECT {} FROM products {}", PRODUCT_COLUMNS, NEWEST_FIRST);
    let mut stmt = conn.prepare_cached(&sql)?;
    let results: DbResult<Vec<Product>> = stmt.query_map([], product_from_row)?.collect();
    results
}

/// Search products by name or barcode (case-sensitive substring match)
///
/// `instr` is used instead of LIKE because SQLite's LIKE folds ASCII case.
pub fn search_products(conn: &Connection, text: &str) -> DbResult<Vec<Product>> {
    let sql = format!(
        "SELECT {} FROM products
         WHERE instr(name, ?1) > 0 OR instr(barcode, ?1) > 0
         {}",
        PRODUCT_COLUMNS, NEWEST_FIRST
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let results: DbResult<Vec<Product>> =
        stmt.query_map(params![text], product_from_row)?.collect();
    results
}

/// Products in exactly this category, newest first
pub fn list_products_by_category(conn: &Connection, category: &str) -> DbResult<Vec<Product>> {
    let sql = format!(
        "SELECT {} FROM products WHERE category = ?1 {}",
        PRODUCT_COLUMNS, NEWEST_FIRST
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let results: DbResult<Vec<Product>> =
        stmt.query_map(params![category], product_from_row)?.collect();
    results
}

/// Non-empty distinct categories, ascending
pub fn distinct_categories(conn: &Connection) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT DISTINCT category FROM products WHERE category != '' ORDER BY category",
    )?;
    let results: DbResult<Vec<String>> = stmt.query_map([], |row| row.get(0))?.collect();
    results
}

/// Add `delta` to the quantity of every product with this barcode
///
/// Returns the number of rows touched (zero, one, or more when the barcode
/// is duplicated).
pub fn increment_quantity_by_barcode(conn: &Connection, barcode: &str, delta: i64) -> DbResult<usize> {
    let mut stmt = conn.prepare_cached(
        "UPDATE products SET quantity = quantity + ?2 WHERE barcode = ?1",
    )?;
    let touched = stmt.execute(params![barcode, delta])?;
    if touched > 1 {
        log::warn!(
            "Barcode {} matches {} products; all were incremented by {}",
            barcode,
            touched,
            delta
        );
    }
    Ok(touched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    /// Create an in-memory database for testing
    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn at(minute: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 10, minute, 0).unwrap()
    }

    fn make_product(barcode: &str, name: &str, minute: u32) -> Product {
        Product::new(barcode, name).with_timestamp(at(minute))
    }

    #[test]
    fn test_init_schema_creates_table() {
        let conn = test_db();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='products'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = test_db();
        init_schema(&conn).unwrap();
        assert_eq!(get_product_count(&conn).unwrap(), 0);
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let conn = test_db();
        let id1 = insert_product(&conn, &make_product("111", "Milk", 0)).unwrap();
        let id2 = insert_product(&conn, &make_product("222", "Bread", 1)).unwrap();
        assert_eq!(id1, 1);
        assert_eq!(id2, 2);
    }

    #[test]
    fn test_insert_with_existing_id_replaces() {
        let conn = test_db();
        let id = insert_product(&conn, &make_product("111", "Milk", 0)).unwrap();

        let mut replacement = make_product("111", "Whole Milk", 5);
        replacement.id = id;
        let replaced_id = insert_product(&conn, &replacement).unwrap();

        assert_eq!(replaced_id, id);
        assert_eq!(get_product_count(&conn).unwrap(), 1);
        let stored = get_product_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(stored.name, "Whole Milk");
    }

    #[test]
    fn test_insert_round_trips_all_fields() {
        let conn = test_db();
        let product = make_product("4006381333931", "Highlighter", 3)
            .with_description("yellow")
            .with_price(1.49)
            .with_quantity(7)
            .with_category("Office")
            .with_notes("shelf B");
        let id = insert_product(&conn, &product).unwrap();

        let stored = get_product_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(stored, Product { id, ..product });
    }

    #[test]
    fn test_get_by_id_returns_none_when_missing() {
        let conn = test_db();
        assert!(get_product_by_id(&conn, 42).unwrap().is_none());
    }

    #[test]
    fn test_update_changes_fields_but_not_timestamp() {
        let conn = test_db();
        let id = insert_product(&conn, &make_product("111", "Milk", 0)).unwrap();

        let mut edited = get_product_by_id(&conn, id).unwrap().unwrap();
        edited.name = "Oat Milk".to_string();
        edited.price = 2.0;
        edited.timestamp = at(59);
        assert_eq!(update_product(&conn, &edited).unwrap(), 1);

        let stored = get_product_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(stored.name, "Oat Milk");
        assert_eq!(stored.price, 2.0);
        assert_eq!(stored.timestamp, at(0), "timestamp must never change");
    }

    #[test]
    fn test_update_missing_id_is_noop() {
        let conn = test_db();
        let mut ghost = make_product("999", "Ghost", 0);
        ghost.id = 77;
        assert_eq!(update_product(&conn, &ghost).unwrap(), 0);
        assert_eq!(get_product_count(&conn).unwrap(), 0);
    }

    #[test]
    fn test_delete_by_id_removes_only_that_record() {
        let conn = test_db();
        let id1 = insert_product(&conn, &make_product("111", "Milk", 0)).unwrap();
        let id2 = insert_product(&conn, &make_product("222", "Bread", 1)).unwrap();

        assert_eq!(delete_product_by_id(&conn, id1).unwrap(), 1);
        assert_eq!(delete_product_by_id(&conn, id1).unwrap(), 0);
        assert!(get_product_by_id(&conn, id2).unwrap().is_some());
        assert_eq!(get_product_count(&conn).unwrap(), 1);
    }

    #[test]
    fn test_delete_all_empties_table() {
        let conn = test_db();
        insert_product(&conn, &make_product("111", "Milk", 0)).unwrap();
        insert_product(&conn, &make_product("222", "Bread", 1)).unwrap();

        assert_eq!(delete_all_products(&conn).unwrap(), 2);
        assert_eq!(get_product_count(&conn).unwrap(), 0);
        assert!(list_products(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_ids_are_not_reused_after_delete() {
        let conn = test_db();
        let id1 = insert_product(&conn, &make_product("111", "Milk", 0)).unwrap();
        delete_product_by_id(&conn, id1).unwrap();
        let id2 = insert_product(&conn, &make_product("222", "Bread", 1)).unwrap();
        assert!(id2 > id1);
    }

    #[test]
    fn test_list_is_newest_first() {
        let conn = test_db();
        insert_product(&conn, &make_product("1", "Old", 0)).unwrap();
        insert_product(&conn, &make_product("2", "Newest", 30)).unwrap();
        insert_product(&conn, &make_product("3", "Middle", 15)).unwrap();

        let names: Vec<String> = list_products(&conn)
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Newest", "Middle", "Old"]);
    }

    #[test]
    fn test_list_breaks_timestamp_ties_by_id() {
        let conn = test_db();
        let a = insert_product(&conn, &make_product("1", "A", 5)).unwrap();
        let b = insert_product(&conn, &make_product("2", "B", 5)).unwrap();
        let ids: Vec<i64> = list_products(&conn).unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![b, a]);
    }

    #[test]
    fn test_search_matches_name_or_barcode_substring() {
        let conn = test_db();
        insert_product(&conn, &make_product("900abc1", "Widget", 0)).unwrap();
        insert_product(&conn, &make_product("555", "xabcx gadget", 1)).unwrap();
        insert_product(&conn, &make_product("777", "Unrelated", 2)).unwrap();

        let found = search_products(&conn, "abc").unwrap();
        let names: Vec<&str> = found.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["xabcx gadget", "Widget"]);
    }

    #[test]
    fn test_search_is_case_sensitive() {
        let conn = test_db();
        insert_product(&conn, &make_product("1", "abc soap", 0)).unwrap();
        insert_product(&conn, &make_product("2", "ABC Soap", 1)).unwrap();
        insert_product(&conn, &make_product("ABC3", "Other", 2)).unwrap();

        let found = search_products(&conn, "abc").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "abc soap");
    }

    #[test]
    fn test_search_treats_like_wildcards_literally() {
        let conn = test_db();
        insert_product(&conn, &make_product("1", "100% juice", 0)).unwrap();
        insert_product(&conn, &make_product("2", "1000 pieces", 1)).unwrap();

        let found = search_products(&conn, "0%").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "100% juice");
    }

    #[test]
    fn test_category_filter_is_exact() {
        let conn = test_db();
        insert_product(&conn, &make_product("1", "Milk", 0).with_category("Dairy")).unwrap();
        insert_product(&conn, &make_product("2", "Cheese", 1).with_category("Dairy")).unwrap();
        insert_product(&conn, &make_product("3", "Yogurt", 2).with_category("dairy")).unwrap();
        insert_product(&conn, &make_product("4", "Bread", 3).with_category("Bakery")).unwrap();

        let dairy = list_products_by_category(&conn, "Dairy").unwrap();
        let names: Vec<&str> = dairy.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Cheese", "Milk"]);
    }

    #[test]
    fn test_distinct_categories_skip_empty_and_sort() {
        let conn = test_db();
        insert_product(&conn, &make_product("1", "Milk", 0).with_category("Dairy")).unwrap();
        insert_product(&conn, &make_product("2", "Cheese", 1).with_category("Dairy")).unwrap();
        insert_product(&conn, &make_product("3", "Bread", 2).with_category("Bakery")).unwrap();
        insert_product(&conn, &make_product("4", "Loose", 3)).unwrap();

        assert_eq!(distinct_categories(&conn).unwrap(), vec!["Bakery", "Dairy"]);
    }

    #[test]
    fn test_get_by_barcode_prefers_lowest_id_on_duplicates() {
        let conn = test_db();
        let first = insert_product(&conn, &make_product("111", "First", 0)).unwrap();
        insert_product(&conn, &make_product("111", "Second", 1)).unwrap();

        let found = get_product_by_barcode(&conn, "111").unwrap().unwrap();
        assert_eq!(found.id, first);
        assert!(get_product_by_barcode(&conn, "nope").unwrap().is_none());
    }

    #[test]
    fn test_increment_touches_every_duplicate() {
        let conn = test_db();
        let a = insert_product(&conn, &make_product("111", "First", 0)).unwrap();
        let b = insert_product(&conn, &make_product("111", "Second", 1)).unwrap();
        insert_product(&conn, &make_product("222", "Other", 2)).unwrap();

        assert_eq!(increment_quantity_by_barcode(&conn, "111", 4).unwrap(), 2);
        assert_eq!(get_product_by_id(&conn, a).unwrap().unwrap().quantity, 5);
        assert_eq!(get_product_by_id(&conn, b).unwrap().unwrap().quantity, 5);
    }

    #[test]
    fn test_increment_overflow_is_rejected_and_row_kept() {
        let conn = test_db();
        let id = insert_product(&conn, &make_product("111", "Milk", 0).with_quantity(i64::MAX)).unwrap();

        assert!(increment_quantity_by_barcode(&conn, "111", 1).is_err());
        assert_eq!(get_product_by_id(&conn, id).unwrap().unwrap().quantity, i64::MAX);
        assert_eq!(list_products(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_increment_unknown_barcode_is_noop() {
        let conn = test_db();
        insert_product(&conn, &make_product("111", "Milk", 0)).unwrap();
        assert_eq!(increment_quantity_by_barcode(&conn, "999", 3).unwrap(), 0);
        assert_eq!(get_product_by_barcode(&conn, "111").unwrap().unwrap().quantity, 1);
    }
}
