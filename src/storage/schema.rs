//! Database schema definitions
//!
//! Every category shares one `listings` table; the `category` column is the
//! collection handle, and `UNIQUE(category, link)` is the dedup key.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per listing, deduplicated on (category, link)
CREATE TABLE IF NOT EXISTS listings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category TEXT NOT NULL,
    title TEXT NOT NULL,
    price TEXT,
    location TEXT,
    surface TEXT,
    rooms TEXT,
    bedrooms TEXT,
    bathrooms TEXT,
    link TEXT NOT NULL,
    image_url TEXT,
    city TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(category, link)
);

CREATE INDEX IF NOT EXISTS idx_listings_category_created
    ON listings(category, created_at);
"#;

/// SQL that removes every collection
pub const DROP_SQL: &str = r#"
DROP INDEX IF EXISTS idx_listings_category_created;
DROP TABLE IF EXISTS listings;
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Drops and recreates every table in a single transaction
pub fn reset_schema(conn: &mut rusqlite::Connection) -> Result<(), rusqlite::Error> {
    let tx = conn.transaction()?;
    tx.execute_batch(DROP_SQL)?;
    tx.execute_batch(SCHEMA_SQL)?;
    tx.commit()
}

/// Returns true if the error means a collection has not been provisioned
pub fn is_missing_table(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.starts_with("no such table")
    )
}
