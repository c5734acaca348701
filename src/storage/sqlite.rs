//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ListingStore trait.

use crate::listing::{Category, FieldSet, Listing, RoomAttributes};
use crate::storage::schema::{initialize_schema, is_missing_table, reset_schema};
use crate::storage::traits::{ListingStore, StorageResult};
use crate::storage::ListingPage;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row, TransactionBehavior};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const INSERT_SQL: &str = "
    INSERT OR IGNORE INTO listings (
        category, title, price, location, surface, rooms, bedrooms, bathrooms,
        link, image_url, city, created_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)";

const LISTING_COLUMNS: &str = "
    category, title, price, location, surface, rooms, bedrooms, bathrooms,
    link, image_url, city, created_at";

/// SQLite storage backend
///
/// The connection sits behind a mutex so one instance can be shared by every
/// page worker through an `Arc`.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Configure SQLite for concurrent writers
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Locks the connection, recovering it if a previous holder panicked
    ///
    /// An open transaction rolls back when its guard unwinds, so the
    /// connection is consistent again by the time the lock is released.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `op`, provisioning the schema and retrying once if a collection
    /// turns out to be missing
    fn provisioned<T>(
        &self,
        op: impl Fn(&mut Connection) -> rusqlite::Result<T>,
    ) -> StorageResult<T> {
        let mut conn = self.lock();
        match op(&mut conn) {
            Err(e) if is_missing_table(&e) => {
                tracing::info!("Provisioning missing listings collection");
                initialize_schema(&conn)?;
                Ok(op(&mut conn)?)
            }
            other => Ok(other?),
        }
    }

    /// Inserts a batch with an explicit creation timestamp
    pub(crate) fn upsert_at(
        &self,
        category: Category,
        listings: &[Listing],
        created_at: DateTime<Utc>,
    ) -> StorageResult<usize> {
        if listings.is_empty() {
            return Ok(0);
        }

        let created_at = format_timestamp(created_at);
        let result = self.provisioned(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let mut inserted = 0;
            {
                let mut stmt = tx.prepare_cached(INSERT_SQL)?;
                for listing in listings {
                    let attrs = listing.attributes.as_ref();
                    let outcome = stmt.execute(params![
                        category.collection(),
                        listing.title,
                        listing.price,
                        listing.location,
                        listing.surface,
                        attrs.and_then(|a| a.rooms.as_deref()),
                        attrs.and_then(|a| a.bedrooms.as_deref()),
                        attrs.and_then(|a| a.bathrooms.as_deref()),
                        listing.link,
                        listing.image_url,
                        listing.city,
                        created_at,
                    ]);
                    match outcome {
                        Ok(rows) => inserted += rows,
                        Err(e) => {
                            tracing::warn!(
                                "Skipping {} listing {}: {}",
                                category,
                                listing.link,
                                e
                            );
                        }
                    }
                }
            }
            tx.commit()?;
            Ok(inserted)
        });

        if let Err(e) = &result {
            tracing::error!(
                "Rolled back {} batch of {} listings: {}",
                category,
                listings.len(),
                e
            );
        }
        result
    }
}

impl ListingStore for SqliteStorage {
    fn upsert(&self, category: Category, listings: &[Listing]) -> StorageResult<usize> {
        self.upsert_at(category, listings, Utc::now())
    }

    fn reset(&self) -> StorageResult<()> {
        let mut conn = self.lock();
        reset_schema(&mut conn)?;
        tracing::info!("Listings database reset");
        Ok(())
    }

    fn list(&self, category: Category, limit: usize, offset: usize) -> StorageResult<ListingPage> {
        let sql = format!(
            "SELECT {} FROM listings WHERE category = ?1
             ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3",
            LISTING_COLUMNS
        );

        self.provisioned(|conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            let listings = stmt
                .query_map(
                    params![category.collection(), limit as i64, offset as i64],
                    |row| row_to_listing(category, row),
                )?
                .collect::<Result<Vec<_>, _>>()?;

            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM listings WHERE category = ?1",
                params![category.collection()],
                |row| row.get(0),
            )?;

            Ok(ListingPage {
                listings,
                total: total as u64,
            })
        })
    }

    fn count(&self, category: Category) -> StorageResult<u64> {
        self.provisioned(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM listings WHERE category = ?1",
                params![category.collection()],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    fn count_by_category(&self) -> StorageResult<BTreeMap<Category, u64>> {
        let rows = self.provisioned(|conn| {
            let mut stmt =
                conn.prepare("SELECT category, COUNT(*) FROM listings GROUP BY category")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        let mut counts: BTreeMap<Category, u64> =
            Category::ALL.into_iter().map(|c| (c, 0)).collect();
        for (name, count) in rows {
            match Category::from_collection(&name) {
                Some(category) => {
                    counts.insert(category, count as u64);
                }
                None => tracing::debug!("Ignoring rows of unknown collection {}", name),
            }
        }

        Ok(counts)
    }

    fn export_rows(
        &self,
        category: Category,
        min_date: Option<DateTime<Utc>>,
    ) -> StorageResult<Vec<Listing>> {
        let sql = format!(
            "SELECT {} FROM listings
             WHERE category = ?1 AND link != '' AND link != 'N/A'
               AND (?2 IS NULL OR created_at >= ?2)
             ORDER BY created_at DESC, id DESC",
            LISTING_COLUMNS
        );
        let min_date = min_date.map(format_timestamp);

        self.provisioned(|conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt
                .query_map(params![category.collection(), min_date], |row| {
                    row_to_listing(category, row)
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    fn links(&self, category: Category) -> StorageResult<Vec<String>> {
        self.provisioned(|conn| {
            let mut stmt = conn.prepare("SELECT link FROM listings WHERE category = ?1")?;
            let links = stmt
                .query_map(params![category.collection()], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(links)
        })
    }
}

/// Fixed-width RFC 3339 so text order matches time order
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn row_to_listing(category: Category, row: &Row<'_>) -> rusqlite::Result<Listing> {
    let attributes = match category.field_set() {
        FieldSet::Standard => Some(RoomAttributes {
            rooms: row.get(5)?,
            bedrooms: row.get(6)?,
            bathrooms: row.get(7)?,
        }),
        FieldSet::LandParcel => None,
    };

    let created_at: String = row.get(11)?;

    Ok(Listing {
        category,
        title: row.get(1)?,
        price: row.get(2)?,
        location: row.get(3)?,
        surface: row.get(4)?,
        attributes,
        link: row.get(8)?,
        image_url: row.get(9)?,
        city: row.get(10)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
    })
}
