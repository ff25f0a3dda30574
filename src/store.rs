//! Feedback source backed by SQLite.
//!
//! The analysis core only reads feedback; writes exist for seeding and tests.

use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use serde::Deserialize;

use crate::error::{InsightsError, Result};
use crate::feedback::{FeedbackRecord, ProductScope};

/// Read-only access to stored feedback
#[async_trait]
pub trait FeedbackSource: Send + Sync {
    /// Records for `scope`, oldest first; product matching ignores case
    async fn fetch(&self, scope: &ProductScope) -> Result<Vec<FeedbackRecord>>;

    /// Distinct product names ignoring case, sorted
    async fn products(&self) -> Result<Vec<String>>;
}

/// CSV row accepted by [`SqliteFeedbackStore::seed_from_csv`]
#[derive(Debug, Deserialize)]
struct SeedRow {
    product: String,
    source: String,
    comment: String,
    #[serde(default)]
    created_at: Option<String>,
}

#[derive(Clone)]
pub struct SqliteFeedbackStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteFeedbackStore {
    /// Open (or create) the database file and ensure the schema exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS feedback (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product TEXT NOT NULL,
                source TEXT NOT NULL,
                comment TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_feedback_product ON feedback(product COLLATE NOCASE);
        "#,
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock().map_err(|_| InsightsError::Database {
            message: "feedback connection lock poisoned".to_string(),
        })?;
        f(&conn)
    }

    /// Insert one feedback row stamped with the current time
    pub fn insert(&self, product: &str, source: &str, comment: &str) -> Result<i64> {
        self.insert_at(product, source, comment, Utc::now())
    }

    pub fn insert_at(
        &self,
        product: &str,
        source: &str,
        comment: &str,
        created_at: DateTime<Utc>,
    ) -> Result<i64> {
        self.with_conn(|conn| insert_row(conn, product, source, comment, created_at))
    }

    /// Load `product,source,comment[,created_at]` rows; returns the number inserted.
    ///
    /// All rows go in one transaction, so a bad row leaves the table untouched.
    pub fn seed_from_csv<R: Read>(&self, reader: R) -> Result<usize> {
        let mut rdr = csv::Reader::from_reader(reader);
        let inserted = self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let mut inserted = 0;
            for row in rdr.deserialize() {
                let row: SeedRow = row?;
                let created_at = row
                    .created_at
                    .as_deref()
                    .filter(|s| !s.trim().is_empty())
                    .map(parse_datetime)
                    .unwrap_or_else(Utc::now);
                insert_row(&tx, &row.product, &row.source, &row.comment, created_at)?;
                inserted += 1;
            }
            tx.commit()?;
            Ok(inserted)
        })?;
        tracing::info!("Seeded {} feedback rows", inserted);
        Ok(inserted)
    }

    pub fn count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM feedback", [], |row| row.get(0))?;
            Ok(n as usize)
        })
    }

    fn fetch_blocking(&self, scope: &ProductScope) -> Result<Vec<FeedbackRecord>> {
        self.with_conn(|conn| {
            let records = match scope {
                ProductScope::All => conn
                    .prepare("SELECT id, product, source, comment, created_at FROM feedback ORDER BY id")?
                    .query_map([], record_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?,
                ProductScope::Product(product) => conn
                    .prepare(
                        "SELECT id, product, source, comment, created_at FROM feedback
                         WHERE lower(product) = lower(?1) ORDER BY id",
                    )?
                    .query_map(params![product], record_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?,
            };
            Ok(records)
        })
    }

    fn products_blocking(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            // one name per case-insensitive product, spelled as first stored
            let mut stmt = conn.prepare(
                "SELECT product, MIN(id) FROM feedback GROUP BY lower(product) ORDER BY lower(product)",
            )?;
            let products = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(products)
        })
    }
}

#[async_trait]
impl FeedbackSource for SqliteFeedbackStore {
    async fn fetch(&self, scope: &ProductScope) -> Result<Vec<FeedbackRecord>> {
        let store = self.clone();
        let scope = scope.clone();
        tokio::task::spawn_blocking(move || store.fetch_blocking(&scope)).await?
    }

    async fn products(&self) -> Result<Vec<String>> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.products_blocking()).await?
    }
}

fn insert_row(
    conn: &Connection,
    product: &str,
    source: &str,
    comment: &str,
    created_at: DateTime<Utc>,
) -> Result<i64> {
    if product.trim().is_empty() {
        return Err(InsightsError::Validation {
            message: "product must not be empty".to_string(),
        });
    }
    conn.execute(
        "INSERT INTO feedback (product, source, comment, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![product.trim(), source.trim(), comment, created_at.to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<FeedbackRecord> {
    Ok(FeedbackRecord {
        id: row.get("id")?,
        product: row.get("product")?,
        source: row.get("source")?,
        comment: row.get("comment")?,
        created_at: parse_datetime(&row.get::<_, String>("created_at")?),
    })
}

/// RFC 3339 or `YYYY-MM-DD HH:MM:SS` (SQLite's CURRENT_TIMESTAMP); epoch if neither parses
fn parse_datetime(raw: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc);
    }
    match chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        Ok(naive) => naive.and_utc(),
        Err(_) => {
            tracing::warn!("Unparseable feedback timestamp '{}'", raw);
            DateTime::<Utc>::default()
        }
    }
}
