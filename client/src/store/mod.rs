//! Local persistent store for fault records, settings and applied versions.
//!
//! Backed by SQLite through a single-connection pool. Readers see only
//! committed state; every multi-step write goes through a [`StoreTxn`].

mod records;
pub mod schema;
mod settings;

pub use records::IndexField;

use crate::error::Result;
use chrono::Utc;
use faultsync_engine::{ChecksumMap, DatasetVersion, Record};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Sqlite, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Handle to the local store.
#[derive(Debug, Clone)]
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    /// Open (creating if missing) the store at `path` and bring its schema
    /// up to date.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_at_schema(path, schema::latest_version()).await
    }

    /// Open the store, migrating only up to `schema_version`.
    pub async fn open_at_schema(path: impl AsRef<Path>, schema_version: u32) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "Opening local store");

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Self::init(pool, schema_version).await
    }

    /// A throwaway store held in memory.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // The database lives as long as its only connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::init(pool, schema::latest_version()).await
    }

    async fn init(pool: SqlitePool, schema_version: u32) -> Result<Self> {
        let version = schema::migrate_to(&pool, schema_version).await?;
        tracing::debug!(schema_version = version, "Local store ready");
        Ok(Self { pool })
    }

    /// Schema version of the open database.
    pub async fn schema_version(&self) -> Result<u32> {
        Ok(schema::current_version(&self.pool).await?)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Record>> {
        let row = records::get(&self.pool, id).await?;
        Ok(row.map(|r| r.into_record()))
    }

    /// Every record, ordered by id.
    pub async fn all(&self) -> Result<Vec<Record>> {
        let rows = records::all(&self.pool).await?;
        Ok(rows.into_iter().map(|r| r.into_record()).collect())
    }

    pub async fn count(&self) -> Result<usize> {
        let count = records::count(&self.pool).await?;
        Ok(count.max(0) as usize)
    }

    /// Id to content checksum map of the stored records.
    pub async fn checksum_map(&self) -> Result<ChecksumMap> {
        let pairs = records::checksums(&self.pool).await?;
        Ok(pairs.into_iter().collect())
    }

    /// Records whose indexed field equals `value`.
    pub async fn find_by(&self, field: IndexField, value: &str) -> Result<Vec<Record>> {
        let rows = records::find_by(&self.pool, field, value).await?;
        Ok(rows.into_iter().map(|r| r.into_record()).collect())
    }

    /// Case-insensitive substring search.
    pub async fn search(&self, query: &str) -> Result<Vec<Record>> {
        let rows = records::search(&self.pool, query).await?;
        Ok(rows.into_iter().map(|r| r.into_record()).collect())
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(settings::get_setting(&self.pool, key).await?)
    }

    pub async fn put_setting(&self, key: &str, value: &str) -> Result<()> {
        Ok(settings::put_setting(&self.pool, key, value).await?)
    }

    /// Applied dataset versions, newest first.
    pub async fn versions(&self) -> Result<Vec<DatasetVersion>> {
        Ok(settings::versions(&self.pool).await?)
    }

    /// Start a write transaction.
    ///
    /// Nothing written through the transaction is visible to readers until
    /// [`StoreTxn::commit`]. Dropping it uncommitted rolls everything back.
    pub async fn begin(&self) -> Result<StoreTxn> {
        Ok(StoreTxn {
            tx: self.pool.begin().await?,
        })
    }

    /// Close the pool, waiting for the connection to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// An open write transaction on the local store.
pub struct StoreTxn {
    tx: Transaction<'static, Sqlite>,
}

impl StoreTxn {
    /// Every record as seen inside the transaction.
    pub async fn all(&mut self) -> Result<Vec<Record>> {
        let rows = records::all(&mut *self.tx).await?;
        Ok(rows.into_iter().map(|r| r.into_record()).collect())
    }

    pub async fn checksum_map(&mut self) -> Result<ChecksumMap> {
        let pairs = records::checksums(&mut *self.tx).await?;
        Ok(pairs.into_iter().collect())
    }

    /// Insert or replace records. Returns the number written.
    pub async fn upsert(&mut self, batch: &[Record]) -> Result<usize> {
        let now = Utc::now();
        for record in batch {
            records::upsert(&mut *self.tx, record, now).await?;
        }
        Ok(batch.len())
    }

    /// Delete records by id. Unknown ids are ignored. Returns the number
    /// actually deleted.
    pub async fn remove<'a, I>(&mut self, ids: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut removed = 0;
        for id in ids {
            if records::delete(&mut *self.tx, id).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Delete every record.
    pub async fn clear(&mut self) -> Result<u64> {
        Ok(records::delete_all(&mut *self.tx).await?)
    }

    pub async fn put_setting(&mut self, key: &str, value: &str) -> Result<()> {
        Ok(settings::put_setting(&mut *self.tx, key, value).await?)
    }

    /// Record an applied version as current.
    pub async fn record_version(&mut self, version: &DatasetVersion) -> Result<()> {
        Ok(settings::record_version(&mut *self.tx, version).await?)
    }

    pub async fn commit(self) -> Result<()> {
        Ok(self.tx.commit().await?)
    }

    pub async fn rollback(self) -> Result<()> {
        Ok(self.tx.rollback().await?)
    }
}
