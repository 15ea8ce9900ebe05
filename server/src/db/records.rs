//! Database operations for the fault_records table.

use faultsync_engine::Record;
use sqlx::postgres::PgRow;
use sqlx::{Executor, Postgres, Row};

/// A stored record row from the database.
#[derive(Debug)]
pub struct StoredRecord {
    pub id: String,
    pub payload: serde_json::Value,
    pub content_checksum: String,
}

impl<'r> sqlx::FromRow<'r, PgRow> for StoredRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredRecord {
            id: row.try_get("id")?,
            payload: row.try_get("payload")?,
            content_checksum: row.try_get("content_checksum")?,
        })
    }
}

impl StoredRecord {
    pub fn into_record(self) -> Record {
        Record {
            id: self.id,
            payload: self.payload,
            content_checksum: self.content_checksum,
        }
    }
}

/// Upsert a record (insert or update).
pub async fn upsert_record<'e, E>(executor: E, record: &Record) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO fault_records (id, payload, content_checksum, updated_at)
        VALUES ($1, $2, $3, NOW())
        ON CONFLICT (id) DO UPDATE SET
            payload = EXCLUDED.payload,
            content_checksum = EXCLUDED.content_checksum,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(&record.id)
    .bind(&record.payload)
    .bind(&record.content_checksum)
    .execute(executor)
    .await?;

    Ok(())
}

/// Delete a record. Returns whether it existed.
pub async fn delete_record<'e, E>(executor: E, id: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM fault_records WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Every record, ordered by id.
pub async fn get_all_records<'e, E>(executor: E) -> Result<Vec<Record>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let rows = sqlx::query_as::<_, StoredRecord>(
        "SELECT id, payload, content_checksum FROM fault_records ORDER BY id",
    )
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(StoredRecord::into_record).collect())
}

/// `(id, content_checksum)` of every record.
pub async fn get_record_checksums<'e, E>(executor: E) -> Result<Vec<(String, String)>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as("SELECT id, content_checksum FROM fault_records")
        .fetch_all(executor)
        .await
}
