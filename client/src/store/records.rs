//! Queries against the fault_records table.

use chrono::{DateTime, Utc};
use faultsync_engine::Record;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use sqlx::{Executor, Row, Sqlite};

/// Payload fields projected into indexed columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexField {
    Brand,
    Model,
    Category,
    Severity,
    Code,
}

impl IndexField {
    pub const ALL: [IndexField; 5] = [
        IndexField::Brand,
        IndexField::Model,
        IndexField::Category,
        IndexField::Severity,
        IndexField::Code,
    ];

    /// Column name, identical to the payload field it is projected from.
    pub fn column(self) -> &'static str {
        match self {
            IndexField::Brand => "brand",
            IndexField::Model => "model",
            IndexField::Category => "category",
            IndexField::Severity => "severity",
            IndexField::Code => "code",
        }
    }
}

impl std::str::FromStr for IndexField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IndexField::ALL
            .into_iter()
            .find(|f| f.column().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown index: {}", s))
    }
}

/// A stored record row.
#[derive(Debug)]
pub struct StoredRecord {
    pub id: String,
    pub payload: Value,
    pub content_checksum: String,
    pub updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for StoredRecord {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let payload: Json<Value> = row.try_get("payload")?;
        Ok(StoredRecord {
            id: row.try_get("id")?,
            payload: payload.0,
            content_checksum: row.try_get("content_checksum")?,
            updated_at: row.try_get("updated_at")?,
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

const SELECT_COLUMNS: &str = "SELECT id, payload, content_checksum, updated_at FROM fault_records";

/// Insert or replace a record, refreshing its index columns.
pub async fn upsert<'e, E>(executor: E, record: &Record, now: DateTime<Utc>) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO fault_records (
            id, payload, content_checksum,
            brand, model, category, severity, code, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (id) DO UPDATE SET
            payload = excluded.payload,
            content_checksum = excluded.content_checksum,
            brand = excluded.brand,
            model = excluded.model,
            category = excluded.category,
            severity = excluded.severity,
            code = excluded.code,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&record.id)
    .bind(Json(&record.payload))
    .bind(&record.content_checksum)
    .bind(record.field("brand"))
    .bind(record.field("model"))
    .bind(record.field("category"))
    .bind(record.field("severity"))
    .bind(record.field("code"))
    .bind(now)
    .execute(executor)
    .await?;

    Ok(())
}

/// Delete a record. Returns whether it existed.
pub async fn delete<'e, E>(executor: E, id: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM fault_records WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete every record.
pub async fn delete_all<'e, E>(executor: E) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM fault_records")
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn get<'e, E>(executor: E, id: &str) -> Result<Option<StoredRecord>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, StoredRecord>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// All records, ordered by id.
pub async fn all<'e, E>(executor: E) -> Result<Vec<StoredRecord>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, StoredRecord>(&format!("{} ORDER BY id", SELECT_COLUMNS))
        .fetch_all(executor)
        .await
}

pub async fn count<'e, E>(executor: E) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar("SELECT COUNT(*) FROM fault_records")
        .fetch_one(executor)
        .await
}

/// `(id, content_checksum)` pairs, ordered by id.
pub async fn checksums<'e, E>(executor: E) -> Result<Vec<(String, String)>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as("SELECT id, content_checksum FROM fault_records ORDER BY id")
        .fetch_all(executor)
        .await
}

/// Records whose indexed field equals `value`.
pub async fn find_by<'e, E>(
    executor: E,
    field: IndexField,
    value: &str,
) -> Result<Vec<StoredRecord>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{} WHERE {} = ? ORDER BY id", SELECT_COLUMNS, field.column());
    sqlx::query_as::<_, StoredRecord>(&sql)
        .bind(value)
        .fetch_all(executor)
        .await
}

/// Case-insensitive substring search over the id, the code, brand and model
/// columns and the payload's title and description.
pub async fn search<'e, E>(executor: E, query: &str) -> Result<Vec<StoredRecord>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
    let sql = format!(
        r#"{} WHERE
            lower(id) LIKE ?1 ESCAPE '\'
            OR lower(code) LIKE ?1 ESCAPE '\'
            OR lower(brand) LIKE ?1 ESCAPE '\'
            OR lower(model) LIKE ?1 ESCAPE '\'
            OR lower(json_extract(payload, '$.title')) LIKE ?1 ESCAPE '\'
            OR lower(json_extract(payload, '$.description')) LIKE ?1 ESCAPE '\'
        ORDER BY id"#,
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, StoredRecord>(&sql)
        .bind(pattern)
        .fetch_all(executor)
        .await
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
