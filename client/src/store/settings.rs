//! Queries against the settings and dataset_versions tables.

use chrono::{DateTime, Utc};
use faultsync_engine::DatasetVersion;
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use sqlx::{Executor, Row, Sqlite};

pub async fn get_setting<'e, E>(executor: E, key: &str) -> Result<Option<String>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(executor)
        .await
}

pub async fn put_setting<'e, E>(executor: E, key: &str, value: &str) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?, ?)
        ON CONFLICT (key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(executor)
    .await?;
    Ok(())
}

/// A row of dataset_versions.
struct VersionRow(DatasetVersion);

impl<'r> sqlx::FromRow<'r, SqliteRow> for VersionRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let record_count: i64 = row.try_get("record_count")?;
        let released_at: DateTime<Utc> = row.try_get("released_at")?;
        let changelog: Json<Vec<String>> = row.try_get("changelog")?;
        Ok(VersionRow(DatasetVersion {
            version: row.try_get("version")?,
            record_count: record_count.max(0) as u64,
            checksum: row.try_get("checksum")?,
            released_at,
            is_current: row.try_get("is_current")?,
            changelog: changelog.0,
        }))
    }
}

/// Record `version` as the current one, demoting any previous current row.
pub async fn record_version(
    conn: &mut sqlx::SqliteConnection,
    version: &DatasetVersion,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE dataset_versions SET is_current = 0 WHERE is_current = 1")
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO dataset_versions (
            version, record_count, checksum, released_at, is_current, changelog
        )
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (version) DO UPDATE SET
            record_count = excluded.record_count,
            checksum = excluded.checksum,
            released_at = excluded.released_at,
            is_current = excluded.is_current,
            changelog = excluded.changelog
        "#,
    )
    .bind(&version.version)
    .bind(version.record_count as i64)
    .bind(&version.checksum)
    .bind(version.released_at)
    .bind(version.is_current)
    .bind(Json(&version.changelog))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Applied versions, newest release first.
pub async fn versions<'e, E>(executor: E) -> Result<Vec<DatasetVersion>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows: Vec<VersionRow> = sqlx::query_as(
        r#"
        SELECT version, record_count, checksum, released_at, is_current, changelog
        FROM dataset_versions
        ORDER BY released_at DESC
        "#,
    )
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}
