//! Database operations for the dataset_versions table.

use chrono::{DateTime, Utc};
use faultsync_engine::DatasetVersion;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{Executor, Postgres, Row};

/// A stored version row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredVersion {
    pub version: String,
    /// Records touched by this version
    pub change_count: i64,
    /// Records in the dataset at this version
    pub record_count: i64,
    pub checksum: String,
    pub changelog: Vec<String>,
    pub released_at: DateTime<Utc>,
    pub is_current: bool,
}

impl<'r> sqlx::FromRow<'r, PgRow> for StoredVersion {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let changelog: Json<Vec<String>> = row.try_get("changelog")?;
        Ok(StoredVersion {
            version: row.try_get("version")?,
            change_count: row.try_get("change_count")?,
            record_count: row.try_get("record_count")?,
            checksum: row.try_get("checksum")?,
            changelog: changelog.0,
            released_at: row.try_get("released_at")?,
            is_current: row.try_get("is_current")?,
        })
    }
}

impl StoredVersion {
    pub fn to_dataset_version(&self) -> DatasetVersion {
        DatasetVersion {
            version: self.version.clone(),
            record_count: self.record_count.max(0) as u64,
            checksum: self.checksum.clone(),
            released_at: self.released_at,
            is_current: self.is_current,
            changelog: self.changelog.clone(),
        }
    }
}

const SELECT_VERSION: &str = r#"
    SELECT version, change_count, record_count, checksum, changelog, released_at, is_current
    FROM dataset_versions
"#;

/// The version marked current, if any.
pub async fn get_current_version<'e, E>(executor: E) -> Result<Option<StoredVersion>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, StoredVersion>(&format!("{} WHERE is_current LIMIT 1", SELECT_VERSION))
        .fetch_optional(executor)
        .await
}

/// Every published version. Ordering is by release time; callers that need
/// semantic ordering sort themselves.
pub async fn list_versions<'e, E>(executor: E) -> Result<Vec<StoredVersion>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, StoredVersion>(&format!("{} ORDER BY released_at", SELECT_VERSION))
        .fetch_all(executor)
        .await
}

/// Insert `version` as the current version, demoting the previous one.
pub async fn insert_current_version(
    conn: &mut sqlx::PgConnection,
    version: &StoredVersion,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE dataset_versions SET is_current = FALSE WHERE is_current")
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO dataset_versions (
            version, change_count, record_count, checksum, changelog, released_at, is_current
        )
        VALUES ($1, $2, $3, $4, $5, $6, TRUE)
        "#,
    )
    .bind(&version.version)
    .bind(version.change_count)
    .bind(version.record_count)
    .bind(&version.checksum)
    .bind(Json(&version.changelog))
    .bind(version.released_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Insert `version` as current only if no version exists yet.
///
/// Returns whether a row was inserted.
pub async fn seed_initial_version<'e, E>(
    executor: E,
    version: &StoredVersion,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO dataset_versions (
            version, change_count, record_count, checksum, changelog, released_at, is_current
        )
        SELECT $1, $2, $3, $4, $5, $6, TRUE
        WHERE NOT EXISTS (SELECT 1 FROM dataset_versions WHERE is_current)
        ON CONFLICT (version) DO NOTHING
        "#,
    )
    .bind(&version.version)
    .bind(version.change_count)
    .bind(version.record_count)
    .bind(&version.checksum)
    .bind(Json(&version.changelog))
    .bind(version.released_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}
