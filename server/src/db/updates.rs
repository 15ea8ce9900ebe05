//! Database operations for the fault_updates change log.

use sqlx::postgres::PgRow;
use sqlx::{Executor, Postgres, Row};

/// What a logged change did to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateAction {
    Upsert,
    Remove,
}

impl UpdateAction {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateAction::Upsert => "upsert",
            UpdateAction::Remove => "remove",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upsert" => Some(UpdateAction::Upsert),
            "remove" => Some(UpdateAction::Remove),
            _ => None,
        }
    }
}

/// A stored change log row.
#[derive(Debug, Clone)]
pub struct StoredUpdate {
    pub id: i64,
    pub version: String,
    pub fault_id: String,
    pub action: UpdateAction,
    pub payload: Option<serde_json::Value>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for StoredUpdate {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let action: String = row.try_get("action")?;
        Ok(StoredUpdate {
            id: row.try_get("id")?,
            version: row.try_get("version")?,
            fault_id: row.try_get("fault_id")?,
            action: UpdateAction::parse(&action).ok_or_else(|| sqlx::Error::ColumnDecode {
                index: "action".to_string(),
                source: format!("unknown update action: {}", action).into(),
            })?,
            payload: row.try_get("payload")?,
        })
    }
}

/// Append a change to the log.
pub async fn insert_update<'e, E>(
    executor: E,
    version: &str,
    fault_id: &str,
    action: UpdateAction,
    payload: Option<&serde_json::Value>,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO fault_updates (version, fault_id, action, payload)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(version)
    .bind(fault_id)
    .bind(action.as_str())
    .bind(payload)
    .execute(executor)
    .await?;

    Ok(())
}

/// Changes logged for any of `versions`, in the order they were made.
pub async fn get_updates_for_versions<'e, E>(
    executor: E,
    versions: &[String],
) -> Result<Vec<StoredUpdate>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, StoredUpdate>(
        r#"
        SELECT id, version, fault_id, action, payload
        FROM fault_updates
        WHERE version = ANY($1)
        ORDER BY id ASC
        "#,
    )
    .bind(versions)
    .fetch_all(executor)
    .await
}
