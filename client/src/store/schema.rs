//! Versioned schema of the local store.
//!
//! The applied schema version lives in `PRAGMA user_version`. Migrations
//! only ever add tables and indexes, so upgrading an existing database keeps
//! every stored record.

use sqlx::SqlitePool;

/// One step of schema evolution.
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub statements: &'static [&'static str],
}

/// All migrations, in the order they are applied.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "fault records",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS fault_records (
                id TEXT PRIMARY KEY NOT NULL,
                payload TEXT NOT NULL,
                content_checksum TEXT NOT NULL,
                brand TEXT,
                model TEXT,
                category TEXT,
                severity TEXT,
                code TEXT,
                updated_at TEXT NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_fault_records_brand ON fault_records(brand)",
            "CREATE INDEX IF NOT EXISTS idx_fault_records_model ON fault_records(model)",
            "CREATE INDEX IF NOT EXISTS idx_fault_records_category ON fault_records(category)",
            "CREATE INDEX IF NOT EXISTS idx_fault_records_severity ON fault_records(severity)",
        ],
    },
    Migration {
        version: 2,
        description: "sync support",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS dataset_versions (
                version TEXT PRIMARY KEY NOT NULL,
                record_count INTEGER NOT NULL DEFAULT 0,
                checksum TEXT NOT NULL,
                released_at TEXT NOT NULL,
                is_current INTEGER NOT NULL DEFAULT 0,
                changelog TEXT NOT NULL DEFAULT '[]'
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_dataset_versions_released_at ON dataset_versions(released_at)",
            "CREATE INDEX IF NOT EXISTS idx_dataset_versions_is_current ON dataset_versions(is_current)",
        ],
    },
    Migration {
        version: 3,
        description: "fault code index",
        statements: &["CREATE INDEX IF NOT EXISTS idx_fault_records_code ON fault_records(code)"],
    },
];

/// Latest schema version this build knows about.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Read the schema version of an open database.
pub async fn current_version(pool: &SqlitePool) -> Result<u32, sqlx::Error> {
    let version: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await?;
    Ok(version as u32)
}

/// Apply every migration newer than the database's schema version.
///
/// Each migration runs in its own transaction together with the
/// `user_version` bump, so a failed upgrade leaves the previous schema
/// intact. Migrations are applied up to `target`.
pub async fn migrate_to(pool: &SqlitePool, target: u32) -> Result<u32, sqlx::Error> {
    let start = current_version(pool).await?;
    let mut version = start;

    for migration in MIGRATIONS
        .iter()
        .filter(|m| m.version > start && m.version <= target)
    {
        tracing::info!(
            from = version,
            to = migration.version,
            description = migration.description,
            "Applying local store migration"
        );

        let mut tx = pool.begin().await?;
        for statement in migration.statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        let bump = format!("PRAGMA user_version = {}", migration.version);
        sqlx::query(&bump).execute(&mut *tx).await?;
        tx.commit().await?;

        version = migration.version;
    }

    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_strictly_increasing() {
        let versions: Vec<u32> = MIGRATIONS.iter().map(|m| m.version).collect();
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(versions.first(), Some(&1));
        assert_eq!(latest_version(), 3);
    }

    #[test]
    fn migrations_are_additive() {
        for migration in MIGRATIONS {
            for statement in migration.statements {
                let upper = statement.to_uppercase();
                assert!(!upper.contains("DROP "), "v{} drops", migration.version);
                assert!(upper.contains("IF NOT EXISTS"), "v{} not idempotent", migration.version);
            }
        }
    }
}
