//! Raw key-value access to the `storage` table.
//!
//! Every function is generic over the executor so the same SQL runs against
//! the pool (soft reads) and inside a write unit's transaction.

use chrono::Utc;
use sqlx::{Executor, Sqlite};

pub(crate) async fn read_value<'e, E>(executor: E, key: &str) -> Result<Option<String>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar::<_, String>("SELECT value FROM storage WHERE key = ?1")
        .bind(key)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn write_value<'e, E>(executor: E, key: &str, value: &str) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO storage (key, value, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(Utc::now().to_rfc3339())
    .execute(executor)
    .await?;

    Ok(())
}

/// Removes every key. Used by the factory-reset path.
pub(crate) async fn delete_all<'e, E>(executor: E) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM storage").execute(executor).await?;
    Ok(result.rows_affected())
}
