use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connect to database")
}

/// Reads a JSON blob stored under `key` for a user.
pub async fn get_user_meta<T: DeserializeOwned>(
    db: &PgPool,
    user_id: Uuid,
    key: &str,
) -> anyhow::Result<Option<T>> {
    let row: Option<(serde_json::Value,)> = sqlx::query_as(
        r#"
        SELECT meta_value
          FROM user_meta
         WHERE user_id = $1 AND meta_key = $2
        "#,
    )
    .bind(user_id)
    .bind(key)
    .fetch_optional(db)
    .await
    .with_context(|| format!("select user_meta {}", key))?;

    row.map(|(v,)| serde_json::from_value(v).with_context(|| format!("decode user_meta {}", key)))
        .transpose()
}

/// Overwrites the JSON blob stored under `key`. Last write wins.
pub async fn put_user_meta<T: Serialize>(
    db: &PgPool,
    user_id: Uuid,
    key: &str,
    value: &T,
) -> anyhow::Result<()> {
    let json = serde_json::to_value(value).context("serialize user_meta")?;
    sqlx::query(
        r#"
        INSERT INTO user_meta (user_id, meta_key, meta_value)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, meta_key)
        DO UPDATE SET meta_value = EXCLUDED.meta_value, updated_at = now()
        "#,
    )
    .bind(user_id)
    .bind(key)
    .bind(json)
    .execute(db)
    .await
    .with_context(|| format!("upsert user_meta {}", key))?;
    Ok(())
}

pub async fn ping(db: &PgPool) -> anyhow::Result<()> {
    sqlx::query("SELECT 1").execute(db).await.context("ping database")?;
    Ok(())
}
