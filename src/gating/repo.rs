use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

/// Current count for one counter and period; zero when no row exists.
pub async fn get_count(
    db: &PgPool,
    user_id: Uuid,
    counter: &str,
    period: &str,
) -> anyhow::Result<i64> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        SELECT count
          FROM usage_counters
         WHERE user_id = $1 AND counter = $2 AND period = $3
        "#,
    )
    .bind(user_id)
    .bind(counter)
    .bind(period)
    .fetch_optional(db)
    .await
    .context("select usage counter")?;

    Ok(row.map(|(c,)| c).unwrap_or(0))
}

/// Bumps a counter and returns the new value.
pub async fn increment(
    db: &PgPool,
    user_id: Uuid,
    counter: &str,
    period: &str,
) -> anyhow::Result<i64> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO usage_counters (user_id, counter, period, count)
        VALUES ($1, $2, $3, 1)
        ON CONFLICT (user_id, counter, period)
        DO UPDATE SET count = usage_counters.count + 1, updated_at = now()
        RETURNING count
        "#,
    )
    .bind(user_id)
    .bind(counter)
    .bind(period)
    .fetch_one(db)
    .await
    .context("increment usage counter")?;

    Ok(count)
}
