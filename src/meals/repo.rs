use anyhow::Context;
use serde_json::Value;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::types::{MealRating, Preference};

/// Stores one generated plan together with the request that produced it.
pub async fn insert_history(
    db: &PgPool,
    user_id: Uuid,
    request: &Value,
    plan: &Value,
) -> anyhow::Result<(Uuid, OffsetDateTime)> {
    let row: (Uuid, OffsetDateTime) = sqlx::query_as(
        r#"
        INSERT INTO meal_history (user_id, request, plan)
        VALUES ($1, $2, $3)
        RETURNING id, created_at
        "#,
    )
    .bind(user_id)
    .bind(request)
    .bind(plan)
    .fetch_one(db)
    .await
    .context("insert meal_history")?;
    Ok(row)
}

pub async fn list_ratings(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<MealRating>> {
    let rows = sqlx::query_as::<_, MealRating>(
        r#"
        SELECT user_id, meal_key, meal_name, stars, preference, updated_at
          FROM meal_ratings
         WHERE user_id = $1
         ORDER BY updated_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("select meal_ratings")?;
    Ok(rows)
}

/// One rating per `(user_id, meal_key)`; a new rating replaces the old one.
pub async fn upsert_rating(
    db: &PgPool,
    user_id: Uuid,
    meal_key: &str,
    meal_name: &str,
    stars: i16,
    preference: Preference,
) -> anyhow::Result<MealRating> {
    let row = sqlx::query_as::<_, MealRating>(
        r#"
        INSERT INTO meal_ratings (user_id, meal_key, meal_name, stars, preference)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id, meal_key)
        DO UPDATE SET meal_name = EXCLUDED.meal_name,
                      stars = EXCLUDED.stars,
                      preference = EXCLUDED.preference,
                      updated_at = now()
        RETURNING user_id, meal_key, meal_name, stars, preference, updated_at
        "#,
    )
    .bind(user_id)
    .bind(meal_key)
    .bind(meal_name)
    .bind(stars)
    .bind(preference.as_str())
    .fetch_one(db)
    .await
    .context("upsert meal_ratings")?;
    Ok(row)
}
