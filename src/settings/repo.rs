use anyhow::Context;
use sqlx::PgPool;
use tracing::warn;

use super::types::AppSettings;

/// Loads the settings document, falling back to defaults when none is stored
/// or the stored one no longer deserializes.
pub async fn load(db: &PgPool) -> anyhow::Result<AppSettings> {
    let row: Option<(serde_json::Value,)> =
        sqlx::query_as(r#"SELECT value FROM app_settings WHERE id = 1"#)
            .fetch_optional(db)
            .await
            .context("select app_settings")?;

    Ok(match row {
        Some((value,)) => serde_json::from_value(value).unwrap_or_else(|e| {
            warn!(error = %e, "stored settings are invalid; using defaults");
            AppSettings::default()
        }),
        None => AppSettings::default(),
    })
}

pub async fn save(db: &PgPool, settings: &AppSettings) -> anyhow::Result<()> {
    let value = serde_json::to_value(settings).context("serialize settings")?;
    sqlx::query(
        r#"
        INSERT INTO app_settings (id, value)
        VALUES (1, $1)
        ON CONFLICT (id) DO UPDATE SET value = EXCLUDED.value, updated_at = now()
        "#,
    )
    .bind(value)
    .execute(db)
    .await
    .context("upsert app_settings")?;
    Ok(())
}
