use sqlx::PgPool;
use uuid::Uuid;

use super::types::Profile;
use crate::db;

pub const PROFILE_META_KEY: &str = "kitcheniq_profile";

/// Stored profile, or the default one for users who never saved.
pub async fn load(db: &PgPool, user_id: Uuid) -> anyhow::Result<Profile> {
    Ok(db::get_user_meta(db, user_id, PROFILE_META_KEY)
        .await?
        .unwrap_or_default())
}

pub async fn save(db: &PgPool, user_id: Uuid, profile: &Profile) -> anyhow::Result<()> {
    db::put_user_meta(db, user_id, PROFILE_META_KEY, profile).await
}
