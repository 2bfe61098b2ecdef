use sqlx::PgPool;
use uuid::Uuid;

use super::types::InventoryItem;
use crate::db;

pub const INVENTORY_META_KEY: &str = "kitcheniq_inventory";

pub async fn load(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<InventoryItem>> {
    Ok(db::get_user_meta(db, user_id, INVENTORY_META_KEY)
        .await?
        .unwrap_or_default())
}

pub async fn save(db: &PgPool, user_id: Uuid, items: &[InventoryItem]) -> anyhow::Result<()> {
    db::put_user_meta(db, user_id, INVENTORY_META_KEY, &items).await
}
