use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo;
use super::tiers::{Tier, TierLimits};
use super::usage::Counter;
use crate::auth::repo::User;
use crate::settings;

/// Where tiers, limits and usage counters are read from and written to.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// `None` when the user does not exist.
    async fn tier(&self, user_id: Uuid) -> anyhow::Result<Option<Tier>>;
    async fn limits(&self, tier: Tier) -> anyhow::Result<TierLimits>;
    async fn get_count(&self, user_id: Uuid, counter: Counter, period: &str) -> anyhow::Result<i64>;
    /// Bumps a counter and returns the new value.
    async fn increment(&self, user_id: Uuid, counter: Counter, period: &str) -> anyhow::Result<i64>;
}

#[derive(Clone)]
pub struct PgUsageStore {
    db: PgPool,
}

impl PgUsageStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UsageStore for PgUsageStore {
    async fn tier(&self, user_id: Uuid) -> anyhow::Result<Option<Tier>> {
        Ok(User::find_by_id(&self.db, user_id).await?.map(|u| u.tier()))
    }

    async fn limits(&self, tier: Tier) -> anyhow::Result<TierLimits> {
        Ok(settings::repo::load(&self.db).await?.tier_limits.for_tier(tier))
    }

    async fn get_count(&self, user_id: Uuid, counter: Counter, period: &str) -> anyhow::Result<i64> {
        repo::get_count(&self.db, user_id, counter.as_str(), period).await
    }

    async fn increment(&self, user_id: Uuid, counter: Counter, period: &str) -> anyhow::Result<i64> {
        repo::increment(&self.db, user_id, counter.as_str(), period).await
    }
}

/// In-memory store for handler tests. Limits are the default table.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryUsageStore {
    pub tiers: std::sync::Mutex<std::collections::HashMap<Uuid, Tier>>,
    pub counts: std::sync::Mutex<std::collections::HashMap<(Uuid, &'static str, String), i64>>,
}

#[cfg(test)]
impl MemoryUsageStore {
    pub fn with_user(user_id: Uuid, tier: Tier) -> Self {
        let store = Self::default();
        store.tiers.lock().unwrap().insert(user_id, tier);
        store
    }

    pub fn count(&self, user_id: Uuid, counter: Counter, period: &str) -> i64 {
        self.counts
            .lock()
            .unwrap()
            .get(&(user_id, counter.as_str(), period.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn tier(&self, user_id: Uuid) -> anyhow::Result<Option<Tier>> {
        Ok(self.tiers.lock().unwrap().get(&user_id).copied())
    }

    async fn limits(&self, tier: Tier) -> anyhow::Result<TierLimits> {
        Ok(super::tiers::TierLimitTable::default().for_tier(tier))
    }

    async fn get_count(&self, user_id: Uuid, counter: Counter, period: &str) -> anyhow::Result<i64> {
        Ok(self.count(user_id, counter, period))
    }

    async fn increment(&self, user_id: Uuid, counter: Counter, period: &str) -> anyhow::Result<i64> {
        let mut counts = self.counts.lock().unwrap();
        let count = counts
            .entry((user_id, counter.as_str(), period.to_string()))
            .or_insert(0);
        *count += 1;
        Ok(*count)
    }
}
