use serde::Serialize;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::store::UsageStore;
use super::tiers::{Feature, Tier, TierLimits};
use crate::error::ApiError;

/// Usage counters that carry a quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Counter {
    /// Reset every ISO week.
    MealsRequested,
    /// Reset every calendar month.
    VisionScans,
}

impl Counter {
    pub fn as_str(self) -> &'static str {
        match self {
            Counter::MealsRequested => "meals_requested",
            Counter::VisionScans => "vision_scans",
        }
    }

    pub fn period_key(self, now: OffsetDateTime) -> String {
        match self {
            Counter::MealsRequested => {
                let (year, week, _) = now.to_iso_week_date();
                format!("{}-W{:02}", year, week)
            }
            Counter::VisionScans => format!("{}-{:02}", now.year(), u8::from(now.month())),
        }
    }

    pub fn limit(self, limits: TierLimits) -> Option<i64> {
        match self {
            Counter::MealsRequested => limits.meals_per_week,
            Counter::VisionScans => limits.vision_scans_per_month,
        }
    }
}

pub fn ensure_feature(tier: Tier, feature: Feature) -> Result<(), ApiError> {
    if feature.allows(tier) {
        Ok(())
    } else {
        Err(ApiError::FeatureNotAvailable {
            feature: feature.as_str().to_string(),
            tier: tier.to_string(),
        })
    }
}

pub fn check_quota(counter: Counter, used: i64, limit: Option<i64>) -> Result<(), ApiError> {
    match limit {
        Some(limit) if used >= limit => Err(ApiError::QuotaExceeded {
            counter: counter.as_str().to_string(),
            used,
            limit,
        }),
        _ => Ok(()),
    }
}

/// Tier of a user; unknown users are rejected as unauthorized.
pub async fn user_tier(store: &dyn UsageStore, user_id: Uuid) -> Result<Tier, ApiError> {
    store
        .tier(user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))
}

/// Checks feature access and, when `quota` is set, that the current period
/// still has room. The caller records usage only after the work succeeded.
///
/// Check and increment are separate statements; two concurrent requests can
/// both pass the check.
pub async fn enforce(
    store: &dyn UsageStore,
    user_id: Uuid,
    feature: Feature,
    quota: Option<Counter>,
) -> Result<Tier, ApiError> {
    let tier = user_tier(store, user_id).await?;
    if let Err(e) = ensure_feature(tier, feature) {
        warn!(%user_id, %tier, feature = feature.as_str(), "feature not available");
        return Err(e);
    }

    if let Some(counter) = quota {
        let limits = store.limits(tier).await?;
        let period = counter.period_key(OffsetDateTime::now_utc());
        let used = store.get_count(user_id, counter, &period).await?;
        let limit = counter.limit(limits);
        if let Err(e) = check_quota(counter, used, limit) {
            warn!(%user_id, %tier, counter = counter.as_str(), used, ?limit, "quota exceeded");
            return Err(e);
        }
    }
    Ok(tier)
}

pub async fn record(store: &dyn UsageStore, user_id: Uuid, counter: Counter) -> Result<i64, ApiError> {
    let period = counter.period_key(OffsetDateTime::now_utc());
    let count = store.increment(user_id, counter, &period).await?;
    info!(%user_id, counter = counter.as_str(), %period, count, "usage recorded");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gating::store::MemoryUsageStore;
    use crate::gating::tiers::TierLimitTable;
    use time::macros::datetime;

    #[test]
    fn weekly_and_monthly_period_keys() {
        let now = datetime!(2026-01-01 10:00 UTC);
        // 2026-01-01 is a Thursday, so it belongs to ISO week 1 of 2026.
        assert_eq!(Counter::MealsRequested.period_key(now), "2026-W01");
        assert_eq!(Counter::VisionScans.period_key(now), "2026-01");

        let late_dec = datetime!(2024-12-30 08:00 UTC);
        assert_eq!(Counter::MealsRequested.period_key(late_dec), "2025-W01");
        assert_eq!(Counter::VisionScans.period_key(late_dec), "2024-12");
    }

    #[test]
    fn free_user_second_meal_request_in_week_is_rejected() {
        let limits = TierLimitTable::default().for_tier(Tier::Free);
        let limit = Counter::MealsRequested.limit(limits);
        assert_eq!(limit, Some(1));

        assert!(check_quota(Counter::MealsRequested, 0, limit).is_ok());
        let err = check_quota(Counter::MealsRequested, 1, limit).unwrap_err();
        assert!(matches!(err, ApiError::QuotaExceeded { used: 1, limit: 1, .. }));
    }

    #[tokio::test]
    async fn enforce_rejects_once_the_period_is_used_up() {
        let user = Uuid::new_v4();
        let store = MemoryUsageStore::with_user(user, Tier::Basic);
        let period = Counter::VisionScans.period_key(OffsetDateTime::now_utc());

        for n in 1..=10 {
            enforce(&store, user, Feature::VisionScan, Some(Counter::VisionScans))
                .await
                .unwrap();
            assert_eq!(record(&store, user, Counter::VisionScans).await.unwrap(), n);
        }
        let err = enforce(&store, user, Feature::VisionScan, Some(Counter::VisionScans))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::QuotaExceeded { used: 10, limit: 10, .. }));
        assert_eq!(store.count(user, Counter::VisionScans, &period), 10);
    }

    #[tokio::test]
    async fn enforce_checks_feature_before_quota_and_unknown_users() {
        let user = Uuid::new_v4();
        let store = MemoryUsageStore::with_user(user, Tier::Free);
        let err = enforce(&store, user, Feature::VisionScan, Some(Counter::VisionScans))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::FeatureNotAvailable { .. }));

        let err = enforce(&store, Uuid::new_v4(), Feature::MealGeneration, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn unlimited_quota_never_rejects() {
        let limits = TierLimitTable::default().for_tier(Tier::Pro);
        let limit = Counter::MealsRequested.limit(limits);
        assert!(limit.is_none());
        assert!(check_quota(Counter::MealsRequested, 10_000, limit).is_ok());
    }

    #[test]
    fn zero_limit_blocks_first_use() {
        assert!(check_quota(Counter::VisionScans, 0, Some(0)).is_err());
    }

    #[test]
    fn ensure_feature_reports_tier() {
        let err = ensure_feature(Tier::Basic, Feature::LiveAssist).unwrap_err();
        assert_eq!(
            err.to_string(),
            "feature 'live_assist' is not available on the basic tier"
        );
        assert!(ensure_feature(Tier::Pro, Feature::LiveAssist).is_ok());
    }
}
