use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::instrument;

use super::tiers::{features_for, Feature, Tier};
use super::usage::{user_tier, Counter};
use crate::{auth::extractors::AuthUser, error::ApiError, state::AppState};

#[derive(Debug, Serialize)]
pub struct CounterUsage {
    pub counter: Counter,
    pub period: String,
    pub used: i64,
    /// `null` means unlimited.
    pub limit: Option<i64>,
    pub remaining: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub tier: Tier,
    pub features: Vec<Feature>,
    pub meals: CounterUsage,
    pub vision_scans: CounterUsage,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/usage", get(get_usage))
}

#[instrument(skip(state))]
pub async fn get_usage(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UsageResponse>, ApiError> {
    let tier = user_tier(state.usage.as_ref(), user_id).await?;
    let limits = state.usage.limits(tier).await?;
    let now = OffsetDateTime::now_utc();

    let mut usage = Vec::with_capacity(2);
    for counter in [Counter::MealsRequested, Counter::VisionScans] {
        let period = counter.period_key(now);
        let used = state.usage.get_count(user_id, counter, &period).await?;
        let limit = counter.limit(limits);
        usage.push(CounterUsage {
            counter,
            period,
            used,
            limit,
            remaining: limit.map(|l| (l - used).max(0)),
        });
    }
    let vision_scans = usage.pop().ok_or_else(|| anyhow::anyhow!("missing usage"))?;
    let meals = usage.pop().ok_or_else(|| anyhow::anyhow!("missing usage"))?;

    Ok(Json(UsageResponse {
        tier,
        features: features_for(tier),
        meals,
        vision_scans,
    }))
}
