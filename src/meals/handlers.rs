use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use serde_json::json;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    prompt::{build_meal_prompt, excluded_keys},
    repo,
    types::{GenerateMealsRequest, MealPlan, MealRating, RateMealRequest},
};
use crate::{
    ai::{parse, schemas},
    analytics::AnalyticsEvent,
    auth::extractors::AuthUser,
    error::ApiError,
    gating::{usage, Counter, Feature},
    inventory, profile, settings,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/meals", post(generate_meals))
        .route("/rate-meal", post(rate_meal))
}

#[derive(Debug, Serialize)]
pub struct GenerateMealsResponse {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(flatten)]
    pub plan: MealPlan,
    pub meals_used: i64,
}

#[instrument(skip(state, req))]
pub async fn generate_meals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(mut req): Json<GenerateMealsRequest>,
) -> Result<Json<GenerateMealsResponse>, ApiError> {
    req.validate().map_err(ApiError::Validation)?;

    let tier = usage::enforce(
        state.usage.as_ref(),
        user_id,
        Feature::MealGeneration,
        Some(Counter::MealsRequested),
    )
    .await?;

    let settings = settings::repo::load(&state.db).await?;
    let profile = profile::repo::load(&state.db, user_id).await?;
    let mut pantry = inventory::repo::load(&state.db, user_id).await?;
    inventory::perishability::fill_perishability(&mut pantry, &settings.perishability_rules);
    inventory::perishability::refresh_statuses(&mut pantry, OffsetDateTime::now_utc());
    let ratings = repo::list_ratings(&state.db, user_id).await?;

    let prompt = build_meal_prompt(&profile, &pantry, &ratings, &req);
    let value = state
        .ai
        .chat_json(
            settings.meal_system_prompt.clone(),
            prompt,
            schemas::MEAL_PLAN,
            schemas::meal_plan_schema(),
        )
        .await?;
    let mut plan: MealPlan = parse::from_value(value)?;

    let generated = plan.meals.len();
    plan.retain_allowed(&excluded_keys(&ratings));
    if plan.meals.len() < generated {
        warn!(%user_id, dropped = generated - plan.meals.len(), "model suggested excluded meals");
    }

    let request_json = serde_json::to_value(&req).map_err(anyhow::Error::from)?;
    let plan_json = serde_json::to_value(&plan).map_err(anyhow::Error::from)?;
    let (id, created_at) = repo::insert_history(&state.db, user_id, &request_json, &plan_json).await?;
    let meals_used =
        usage::record(state.usage.as_ref(), user_id, Counter::MealsRequested).await?;

    if settings.airtable_enabled {
        state.analytics.log(AnalyticsEvent::new(
            "meal_generation",
            user_id,
            tier,
            json!({ "meals": plan.meals.len(), "pantry_items": pantry.len() }),
        ));
    }

    info!(%user_id, %id, meals = plan.meals.len(), "meal plan generated");
    Ok(Json(GenerateMealsResponse {
        id,
        created_at,
        plan,
        meals_used,
    }))
}

#[instrument(skip(state, payload))]
pub async fn rate_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<RateMealRequest>,
) -> Result<Json<MealRating>, ApiError> {
    let key = payload.validate().map_err(ApiError::Validation)?;
    usage::enforce(state.usage.as_ref(), user_id, Feature::MealRating, None).await?;

    let rating = repo::upsert_rating(
        &state.db,
        user_id,
        &key,
        payload.meal_name.trim(),
        payload.stars,
        payload.preference,
    )
    .await?;
    info!(%user_id, meal_key = %key, stars = payload.stars, preference = payload.preference.as_str(), "meal rated");
    Ok(Json(rating))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        app::build_app,
        auth::jwt::JwtKeys,
        gating::{store::MemoryUsageStore, Tier},
    };
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn request_meals(state: AppState, user_id: Uuid) -> axum::response::Response {
        let token = JwtKeys::from_config(&state.config.jwt)
            .sign_access(user_id)
            .unwrap();
        build_app(state)
            .oneshot(
                Request::post("/api/v1/meals")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"count": 3}"#))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn free_user_second_meal_request_in_week_gets_429() {
        let user = Uuid::new_v4();
        let store = Arc::new(MemoryUsageStore::with_user(user, Tier::Free));
        let mut state = AppState::fake();
        state.usage = store.clone();

        // The first request passes the gate; the unreachable database fails it
        // afterwards, so nothing is recorded.
        let first = request_meals(state.clone(), user).await;
        assert_ne!(first.status(), StatusCode::TOO_MANY_REQUESTS);
        let period = Counter::MealsRequested.period_key(OffsetDateTime::now_utc());
        assert_eq!(store.count(user, Counter::MealsRequested, &period), 0);

        usage::record(store.as_ref(), user, Counter::MealsRequested)
            .await
            .unwrap();

        let second = request_meals(state, user).await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        let bytes = second.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "quota_exceeded");
        assert_eq!(store.count(user, Counter::MealsRequested, &period), 1);
    }

    #[tokio::test]
    async fn unknown_user_cannot_request_meals() {
        let res = request_meals(AppState::fake(), Uuid::new_v4()).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
