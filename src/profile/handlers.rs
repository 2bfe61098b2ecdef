use axum::{extract::State, routing::get, Json, Router};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use super::{repo, types::Profile};
use crate::{auth::extractors::AuthUser, error::ApiError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).post(save_profile))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(repo::load(&state.db, user_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn save_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(mut payload): Json<Profile>,
) -> Result<Json<Profile>, ApiError> {
    if let Err(msg) = payload.normalize() {
        warn!(%user_id, %msg, "invalid profile");
        return Err(ApiError::Validation(msg));
    }
    payload.updated_at = Some(OffsetDateTime::now_utc());
    repo::save(&state.db, user_id, &payload).await?;

    info!(
        %user_id,
        household_size = payload.household_size,
        members = payload.members.len(),
        "profile saved"
    );
    Ok(Json(payload))
}
