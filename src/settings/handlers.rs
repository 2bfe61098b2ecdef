use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::{repo, types::AppSettings};
use crate::{auth::extractors::AdminUser, error::ApiError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/admin/settings", get(get_settings).post(save_settings))
}

#[instrument(skip(state))]
pub async fn get_settings(
    State(state): State<AppState>,
    AdminUser(_admin_id): AdminUser,
) -> Result<Json<AppSettings>, ApiError> {
    Ok(Json(repo::load(&state.db).await?))
}

#[instrument(skip(state, payload))]
pub async fn save_settings(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Json(mut payload): Json<AppSettings>,
) -> Result<Json<AppSettings>, ApiError> {
    payload.validate().map_err(ApiError::Validation)?;
    repo::save(&state.db, &payload).await?;
    info!(%admin_id, rules = payload.perishability_rules.len(), "settings updated");
    Ok(Json(payload))
}
