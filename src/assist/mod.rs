//! Hands-free cooking help: live assist and audio transcription.

pub mod handlers;
pub mod types;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
