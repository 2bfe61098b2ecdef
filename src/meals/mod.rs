//! Meal planning: prompt building, generation, history and ratings.

pub mod handlers;
pub mod prompt;
mod repo;
pub mod types;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
