//! Household profile: size, diet, skill, budget, members.

pub mod handlers;
pub mod repo;
pub mod types;

use crate::state::AppState;
use axum::Router;

pub use types::Profile;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
