//! Admin-managed options: prompts, perishability rules, tier limit overrides.

pub mod handlers;
pub mod repo;
pub mod types;

use crate::state::AppState;
use axum::Router;

pub use types::AppSettings;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
