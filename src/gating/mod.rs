//! Tier-based feature gating and usage quotas.

pub mod handlers;
mod repo;
pub mod store;
pub mod tiers;
pub mod usage;

use crate::state::AppState;
use axum::Router;

pub use store::{PgUsageStore, UsageStore};
pub use tiers::{Feature, Tier};
pub use usage::Counter;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
