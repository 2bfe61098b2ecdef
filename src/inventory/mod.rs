//! Pantry inventory: normalization, perishability, scans and barcode lookup.

pub mod handlers;
pub mod normalize;
pub mod perishability;
pub mod repo;
pub mod scan;
pub mod types;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
