//! Public health and diagnostic endpoints.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::{instrument, warn};

use crate::{db, state::AppState};

#[derive(Debug, Serialize)]
pub struct Diagnostic {
    pub service: &'static str,
    pub version: &'static str,
    pub database: bool,
    pub openai_configured: bool,
    pub airtable_configured: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/diagnostic", get(diagnostic))
}

/// Reports reachability and which providers are configured; never fails.
#[instrument(skip(state))]
pub async fn diagnostic(State(state): State<AppState>) -> Json<Diagnostic> {
    let database = match db::ping(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "diagnostic: database unreachable");
            false
        }
    };
    Json(Diagnostic {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        database,
        openai_configured: state.ai.is_configured(),
        airtable_configured: state.analytics.is_configured(),
    })
}
