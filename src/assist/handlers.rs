use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use serde_json::json;
use tracing::{info, instrument};

use super::types::{audio_ext_from_mime, LiveAssistReply, LiveAssistRequest, TranscriptResponse};
use crate::{
    ai::{parse, schemas},
    analytics::AnalyticsEvent,
    auth::extractors::AuthUser,
    error::ApiError,
    gating::{usage, Feature},
    settings,
    state::AppState,
};

const ASSIST_BODY_LIMIT: usize = 10 * 1024 * 1024; // 10MB
const AUDIO_BODY_LIMIT: usize = 25 * 1024 * 1024; // 25MB, provider upload cap

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/live-assist",
            post(live_assist).layer(DefaultBodyLimit::max(ASSIST_BODY_LIMIT)),
        )
        .route(
            "/transcribe-audio",
            post(transcribe_audio).layer(DefaultBodyLimit::max(AUDIO_BODY_LIMIT)),
        )
}

#[instrument(skip(state, req))]
pub async fn live_assist(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(mut req): Json<LiveAssistRequest>,
) -> Result<Json<LiveAssistReply>, ApiError> {
    req.normalize().map_err(ApiError::Validation)?;
    let tier = usage::enforce(state.usage.as_ref(), user_id, Feature::LiveAssist, None).await?;
    let settings = settings::repo::load(&state.db).await?;

    let system = settings.live_assist_system_prompt.clone();
    let value = match req.frame.clone() {
        Some(frame) => {
            state
                .ai
                .vision_json(
                    system,
                    req.prompt(),
                    vec![frame],
                    schemas::LIVE_ASSIST,
                    schemas::live_assist_schema(),
                )
                .await?
        }
        None => {
            state
                .ai
                .chat_json(system, req.prompt(), schemas::LIVE_ASSIST, schemas::live_assist_schema())
                .await?
        }
    };
    let reply = parse::from_value::<LiveAssistReply>(value)?.tidy();
    if reply.reply.is_empty() {
        return Err(ApiError::upstream("openai", "empty assist reply"));
    }

    if settings.airtable_enabled {
        state.analytics.log(AnalyticsEvent::new(
            "live_assist",
            user_id,
            tier,
            json!({ "with_frame": req.frame.is_some(), "history": req.history.len() }),
        ));
    }
    Ok(Json(reply))
}

/// POST /transcribe-audio (multipart)
/// Field: audio (one recording).
#[instrument(skip(state, mp))]
pub async fn transcribe_audio(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> Result<Json<TranscriptResponse>, ApiError> {
    usage::enforce(state.usage.as_ref(), user_id, Feature::AudioTranscription, None).await?;

    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("invalid multipart body: {}", e)))?
    {
        if field.name() != Some("audio") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".into());
        let ext = audio_ext_from_mime(&content_type).ok_or_else(|| {
            ApiError::Validation(format!("unsupported audio type {}", content_type))
        })?;
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(format!("failed to read audio: {}", e)))?;
        if data.is_empty() {
            return Err(ApiError::validation("audio must not be empty"));
        }

        let bytes = data.len();
        let text = state
            .ai
            .transcribe(data, &format!("recording.{}", ext), &content_type)
            .await?;
        info!(%user_id, bytes, chars = text.len(), "audio transcribed");
        return Ok(Json(TranscriptResponse { text }));
    }
    Err(ApiError::validation("audio is required"))
}
