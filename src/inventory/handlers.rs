use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    normalize::merge_items,
    perishability::{fill_perishability, refresh_statuses},
    repo,
    scan::{self, MAX_SCAN_IMAGES},
    types::{InventoryItem, RawItem},
};
use crate::{
    analytics::AnalyticsEvent,
    auth::extractors::AuthUser,
    error::ApiError,
    gating::{usage, Counter, Feature},
    lookup::openfoodfacts::Product,
    settings::{self, AppSettings},
    state::AppState,
    storage::{ext_from_mime, scan_frame_key, StorageClient},
};

const SCAN_BODY_LIMIT: usize = 20 * 1024 * 1024; // 20MB
const VIDEO_BODY_LIMIT: usize = 40 * 1024 * 1024; // 40MB

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/inventory", get(get_inventory).post(save_inventory))
        .route("/inventory-confirm", post(confirm_inventory))
        .route("/inventory-code", post(lookup_code))
        .route(
            "/inventory-scan",
            post(scan_images).layer(DefaultBodyLimit::max(SCAN_BODY_LIMIT)),
        )
        .route(
            "/inventory-scan-video",
            post(scan_video_frames).layer(DefaultBodyLimit::max(VIDEO_BODY_LIMIT)),
        )
}

// --- dto ---

#[derive(Debug, Serialize)]
pub struct InventoryResponse {
    pub items: Vec<InventoryItem>,
}

#[derive(Debug, Deserialize)]
pub struct SaveInventoryRequest {
    pub items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub items: Vec<RawItem>,
    /// Replace the stored inventory instead of merging into it.
    #[serde(default)]
    pub replace: bool,
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub images: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub scan_id: Uuid,
    pub items: Vec<InventoryItem>,
    pub scans_used: i64,
}

#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    pub barcode: String,
}

#[derive(Debug, Serialize)]
pub struct CodeResponse {
    pub barcode: String,
    pub product: Product,
    pub item: InventoryItem,
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn get_inventory(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<InventoryResponse>, ApiError> {
    let settings = settings::repo::load(&state.db).await?;
    let mut items = repo::load(&state.db, user_id).await?;
    fill_perishability(&mut items, &settings.perishability_rules);
    refresh_statuses(&mut items, OffsetDateTime::now_utc());
    Ok(Json(InventoryResponse { items }))
}

/// Overwrites the stored inventory with the normalized request list.
#[instrument(skip(state, payload))]
pub async fn save_inventory(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<SaveInventoryRequest>,
) -> Result<Json<InventoryResponse>, ApiError> {
    let settings = settings::repo::load(&state.db).await?;
    let items = normalize_for_storage(&settings, payload.items);
    repo::save(&state.db, user_id, &items).await?;
    info!(%user_id, items = items.len(), "inventory saved");
    Ok(Json(InventoryResponse { items }))
}

/// Merges reviewed scan results into the stored inventory.
#[instrument(skip(state, payload))]
pub async fn confirm_inventory(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ConfirmRequest>,
) -> Result<Json<InventoryResponse>, ApiError> {
    if payload.items.is_empty() && !payload.replace {
        return Err(ApiError::validation("items must be non-empty"));
    }

    let incoming = payload.items.len();
    let combined: Vec<RawItem> = if payload.replace {
        payload.items
    } else {
        let existing = repo::load(&state.db, user_id).await?;
        existing
            .into_iter()
            .map(RawItem::from)
            .chain(payload.items)
            .collect()
    };

    let settings = settings::repo::load(&state.db).await?;
    let items = normalize_for_storage(&settings, combined);
    repo::save(&state.db, user_id, &items).await?;
    info!(%user_id, incoming, total = items.len(), replace = payload.replace, "inventory confirmed");
    Ok(Json(InventoryResponse { items }))
}

#[instrument(skip(state, payload))]
pub async fn scan_images(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, ApiError> {
    scan::validate_image_refs(&payload.images)?;
    let tier = usage::enforce(
        state.usage.as_ref(),
        user_id,
        Feature::VisionScan,
        Some(Counter::VisionScans),
    )
    .await?;
    let settings = settings::repo::load(&state.db).await?;

    let image_count = payload.images.len();
    let items = scan::extract_items(
        state.ai.as_ref(),
        &settings,
        payload.images,
        OffsetDateTime::now_utc(),
    )
    .await?;
    let scans_used = usage::record(state.usage.as_ref(), user_id, Counter::VisionScans).await?;

    if settings.airtable_enabled {
        state.analytics.log(AnalyticsEvent::new(
            "vision_scan",
            user_id,
            tier,
            json!({ "images": image_count, "items": items.len() }),
        ));
    }

    Ok(Json(ScanResponse {
        scan_id: Uuid::new_v4(),
        items,
        scans_used,
    }))
}

/// POST /inventory-scan-video (multipart)
/// Field: frames / frames[] (still images pulled from the video by the client).
#[instrument(skip(state, mp))]
pub async fn scan_video_frames(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> Result<Json<ScanResponse>, ApiError> {
    let tier = usage::enforce(
        state.usage.as_ref(),
        user_id,
        Feature::VideoScan,
        Some(Counter::VisionScans),
    )
    .await?;

    let frames = read_frames(&mut mp, user_id).await?;
    let scan_id = Uuid::new_v4();
    let keys = upload_frames(state.storage.as_ref(), user_id, scan_id, frames).await?;

    let mut urls = Vec::with_capacity(keys.len());
    for key in &keys {
        urls.push(
            state
                .storage
                .presign_get(key, state.config.storage.presign_ttl_secs)
                .await?,
        );
    }

    let settings = settings::repo::load(&state.db).await?;
    let items = scan::extract_items(state.ai.as_ref(), &settings, urls, OffsetDateTime::now_utc()).await?;
    let scans_used = usage::record(state.usage.as_ref(), user_id, Counter::VisionScans).await?;

    if settings.airtable_enabled {
        state.analytics.log(AnalyticsEvent::new(
            "video_scan",
            user_id,
            tier,
            json!({ "frames": keys.len(), "items": items.len() }),
        ));
    }

    info!(%user_id, %scan_id, frames = keys.len(), items = items.len(), "video scan done");
    Ok(Json(ScanResponse {
        scan_id,
        items,
        scans_used,
    }))
}

#[instrument(skip(state, payload))]
pub async fn lookup_code(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CodeRequest>,
) -> Result<Json<CodeResponse>, ApiError> {
    let tier = usage::enforce(state.usage.as_ref(), user_id, Feature::BarcodeLookup, None).await?;
    let product = state.foodfacts.product(&payload.barcode).await?;
    let raw = product
        .to_raw_item()
        .ok_or_else(|| ApiError::NotFound("product has no usable name".into()))?;

    let settings = settings::repo::load(&state.db).await?;
    let item = normalize_for_storage(&settings, vec![raw])
        .pop()
        .ok_or_else(|| ApiError::NotFound("product has no usable name".into()))?;

    if settings.airtable_enabled {
        state.analytics.log(AnalyticsEvent::new(
            "barcode_lookup",
            user_id,
            tier,
            json!({ "barcode": payload.barcode.trim(), "name": item.name }),
        ));
    }

    Ok(Json(CodeResponse {
        barcode: payload.barcode.trim().to_string(),
        product,
        item,
    }))
}

struct Frame {
    content_type: String,
    data: Bytes,
}

/// Reads every `frames` field. Limit and type errors surface before anything
/// reaches storage.
async fn read_frames(mp: &mut Multipart, user_id: Uuid) -> Result<Vec<Frame>, ApiError> {
    let mut frames = Vec::new();
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("invalid multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        if !matches!(name.as_deref(), Some("frames") | Some("frames[]")) {
            continue;
        }
        if frames.len() == MAX_SCAN_IMAGES {
            return Err(ApiError::Validation(format!(
                "at most {} frames per scan",
                MAX_SCAN_IMAGES
            )));
        }
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".into());
        if ext_from_mime(&content_type).is_none() {
            warn!(%user_id, %content_type, "unsupported frame type");
            return Err(ApiError::Validation(format!(
                "unsupported frame type {}",
                content_type
            )));
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(format!("failed to read frame: {}", e)))?;
        frames.push(Frame { content_type, data });
    }
    if frames.is_empty() {
        return Err(ApiError::validation("frames[] is required"));
    }
    Ok(frames)
}

/// Stores the frames under the scan's prefix. If one upload fails, the
/// frames already stored are deleted again.
async fn upload_frames(
    storage: &dyn StorageClient,
    user_id: Uuid,
    scan_id: Uuid,
    frames: Vec<Frame>,
) -> Result<Vec<String>, ApiError> {
    let mut keys: Vec<String> = Vec::with_capacity(frames.len());
    for (i, frame) in frames.into_iter().enumerate() {
        let key = scan_frame_key(user_id, scan_id, i, &frame.content_type);
        if let Err(e) = storage.put_object(&key, frame.data, &frame.content_type).await {
            for stored in &keys {
                if let Err(del) = storage.delete_object(stored).await {
                    warn!(key = %stored, error = %del, "failed to remove frame after upload error");
                }
            }
            return Err(e.into());
        }
        keys.push(key);
    }
    Ok(keys)
}

/// Merge, fill shelf life, then refresh time-derived statuses.
fn normalize_for_storage(settings: &AppSettings, raw: Vec<RawItem>) -> Vec<InventoryItem> {
    let now = OffsetDateTime::now_utc();
    let mut items = merge_items(raw, now);
    fill_perishability(&mut items, &settings.perishability_rules);
    refresh_statuses(&mut items, now);
    items
}
