use serde::Deserialize;
use time::OffsetDateTime;
use tracing::info;

use super::{
    normalize::merge_items,
    perishability::{fill_perishability, refresh_statuses},
    types::{InventoryItem, RawItem},
};
use crate::ai::{parse, schemas, AiClient};
use crate::error::ApiError;
use crate::settings::AppSettings;

/// Images per vision call; frames beyond this are rejected.
pub const MAX_SCAN_IMAGES: usize = 8;

#[derive(Debug, Deserialize)]
struct VisionItems {
    items: Vec<RawItem>,
}

/// Accepts http(s) URLs and base64 image data URIs.
pub fn validate_image_ref(s: &str) -> Result<(), String> {
    let s = s.trim();
    if s.starts_with("https://") || s.starts_with("http://") {
        return Ok(());
    }
    if let Some(rest) = s.strip_prefix("data:image/") {
        if rest.contains(";base64,") {
            return Ok(());
        }
    }
    Err("images must be http(s) URLs or base64 image data URIs".into())
}

pub fn validate_image_refs(images: &[String]) -> Result<(), ApiError> {
    if images.is_empty() {
        return Err(ApiError::validation("at least one image is required"));
    }
    if images.len() > MAX_SCAN_IMAGES {
        return Err(ApiError::Validation(format!(
            "at most {} images per scan",
            MAX_SCAN_IMAGES
        )));
    }
    for img in images {
        validate_image_ref(img).map_err(ApiError::Validation)?;
    }
    Ok(())
}

pub fn vision_prompt(image_count: usize) -> String {
    let mut prompt = format!(
        "These {} image(s) show parts of one kitchen. List every food item you can identify.",
        image_count
    );
    if image_count > 1 {
        prompt.push_str(
            " Images may overlap; report what you see in each image and duplicates will be merged.",
        );
    }
    prompt.push_str(
        " Use null for quantity when you cannot count it and null for perishability_days when unsure.",
    );
    prompt
}

/// Runs the vision model over the images and returns the merged item list.
pub async fn extract_items(
    ai: &dyn AiClient,
    settings: &AppSettings,
    image_urls: Vec<String>,
    now: OffsetDateTime,
) -> Result<Vec<InventoryItem>, ApiError> {
    let count = image_urls.len();
    let value = ai
        .vision_json(
            settings.vision_system_prompt.clone(),
            vision_prompt(count),
            image_urls,
            schemas::PANTRY_ITEMS,
            schemas::pantry_items_schema(),
        )
        .await?;
    let parsed: VisionItems = parse::from_value(value)?;
    let raw_count = parsed.items.len();

    let mut items = merge_items(parsed.items, now);
    fill_perishability(&mut items, &settings.perishability_rules);
    refresh_statuses(&mut items, now);

    info!(images = count, raw = raw_count, merged = items.len(), "vision scan extracted");
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::client::StaticAiClient;
    use crate::inventory::types::ItemStatus;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn image_refs() {
        assert!(validate_image_ref("https://cdn.example.com/p.jpg").is_ok());
        assert!(validate_image_ref("data:image/jpeg;base64,/9j/4AAQ").is_ok());
        assert!(validate_image_ref("data:text/plain;base64,aGk=").is_err());
        assert!(validate_image_ref("ftp://x/y.jpg").is_err());
        assert!(validate_image_refs(&[]).is_err());
        let too_many = vec!["https://a/b.jpg".to_string(); MAX_SCAN_IMAGES + 1];
        assert!(validate_image_refs(&too_many).is_err());
    }

    #[tokio::test]
    async fn extract_merges_duplicates_across_images() {
        let ai = StaticAiClient::new(json!({
            "items": [
                { "name": "Roma tomatoes", "quantity": 3, "category": "produce", "status": "fresh", "perishability_days": null },
                { "name": "roma tomato", "quantity": 1, "category": "produce", "status": "fresh", "perishability_days": null },
                { "name": "opened milk", "quantity": null, "category": "dairy", "status": "fresh", "perishability_days": null }
            ]
        }));
        let now = datetime!(2026-10-17 12:00 UTC);
        let items = extract_items(
            &ai,
            &AppSettings::default(),
            vec!["https://a/1.jpg".into(), "https://a/2.jpg".into()],
            now,
        )
        .await
        .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "roma tomato");
        assert_eq!(items[0].quantity, 4.0);
        assert_eq!(items[0].perishability_days, Some(6));
        assert_eq!(items[1].name, "milk");
        assert_eq!(items[1].status, ItemStatus::Low);

        let sent = ai.requests.lock().unwrap();
        assert_eq!(sent[0].image_urls.len(), 2);
        assert_eq!(sent[0].schema_name, schemas::PANTRY_ITEMS);
    }

    #[tokio::test]
    async fn malformed_model_output_is_upstream_error() {
        let ai = StaticAiClient::new(json!({ "things": [] }));
        let err = extract_items(
            &ai,
            &AppSettings::default(),
            vec!["https://a/1.jpg".into()],
            datetime!(2026-10-17 12:00 UTC),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_GATEWAY);
    }
}
