//! OpenFoodFacts product lookup by barcode.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::inventory::types::RawItem;

const USER_AGENT: &str = concat!("kitcheniq/", env!("CARGO_PKG_VERSION"), " (pantry barcode lookup)");
const FIELDS: &str = "code,product_name,generic_name,brands,quantity,categories_tags";

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("invalid barcode '{0}'")]
    InvalidBarcode(String),

    #[error("product {0} not found")]
    NotFound(String),

    #[error("network error: {0}")]
    Transport(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl From<LookupError> for ApiError {
    fn from(e: LookupError) -> Self {
        match e {
            LookupError::InvalidBarcode(_) => ApiError::Validation(e.to_string()),
            LookupError::NotFound(_) => ApiError::NotFound(e.to_string()),
            other => ApiError::upstream("openfoodfacts", other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Product {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub generic_name: Option<String>,
    #[serde(default)]
    pub brands: Option<String>,
    #[serde(default)]
    pub quantity: Option<String>,
    #[serde(default)]
    pub categories_tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ProductResponse {
    status: i64,
    product: Option<Product>,
}

pub struct OpenFoodFactsClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenFoodFactsClient {
    pub fn new(base_url: &str) -> Result<Self, LookupError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| LookupError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn product(&self, barcode: &str) -> Result<Product, LookupError> {
        let code = clean_barcode(barcode)?;
        let url = format!("{}/api/v2/product/{}.json", self.base_url, code);
        debug!(%code, "querying openfoodfacts");

        let response = self
            .http
            .get(&url)
            .query(&[("fields", FIELDS)])
            .send()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound(code));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LookupError::Api(status.as_u16(), text));
        }

        let parsed: ProductResponse = response
            .json()
            .await
            .map_err(|e| LookupError::Parse(e.to_string()))?;
        match parsed.product {
            Some(product) if parsed.status == 1 => {
                info!(%code, name = ?product.product_name, "openfoodfacts hit");
                Ok(product)
            }
            _ => Err(LookupError::NotFound(code)),
        }
    }
}

/// Digits only, EAN-8 through GTIN-14.
pub fn clean_barcode(raw: &str) -> Result<String, LookupError> {
    let code: String = raw.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
    if (8..=14).contains(&code.len()) && code.chars().all(|c| c.is_ascii_digit()) {
        Ok(code)
    } else {
        Err(LookupError::InvalidBarcode(raw.to_string()))
    }
}

/// Maps OpenFoodFacts category tags onto pantry categories.
pub fn pantry_category(tags: &[String]) -> &'static str {
    const MAPPING: &[(&str, &str)] = &[
        ("en:frozen", "frozen"),
        ("en:dairies", "dairy"),
        ("en:cheeses", "dairy"),
        ("en:yogurts", "dairy"),
        ("en:eggs", "dairy"),
        ("en:seafood", "seafood"),
        ("en:fishes", "seafood"),
        ("en:meats", "meat"),
        ("en:poultries", "meat"),
        ("en:breads", "bakery"),
        ("en:pastries", "bakery"),
        ("en:fruits", "produce"),
        ("en:vegetables", "produce"),
        ("en:beverages", "beverage"),
        ("en:condiments", "condiment"),
        ("en:sauces", "condiment"),
        ("en:spreads", "condiment"),
    ];
    MAPPING
        .iter()
        .find(|(prefix, _)| tags.iter().any(|t| t.starts_with(prefix)))
        .map(|(_, category)| *category)
        .unwrap_or("pantry")
}

impl Product {
    pub fn display_name(&self) -> Option<String> {
        [&self.product_name, &self.generic_name]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// Inventory candidate for this product; `None` when the product has no usable name.
    pub fn to_raw_item(&self) -> Option<RawItem> {
        let name = self.display_name()?;
        Some(RawItem {
            quantity: Some(1.0),
            category: Some(pantry_category(&self.categories_tags).to_string()),
            ..RawItem::named(&name)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: Option<&str>, tags: &[&str]) -> Product {
        Product {
            code: Some("3017620422003".into()),
            product_name: name.map(str::to_string),
            generic_name: None,
            brands: Some("Brand".into()),
            quantity: Some("400 g".into()),
            categories_tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn barcode_cleaning() {
        assert_eq!(clean_barcode(" 3017-6204 22003 ").unwrap(), "3017620422003");
        assert!(clean_barcode("1234").is_err());
        assert!(clean_barcode("30176204220ab").is_err());
    }

    #[test]
    fn category_mapping_prefers_first_table_match() {
        assert_eq!(pantry_category(&["en:frozen-desserts".into(), "en:dairies".into()]), "frozen");
        assert_eq!(pantry_category(&["en:dairies".into(), "en:milks".into()]), "dairy");
        assert_eq!(pantry_category(&["en:snacks".into()]), "pantry");
    }

    #[test]
    fn product_to_raw_item() {
        let item = product(Some(" Greek Yogurt "), &["en:yogurts"]).to_raw_item().unwrap();
        assert_eq!(item.name, "Greek Yogurt");
        assert_eq!(item.category.as_deref(), Some("dairy"));
        assert_eq!(item.quantity, Some(1.0));

        assert!(product(Some("  "), &[]).to_raw_item().is_none());
    }

    #[test]
    fn lookup_errors_map_to_http() {
        let nf: ApiError = LookupError::NotFound("123".into()).into();
        assert_eq!(nf.status(), axum::http::StatusCode::NOT_FOUND);
        let bad: ApiError = LookupError::InvalidBarcode("x".into()).into();
        assert_eq!(bad.status(), axum::http::StatusCode::BAD_REQUEST);
        let up: ApiError = LookupError::Api(500, "boom".into()).into();
        assert_eq!(up.status(), axum::http::StatusCode::BAD_GATEWAY);
    }
}
