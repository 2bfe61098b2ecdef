//! Fire-and-forget export of usage events to an Airtable base.

use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::AirtableConfig;
use crate::gating::Tier;

const AIRTABLE_API: &str = "https://api.airtable.com/v0";

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsEvent {
    pub event: &'static str,
    pub user_id: Uuid,
    pub tier: Tier,
    pub detail: Value,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

impl AnalyticsEvent {
    pub fn new(event: &'static str, user_id: Uuid, tier: Tier, detail: Value) -> Self {
        Self {
            event,
            user_id,
            tier,
            detail,
            at: OffsetDateTime::now_utc(),
        }
    }

    fn to_record(&self) -> Value {
        json!({
            "records": [{
                "fields": {
                    "Event": self.event,
                    "User": self.user_id.to_string(),
                    "Tier": self.tier.as_str(),
                    "Detail": self.detail.to_string(),
                    "Timestamp": self.at.format(&Rfc3339).unwrap_or_default(),
                }
            }],
            "typecast": true
        })
    }
}

#[derive(Clone)]
pub struct AirtableLogger {
    http: reqwest::Client,
    cfg: Option<AirtableConfig>,
}

impl AirtableLogger {
    pub fn new(cfg: Option<AirtableConfig>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { http, cfg })
    }

    pub fn is_configured(&self) -> bool {
        self.cfg.is_some()
    }

    /// Spawns the export and returns immediately; failures are only logged.
    pub fn log(&self, event: AnalyticsEvent) {
        let Some(cfg) = self.cfg.clone() else {
            return;
        };
        let http = self.http.clone();
        tokio::spawn(async move {
            let url = format!("{}/{}/{}", AIRTABLE_API, cfg.base_id, cfg.table);
            let result = http
                .post(&url)
                .bearer_auth(&cfg.api_key)
                .json(&event.to_record())
                .send()
                .await;
            match result {
                Ok(res) if res.status().is_success() => {
                    debug!(event = event.event, "airtable event exported")
                }
                Ok(res) => warn!(event = event.event, status = res.status().as_u16(), "airtable export rejected"),
                Err(e) => warn!(event = event.event, error = %e, "airtable export failed"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_shape() {
        let event = AnalyticsEvent::new(
            "vision_scan",
            Uuid::nil(),
            Tier::Basic,
            json!({ "items": 4 }),
        );
        let body = event.to_record();
        let fields = &body["records"][0]["fields"];
        assert_eq!(fields["Event"], "vision_scan");
        assert_eq!(fields["Tier"], "basic");
        assert_eq!(fields["Detail"], r#"{"items":4}"#);
        assert_eq!(body["typecast"], true);
    }

    #[tokio::test]
    async fn unconfigured_logger_is_a_no_op() {
        let logger = AirtableLogger::new(None).unwrap();
        assert!(!logger.is_configured());
        logger.log(AnalyticsEvent::new("x", Uuid::nil(), Tier::Free, Value::Null));
    }
}
