use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Fresh,
    Nearing,
    Low,
    Out,
    Expired,
}

impl ItemStatus {
    /// Status of a bucket holding items with statuses `self` and `other`.
    ///
    /// `Low` absorbs everything, `Out` only survives when every member is out,
    /// otherwise the worse of fresh < nearing < expired wins.
    pub fn combine(self, other: ItemStatus) -> ItemStatus {
        use ItemStatus::*;
        match (self, other) {
            (Low, _) | (_, Low) => Low,
            (Out, x) | (x, Out) => x,
            (a, b) => {
                if a.decay_rank() >= b.decay_rank() {
                    a
                } else {
                    b
                }
            }
        }
    }

    fn decay_rank(self) -> u8 {
        match self {
            ItemStatus::Fresh => 0,
            ItemStatus::Nearing => 1,
            ItemStatus::Expired => 2,
            ItemStatus::Low | ItemStatus::Out => 3,
        }
    }

    /// Statuses that depend on the calendar rather than on what was observed.
    pub fn is_time_derived(self) -> bool {
        matches!(self, ItemStatus::Fresh | ItemStatus::Nearing)
    }
}

fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// One stored pantry entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub name: String,
    pub quantity: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default, with = "iso_date::option")]
    pub expiry_estimate: Option<Date>,
    #[serde(default)]
    pub perishability_days: Option<u32>,
    #[serde(default = "now_utc", with = "time::serde::rfc3339")]
    pub added_at: OffsetDateTime,
}

/// An item as it arrives from a scan, a barcode lookup or the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    pub name: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<ItemStatus>,
    #[serde(default, with = "iso_date::option")]
    pub expiry_estimate: Option<Date>,
    #[serde(default)]
    pub perishability_days: Option<u32>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub added_at: Option<OffsetDateTime>,
}

impl RawItem {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

impl From<InventoryItem> for RawItem {
    fn from(item: InventoryItem) -> Self {
        Self {
            name: item.name,
            quantity: Some(item.quantity),
            category: Some(item.category),
            status: Some(item.status),
            expiry_estimate: item.expiry_estimate,
            perishability_days: item.perishability_days,
            added_at: Some(item.added_at),
        }
    }
}
