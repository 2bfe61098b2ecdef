use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Subscription level of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Basic,
    Pro,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Basic => "basic",
            Tier::Pro => "pro",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Tier::Free),
            "basic" => Ok(Tier::Basic),
            "pro" => Ok(Tier::Pro),
            other => anyhow::bail!("unknown tier '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    MealGeneration,
    MealRating,
    BarcodeLookup,
    VisionScan,
    VideoScan,
    LiveAssist,
    AudioTranscription,
}

const ALL_TIERS: &[Tier] = &[Tier::Free, Tier::Basic, Tier::Pro];
const PAID_TIERS: &[Tier] = &[Tier::Basic, Tier::Pro];
const PRO_ONLY: &[Tier] = &[Tier::Pro];

/// Feature -> tiers allowed to use it.
const FEATURE_TABLE: &[(Feature, &[Tier])] = &[
    (Feature::MealGeneration, ALL_TIERS),
    (Feature::MealRating, ALL_TIERS),
    (Feature::BarcodeLookup, ALL_TIERS),
    (Feature::VisionScan, PAID_TIERS),
    (Feature::VideoScan, PRO_ONLY),
    (Feature::LiveAssist, PRO_ONLY),
    (Feature::AudioTranscription, PRO_ONLY),
];

impl Feature {
    pub fn as_str(self) -> &'static str {
        match self {
            Feature::MealGeneration => "meal_generation",
            Feature::MealRating => "meal_rating",
            Feature::BarcodeLookup => "barcode_lookup",
            Feature::VisionScan => "vision_scan",
            Feature::VideoScan => "video_scan",
            Feature::LiveAssist => "live_assist",
            Feature::AudioTranscription => "audio_transcription",
        }
    }

    pub fn allowed_tiers(self) -> &'static [Tier] {
        FEATURE_TABLE
            .iter()
            .find(|(f, _)| *f == self)
            .map(|(_, tiers)| *tiers)
            .unwrap_or(&[])
    }

    pub fn allows(self, tier: Tier) -> bool {
        self.allowed_tiers().contains(&tier)
    }
}

/// Features available to a tier, in table order.
pub fn features_for(tier: Tier) -> Vec<Feature> {
    FEATURE_TABLE
        .iter()
        .filter(|(_, tiers)| tiers.contains(&tier))
        .map(|(f, _)| *f)
        .collect()
}

/// Per-period usage caps. `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    pub meals_per_week: Option<i64>,
    pub vision_scans_per_month: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierLimitTable {
    pub free: TierLimits,
    pub basic: TierLimits,
    pub pro: TierLimits,
}

impl Default for TierLimitTable {
    fn default() -> Self {
        Self {
            free: TierLimits {
                meals_per_week: Some(1),
                vision_scans_per_month: Some(0),
            },
            basic: TierLimits {
                meals_per_week: Some(5),
                vision_scans_per_month: Some(10),
            },
            pro: TierLimits {
                meals_per_week: None,
                vision_scans_per_month: Some(60),
            },
        }
    }
}

impl TierLimitTable {
    pub fn for_tier(&self, tier: Tier) -> TierLimits {
        match tier {
            Tier::Free => self.free,
            Tier::Basic => self.basic,
            Tier::Pro => self.pro,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for (tier, limits) in [
            (Tier::Free, self.free),
            (Tier::Basic, self.basic),
            (Tier::Pro, self.pro),
        ] {
            let negative = [limits.meals_per_week, limits.vision_scans_per_month]
                .into_iter()
                .flatten()
                .any(|v| v < 0);
            if negative {
                return Err(format!("limits for {} tier must not be negative", tier));
            }
        }
        Ok(())
    }
}
