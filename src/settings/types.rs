use serde::{Deserialize, Serialize};

use crate::gating::tiers::TierLimitTable;
use crate::inventory::normalize::MAX_PERISHABILITY_DAYS;

pub const DEFAULT_MEAL_SYSTEM_PROMPT: &str = "You are KitchenIQ, a practical home-cooking planner. \
Plan meals that use what the household already has, respect every dietary restriction, allergy \
and intolerance without exception, and match the stated skill level, budget and time per meal. \
Prefer ingredients that are low or nearing expiry. List anything not in the pantry under \
missing_items and collect those into shopping_list. Answer only with JSON matching the schema.";

pub const DEFAULT_VISION_SYSTEM_PROMPT: &str = "You catalogue pantry, fridge and freezer contents \
from photos. List each distinct food item once per image with a short generic name (for example \
'roma tomato', 'whole milk'), a best-guess count, a category such as produce, dairy, meat, \
seafood, bakery, pantry, frozen, beverage or condiment, and a status: 'low' for opened, partly \
used or wilted items, 'expired' for visibly spoiled items, otherwise 'fresh'. Ignore non-food \
objects. Answer only with JSON matching the schema.";

pub const DEFAULT_LIVE_ASSIST_SYSTEM_PROMPT: &str = "You are a friendly cooking coach watching \
the user's kitchen through their camera while they talk to you. Give short, concrete, spoken-style \
guidance for the next step, flag food-safety problems you can see, and offer up to three brief \
follow-up suggestions. Answer only with JSON matching the schema.";

/// Keyword -> typical shelf life once in the kitchen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerishabilityRule {
    pub keyword: String,
    pub days: u32,
}

impl PerishabilityRule {
    fn new(keyword: &str, days: u32) -> Self {
        Self {
            keyword: keyword.to_string(),
            days,
        }
    }
}

pub fn default_perishability_rules() -> Vec<PerishabilityRule> {
    [
        ("fish", 2),
        ("seafood", 2),
        ("shrimp", 2),
        ("chicken", 2),
        ("ground beef", 2),
        ("meat", 3),
        ("berry", 4),
        ("strawberry", 4),
        ("blueberry", 4),
        ("raspberry", 4),
        ("blackberry", 4),
        ("lettuce", 5),
        ("spinach", 5),
        ("herb", 5),
        ("bread", 5),
        ("banana", 5),
        ("avocado", 4),
        ("tomato", 6),
        ("ice cream", 60),
        ("milk", 7),
        ("cream", 7),
        ("yogurt", 10),
        ("cheese", 14),
        ("apple", 21),
        ("egg", 21),
        ("carrot", 21),
        ("potato", 30),
        ("onion", 30),
        ("produce", 7),
        ("dairy", 10),
        ("bakery", 5),
    ]
    .into_iter()
    .map(|(k, d)| PerishabilityRule::new(k, d))
    .collect()
}

/// Admin-editable options, stored as one JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub meal_system_prompt: String,
    pub vision_system_prompt: String,
    pub live_assist_system_prompt: String,
    /// Checked in order; first keyword match wins.
    pub perishability_rules: Vec<PerishabilityRule>,
    pub tier_limits: TierLimitTable,
    pub airtable_enabled: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            meal_system_prompt: DEFAULT_MEAL_SYSTEM_PROMPT.to_string(),
            vision_system_prompt: DEFAULT_VISION_SYSTEM_PROMPT.to_string(),
            live_assist_system_prompt: DEFAULT_LIVE_ASSIST_SYSTEM_PROMPT.to_string(),
            perishability_rules: default_perishability_rules(),
            tier_limits: TierLimitTable::default(),
            airtable_enabled: true,
        }
    }
}

impl AppSettings {
    pub fn validate(&mut self) -> Result<(), String> {
        for (name, prompt) in [
            ("meal_system_prompt", &self.meal_system_prompt),
            ("vision_system_prompt", &self.vision_system_prompt),
            ("live_assist_system_prompt", &self.live_assist_system_prompt),
        ] {
            if prompt.trim().is_empty() {
                return Err(format!("{} must not be empty", name));
            }
        }
        for rule in &mut self.perishability_rules {
            rule.keyword = rule.keyword.trim().to_lowercase();
            if rule.keyword.is_empty() {
                return Err("perishability rule keyword must not be empty".into());
            }
            if rule.days == 0 || rule.days > MAX_PERISHABILITY_DAYS {
                return Err(format!(
                    "perishability days for '{}' must be between 1 and {}",
                    rule.keyword, MAX_PERISHABILITY_DAYS
                ));
            }
        }
        self.tier_limits.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let s: AppSettings =
            serde_json::from_value(serde_json::json!({ "airtable_enabled": false })).unwrap();
        assert!(!s.airtable_enabled);
        assert_eq!(s.meal_system_prompt, DEFAULT_MEAL_SYSTEM_PROMPT);
        assert_eq!(s.perishability_rules, default_perishability_rules());
    }

    #[test]
    fn validate_normalizes_keywords() {
        let mut s = AppSettings {
            perishability_rules: vec![PerishabilityRule::new("  Kale ", 4)],
            ..AppSettings::default()
        };
        s.validate().unwrap();
        assert_eq!(s.perishability_rules[0].keyword, "kale");
    }

    #[test]
    fn validate_rejects_zero_days_and_blank_prompts() {
        let mut s = AppSettings {
            perishability_rules: vec![PerishabilityRule::new("kale", 0)],
            ..AppSettings::default()
        };
        assert!(s.validate().is_err());

        let mut s = AppSettings {
            vision_system_prompt: "   ".into(),
            ..AppSettings::default()
        };
        assert!(s.validate().unwrap_err().contains("vision_system_prompt"));
    }
}
