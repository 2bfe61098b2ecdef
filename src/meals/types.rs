use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

pub const MAX_MEALS_PER_REQUEST: u32 = 7;
const DEFAULT_MEAL_COUNT: u32 = 3;
const MAX_NOTES_LEN: usize = 500;

lazy_static! {
    static ref NON_ALNUM_RE: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub fn as_str(self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionEstimate {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub meal_name: String,
    pub meal_type: MealType,
    pub cooking_time_mins: u32,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub ingredients_used: Vec<String>,
    #[serde(default)]
    pub missing_items: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub nutrition_estimate: NutritionEstimate,
}

impl Meal {
    pub fn key(&self) -> String {
        meal_key(&self.meal_name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MealPlan {
    pub meals: Vec<Meal>,
    #[serde(default)]
    pub shopping_list: Vec<String>,
}

impl MealPlan {
    /// Drops meals with excluded keys and rebuilds the shopping list from
    /// the meals that remain, deduplicated case-insensitively.
    pub fn retain_allowed(&mut self, excluded: &[String]) {
        self.meals.retain(|m| !excluded.contains(&m.key()));

        let mut seen = std::collections::BTreeSet::new();
        let mut list = Vec::new();
        let candidates = self
            .shopping_list
            .iter()
            .chain(self.meals.iter().flat_map(|m| m.missing_items.iter()));
        for entry in candidates {
            let trimmed = entry.trim();
            if trimmed.is_empty() {
                continue;
            }
            let needed = self.meals.iter().any(|m| {
                m.missing_items
                    .iter()
                    .any(|x| x.trim().eq_ignore_ascii_case(trimmed))
            });
            if needed && seen.insert(trimmed.to_lowercase()) {
                list.push(trimmed.to_string());
            }
        }
        self.shopping_list = list;
    }
}

fn default_meal_count() -> u32 {
    DEFAULT_MEAL_COUNT
}

fn default_meal_types() -> Vec<MealType> {
    vec![MealType::Dinner]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateMealsRequest {
    #[serde(default = "default_meal_count")]
    pub count: u32,
    #[serde(default = "default_meal_types")]
    pub meal_types: Vec<MealType>,
    /// Free-text wishes, e.g. "something warm".
    #[serde(default)]
    pub notes: Option<String>,
}

impl Default for GenerateMealsRequest {
    fn default() -> Self {
        Self {
            count: default_meal_count(),
            meal_types: default_meal_types(),
            notes: None,
        }
    }
}

impl GenerateMealsRequest {
    pub fn validate(&mut self) -> Result<(), String> {
        if self.count == 0 || self.count > MAX_MEALS_PER_REQUEST {
            return Err(format!(
                "count must be between 1 and {}",
                MAX_MEALS_PER_REQUEST
            ));
        }
        if self.meal_types.is_empty() {
            self.meal_types = default_meal_types();
        }
        self.meal_types.dedup();
        if let Some(notes) = &self.notes {
            let trimmed = notes.trim();
            if trimmed.chars().count() > MAX_NOTES_LEN {
                return Err(format!("notes must be at most {} characters", MAX_NOTES_LEN));
            }
            self.notes = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preference {
    Often,
    Sometimes,
    Rarely,
    Never,
}

impl Preference {
    pub fn as_str(self) -> &'static str {
        match self {
            Preference::Often => "often",
            Preference::Sometimes => "sometimes",
            Preference::Rarely => "rarely",
            Preference::Never => "never",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "often" => Some(Preference::Often),
            "sometimes" => Some(Preference::Sometimes),
            "rarely" => Some(Preference::Rarely),
            "never" => Some(Preference::Never),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateMealRequest {
    pub meal_name: String,
    pub stars: i16,
    pub preference: Preference,
}

impl RateMealRequest {
    pub fn validate(&self) -> Result<String, String> {
        if !(1..=5).contains(&self.stars) {
            return Err("stars must be between 1 and 5".into());
        }
        let key = meal_key(&self.meal_name);
        if key.is_empty() {
            return Err("meal_name must contain letters or digits".into());
        }
        Ok(key)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MealRating {
    pub user_id: Uuid,
    pub meal_key: String,
    pub meal_name: String,
    pub stars: i16,
    pub preference: String,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl MealRating {
    /// Stored preference; unknown values read as `sometimes`.
    pub fn preference(&self) -> Preference {
        Preference::parse(&self.preference).unwrap_or(Preference::Sometimes)
    }
}

/// Stable rating key: lowercase, runs of non-alphanumerics collapsed to `-`.
pub fn meal_key(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    NON_ALNUM_RE
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}
