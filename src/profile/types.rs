use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const MAX_HOUSEHOLD_SIZE: u32 = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CookingSkill {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetLevel {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimePerMeal {
    Quick,
    #[default]
    Moderate,
    Extended,
}

impl TimePerMeal {
    /// Upper bound on active cooking time handed to the planner.
    pub fn max_minutes(self) -> u32 {
        match self {
            TimePerMeal::Quick => 20,
            TimePerMeal::Moderate => 45,
            TimePerMeal::Extended => 90,
        }
    }
}

fn default_appetite() -> u8 {
    3
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseholdMember {
    pub name: String,
    /// 1 (light eater) ..= 5 (big eater).
    #[serde(default = "default_appetite")]
    pub appetite: u8,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub intolerances: Vec<String>,
    #[serde(default)]
    pub dislikes: Vec<String>,
}

fn default_household_size() -> u32 {
    1
}

/// Household profile, replaced wholesale on every save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default = "default_household_size")]
    pub household_size: u32,
    #[serde(default)]
    pub dietary_restrictions: BTreeSet<String>,
    #[serde(default)]
    pub cooking_skill: CookingSkill,
    #[serde(default)]
    pub budget_level: BudgetLevel,
    #[serde(default)]
    pub time_per_meal: TimePerMeal,
    #[serde(default)]
    pub dislikes: Vec<String>,
    #[serde(default)]
    pub appliances: BTreeSet<String>,
    #[serde(default)]
    pub members: Vec<HouseholdMember>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            household_size: default_household_size(),
            dietary_restrictions: BTreeSet::new(),
            cooking_skill: CookingSkill::default(),
            budget_level: BudgetLevel::default(),
            time_per_meal: TimePerMeal::default(),
            dislikes: Vec::new(),
            appliances: BTreeSet::new(),
            members: Vec::new(),
            updated_at: None,
        }
    }
}

/// Lowercases, trims and drops empty/duplicate tags, keeping first-seen order.
fn clean_list(items: &mut Vec<String>) {
    let mut seen = BTreeSet::new();
    items.retain_mut(|s| {
        *s = s.trim().to_lowercase();
        !s.is_empty() && seen.insert(s.clone())
    });
}

fn clean_set(items: &mut BTreeSet<String>) {
    *items = items
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
}

impl Profile {
    /// Cleans tag lists in place and rejects out-of-range values.
    pub fn normalize(&mut self) -> Result<(), String> {
        clean_set(&mut self.dietary_restrictions);
        clean_set(&mut self.appliances);
        clean_list(&mut self.dislikes);

        if self.members.len() > MAX_HOUSEHOLD_SIZE as usize {
            return Err(format!("at most {} members are allowed", MAX_HOUSEHOLD_SIZE));
        }
        for member in &mut self.members {
            member.name = member.name.trim().to_string();
            if member.name.is_empty() {
                return Err("member name must not be empty".into());
            }
            if !(1..=5).contains(&member.appetite) {
                return Err(format!("appetite for {} must be between 1 and 5", member.name));
            }
            if member.age.is_some_and(|a| a > 120) {
                return Err(format!("age for {} is out of range", member.name));
            }
            clean_list(&mut member.allergies);
            clean_list(&mut member.intolerances);
            clean_list(&mut member.dislikes);
        }

        // Listed members always count towards the household.
        self.household_size = self.household_size.max(self.members.len() as u32);
        if self.household_size == 0 || self.household_size > MAX_HOUSEHOLD_SIZE {
            return Err(format!(
                "household_size must be between 1 and {}",
                MAX_HOUSEHOLD_SIZE
            ));
        }
        Ok(())
    }

    /// Allergies and intolerances across all members, deduplicated.
    pub fn hard_exclusions(&self) -> BTreeSet<String> {
        self.members
            .iter()
            .flat_map(|m| m.allergies.iter().chain(m.intolerances.iter()))
            .cloned()
            .collect()
    }

    /// Household and member dislikes, deduplicated.
    pub fn all_dislikes(&self) -> BTreeSet<String> {
        self.dislikes
            .iter()
            .chain(self.members.iter().flat_map(|m| m.dislikes.iter()))
            .cloned()
            .collect()
    }

    /// Portion multiplier relative to one average eater (appetite 3).
    pub fn portion_factor(&self) -> f64 {
        if self.members.is_empty() {
            return self.household_size as f64;
        }
        let listed: f64 = self.members.iter().map(|m| m.appetite as f64 / 3.0).sum();
        let unlisted = self.household_size.saturating_sub(self.members.len() as u32) as f64;
        listed + unlisted
    }
}
