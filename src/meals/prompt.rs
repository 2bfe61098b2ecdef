use std::fmt::Write;

use super::types::{GenerateMealsRequest, MealRating, Preference};
use crate::inventory::types::{InventoryItem, ItemStatus};
use crate::profile::Profile;

/// Keys of meals the household never wants to see again.
pub fn excluded_keys(ratings: &[MealRating]) -> Vec<String> {
    ratings
        .iter()
        .filter(|r| r.preference() == Preference::Never)
        .map(|r| r.meal_key.clone())
        .collect()
}

fn join_or(items: impl IntoIterator<Item = String>, empty: &str) -> String {
    let joined = items.into_iter().collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        empty.to_string()
    } else {
        joined
    }
}

fn describe_item(item: &InventoryItem) -> String {
    let qty = if item.quantity.fract() == 0.0 {
        format!("{}", item.quantity as i64)
    } else {
        format!("{:.2}", item.quantity)
    };
    format!("{} x{}", item.name, qty)
}

/// User message for the meal planner: household, pantry and taste history.
pub fn build_meal_prompt(
    profile: &Profile,
    inventory: &[InventoryItem],
    ratings: &[MealRating],
    req: &GenerateMealsRequest,
) -> String {
    let mut out = String::new();
    let meal_types = req
        .meal_types
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(out, "Plan {} meal(s) of type: {}.", req.count, meal_types);

    let _ = writeln!(out, "\nHousehold:");
    let _ = writeln!(
        out,
        "- {} people, portions for about {:.1} average eaters",
        profile.household_size,
        profile.portion_factor()
    );
    let _ = writeln!(
        out,
        "- cooking skill: {:?}, budget: {:?}, at most {} minutes per meal",
        profile.cooking_skill,
        profile.budget_level,
        profile.time_per_meal.max_minutes()
    );
    let _ = writeln!(
        out,
        "- dietary restrictions: {}",
        join_or(profile.dietary_restrictions.iter().cloned(), "none")
    );
    let _ = writeln!(
        out,
        "- never use (allergies/intolerances): {}",
        join_or(profile.hard_exclusions(), "none")
    );
    let _ = writeln!(out, "- avoid (dislikes): {}", join_or(profile.all_dislikes(), "none"));
    let _ = writeln!(
        out,
        "- appliances: {}",
        join_or(profile.appliances.iter().cloned(), "standard stove and oven")
    );
    for member in &profile.members {
        let age = member.age.map(|a| format!(", age {}", a)).unwrap_or_default();
        let _ = writeln!(out, "  - {}: appetite {}/5{}", member.name, member.appetite, age);
    }

    let usable: Vec<&InventoryItem> = inventory
        .iter()
        .filter(|i| !matches!(i.status, ItemStatus::Out | ItemStatus::Expired))
        .collect();
    let (use_soon, rest): (Vec<&InventoryItem>, Vec<&InventoryItem>) = usable
        .into_iter()
        .partition(|i| matches!(i.status, ItemStatus::Low | ItemStatus::Nearing));

    let _ = writeln!(out, "\nPantry:");
    let _ = writeln!(
        out,
        "- use soon: {}",
        join_or(use_soon.into_iter().map(describe_item), "nothing")
    );
    let _ = writeln!(
        out,
        "- available: {}",
        join_or(rest.into_iter().map(describe_item), "nothing")
    );

    let favourites = ratings
        .iter()
        .filter(|r| r.preference() == Preference::Often)
        .map(|r| r.meal_name.clone());
    let never = ratings
        .iter()
        .filter(|r| r.preference() == Preference::Never)
        .map(|r| r.meal_name.clone());
    let _ = writeln!(out, "\nTaste history:");
    let _ = writeln!(out, "- favourites, suggest these or similar: {}", join_or(favourites, "none yet"));
    let _ = writeln!(out, "- never suggest: {}", join_or(never, "none"));

    if let Some(notes) = &req.notes {
        let _ = writeln!(out, "\nRequest notes: {}", notes);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meals::types::MealType;
    use crate::profile::types::HouseholdMember;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn item(name: &str, quantity: f64, status: ItemStatus) -> InventoryItem {
        InventoryItem {
            name: name.into(),
            quantity,
            category: "produce".into(),
            status,
            expiry_estimate: None,
            perishability_days: None,
            added_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn rating(name: &str, preference: &str) -> MealRating {
        MealRating {
            user_id: Uuid::nil(),
            meal_key: crate::meals::types::meal_key(name),
            meal_name: name.into(),
            stars: 3,
            preference: preference.into(),
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn prompt_sorts_pantry_and_history() {
        let mut profile = Profile::default();
        profile.members.push(HouseholdMember {
            name: "Sam".into(),
            appetite: 4,
            age: Some(9),
            allergies: vec!["peanut".into()],
            intolerances: vec![],
            dislikes: vec!["olives".into()],
        });
        let inventory = vec![
            item("spinach", 1.0, ItemStatus::Nearing),
            item("rice", 2.5, ItemStatus::Fresh),
            item("milk", 0.0, ItemStatus::Out),
            item("bread", 1.0, ItemStatus::Expired),
        ];
        let ratings = vec![rating("Veggie Chili", "often"), rating("Fish Tacos", "never")];
        let req = GenerateMealsRequest {
            count: 2,
            meal_types: vec![MealType::Lunch, MealType::Dinner],
            notes: Some("something warm".into()),
        };

        let prompt = build_meal_prompt(&profile, &inventory, &ratings, &req);
        assert!(prompt.contains("Plan 2 meal(s) of type: lunch, dinner."));
        assert!(prompt.contains("- use soon: spinach x1"));
        assert!(prompt.contains("- available: rice x2.50"));
        assert!(!prompt.contains("milk"));
        assert!(!prompt.contains("bread"));
        assert!(prompt.contains("never use (allergies/intolerances): peanut"));
        assert!(prompt.contains("avoid (dislikes): olives"));
        assert!(prompt.contains("Sam: appetite 4/5, age 9"));
        assert!(prompt.contains("favourites, suggest these or similar: Veggie Chili"));
        assert!(prompt.contains("never suggest: Fish Tacos"));
        assert!(prompt.contains("Request notes: something warm"));
    }

    #[test]
    fn excluded_keys_only_lists_never() {
        let ratings = vec![rating("A", "often"), rating("B", "never"), rating("C", "rarely")];
        assert_eq!(excluded_keys(&ratings), vec!["b".to_string()]);
    }
}
