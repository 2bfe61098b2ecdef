use time::{Date, Duration, OffsetDateTime};

use super::types::{InventoryItem, ItemStatus};
use crate::settings::types::PerishabilityRule;

/// Items expiring within this many days are reported as `nearing`.
pub const NEARING_WINDOW_DAYS: i64 = 2;

fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

/// True when the keyword's words appear as a contiguous run of whole words,
/// so "egg" matches "egg white" but not "eggplant".
fn has_keyword(text: &str, keyword: &str) -> bool {
    let needle = words(keyword);
    if needle.is_empty() {
        return false;
    }
    words(text)
        .windows(needle.len())
        .any(|w| w == needle.as_slice())
}

/// Shelf life from the first rule whose keyword appears in the name, then the category.
pub fn shelf_life_days(item: &InventoryItem, rules: &[PerishabilityRule]) -> Option<u32> {
    rules
        .iter()
        .find(|r| has_keyword(&item.name, &r.keyword))
        .or_else(|| rules.iter().find(|r| has_keyword(&item.category, &r.keyword)))
        .map(|r| r.days)
}

pub fn fill_perishability(items: &mut [InventoryItem], rules: &[PerishabilityRule]) {
    for item in items.iter_mut() {
        if item.perishability_days.is_none() {
            item.perishability_days = shelf_life_days(item, rules);
        }
    }
}

/// Expected expiry: the explicit estimate, else added date plus shelf life.
/// `None` when the sum falls outside the calendar.
pub fn expiry_date(item: &InventoryItem) -> Option<Date> {
    item.expiry_estimate.or_else(|| {
        item.perishability_days
            .and_then(|d| item.added_at.date().checked_add(Duration::days(i64::from(d))))
    })
}

/// Re-derives calendar statuses. Observed `low`, `out` and `expired` are kept.
pub fn derive_status(item: &InventoryItem, today: Date) -> ItemStatus {
    if !item.status.is_time_derived() {
        return item.status;
    }
    let Some(expiry) = expiry_date(item) else {
        return item.status;
    };
    let days_left = (expiry - today).whole_days();
    if days_left < 0 {
        ItemStatus::Expired
    } else if days_left <= NEARING_WINDOW_DAYS {
        ItemStatus::Nearing
    } else {
        ItemStatus::Fresh
    }
}

pub fn refresh_statuses(items: &mut [InventoryItem], now: OffsetDateTime) {
    let today = now.date();
    for item in items.iter_mut() {
        item.status = derive_status(item, today);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::types::default_perishability_rules;
    use time::macros::{date, datetime};

    fn item(name: &str, category: &str, status: ItemStatus) -> InventoryItem {
        InventoryItem {
            name: name.into(),
            quantity: 1.0,
            category: category.into(),
            status,
            expiry_estimate: None,
            perishability_days: None,
            added_at: datetime!(2026-10-10 08:00 UTC),
        }
    }

    #[test]
    fn rules_match_name_before_category() {
        let rules = default_perishability_rules();
        assert_eq!(shelf_life_days(&item("whole milk", "dairy", ItemStatus::Fresh), &rules), Some(7));
        assert_eq!(shelf_life_days(&item("kefir", "dairy", ItemStatus::Fresh), &rules), Some(10));
        assert_eq!(shelf_life_days(&item("rice", "pantry", ItemStatus::Fresh), &rules), None);
    }

    #[test]
    fn keywords_match_whole_words_only() {
        let rules = default_perishability_rules();
        let days = |name: &str, category: &str| {
            shelf_life_days(&item(name, category, ItemStatus::Fresh), &rules)
        };
        assert_eq!(days("eggplant", "produce"), Some(7));
        assert_eq!(days("goldfish cracker", "snacks"), None);
        assert_eq!(days("ice cream", "frozen"), Some(60));
        assert_eq!(days("heavy cream", "dairy"), Some(7));
        assert_eq!(days("egg", ""), Some(21));
        assert_eq!(days("strawberry", "produce"), Some(4));
        assert_eq!(days("ground beef", "meat"), Some(2));
        assert_eq!(days("smoked salmon", "seafood"), Some(2));
    }

    #[test]
    fn far_future_shelf_life_does_not_overflow() {
        let mut honey = item("honey", "pantry", ItemStatus::Fresh);
        honey.perishability_days = Some(u32::MAX);
        assert_eq!(expiry_date(&honey), None);
        assert_eq!(derive_status(&honey, date!(2026-10-17)), ItemStatus::Fresh);
    }

    #[test]
    fn fill_keeps_explicit_days() {
        let rules = default_perishability_rules();
        let mut items = vec![item("milk", "dairy", ItemStatus::Fresh), item("milk", "dairy", ItemStatus::Fresh)];
        items[1].perishability_days = Some(3);
        fill_perishability(&mut items, &rules);
        assert_eq!(items[0].perishability_days, Some(7));
        assert_eq!(items[1].perishability_days, Some(3));
    }

    #[test]
    fn status_follows_calendar() {
        let mut milk = item("milk", "dairy", ItemStatus::Fresh);
        milk.perishability_days = Some(7); // expires 2026-10-17

        assert_eq!(derive_status(&milk, date!(2026-10-12)), ItemStatus::Fresh);
        assert_eq!(derive_status(&milk, date!(2026-10-15)), ItemStatus::Nearing);
        assert_eq!(derive_status(&milk, date!(2026-10-17)), ItemStatus::Nearing);
        assert_eq!(derive_status(&milk, date!(2026-10-18)), ItemStatus::Expired);
    }

    #[test]
    fn explicit_estimate_beats_shelf_life() {
        let mut bread = item("bread", "bakery", ItemStatus::Nearing);
        bread.perishability_days = Some(1);
        bread.expiry_estimate = Some(date!(2026-10-30));
        assert_eq!(derive_status(&bread, date!(2026-10-17)), ItemStatus::Fresh);
    }

    #[test]
    fn observed_statuses_are_kept() {
        let mut low = item("milk", "dairy", ItemStatus::Low);
        low.perishability_days = Some(1);
        assert_eq!(derive_status(&low, date!(2026-12-01)), ItemStatus::Low);

        let unknown = item("rice", "pantry", ItemStatus::Fresh);
        assert_eq!(derive_status(&unknown, date!(2030-01-01)), ItemStatus::Fresh);
    }
}
