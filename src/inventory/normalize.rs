//! Name/quantity/status heuristics for scanned pantry items and the merge
//! that collapses duplicates across photos and frames.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;

use super::types::{InventoryItem, ItemStatus, RawItem};

pub const DEFAULT_CATEGORY: &str = "other";

/// Upper bound for a bucket's quantity; keeps stored JSON numbers finite.
pub const MAX_QUANTITY: f64 = 10_000.0;

/// Upper bound for a shelf life in days.
pub const MAX_PERISHABILITY_DAYS: u32 = 3650;

lazy_static! {
    static ref PUNCT_RE: Regex = Regex::new(r"[^\p{L}\p{N}\s'\-.]").unwrap();
    static ref SPACE_RE: Regex = Regex::new(r"\s+").unwrap();
    static ref LEADING_QTY_RE: Regex = Regex::new(r"^(\d+(?:\.\d+)?)\s*(?:x\s+)?").unwrap();
    static ref LEADING_ARTICLE_RE: Regex = Regex::new(r"^(?:a few|an|a|the|some)\s+").unwrap();
    static ref TRAILING_CONTAINER_RE: Regex = Regex::new(
        r"\s+(?:bag|box|jar|can|tin|bottle|pack|packet|carton|container|tub)s?$"
    ).unwrap();

    /// Words describing amount or condition rather than the food itself.
    static ref CUE_WORDS_RE: Regex = Regex::new(
        r"\b(?:half(?:\s+of)?(?:\s+(?:a|an))?|quarter(?:\s+of)?(?:\s+(?:a|an))?|a\s+dozen|dozen|(?:a\s+)?pair\s+of|unopened|sealed|opened|wilted|wilting|partially\s+used|partial|leftovers?|almost\s+empty|nearly\s+empty|running\s+low|bruised|expired|moldy|mouldy|spoiled|rotten|rotting|empty|(?:bag|box|jar|can|tin|bottle|pack|packet|carton|container|tub|bunch|loaf)s?\s+of)\b"
    ).unwrap();

    static ref LOW_RE: Regex = Regex::new(
        r"\b(?:opened|wilted|wilting|half|partial|partially\s+used|leftovers?|almost\s+empty|nearly\s+empty|running\s+low|bruised)\b"
    ).unwrap();
    static ref EXPIRED_RE: Regex = Regex::new(r"\b(?:expired|moldy|mouldy|spoiled|rotten|rotting)\b").unwrap();
    static ref OUT_RE: Regex = Regex::new(r"\bempty\b").unwrap();

    static ref DOZEN_RE: Regex = Regex::new(r"\bdozen\b").unwrap();
    static ref HALF_RE: Regex = Regex::new(r"\bhalf\b").unwrap();
    static ref QUARTER_RE: Regex = Regex::new(r"\bquarter\b").unwrap();
    static ref PAIR_RE: Regex = Regex::new(r"\bpair\s+of\b").unwrap();

    /// Plural -> singular rules for the head noun, first match wins.
    static ref SINGULAR_RULES: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"^(.*(?:lea|loa|hal|cal|shel))ves$").unwrap(), "${1}f"),
        (Regex::new(r"^(.*[^aeiou])ies$").unwrap(), "${1}y"),
        (Regex::new(r"^(.*o)es$").unwrap(), "${1}"),
        (Regex::new(r"^(.*(?:ch|sh|x|z|ss))es$").unwrap(), "${1}"),
        (Regex::new(r"^(.*[^su'])s$").unwrap(), "${1}"),
    ];
}

/// Words left alone by singularization.
const INVARIANT_WORDS: &[&str] = &[
    "asparagus", "brussels", "chips", "couscous", "grits", "greens", "hummus", "molasses",
    "oats", "swiss", "series", "species", "citrus", "octopus", "quinoa", "sprinkles",
    "noodles", "oregano",
];

/// Irregular plurals the rules above get wrong.
const IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("cookies", "cookie"),
    ("brownies", "brownie"),
    ("pies", "pie"),
    ("smoothies", "smoothie"),
    ("veggies", "veggie"),
    ("calories", "calorie"),
    ("mice", "mouse"),
    ("geese", "goose"),
];

/// Names that would be mangled by cue stripping.
const PROTECTED_NAMES: &[&str] = &["half and half", "half-and-half"];

fn clean(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let no_punct = PUNCT_RE.replace_all(&lower, " ");
    SPACE_RE.replace_all(no_punct.trim(), " ").trim_matches('.').trim().to_string()
}

fn singularize(word: &str) -> String {
    if word.chars().count() <= 3 || INVARIANT_WORDS.contains(&word) {
        return word.to_string();
    }
    if let Some((_, singular)) = IRREGULAR_PLURALS.iter().find(|(p, _)| *p == word) {
        return singular.to_string();
    }
    for (re, rep) in SINGULAR_RULES.iter() {
        if re.is_match(word) {
            return re.replace(word, *rep).into_owned();
        }
    }
    word.to_string()
}

/// Canonical name used as the merge key, e.g. "2 Roma Tomatoes (opened)" -> "roma tomato".
pub fn normalize_name(raw: &str) -> String {
    let cleaned = clean(raw);
    if PROTECTED_NAMES.contains(&cleaned.as_str()) {
        return "half and half".to_string();
    }

    let without_qty = LEADING_QTY_RE.replace(&cleaned, "");
    let without_cues = CUE_WORDS_RE.replace_all(&without_qty, " ");
    let collapsed = SPACE_RE.replace_all(without_cues.trim(), " ");
    let without_article = LEADING_ARTICLE_RE.replace(&collapsed, "");
    let mut name = TRAILING_CONTAINER_RE
        .replace(without_article.trim(), "")
        .trim()
        .to_string();
    if name.is_empty() {
        // Everything was a cue word ("opened bag of"); keep what we had.
        name = collapsed.trim().to_string();
    }

    let mut words: Vec<String> = name.split(' ').map(str::to_string).collect();
    if let Some(last) = words.last_mut() {
        *last = singularize(last);
    }
    words.join(" ").trim().to_string()
}

/// Status suggested by the item's text, if any.
pub fn infer_status(raw_name: &str) -> Option<ItemStatus> {
    let name = clean(raw_name);
    if LOW_RE.is_match(&name) {
        Some(ItemStatus::Low)
    } else if EXPIRED_RE.is_match(&name) {
        Some(ItemStatus::Expired)
    } else if OUT_RE.is_match(&name) {
        Some(ItemStatus::Out)
    } else {
        None
    }
}

/// Explicit positive quantity wins; otherwise textual cues; otherwise 1.
/// The result never exceeds [`MAX_QUANTITY`].
pub fn infer_quantity(raw_name: &str, explicit: Option<f64>) -> f64 {
    if let Some(q) = explicit.filter(|q| q.is_finite() && *q > 0.0) {
        return q.min(MAX_QUANTITY);
    }
    let name = clean(raw_name);
    let leading = LEADING_QTY_RE
        .captures(&name)
        .and_then(|c| c[1].parse::<f64>().ok())
        .filter(|n| *n > 0.0)
        .map(|n| n.min(MAX_QUANTITY));

    if DOZEN_RE.is_match(&name) {
        let per = if HALF_RE.is_match(&name) { 6.0 } else { 12.0 };
        return (leading.unwrap_or(1.0) * per).min(MAX_QUANTITY);
    }
    if let Some(n) = leading {
        return n;
    }
    if HALF_RE.is_match(&name) {
        0.5
    } else if QUARTER_RE.is_match(&name) {
        0.25
    } else if PAIR_RE.is_match(&name) {
        2.0
    } else {
        // Container words ("bag of rice") count as one unit too.
        1.0
    }
}

/// Status of one scanned item. Text cues beat the model's label, except that
/// a `low` from either side always wins.
fn item_status(raw_name: &str, labelled: Option<ItemStatus>) -> ItemStatus {
    match (infer_status(raw_name), labelled) {
        (Some(ItemStatus::Low), _) | (_, Some(ItemStatus::Low)) => ItemStatus::Low,
        (Some(cue), _) => cue,
        (None, Some(label)) => label,
        (None, None) => ItemStatus::Fresh,
    }
}

/// Normalizes a single item without merging. `None` when nothing nameable remains.
pub fn normalize_item(raw: RawItem, now: OffsetDateTime) -> Option<InventoryItem> {
    let name = normalize_name(&raw.name);
    if name.is_empty() {
        return None;
    }
    let status = item_status(&raw.name, raw.status);
    let quantity = if status == ItemStatus::Out {
        0.0
    } else {
        infer_quantity(&raw.name, raw.quantity)
    };
    let category = raw
        .category
        .map(|c| c.trim().to_lowercase())
        .unwrap_or_default();

    Some(InventoryItem {
        name,
        quantity,
        category,
        status,
        expiry_estimate: raw.expiry_estimate,
        perishability_days: raw
            .perishability_days
            .filter(|d| *d > 0)
            .map(|d| d.min(MAX_PERISHABILITY_DAYS)),
        added_at: raw.added_at.unwrap_or(now),
    })
}

fn min_opt<T: Ord>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, y) => x.or(y),
    }
}

/// Collapses already-normalized items by name, keeping first-seen order.
pub fn aggregate(items: impl IntoIterator<Item = InventoryItem>) -> Vec<InventoryItem> {
    let mut out: Vec<InventoryItem> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        match index.get(&item.name) {
            Some(&i) => {
                let bucket = &mut out[i];
                bucket.quantity = (bucket.quantity + item.quantity).min(MAX_QUANTITY);
                bucket.status = bucket.status.combine(item.status);
                if bucket.category.is_empty() {
                    bucket.category = item.category;
                }
                bucket.expiry_estimate = min_opt(bucket.expiry_estimate, item.expiry_estimate);
                bucket.perishability_days =
                    min_opt(bucket.perishability_days, item.perishability_days);
                bucket.added_at = bucket.added_at.min(item.added_at);
            }
            None => {
                index.insert(item.name.clone(), out.len());
                out.push(item);
            }
        }
    }

    for bucket in &mut out {
        bucket.quantity = (bucket.quantity.min(MAX_QUANTITY) * 100.0).round() / 100.0;
        if bucket.category.is_empty() {
            bucket.category = DEFAULT_CATEGORY.to_string();
        }
    }
    out
}

/// Raw items -> deduplicated inventory list.
pub fn merge_items(raw: impl IntoIterator<Item = RawItem>, now: OffsetDateTime) -> Vec<InventoryItem> {
    aggregate(raw.into_iter().filter_map(|r| normalize_item(r, now)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2026-10-17 12:00 UTC);

    fn raw(name: &str, qty: Option<f64>, status: Option<ItemStatus>) -> RawItem {
        RawItem {
            quantity: qty,
            status,
            ..RawItem::named(name)
        }
    }

    #[test]
    fn roma_tomatoes_merge_into_one_bucket() {
        let merged = merge_items(
            vec![
                raw("roma tomatoes", Some(3.0), None),
                raw("roma tomato", Some(2.0), None),
            ],
            NOW,
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "roma tomato");
        assert_eq!(merged[0].quantity, 5.0);
    }

    #[test]
    fn opened_forces_bucket_low_regardless_of_duplicates() {
        for other in [
            ItemStatus::Fresh,
            ItemStatus::Nearing,
            ItemStatus::Out,
            ItemStatus::Expired,
        ] {
            let merged = merge_items(
                vec![
                    raw("milk", Some(1.0), Some(other)),
                    raw("opened milk", Some(1.0), Some(ItemStatus::Expired)),
                    raw("Milk", None, Some(other)),
                ],
                NOW,
            );
            assert_eq!(merged.len(), 1, "{:?}", merged);
            assert_eq!(merged[0].name, "milk");
            assert_eq!(merged[0].status, ItemStatus::Low, "other = {:?}", other);
        }
    }

    #[test]
    fn name_normalization_table() {
        let cases = [
            ("Roma Tomatoes", "roma tomato"),
            ("  STRAWBERRIES!! ", "strawberry"),
            ("2 loaves", "loaf"),
            ("bag of baby carrots", "baby carrot"),
            ("half a lemon", "lemon"),
            ("wilted spinach leaves", "spinach leaf"),
            ("peaches", "peach"),
            ("hummus", "hummus"),
            ("rolled oats", "rolled oats"),
            ("cookies", "cookie"),
            ("glass", "glass"),
            ("Half-and-half", "half and half"),
            ("a dozen eggs", "egg"),
            ("3 x cans of chickpeas", "chickpea"),
            ("empty milk carton", "milk"),
            ("a quarter of a cabbage", "cabbage"),
        ];
        for (input, expected) in cases {
            assert_eq!(normalize_name(input), expected, "input: {}", input);
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        for name in ["roma tomato", "strawberry", "loaf", "spinach leaf", "hummus", "egg"] {
            assert_eq!(normalize_name(name), name);
        }
    }

    #[test]
    fn quantity_cues() {
        assert_eq!(infer_quantity("half an onion", None), 0.5);
        assert_eq!(infer_quantity("a quarter of a cabbage", None), 0.25);
        assert_eq!(infer_quantity("bag of rice", None), 1.0);
        assert_eq!(infer_quantity("a dozen eggs", None), 12.0);
        assert_eq!(infer_quantity("2 dozen eggs", None), 24.0);
        assert_eq!(infer_quantity("half dozen eggs", None), 6.0);
        assert_eq!(infer_quantity("3 apples", None), 3.0);
        assert_eq!(infer_quantity("pair of avocados", None), 2.0);
        assert_eq!(infer_quantity("half an onion", Some(4.0)), 4.0);
        assert_eq!(infer_quantity("apple", Some(0.0)), 1.0);
    }

    #[test]
    fn status_cues() {
        assert_eq!(infer_status("opened jar of salsa"), Some(ItemStatus::Low));
        assert_eq!(infer_status("wilted lettuce"), Some(ItemStatus::Low));
        assert_eq!(infer_status("moldy bread"), Some(ItemStatus::Expired));
        assert_eq!(infer_status("empty milk carton"), Some(ItemStatus::Out));
        assert_eq!(infer_status("almost empty ketchup"), Some(ItemStatus::Low));
        assert_eq!(infer_status("cheddar"), None);
    }

    #[test]
    fn empty_item_has_zero_quantity_but_merges_away() {
        let merged = merge_items(
            vec![raw("empty milk carton", Some(1.0), None), raw("milk", Some(2.0), None)],
            NOW,
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].quantity, 2.0);
        assert_eq!(merged[0].status, ItemStatus::Fresh);

        let alone = merge_items(vec![raw("empty milk carton", None, None)], NOW);
        assert_eq!(alone[0].status, ItemStatus::Out);
        assert_eq!(alone[0].quantity, 0.0);
    }

    #[test]
    fn first_seen_category_wins_and_order_is_kept() {
        let mut a = raw("apples", Some(2.0), None);
        a.category = Some("Produce".into());
        let mut b = raw("apple", Some(1.0), None);
        b.category = Some("snacks".into());
        let mut c = raw("yogurt", None, None);
        c.category = None;

        let merged = merge_items(vec![c, a, b], NOW);
        assert_eq!(merged[0].name, "yogurt");
        assert_eq!(merged[0].category, DEFAULT_CATEGORY);
        assert_eq!(merged[1].name, "apple");
        assert_eq!(merged[1].category, "produce");
        assert_eq!(merged[1].quantity, 3.0);
    }

    #[test]
    fn earliest_expiry_and_shortest_shelf_life_kept() {
        let mut a = raw("chicken thighs", None, None);
        a.expiry_estimate = Some(time::macros::date!(2026-10-20));
        a.perishability_days = Some(3);
        let mut b = raw("chicken thigh", None, None);
        b.expiry_estimate = Some(time::macros::date!(2026-10-19));
        b.perishability_days = Some(2);
        let merged = merge_items(vec![a, b], NOW);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].expiry_estimate, Some(time::macros::date!(2026-10-19)));
        assert_eq!(merged[0].perishability_days, Some(2));
    }

    #[test]
    fn huge_quantities_survive_a_storage_round_trip() {
        let huge_count = format!("1{} eggs", "0".repeat(400));
        let mut shelf_stable = raw("honey", Some(1.0), None);
        shelf_stable.perishability_days = Some(u32::MAX);
        let merged = merge_items(
            vec![
                raw("rice", Some(1e307), None),
                raw("rice", Some(1e307), None),
                raw(&huge_count, None, None),
                raw("2000 dozen eggs", None, None),
                shelf_stable,
            ],
            NOW,
        );
        assert_eq!(merged[0].quantity, MAX_QUANTITY);
        assert_eq!(merged[1].name, "egg");
        assert_eq!(merged[1].quantity, MAX_QUANTITY);
        assert_eq!(merged[2].perishability_days, Some(MAX_PERISHABILITY_DAYS));

        let stored = serde_json::to_value(&merged).unwrap();
        let reloaded: Vec<InventoryItem> = serde_json::from_value(stored).unwrap();
        assert_eq!(reloaded, merged);
    }

    #[test]
    fn unopened_items_stay_fresh_and_merge_with_plain_name() {
        assert_eq!(infer_status("unopened milk"), None);
        assert_eq!(normalize_name("unopened milk"), "milk");

        let merged = merge_items(
            vec![raw("unopened milk", None, None), raw("milk", Some(1.0), None)],
            NOW,
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].status, ItemStatus::Fresh);
        assert_eq!(merged[0].quantity, 2.0);
    }

    #[test]
    fn blank_names_are_dropped() {
        let merged = merge_items(vec![raw("  ", None, None), raw("!!", None, None)], NOW);
        assert!(merged.is_empty());
    }
}
