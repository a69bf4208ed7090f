//! Compositional additive scoring (spec §4.1 operation 7, SPEC_FULL §0.6).
//! Grounded on `original_source/tools/web_automation/dom_processor.py`'s
//! `score_interactive_elements`.

use std::collections::HashSet;

use lattice_types::Element;

use crate::extract::class_string;

const INTERACTIVE_TAGS: &[&str] = &["a", "button", "input", "select"];
const INTERACTIVE_ROLES: &[&str] = &[
    "button",
    "link",
    "dialog",
    "combobox",
    "textbox",
    "menuitem",
    "option",
    "tab",
    "switch",
    "checkbox",
    "radio",
    "menu",
    "menuitemcheckbox",
    "menuitemradio",
    "treeitem",
];

const KEYWORD_BOOST: &[&str] = &[
    "order", "buy", "shop", "start", "begin", "find", "location", "search", "submit", "accept",
    "agree", "continue", "next", "add", "cart", "checkout", "zip", "address", "pickup", "delivery",
    "login", "sign in", "apply", "continue as guest",
];

const PRIMARY_ACTIONS: &[&str] = &[
    "order now",
    "buy now",
    "get started",
    "begin",
    "add to cart",
    "checkout",
    "start",
    "shop now",
    "add to bag",
];

const MODAL_KEYWORDS: &[&str] = &["accept", "agree", "continue", "close", "got it", "dismiss", "ok"];

const LOCATION_INPUT_KEYWORDS: &[&str] = &["zip", "postal", "address", "location", "city", "state"];

const LOCATION_FINDER_PHRASES: &[&str] =
    &["find location", "find store", "store locator", "find a store", "find locations"];

const LOCATION_KEYWORDS_SHORT: &[&str] = &["find location", "store locator", "enter zip"];

const HIGH_VALUE_ATTRS: &[&str] = &[
    "data-qa-item-name",
    "data-qa-group-name",
    "data-menu-item",
    "data-item-name",
    "data-testid",
    "data-track",
];

const FOOD_TYPES: &[&str] =
    &["bowl", "burrito", "taco", "salad", "quesadilla", "chips", "drink", "kids meal"];

const LOCATION_CONTAINER_ATTRS: &[&str] = &[
    "data-qa-restaurant-id",
    "data-store-id",
    "data-location-id",
    "data-shop-id",
    "data-venue-id",
    "data-place-id",
];

const LOCATION_CONTAINER_CLASSES: &[&str] = &[
    "restaurant-address-item",
    "location-item",
    "store-item",
    "store-card",
    "location-card",
    "venue-item",
];

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "to", "for", "of", "in", "on", "at", "by", "with", "from", "up", "about",
    "into", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does",
    "did", "will", "would", "could", "should", "may", "might", "can", "must", "shall", "and", "or",
    "but", "so", "as", "if", "then", "than", "when", "where", "while", "how", "why", "what",
    "which", "who", "this", "that", "these", "those", "i", "you", "he", "she", "it", "we", "they",
    "me", "him", "her", "us", "them", "my", "your", "his", "our", "their",
];

const IMPERATIVE_WORDS: &[&str] = &[
    "select", "choose", "pick", "click", "build", "your", "own", "option", "type", "order", "get",
    "go", "find", "then",
];

/// `score(elements, goal) -> reordered sequence of Element` (spec §4.1).
/// Deterministic given `(elements, goal)` (P9); ties broken by stable sort
/// preserving original extraction order.
pub fn score(mut elements: Vec<Element>, goal: &str) -> Vec<Element> {
    let goal_lower = goal.to_lowercase();
    let wants_location =
        ["location", "store", "restaurant", "zip", "postal"].iter().any(|k| goal_lower.contains(k));

    for el in elements.iter_mut() {
        el.score = score_one(el, &goal_lower, wants_location);
    }

    apply_goal_aware_postprocessing(&mut elements, &goal_lower);

    elements.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    elements
}

fn score_one(el: &Element, goal_lower: &str, wants_location: bool) -> f64 {
    let mut score = 0.0_f64;
    let text = el.text.to_lowercase();
    let attrs = &el.attrs;
    let role = attrs.get("role").cloned().unwrap_or_default().to_lowercase();
    let placeholder = attrs.get("placeholder").cloned().unwrap_or_default().to_lowercase();
    let aria = attrs.get("aria-label").cloned().unwrap_or_default().to_lowercase();
    let name = attrs.get("name").cloned().unwrap_or_default().to_lowercase();
    let href = attrs.get("href").cloned().unwrap_or_default().to_lowercase();
    let classes = class_string(attrs).to_lowercase();

    if INTERACTIVE_TAGS.contains(&el.tag.as_str()) {
        score += 1.0;
    }
    if INTERACTIVE_ROLES.contains(&role.as_str()) {
        score += 0.5;
    }

    if wants_location {
        for phrase in LOCATION_FINDER_PHRASES {
            if text.contains(phrase) || classes.contains(phrase) {
                score += 3.0;
            }
        }
        if text.contains("find") && ["store", "location", "restaurant", "shop"].iter().any(|w| text.contains(w)) {
            score += 2.5;
        }
    }

    let all_text = format!("{text} {placeholder} {aria} {name} {href} {classes}");
    for kw in KEYWORD_BOOST {
        if all_text.contains(kw) {
            score += 0.8;
        }
    }

    if classes.contains("add-to-bag") || all_text.contains("add to bag") {
        score += 3.0;
    } else if all_text.contains("bag") || all_text.contains("cart") {
        score += 2.0;
    }

    for action in PRIMARY_ACTIONS {
        if all_text.contains(action) {
            score += 1.2;
        }
    }

    for mk in MODAL_KEYWORDS {
        if all_text.contains(mk) {
            score += 0.7;
        }
    }

    if el.tag == "input" {
        score += 0.5;
        for lk in LOCATION_INPUT_KEYWORDS {
            if placeholder.contains(lk) || aria.contains(lk) || name.contains(lk) {
                score += 2.0;
            }
        }
        let input_type = attrs.get("type").cloned().unwrap_or_default().to_lowercase();
        if matches!(input_type.as_str(), "text" | "search" | "tel" | "") {
            score += 0.8;
        }
    }

    if matches!(el.tag.as_str(), "div" | "span") && crate::extract::is_clickable_div(attrs, &el.text) {
        score += 1.2;
    }

    for lk in LOCATION_KEYWORDS_SHORT {
        if all_text.contains(lk) {
            score += 1.5;
        }
    }

    if text.contains("all") && text.contains("location") {
        score -= 1.0;
    }
    if text.contains("view") && (text.contains("all") || text.contains("more")) {
        score -= 0.8;
    }

    if href.contains("javascript:") {
        score -= 0.5;
    }
    if el.tag == "a" && href.is_empty() {
        score -= 0.3;
    }
    if text.chars().count() > 100 {
        score -= 0.2;
    }

    let text_len = text.chars().count();
    if (3..=50).contains(&text_len) {
        score += 0.3;
    } else if text_len > 50 {
        score += 0.1;
    }

    if attrs.get("onclick").map(|v| !v.is_empty()).unwrap_or(false) {
        score += 0.4;
    }
    if attrs.contains_key("data-testid") {
        score += 0.3;
    }
    if classes.contains("btn") || classes.contains("button") {
        score += 0.5;
    }

    score += goal_lexicon_boost(&text, goal_lower, attrs);
    score += phrase_match_boost(&text, goal_lower);

    score.max(0.0)
}

fn goal_lexicon_boost(text: &str, goal_lower: &str, attrs: &std::collections::BTreeMap<String, String>) -> f64 {
    let mut target_keywords = Vec::new();
    let mut general_keywords = Vec::new();

    for word in goal_lower.split_whitespace() {
        let clean: String = word
            .trim_matches(|c: char| ".,!?;:\"()[]{}'".contains(c))
            .to_lowercase();
        if clean.chars().count() < 2 || STOP_WORDS.contains(&clean.as_str()) {
            continue;
        }
        if IMPERATIVE_WORDS.contains(&clean.as_str()) {
            general_keywords.push(clean);
        } else {
            target_keywords.push(clean);
        }
    }

    let target_matches = target_keywords.iter().filter(|kw| text.contains(kw.as_str())).count();
    let general_matches = general_keywords.iter().filter(|kw| text.contains(kw.as_str())).count();

    let mut total_boost = 0.0;
    if target_matches > 0 {
        total_boost += target_matches as f64 * 3.0;
    }
    if general_matches > 0 {
        total_boost += general_matches as f64 * 0.5;
    }

    if total_boost > 0.0 {
        let has_high_value_attr = HIGH_VALUE_ATTRS.iter().any(|a| attrs.contains_key(*a));
        if has_high_value_attr {
            total_boost *= 3.0;
        }
    }

    total_boost
}

fn phrase_match_boost(text: &str, goal_lower: &str) -> f64 {
    let goal_phrase = goal_lower
        .replace("add", "")
        .replace(['\'', '"'], "")
        .replace("as a topping", "")
        .replace("as", "")
        .trim()
        .to_string();
    if goal_phrase.split_whitespace().count() >= 2 && text.contains(&goal_phrase) {
        5.0
    } else {
        0.0
    }
}

/// Goal-aware post-processing: menu-selection and location-selection
/// specializations re-boost matching elements and re-sort (spec §4.1 items
/// 5-6).
fn apply_goal_aware_postprocessing(elements: &mut [Element], goal_lower: &str) {
    let has_select_keyword = ["select", "choose", "pick"].iter().any(|k| goal_lower.contains(k));
    let has_food_keyword = FOOD_TYPES.iter().any(|f| goal_lower.contains(f));

    if has_select_keyword && has_food_keyword {
        let goal_food_items: Vec<&str> = FOOD_TYPES.iter().copied().filter(|f| goal_lower.contains(f)).collect();
        for el in elements.iter_mut() {
            let text = el.text.to_lowercase();
            let classes = class_string(&el.attrs).to_lowercase();
            for food in &goal_food_items {
                if text.contains(food) {
                    el.score += 6.0;
                }
            }
            let menu_indicators: HashSet<&str> = ["menu", "top-level-menu", "meal", "item", "card"].into();
            if menu_indicators.iter().any(|i| classes.contains(i)) && goal_food_items.iter().any(|f| text.contains(f)) {
                el.score += 2.0;
            }
        }
        return;
    }

    let wants_location_select = ["select", "choose", "pick", "nearest"].iter().any(|k| goal_lower.contains(k))
        && ["location", "restaurant", "store"].iter().any(|k| goal_lower.contains(k));
    if wants_location_select {
        for el in elements.iter_mut() {
            let text = el.text.to_lowercase();
            let classes = class_string(&el.attrs).to_lowercase();
            let has_location_attr = LOCATION_CONTAINER_ATTRS.iter().any(|a| el.attrs.contains_key(*a));
            let has_location_class = LOCATION_CONTAINER_CLASSES.iter().any(|c| classes.contains(c));
            if has_location_attr || has_location_class {
                el.score += 8.0;
            } else {
                let role_is_definition = el.attrs.get("role").map(|r| r == "definition").unwrap_or(false);
                let distance_words = ["near", "mile", "mi", "km", "street", "road", "avenue", "boulevard", "drive", "lane", "way"];
                let addr_like = role_is_definition && distance_words.iter().any(|w| text.contains(w));
                let class_hit = ["address", "location", "result", "store", "restaurant"].iter().any(|c| classes.contains(c));
                let distance_hit = ["mile", "mi", "km", "away"].iter().any(|w| text.contains(w));
                if addr_like || class_hit || distance_hit {
                    el.score += 4.0;
                }
            }
            if text.contains("all") && text.contains("location") {
                el.score -= 0.8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_types::Element;

    fn el(tag: &str, text: &str) -> Element {
        Element {
            tag: tag.to_string(),
            text: text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn interactive_tag_gets_base_weight() {
        let scored = score(vec![el("a", "plain")], "do something");
        assert!(scored[0].score >= 1.0);
    }

    #[test]
    fn target_noun_monotonicity_p9() {
        // P9: adding an exact target-noun substring never decreases score.
        let without = score(vec![el("button", "Click")], "select burrito")[0].score;
        let with = score(vec![el("button", "Click burrito")], "select burrito")[0].score;
        assert!(with >= without);
    }

    #[test]
    fn menu_selection_boosts_exact_food_match_over_other_item() {
        let scored = score(
            vec![el("div", "Burrito Bowl"), el("div", "Lifestyle Bowl")],
            "Select 'Burrito Bowl'",
        );
        let burrito = scored.iter().find(|e| e.text == "Burrito Bowl").unwrap();
        let lifestyle = scored.iter().find(|e| e.text == "Lifestyle Bowl").unwrap();
        assert!(burrito.score >= lifestyle.score);
    }

    #[test]
    fn scoring_is_deterministic() {
        let elements = vec![el("a", "find store"), el("button", "Add to bag")];
        let once = score(elements.clone(), "find store near 45305");
        let twice = score(elements, "find store near 45305");
        let once_scores: Vec<f64> = once.iter().map(|e| e.score).collect();
        let twice_scores: Vec<f64> = twice.iter().map(|e| e.score).collect();
        assert_eq!(once_scores, twice_scores);
    }

    #[test]
    fn all_locations_link_is_penalized() {
        let scored = score(vec![el("a", "All Locations")], "find store location");
        assert!(scored[0].score < 1.0 + 0.5);
    }
}
