//! Regex-first element extraction (spec §4.1 `extract`). A real deployment
//! would prefer an lxml-style HTML parser; this fallback path is kept as the
//! primary and only path here because it is the one with an identical,
//! fully specified output contract (spec §9 "Regex-first DOM fallback") and
//! needs no external parser dependency.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use lattice_types::Element;

use crate::selectors::candidate_selectors;

const DATA_ATTR_TEXT_PRIORITY: &[&str] = &[
    "data-qa-item-name",
    "data-qa-group-name",
    "data-qa-name",
    "data-qa-title",
    "data-qa-label",
    "data-item-name",
    "data-label",
    "data-title",
    "data-name",
    "data-text",
    "data-value",
    "data-button-value",
    "data-menu-name",
    "data-category",
];

const PRICE_MARKERS: &[&str] = &["$", "£", "€", "¥", "cal", "kcal"];

const CLICKABLE_BUTTON_CLASSES: &[&str] = &[
    "btn",
    "button",
    "click",
    "action",
    "submit",
    "cta",
    "link",
    "add-to-bag",
    "add-to-cart",
    "checkout",
    "purchase",
];

const CLICKABLE_ACTION_WORDS: &[&str] = &[
    "add", "submit", "continue", "next", "select", "choose", "buy", "order", "checkout",
    "proceed", "confirm", "save", "start", "begin", "find", "search", "go", "view", "see",
];

const NAVIGATION_KEYWORDS: &[&str] = &[
    "find", "locate", "location", "store", "shop", "order", "menu", "navigation", "nav", "click",
    "button", "link", "bowl", "burrito", "taco", "salad", "quesadilla", "food", "meal", "item",
    "build", "custom", "lifestyle",
];

const LOCATION_FINDER_PHRASES: &[&str] = &[
    "find location",
    "find store",
    "store locator",
    "location finder",
    "enter location",
    "location search",
    "find a store",
    "store finder",
    "find locations",
];

const QA_ATTRS: &[&str] = &[
    "data-qa-item-name",
    "data-qa-group-name",
    "data-qa-name",
    "data-testid",
    "data-test-id",
];

const MENU_ATTRS: &[&str] = &[
    "data-menu-item",
    "data-menu-category",
    "data-item-name",
    "data-category",
    "data-meal-type",
];

const LOCATION_ATTRS: &[&str] = &[
    "data-qa-restaurant-id",
    "data-store-id",
    "data-location-id",
    "data-shop-id",
    "data-venue-id",
    "data-place-id",
];

static TAG_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<(a|button|input|select|div|span|li)\b((?:[^>"']|"[^"]*"|'[^']*')*)(/?)>"#)
        .unwrap()
});
static ATTR_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*"([^"]*)"|([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*'([^']*)'"#).unwrap());
static TAG_TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)>([^<]{0,400})<").unwrap());
static TAG_STRIP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<[^>]+>").unwrap());

/// Two-pass regex scan: traditional interactive tags first, then generic
/// containers gated by the clickable-div heuristic (spec §4.1).
pub fn extract(raw_html: &str) -> Vec<Element> {
    let mut out = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for caps in TAG_OPEN.captures_iter(raw_html) {
        let tag = caps[1].to_lowercase();
        let attr_str = &caps[2];
        let self_closing = &caps[3] == "/";
        let attrs = parse_attrs(attr_str);

        let raw_text = if self_closing || tag == "input" {
            String::new()
        } else {
            extract_following_text(raw_html, caps.get(0).unwrap().end())
        };

        let is_interactive_tag = matches!(tag.as_str(), "a" | "button" | "input" | "select");
        let is_candidate_container = matches!(tag.as_str(), "div" | "span" | "li");

        if is_candidate_container && !is_clickable_div(&attrs, &raw_text) {
            continue;
        }
        if !is_interactive_tag && !is_candidate_container {
            continue;
        }

        let text = extract_meaningful_text(&raw_text, &attrs);
        if text.is_empty() && !has_affordance_class(&attrs) {
            continue;
        }

        let dedup_key = (
            tag.clone(),
            class_signature(&attrs),
            text.chars().take(30).collect::<String>(),
        );
        if !seen.insert(dedup_key) {
            continue;
        }

        let selectors = candidate_selectors(&tag, &attrs, &text);
        out.push(Element {
            tag,
            text,
            attrs,
            selectors,
            score: 0.0,
            candidate_id: 0,
        });
    }

    out
}

fn extract_following_text(html: &str, from: usize) -> String {
    if let Some(m) = TAG_TEXT.find(&html[from..]) {
        let inner = &m.as_str()[1..m.as_str().len() - 1];
        norm_text(inner)
    } else {
        String::new()
    }
}

/// Attributes kept verbatim besides the `data-*`/`aria-*` prefixes (spec §3
/// Element.attrs: "retained subset of HTML attributes").
const RETAINED_ATTRS: &[&str] =
    &["id", "class", "role", "name", "placeholder", "href", "onclick", "tabindex", "type"];

fn is_retained_attr(key: &str) -> bool {
    RETAINED_ATTRS.contains(&key) || key.starts_with("data-") || key.starts_with("aria-")
}

fn parse_attrs(attr_str: &str) -> BTreeMap<String, String> {
    let mut attrs = BTreeMap::new();
    for caps in ATTR_PAIR.captures_iter(attr_str) {
        let (k, v) = if let (Some(k), Some(v)) = (caps.get(1), caps.get(2)) {
            (k, v)
        } else if let (Some(k), Some(v)) = (caps.get(3), caps.get(4)) {
            (k, v)
        } else {
            continue;
        };
        let key = k.as_str().to_lowercase();
        if is_retained_attr(&key) {
            attrs.insert(key, v.as_str().to_string());
        }
    }
    attrs
}

fn norm_text(raw: &str) -> String {
    let stripped = TAG_STRIP.replace_all(raw, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn class_string(attrs: &BTreeMap<String, String>) -> String {
    attrs.get("class").cloned().unwrap_or_default()
}

fn class_signature(attrs: &BTreeMap<String, String>) -> String {
    let mut classes: Vec<&str> = class_string(attrs).split_whitespace().collect();
    classes.sort_unstable();
    classes.join(".")
}

fn has_affordance_class(attrs: &BTreeMap<String, String>) -> bool {
    let classes = class_string(attrs).to_lowercase();
    CLICKABLE_BUTTON_CLASSES.iter().any(|c| classes.contains(c))
        || attrs.contains_key("onclick")
        || attrs.contains_key("role")
}

/// Meaningful-text extraction priority (spec §3, SPEC_FULL §0.6):
/// recognized data-attribute > short clean visible text > noise-stripped
/// leading clause.
pub fn extract_meaningful_text(raw_text: &str, attrs: &BTreeMap<String, String>) -> String {
    for key in DATA_ATTR_TEXT_PRIORITY {
        if let Some(v) = attrs.get(*key) {
            let v = v.trim();
            if v.len() > 1 {
                return norm_text(v);
            }
        }
    }

    let text = norm_text(raw_text);
    let trimmed = text.trim();
    if (2..=50).contains(&trimmed.chars().count()) {
        let alnum = trimmed.chars().filter(|c| c.is_alphanumeric() || c.is_whitespace()).count();
        let ratio = alnum as f64 / trimmed.chars().count().max(1) as f64;
        let has_price = PRICE_MARKERS.iter().any(|m| trimmed.contains(m));
        if ratio > 0.7 && !has_price {
            return trimmed.to_string();
        }
    }

    // Fall back to the leading 1-3 words, noise stripped.
    trimmed
        .split_whitespace()
        .take(3)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Clickable-div heuristic (spec §4.1, SPEC_FULL §0.6).
pub fn is_clickable_div(attrs: &BTreeMap<String, String>, text: &str) -> bool {
    let has_data_attr = attrs.keys().any(|k| k.starts_with("data-"));
    if has_data_attr && !text.trim().is_empty() {
        return true;
    }

    if QA_ATTRS.iter().any(|a| attrs.get(*a).map(|v| !v.is_empty()).unwrap_or(false)) {
        return true;
    }
    if MENU_ATTRS.iter().any(|a| attrs.get(*a).map(|v| !v.is_empty()).unwrap_or(false)) {
        return true;
    }
    if LOCATION_ATTRS.iter().any(|a| attrs.get(*a).map(|v| !v.is_empty()).unwrap_or(false)) {
        return true;
    }

    if attrs.get("onclick").map(|v| !v.is_empty()).unwrap_or(false) {
        return true;
    }
    if let Some(role) = attrs.get("role") {
        if matches!(role.as_str(), "button" | "link" | "tab" | "menuitem" | "option") {
            return true;
        }
    }
    if let Some(tabindex) = attrs.get("tabindex") {
        if tabindex != "-1" {
            return true;
        }
    }

    let classes = class_string(attrs).to_lowercase();
    if CLICKABLE_BUTTON_CLASSES.iter().any(|p| classes.contains(p)) {
        return true;
    }

    let text_lower = text.to_lowercase();
    if !text_lower.trim().is_empty()
        && CLICKABLE_ACTION_WORDS.iter().any(|w| text_lower.contains(w))
    {
        return true;
    }

    let combined = format!(
        "{} {} {} {}",
        text_lower,
        classes,
        attrs.get("data-testid").cloned().unwrap_or_default().to_lowercase(),
        attrs.get("aria-label").cloned().unwrap_or_default().to_lowercase()
    );

    if LOCATION_FINDER_PHRASES.iter().any(|p| combined.contains(p)) {
        return true;
    }

    let keyword_count = NAVIGATION_KEYWORDS.iter().filter(|kw| combined.contains(*kw)).count();
    keyword_count >= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_anchor_and_button() {
        let html = r#"<a href="/x" id="go">Go now</a><button class="btn">Submit</button>"#;
        let els = extract(html);
        assert!(els.iter().any(|e| e.tag == "a" && e.text == "Go now"));
        assert!(els.iter().any(|e| e.tag == "button" && e.text == "Submit"));
    }

    #[test]
    fn clickable_div_with_data_attr_and_text_is_kept() {
        let html = r#"<div data-qa-item-name="Burrito Bowl">Burrito Bowl</div>"#;
        let els = extract(html);
        assert_eq!(els.len(), 1);
        assert_eq!(els[0].text, "Burrito Bowl");
    }

    #[test]
    fn non_clickable_div_is_dropped() {
        let html = r#"<div class="wrapper">just some paragraph text with no affordance</div>"#;
        let els = extract(html);
        assert!(els.is_empty());
    }

    #[test]
    fn dedup_collapses_repeated_elements() {
        let html = r#"<a class="x" id="a1">Same</a><a class="x" id="a2">Same</a>"#;
        let els = extract(html);
        assert_eq!(els.len(), 1);
    }

    #[test]
    fn empty_html_yields_no_elements() {
        assert!(extract("").is_empty());
    }

    #[test]
    fn data_attribute_wins_over_visible_text() {
        let html = r#"<button data-qa-item-name="Steak Bowl">ignored label</button>"#;
        let els = extract(html);
        assert_eq!(els[0].text, "Steak Bowl");
    }
}
