//! Candidate selector generation (spec §3 `Element.selectors`, SPEC_FULL
//! §0.6). Ordered most-unique-first, capped at 5, values escaped and
//! length-capped so a selector can never smuggle attacker-controlled text
//! past a reasonable length.

use std::collections::BTreeMap;

use crate::extract::class_string;

fn esc(v: &str, limit: usize) -> String {
    let capped: String = v.chars().take(limit).collect();
    capped.replace('"', "\\\"")
}

pub fn candidate_selectors(tag: &str, attrs: &BTreeMap<String, String>, text: &str) -> Vec<String> {
    let mut sels = Vec::new();

    if let Some(v) = attrs.get("data-qa-item-name") {
        sels.push(format!("{tag}[data-qa-item-name=\"{}\"]", esc(v, 24)));
    } else if let Some(v) = attrs.get("data-qa-group-name") {
        sels.push(format!("{tag}[data-qa-group-name=\"{}\"]", esc(v, 24)));
    } else if let Some(v) = attrs.get("data-testid") {
        sels.push(format!("{tag}[data-testid=\"{}\"]", esc(v, 24)));
    } else if let Some(v) = attrs.get("data-qa-name") {
        sels.push(format!("{tag}[data-qa-name=\"{}\"]", esc(v, 24)));
    }

    if let Some(id) = attrs.get("id") {
        if !id.is_empty() {
            sels.push(format!("#{id}"));
        }
    }

    let classes = class_string(attrs);
    let first_two: Vec<&str> = classes.split_whitespace().take(2).collect();
    if !first_two.is_empty() {
        sels.push(format!("{tag}.{}", first_two.join(".")));
    }

    if let Some(role) = attrs.get("role") {
        if !role.is_empty() {
            sels.push(format!("[role=\"{}\"]", esc(role, 32)));
            if !text.is_empty() {
                sels.push(format!("[role=\"{}\"]:has-text(\"{}\")", esc(role, 32), esc(text, 48)));
            }
        }
    }

    if let Some(aria) = attrs.get("aria-label") {
        if !aria.is_empty() {
            sels.push(format!("[aria-label*=\"{}\"]", esc(aria, 24)));
        }
    }
    if let Some(name) = attrs.get("name") {
        if !name.is_empty() {
            sels.push(format!("{tag}[name*=\"{}\"]", esc(name, 24)));
        }
    }
    if let Some(placeholder) = attrs.get("placeholder") {
        if !placeholder.is_empty() {
            sels.push(format!("{tag}[placeholder*=\"{}\"]", esc(placeholder, 24)));
        }
    }
    if tag == "a" {
        if let Some(href) = attrs.get("href") {
            if !href.is_empty() {
                sels.push(format!("a[href*=\"{}\"]", esc(href, 32)));
            }
        }
    }

    if !text.is_empty() {
        sels.push(format!("{tag}:has-text(\"{}\")", esc(text, 48)));
    }

    let mut seen = std::collections::HashSet::new();
    sels.retain(|s| seen.insert(s.clone()));
    sels.truncate(5);
    sels
}
