//! Size budgets and limits, overridable via the `WEB_AGENT_*` environment
//! variables named in spec §6. Grounded on the literal defaults in
//! `original_source/tools/web_automation/dom_processor.py`.

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Clone, Debug)]
pub struct DomConfig {
    pub truncate_chars_default: usize,
    pub truncate_chars_location: usize,
    pub truncate_chars_action: usize,
    pub interactive_max_items: usize,
    pub interactive_include_text_max: usize,
}

impl Default for DomConfig {
    fn default() -> Self {
        Self {
            truncate_chars_default: env_usize("WEB_AGENT_DOM_TRUNCATE_CHARS", 50_000),
            truncate_chars_location: env_usize("WEB_AGENT_DOM_TRUNCATE_CHARS_LOCATION", 100_000),
            truncate_chars_action: env_usize("WEB_AGENT_DOM_TRUNCATE_CHARS_ACTION", 150_000),
            interactive_max_items: env_usize("WEB_AGENT_INTERACTIVE_MAX_ITEMS", 200),
            interactive_include_text_max: env_usize("WEB_AGENT_INTERACTIVE_INCLUDE_TEXT_MAX", 80),
        }
    }
}

/// Goal-aware truncation budget selection (SPEC_FULL §0.6).
pub fn budget_for_goal(cfg: &DomConfig, goal: &str) -> usize {
    let goal_lower = goal.to_lowercase();
    let wants_location = ["select", "choose", "pick", "nearest"]
        .iter()
        .any(|k| goal_lower.contains(k))
        && ["location", "restaurant", "store"]
            .iter()
            .any(|k| goal_lower.contains(k));
    let wants_action = ["add to bag", "add to cart", "checkout", "purchase", "buy"]
        .iter()
        .any(|k| goal_lower.contains(k));

    if wants_location {
        cfg.truncate_chars_location
    } else if wants_action {
        cfg.truncate_chars_action
    } else {
        cfg.truncate_chars_default
    }
}

pub fn wants_footer_preserving_truncation(goal: &str) -> bool {
    let goal_lower = goal.to_lowercase();
    ["add to bag", "add to cart", "checkout", "purchase"]
        .iter()
        .any(|k| goal_lower.contains(k))
}
