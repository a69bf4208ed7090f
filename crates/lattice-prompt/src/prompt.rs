//! Deterministic prompt assembly (spec §4.2 `build_reasoning_prompt`).
//!
//! `lattice-memory` formats `PageContext.recent_events` lines as
//! `"step <n> <✓|✗> <verb> candidate=<id> changed=<bool>"` (or
//! `"step <n> <✓|✗> navigate to <url>"` for navigation) — this module
//! parses that exact shape back out for cycle detection. If that contract
//! ever changes, the regex below must change with it.

use once_cell::sync::Lazy;
use regex::Regex;

use lattice_types::PageContext;

pub const MAX_CANDIDATES: usize = 50;
pub const MAX_SELECTORS_PER_CANDIDATE: usize = 3;
const MAX_SKELETON_CHARS: usize = 4_000;

static CANDIDATE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"candidate=(\d+)").unwrap());

pub const SYSTEM_INSTRUCTIONS: &str = "You are an intelligent web-navigation planner with access to recent memory, \
state tracking, and breadcrumb context. Given a goal, DOM skeleton, ranked candidates, and progress history, \
return 1-3 JSON commands that make concrete progress toward the goal.\n\n\
CONTEXTUAL AWARENESS: use breadcrumb progress to understand where you are in the workflow. Pay attention to DOM \
signature changes and success/failure patterns from recent actions.\n\n\
CANDIDATE DISCIPLINE (HARD): you may only refer to an element by its integer candidate_id from the Ranked \
Candidates list below. Never invent a selector; the executor resolves candidate_id to a selector on your behalf \
and will drop any command whose candidate_id does not exist in this page's candidates.\n\n\
TOP-10 GATE (HARD): choose a candidate_id from the top 10 by score unless an override is justified. Choosing \
outside the top 5 requires a non-empty override_reason citing at least two concrete signals (for example: \"no \
noun match in top-5; candidate 14 has data-qa-item-name exact match\").\n\n\
GOAL LEXICON: derive target nouns (things to click or select) and verbs/qualifiers from the goal before choosing.\n\n\
DISQUALIFIERS: avoid marketing/hero/promo copy, group/catering language, and prebuilt/lifestyle items unless the \
goal explicitly asks for them.\n\n\
PREFERENCES: prefer candidates whose text or attributes contain a goal noun; prefer semantic selectors (data-*, \
role, aria-*) over decorative containers; prefer the option most likely to reach the next state in the fewest \
steps; never repeat a candidate_id that failed or produced no DOM change in the last 3 events without an \
override_reason explaining the retry.\n\n\
TYPING PROTOCOL: follow `type` with `press Enter` (or set `press_enter: true`) for search fields and forms.\n\n\
PROGRESS VERIFICATION: a DOM signature change is evidence of a successful action; an unchanged signature after an \
action means try a different approach.\n\n\
Return ONLY valid JSON. Every command must include `type` and, where applicable, `candidate_id`. Include `why` \
reasoning in `rationale`. Limit commands to 1-3.";

fn affordance_hints(goal: &str) -> Option<(&'static str, String)> {
    let g = goal.to_lowercase();
    if ["location", "zip", "postal", "address", "store", "find"].iter().any(|k| g.contains(k)) {
        return Some((
            "Location Search Hints",
            "Look for input[type=search], input[name*='zip'], [aria-label*='location'|'zip'], [role='textbox']. \
Button triggers: 'Find Store', 'Store Locator', 'Find Location'."
                .to_string(),
        ));
    }
    if g.contains("search") {
        return Some((
            "Search Hints",
            "Primary: input[type=search], input[name*='search']. Always press Enter after typing.".to_string(),
        ));
    }
    if ["menu", "navigate", "go to"].iter().any(|k| g.contains(k)) {
        return Some((
            "Navigation Hints",
            "Look for nav elements, [role='navigation'], .menu, .nav. Mobile: button[aria-label*='menu'].".to_string(),
        ));
    }
    None
}

fn recent_state_context(ctx: &PageContext) -> String {
    let mut parts = Vec::new();
    if ctx.total_steps > 0 {
        parts.push(format!("STEP {} of {}", ctx.step_number, ctx.total_steps));
    }

    if !ctx.recent_events.is_empty() {
        parts.push("RECENT ACTIONS:".to_string());
        let start = ctx.recent_events.len().saturating_sub(5);
        for line in &ctx.recent_events[start..] {
            parts.push(format!("  {line}"));
        }

        let window_start = ctx.recent_events.len().saturating_sub(3);
        let mut clicked_ids: Vec<u32> = Vec::new();
        for line in &ctx.recent_events[window_start..] {
            for caps in CANDIDATE_TOKEN.captures_iter(line) {
                if let Ok(id) = caps[1].parse::<u32>() {
                    clicked_ids.push(id);
                }
            }
        }
        let mut seen = std::collections::HashSet::new();
        let mut warned = std::collections::HashSet::new();
        for id in &clicked_ids {
            if !seen.insert(*id) && warned.insert(*id) {
                parts.push(format!(
                    "CYCLE DETECTED: candidate_id {id} referenced more than once in the last 3 events - \
do not repeat it without an override_reason."
                ));
            }
        }
    }

    if let Some(prev_sig) = &ctx.previous_signature {
        parts.push(format!("PREV DOM SIGNATURE: {prev_sig}"));
    }

    parts.join("\n")
}

fn lattice_guidance(ctx: &PageContext) -> String {
    match &ctx.lattice_state {
        Some(state) => {
            let mut parts = Vec::new();
            if let Some(current) = state.planned_steps.get(state.current_index) {
                parts.push(format!("LATTICE GUIDANCE: {current}"));
            }
            if let Some(next) = state.planned_steps.get(state.current_index + 1) {
                parts.push(format!("NEXT PLANNED: {next}"));
            }
            if !state.accumulated_patterns.is_empty() {
                parts.push("SUCCESSFUL PATTERNS:".to_string());
                let start = state.accumulated_patterns.len().saturating_sub(3);
                for pattern in &state.accumulated_patterns[start..] {
                    parts.push(format!("  - {pattern}"));
                }
            }
            if parts.is_empty() {
                "LATTICE: no specific guidance available".to_string()
            } else {
                parts.join("\n")
            }
        }
        None => "LATTICE: no specific guidance available".to_string(),
    }
}

fn delta_verification(ctx: &PageContext) -> String {
    let mut lines = vec![
        "PROGRESS VERIFICATION:".to_string(),
        "- DOM signature changes indicate successful actions".to_string(),
        "- URL changes suggest navigation progress".to_string(),
        "- if signature unchanged after action, try a different approach".to_string(),
    ];
    lines.push(format!("- current DOM signature: {}", ctx.signature));
    lines.join("\n")
}

struct ShapedCandidate<'a> {
    candidate_id: u32,
    tag: &'a str,
    text: &'a str,
    score: f64,
    selectors: Vec<&'a str>,
}

fn shape_candidates(ctx: &PageContext) -> Vec<ShapedCandidate<'_>> {
    ctx.interactive
        .iter()
        .take(MAX_CANDIDATES)
        .map(|el| ShapedCandidate {
            candidate_id: el.candidate_id,
            tag: el.tag.as_str(),
            text: el.text.as_str(),
            score: el.score,
            selectors: el.selectors.iter().take(MAX_SELECTORS_PER_CANDIDATE).map(|s| s.as_str()).collect(),
        })
        .collect()
}

/// `build_reasoning_prompt(goal, ctx, recent_actions, breadcrumbs) -> String`
/// (spec §4.2). Pure function of its inputs (P10): never reads the clock,
/// randomness, or any I/O.
pub fn build_reasoning_prompt(goal: &str, ctx: &PageContext, recent_actions: &[String], breadcrumbs: &[String]) -> String {
    let mut sections: Vec<String> = Vec::new();

    sections.push(format!("System:\n{SYSTEM_INSTRUCTIONS}"));
    sections.push(format!("--- Goal ---\n{}", goal.trim()));

    if let Some((title, hints)) = affordance_hints(goal) {
        sections.push(format!("--- {title} ---\n{hints}"));
    }

    let recent = recent_state_context(ctx);
    if !recent.is_empty() {
        sections.push(format!("--- Recent State ---\n{recent}"));
    }

    sections.push(format!("--- Lattice Guidance ---\n{}", lattice_guidance(ctx)));
    sections.push(format!("--- Progress Verification ---\n{}", delta_verification(ctx)));
    sections.push(format!(
        "--- Page State ---\nURL: {}\nTitle: {}\nSignature: {}",
        ctx.url, ctx.title, ctx.signature
    ));

    let skeleton: String = ctx.skeleton.chars().take(MAX_SKELETON_CHARS).collect();
    sections.push(format!("--- DOM Skeleton (truncated) ---\n{skeleton}"));

    let candidates = shape_candidates(ctx);
    let mut candidate_lines = vec!["--- Ranked Candidates (refer to these ONLY by candidate_id) ---".to_string()];
    for c in &candidates {
        candidate_lines.push(format!(
            "{} <{}> score={:.3} text=\"{}\" selectors=[{}]",
            c.candidate_id,
            c.tag,
            c.score,
            c.text,
            c.selectors.join(", ")
        ));
    }
    sections.push(candidate_lines.join("\n"));

    if !breadcrumbs.is_empty() {
        let mut lines = vec!["--- Progress So Far ---".to_string()];
        let start = breadcrumbs.len().saturating_sub(5);
        for b in &breadcrumbs[start..] {
            lines.push(format!("- {b}"));
        }
        sections.push(lines.join("\n"));
    }

    if !recent_actions.is_empty() {
        let mut lines = vec!["--- Legacy Recent Actions ---".to_string()];
        let start = recent_actions.len().saturating_sub(3);
        for a in &recent_actions[start..] {
            lines.push(format!("- {a}"));
        }
        sections.push(lines.join("\n"));
    }

    sections.push(
        "--- Constraints ---\n\
- Do NOT click login/rewards/marketing unless explicitly required\n\
- DO NOT repeat a candidate_id from recent history without an override_reason\n\
- If stuck in a loop, try a different candidate, navigation, or a wait_for command\n\
- STOP (emit `noop` or no further commands) if the goal is achieved or clearly impossible"
            .to_string(),
    );

    sections.push(format!("--- Goal Restatement ---\nPRIMARY OBJECTIVE: {}", goal.trim()));

    sections.push(
        "--- Respond ---\n\
Return ONLY valid JSON with these exact fields:\n\
{\n  \"commands\": [{\"type\": \"type\", \"candidate_id\": 3, \"text\": \"45305\", \"press_enter\": true}],\n  \"confidence\": 0.8,\n  \"rationale\": \"candidate 3 matches the location search input, typing ZIP and pressing Enter per the typing protocol\",\n  \"breadcrumb\": \"Entered ZIP code 45305 into location search field\"\n}\n\
Limit commands to 1-3. Do not include any text outside the JSON object."
            .to_string(),
    );

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_types::Element;

    fn ctx_with_candidates() -> PageContext {
        PageContext {
            url: "https://example.com".into(),
            title: "Example".into(),
            signature: "abcdef0123456789".into(),
            interactive: vec![Element {
                tag: "button".into(),
                text: "Add to Bag".into(),
                score: 4.0,
                candidate_id: 1,
                selectors: vec!["button.add-to-bag".into()],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn prompt_is_deterministic_given_identical_inputs() {
        let ctx = ctx_with_candidates();
        let a = build_reasoning_prompt("add to bag", &ctx, &[], &[]);
        let b = build_reasoning_prompt("add to bag", &ctx, &[], &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn prompt_never_exposes_raw_selectors_outside_candidate_listing() {
        let ctx = ctx_with_candidates();
        let prompt = build_reasoning_prompt("add to bag", &ctx, &[], &[]);
        let candidates_section = prompt.split("--- Ranked Candidates").nth(1).unwrap();
        assert!(candidates_section.contains("button.add-to-bag"));
        assert!(prompt.contains("candidate_id"));
    }

    #[test]
    fn cycle_warning_appears_for_repeated_candidate() {
        let mut ctx = ctx_with_candidates();
        ctx.recent_events = vec![
            "step 1 ✗ click candidate=7 changed=false".to_string(),
            "step 2 ✗ click candidate=7 changed=false".to_string(),
        ];
        let prompt = build_reasoning_prompt("add to bag", &ctx, &[], &[]);
        assert!(prompt.contains("CYCLE DETECTED"));
        assert!(prompt.contains("candidate_id 7"));
    }

    #[test]
    fn location_goal_adds_affordance_hints() {
        let ctx = ctx_with_candidates();
        let prompt = build_reasoning_prompt("find nearest store location", &ctx, &[], &[]);
        assert!(prompt.contains("Location Search Hints"));
    }

    #[test]
    fn non_matching_goal_omits_affordance_hints() {
        let ctx = ctx_with_candidates();
        let prompt = build_reasoning_prompt("check order status", &ctx, &[], &[]);
        assert!(!prompt.contains("Location Search Hints"));
        assert!(!prompt.contains("Search Hints"));
    }
}
