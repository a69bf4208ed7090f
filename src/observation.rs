//! Observation-step prompt + schema (SPEC_FULL §0.6, supplemented from
//! `original_source/`): a `StepKind::Observation` step never touches the
//! browser — it asks the LLM to read the current page and report whether
//! a condition holds, returning `{summary, findings, verification:
//! {complete, reason}, breadcrumb}` instead of a command batch.

use lattice_types::PageContext;

pub const OBSERVATION_SYSTEM_INSTRUCTIONS: &str = "You are observing a web page to check progress toward a goal, not \
acting on it. Read the page state and report what you see. Return ONLY valid JSON: {\"summary\": \"one sentence \
describing the page state\", \"findings\": {}, \"verification\": {\"complete\": true|false, \"reason\": \"why\"}, \
\"breadcrumb\": \"short progress note\"}. `findings` may contain any string-keyed facts worth remembering (for \
example {\"order_total\": \"$42.10\"}). Do not include any text outside the JSON object.";

/// Mirrors [`lattice_prompt::build_reasoning_prompt`]'s structure (goal,
/// page state, skeleton, breadcrumbs) but omits the ranked-candidates
/// section entirely: an observation step never emits a `candidate_id`.
pub fn build_observation_prompt(goal: &str, step_goal: &str, ctx: &PageContext, breadcrumbs: &[String]) -> String {
    let mut sections = vec![
        format!("System:\n{OBSERVATION_SYSTEM_INSTRUCTIONS}"),
        format!("--- Overall Goal ---\n{}", goal.trim()),
        format!("--- Observation Task ---\n{}", step_goal.trim()),
        format!("--- Page State ---\nURL: {}\nTitle: {}\nSignature: {}", ctx.url, ctx.title, ctx.signature),
    ];

    let skeleton: String = ctx.skeleton.chars().take(4_000).collect();
    sections.push(format!("--- DOM Skeleton (truncated) ---\n{skeleton}"));

    if !breadcrumbs.is_empty() {
        let mut lines = vec!["--- Progress So Far ---".to_string()];
        let start = breadcrumbs.len().saturating_sub(5);
        for b in &breadcrumbs[start..] {
            lines.push(format!("- {b}"));
        }
        sections.push(lines.join("\n"));
    }

    sections.push(
        "--- Respond ---\nReturn ONLY valid JSON with these exact fields:\n\
{\n  \"summary\": \"...\",\n  \"findings\": {},\n  \"verification\": {\"complete\": false, \"reason\": \"...\"},\n  \"breadcrumb\": \"...\"\n}"
            .to_string(),
    );

    sections.join("\n\n")
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
#[serde(default)]
struct RawVerification {
    complete: bool,
    reason: String,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
#[serde(default)]
struct RawObservation {
    summary: String,
    findings: serde_json::Map<String, serde_json::Value>,
    verification: RawVerification,
    breadcrumb: String,
}

/// Result of one observation step: never touches the browser, so there is
/// no `Evidence` in the `lattice_types` sense — this is its own small
/// outcome shape folded into `Evidence.findings` by the caller.
pub struct ObservationOutcome {
    pub summary: String,
    pub findings: std::collections::BTreeMap<String, serde_json::Value>,
    pub complete: bool,
    pub reason: String,
    pub breadcrumb: String,
}

/// Tolerant parse of an observation reply (spec §9 "LLM JSON robustness"
/// applies here too): a malformed reply degrades to an incomplete,
/// unverified observation rather than erroring out the task.
pub fn parse_observation_reply(raw_reply: &str) -> ObservationOutcome {
    let parsed = lattice_prompt::first_balanced_json_object(raw_reply)
        .and_then(|obj| serde_json::from_str::<RawObservation>(obj).ok());

    match parsed {
        Some(raw) => ObservationOutcome {
            summary: raw.summary,
            findings: raw.findings.into_iter().collect(),
            complete: raw.verification.complete,
            reason: raw.verification.reason,
            breadcrumb: raw.breadcrumb,
        },
        None => ObservationOutcome {
            summary: String::new(),
            findings: std::collections::BTreeMap::new(),
            complete: false,
            reason: "unparseable observation reply".to_string(),
            breadcrumb: String::new(),
        },
    }
}
