//! Coordinator (spec §4.7, component C7): owns the plan/execute loop —
//! `create_web_automation_plan(goal) -> Vec<PlannedStep>` and
//! `execute_web_task(url, objectives, max_iterations)` — threading the
//! Cognitive Lattice, the Step Executor, and the DOM Processor together.
//! Structured as a plan-then-reason-and-act browser loop, generalized
//! from a chat-turn orchestration loop (see `DESIGN.md`).

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use lattice_browser::{BrowserDriver, CancellationToken};
use lattice_dom::DomConfig;
use lattice_executor::{ConfirmationCallback, StepExecutor};
use lattice_llm::LlmProvider;
use lattice_memory::Lattice;
use lattice_policy::{PolicyConfig, RunMode};
use lattice_types::{
    Command, Evidence, LatticeEventType, LatticeStateBrief, LogicalSuccess, PlannedStep, StepKind, VerificationRule,
};

const PLANNING_SYSTEM_INSTRUCTIONS: &str = "You are a web-task planner. Decompose the user's goal into 2-6 short, \
concrete, sequential steps a browser automation agent can execute one at a time. Each step is either an \"action\" \
(click/type/navigate toward the goal) or an \"observation\" (read the current page and decide whether a condition \
holds). Attach a verification rule to a step only when one is meaningful: \"url_pattern\" (value: an array of \
substrings the URL must contain once the step succeeds), \"finding_flag\" (value: a string key that must be truthy \
in the step's findings), \"dom_changed\" (the DOM must differ before/after the step), or \"none\". Return ONLY \
valid JSON: {\"steps\": [{\"description\": \"...\", \"kind\": \"action\"|\"observation\", \"verification\": \
{\"type\": \"none\"|\"url_pattern\"|\"finding_flag\"|\"dom_changed\", \"value\": null}}]}. Do not include any text \
outside the JSON object.";

/// `{success, goal, url, timestamp}` (spec §6, the return shape of the
/// top-level `execute_cognitive_web_task` entry point).
#[derive(Clone, Debug)]
pub struct WebTaskResult {
    pub success: bool,
    pub goal: String,
    pub url: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl WebTaskResult {
    fn new(success: bool, goal: &str, url: &str) -> Self {
        Self { success, goal: goal.to_string(), url: url.to_string(), timestamp: chrono::Utc::now() }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPlan {
    steps: Vec<RawPlannedStep>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPlannedStep {
    description: String,
    kind: String,
    verification: Option<RawVerification>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawVerification {
    #[serde(rename = "type")]
    kind: String,
    value: serde_json::Value,
}

fn to_step_kind(raw: &str) -> StepKind {
    if raw.eq_ignore_ascii_case("observation") {
        StepKind::Observation
    } else {
        StepKind::Action
    }
}

fn to_verification_rule(raw: Option<RawVerification>) -> VerificationRule {
    let Some(raw) = raw else {
        return VerificationRule::None;
    };
    match raw.kind.as_str() {
        "url_pattern" => {
            let patterns: Vec<String> = match raw.value {
                serde_json::Value::Array(items) => items.into_iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
                serde_json::Value::String(s) => vec![s],
                _ => Vec::new(),
            };
            if patterns.is_empty() {
                VerificationRule::None
            } else {
                VerificationRule::UrlPattern(patterns)
            }
        }
        "finding_flag" => match raw.value.as_str() {
            Some(s) if !s.is_empty() => VerificationRule::FindingFlag(s.to_string()),
            _ => VerificationRule::None,
        },
        "dom_changed" => VerificationRule::DomChanged,
        _ => VerificationRule::None,
    }
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Null => false,
        serde_json::Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        serde_json::Value::String(s) => !s.is_empty() && s != "false",
        serde_json::Value::Array(a) => !a.is_empty(),
        serde_json::Value::Object(o) => !o.is_empty(),
    }
}

/// Arbitrates whether a step's `VerificationRule` is satisfied (SPEC_FULL
/// §0.7): domain-agnostic, driven entirely by the rule the plan attached
/// to the step rather than hard-coded heuristics in this function.
fn arbitrate_logical_success(rule: &VerificationRule, url_after: &str, evidence: &Evidence) -> LogicalSuccess {
    match rule {
        VerificationRule::None => {
            if evidence.success {
                LogicalSuccess::Unknown
            } else {
                LogicalSuccess::False
            }
        }
        VerificationRule::UrlPattern(patterns) => {
            if patterns.iter().any(|p| url_after.contains(p.as_str())) {
                LogicalSuccess::True
            } else {
                LogicalSuccess::False
            }
        }
        VerificationRule::FindingFlag(key) => match evidence.findings.get(key) {
            Some(v) if is_truthy(v) => LogicalSuccess::True,
            Some(_) => LogicalSuccess::False,
            None => LogicalSuccess::Unknown,
        },
        VerificationRule::DomChanged => {
            if evidence.changed {
                LogicalSuccess::True
            } else {
                LogicalSuccess::False
            }
        }
    }
}

/// Formats one step's outcome as the fixed-shape event line the Prompt
/// Builder's cycle-detection regex parses back out: `"step <n> <✓|✗> <verb>
/// candidate=<id> changed=<bool>"`, or `"step <n> <✓|✗> navigate to
/// <url>"` for a pure navigation.
fn format_event_line(step_number: u32, commands: &[Command], evidence: &Evidence) -> String {
    let mark = if evidence.success { "✓" } else { "✗" };
    if let [Command::Navigate { url }] = commands {
        return format!("step {step_number} {mark} navigate to {url}");
    }
    let primary = commands.iter().find(|c| !matches!(c, Command::Noop)).unwrap_or(&Command::Noop);
    let candidate = primary
        .candidate_id()
        .or(evidence.used_candidate_id)
        .map(|id| id.to_string())
        .unwrap_or_else(|| "none".to_string());
    format!("step {step_number} {mark} {} candidate={candidate} changed={}", primary.kind(), evidence.changed)
}

/// Orchestrates one full task: decompose the goal into a plan, then drive
/// the Step Executor through it, arbitrating logical success per step and
/// recording everything into the Cognitive Lattice.
pub struct Coordinator {
    executor: StepExecutor,
    llm: Arc<dyn LlmProvider>,
    dom_cfg: DomConfig,
    run_mode: RunMode,
    step_sleep_ms: u64,
    headless: bool,
    audit: crate::audit::AuditWriter,
}

impl Coordinator {
    pub fn new(llm: Arc<dyn LlmProvider>, policy: PolicyConfig, dom_cfg: DomConfig, run_mode: RunMode) -> Self {
        Self {
            executor: StepExecutor::new(llm.clone(), policy),
            llm,
            dom_cfg,
            run_mode,
            step_sleep_ms: 500,
            headless: true,
            audit: crate::audit::AuditWriter::disabled(),
        }
    }

    pub fn with_audit(mut self, audit: crate::audit::AuditWriter) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_confirmation(mut self, confirmation: Arc<dyn ConfirmationCallback>) -> Self {
        self.executor = self.executor.with_confirmation(confirmation);
        self
    }

    pub fn with_step_sleep_ms(mut self, ms: u64) -> Self {
        self.step_sleep_ms = ms;
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// `create_web_automation_plan(goal) -> Vec<PlannedStep>` (spec §4.7).
    /// Degrades to a single-step plan (SPEC_FULL §0.7) whenever the
    /// planning call fails or replies with something unparseable — a
    /// malformed plan must never abort the task outright.
    pub async fn create_web_automation_plan(&self, goal: &str) -> Vec<PlannedStep> {
        let prompt = format!("--- Goal ---\n{}\n\n--- Respond ---\nReturn ONLY the JSON plan described above.", goal.trim());
        let reply = match self.llm.chat(PLANNING_SYSTEM_INSTRUCTIONS, &prompt).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!(error = %err, "planning llm call failed, falling back to a single-step plan");
                return Self::fallback_plan(goal);
            }
        };
        Self::parse_plan_reply(&reply, goal)
    }

    fn parse_plan_reply(reply: &str, goal: &str) -> Vec<PlannedStep> {
        let Some(json_slice) = lattice_prompt::first_balanced_json_object(reply) else {
            tracing::warn!("planning reply had no JSON object, falling back to a single-step plan");
            return Self::fallback_plan(goal);
        };
        let raw: RawPlan = match serde_json::from_str(json_slice) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(error = %err, "planning reply did not match the plan schema, falling back");
                return Self::fallback_plan(goal);
            }
        };
        if raw.steps.is_empty() {
            return Self::fallback_plan(goal);
        }
        raw.steps
            .into_iter()
            .enumerate()
            .map(|(idx, step)| PlannedStep {
                step_number: (idx + 1) as u32,
                description: if step.description.trim().is_empty() { goal.to_string() } else { step.description },
                kind: to_step_kind(&step.kind),
                verification: to_verification_rule(step.verification),
            })
            .collect()
    }

    fn fallback_plan(goal: &str) -> Vec<PlannedStep> {
        vec![PlannedStep { step_number: 1, description: goal.to_string(), kind: StepKind::Action, verification: VerificationRule::None }]
    }

    /// `execute_web_task(url, objectives, max_iterations)` (spec §4.7):
    /// plans, navigates, then loops `reason_and_act` over the plan until
    /// the last step's verification rule is satisfied or the iteration
    /// budget runs out.
    pub async fn execute_web_task(
        &self,
        driver: &mut dyn BrowserDriver,
        cancel: &mut CancellationToken,
        lattice: &mut Lattice,
        url: &str,
        objectives: &str,
        max_iterations: u32,
    ) -> WebTaskResult {
        let plan = self.create_web_automation_plan(objectives).await;
        let plan_descriptions: Vec<String> = plan.iter().map(|s| s.description.clone()).collect();
        lattice.create_new_task(objectives, plan_descriptions.clone());

        if let Err(err) = driver.initialize(None, self.headless).await {
            tracing::error!(error = %err, "browser initialize failed, abandoning task");
            lattice.abandon_current_task().ok();
            return WebTaskResult::new(false, objectives, url);
        }
        if let Err(err) = driver.navigate(url).await {
            tracing::error!(error = %err, "initial navigate failed, abandoning task");
            lattice.abandon_current_task().ok();
            return WebTaskResult::new(false, objectives, url);
        }

        let mut breadcrumbs: Vec<String> = Vec::new();
        let mut recent_actions: Vec<String> = Vec::new();
        let mut previous_signature: Option<String> = None;
        let total_steps = plan.len().max(1) as u32;
        let iterations = max_iterations.max(1);
        let mut steps_run: u32 = 0;
        let mut steps_succeeded: u32 = 0;

        for step_number in 1..=iterations {
            if cancel.is_cancelled() {
                tracing::info!("execution cancelled before step {step_number}");
                break;
            }

            let current_index = ((step_number - 1) as usize).min(plan.len().saturating_sub(1));
            let planned = plan.get(current_index);
            let step_goal = planned.map(|p| p.description.as_str()).unwrap_or(objectives);
            let rule = planned.map(|p| p.verification.clone()).unwrap_or_default();
            let last_step = current_index + 1 == plan.len();

            let (html, title, current_url) = match driver.get_current_dom().await {
                Ok(t) => t,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to capture dom, aborting task");
                    break;
                }
            };

            let mut ctx = lattice_dom::ctx_from_page(&current_url, &title, &html, step_goal, &self.dom_cfg);
            ctx.step_number = step_number;
            ctx.total_steps = total_steps;
            ctx.overall_goal = objectives.to_string();
            ctx.current_step_goal = step_goal.to_string();
            ctx.recent_events = recent_actions.clone();
            ctx.previous_signature = previous_signature.clone();
            ctx.breadcrumbs = breadcrumbs.clone();
            ctx.lattice_state = Some(LatticeStateBrief {
                planned_steps: plan_descriptions.clone(),
                current_index,
                accumulated_patterns: breadcrumbs.clone(),
            });

            if self.audit.is_enabled() {
                let ts = chrono::Utc::now().timestamp_millis() as u64;
                self.audit.write_dom(step_number, ts, &ctx.skeleton);
            }

            let is_observation = planned.map(|p| p.kind) == Some(StepKind::Observation);

            let (event_line, breadcrumb, logical_success, confidence, rationale, step_success) = if is_observation {
                let prompt = crate::observation::build_observation_prompt(objectives, step_goal, &ctx, &breadcrumbs);
                let reply = match self.llm.chat(crate::observation::OBSERVATION_SYSTEM_INSTRUCTIONS, &prompt).await {
                    Ok(reply) => reply,
                    Err(err) => {
                        tracing::warn!(error = %err, "observation llm call failed");
                        String::new()
                    }
                };
                let observed = crate::observation::parse_observation_reply(&reply);
                let logical_success = if observed.complete { LogicalSuccess::True } else { LogicalSuccess::False };
                let mark = if observed.complete { "\u{2713}" } else { "\u{2717}" };
                let line = format!("step {step_number} {mark} observe candidate=none changed=false");
                let breadcrumb = if observed.breadcrumb.is_empty() {
                    String::new()
                } else {
                    format!("Observed: {}", observed.breadcrumb)
                };
                (line, breadcrumb, logical_success, 1.0, observed.reason, observed.complete)
            } else {
                let outcome = self
                    .executor
                    .reason_and_act(objectives, &ctx, self.run_mode, &recent_actions, &breadcrumbs, driver, cancel)
                    .await;

                let url_after = match driver.get_current_dom().await {
                    Ok((_, _, u)) => u,
                    Err(_) => ctx.url.clone(),
                };
                let logical_success = arbitrate_logical_success(&rule, &url_after, &outcome.evidence);
                // Fall back to driver-level success when the verification
                // rule can't resolve the question either way (spec §4.7
                // step 4 "fall back to driver-level success when logical is
                // `unknown`").
                let step_success = match logical_success {
                    LogicalSuccess::True => true,
                    LogicalSuccess::False => false,
                    LogicalSuccess::Unknown => outcome.evidence.success,
                };
                let line = format_event_line(step_number, &outcome.batch.commands, &outcome.evidence);
                (line, outcome.breadcrumb.clone(), logical_success, outcome.confidence, outcome.rationale.clone(), step_success)
            };

            recent_actions.push(event_line.clone());
            if recent_actions.len() > 20 {
                recent_actions.remove(0);
            }
            if !breadcrumb.is_empty() {
                breadcrumbs.push(breadcrumb);
            }
            previous_signature = Some(ctx.signature.clone());

            lattice
                .execute_step(
                    step_number,
                    step_goal.to_string(),
                    None,
                    serde_json::json!({
                        "event": event_line,
                        "logical_success": format!("{logical_success:?}"),
                        "confidence": confidence,
                        "rationale": rationale,
                    }),
                )
                .ok();
            lattice.mark_step_completed(step_number).ok();
            lattice.add_event(LatticeEventType::WebDecision, serde_json::json!({ "step": step_number, "event": event_line }));

            steps_run += 1;
            if step_success {
                steps_succeeded += 1;
            }

            if last_step && step_success {
                break;
            }

            tokio::time::sleep(Duration::from_millis(self.step_sleep_ms)).await;
        }

        // Overall success when >= 50% of planned steps succeeded (spec
        // §4.7 step 6), not merely whether the last step resolved.
        let task_succeeded = steps_run > 0 && (steps_succeeded as f64 / steps_run as f64) >= 0.5;

        if task_succeeded {
            lattice.complete_current_task().ok();
        } else {
            lattice.abandon_current_task().ok();
        }
        driver.close(true).await.ok();

        WebTaskResult::new(task_succeeded, objectives, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_browser::{Canceller, FakeBrowserDriver};
    use lattice_llm::ScriptedProvider;
    use lattice_types::SessionId;

    #[tokio::test]
    async fn single_step_plan_completes_on_dom_change() {
        // Two identical replies: `create_web_automation_plan` consumes the
        // first (its `steps` field is absent so it degrades to the
        // single-step fallback plan), leaving the second for the actual
        // `reason_and_act` call.
        let click_reply =
            r#"{"commands": [{"type": "click", "candidate_id": 1}], "confidence": 0.9, "rationale": "r", "breadcrumb": "clicked go"}"#
                .to_string();
        let llm = Arc::new(ScriptedProvider::new(vec![click_reply.clone(), click_reply]));
        let coordinator = Coordinator::new(llm, PolicyConfig::default(), DomConfig::default(), RunMode::Autonomous);

        let mut driver = FakeBrowserDriver::new("<button id=\"go\">Go</button>");
        driver.set_click_effect("#go", "<div>done</div>");
        let (_c, mut token) = Canceller::new();
        let mut lattice = Lattice::new(SessionId::new());

        let result = coordinator.execute_web_task(&mut driver, &mut token, &mut lattice, "https://fake.test", "click go", 3).await;

        assert!(result.success);
        assert!(lattice.get_active_task().is_none());
    }

    #[tokio::test]
    async fn exhausting_iterations_without_progress_abandons_task() {
        let llm = Arc::new(ScriptedProvider::new(vec![
            r#"{"commands": [], "confidence": 0.1, "rationale": "stuck", "breadcrumb": ""}"#.to_string(),
            r#"{"commands": [], "confidence": 0.1, "rationale": "stuck", "breadcrumb": ""}"#.to_string(),
        ]));
        let coordinator = Coordinator::new(llm, PolicyConfig::default(), DomConfig::default(), RunMode::Autonomous);

        let mut driver = FakeBrowserDriver::new("<div>static</div>");
        let (_c, mut token) = Canceller::new();
        let mut lattice = Lattice::new(SessionId::new());

        let result = coordinator.execute_web_task(&mut driver, &mut token, &mut lattice, "https://fake.test", "do nothing useful", 2).await;

        assert!(!result.success);
        let task = &lattice.nodes()[0];
        assert_eq!(format!("{:?}", task.status), "Abandoned");
    }

    #[test]
    fn fallback_plan_is_a_single_action_step() {
        let plan = Coordinator::fallback_plan("buy milk");
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].kind, StepKind::Action);
        assert_eq!(plan[0].verification, VerificationRule::None);
    }

    #[test]
    fn url_pattern_rule_arbitrates_on_substring_match() {
        let rule = VerificationRule::UrlPattern(vec!["/cart".to_string()]);
        let evidence = Evidence::default();
        assert_eq!(arbitrate_logical_success(&rule, "https://x.test/cart", &evidence), LogicalSuccess::True);
        assert_eq!(arbitrate_logical_success(&rule, "https://x.test/home", &evidence), LogicalSuccess::False);
    }

    #[test]
    fn event_line_matches_the_contract_shape() {
        let evidence = Evidence { success: true, changed: true, ..Default::default() };
        let line = format_event_line(3, &[Command::Click { candidate_id: 7 }], &evidence);
        assert_eq!(line, "step 3 ✓ click candidate=7 changed=true");
    }

    #[test]
    fn navigate_event_line_uses_navigate_to_shape() {
        let evidence = Evidence { success: true, ..Default::default() };
        let line = format_event_line(1, &[Command::Navigate { url: "https://x.test".into() }], &evidence);
        assert_eq!(line, "step 1 ✓ navigate to https://x.test");
    }
}
