#![allow(dead_code)]

//! Step Executor (spec §4.5, component C5): one planning <-> execution
//! cycle, `reason_and_act(goal, ctx, mode, recent_actions) -> StepOutcome`,
//! following a prompt -> parse -> validate -> dispatch -> evidence loop
//! over the JSON command-batch protocol spec §4.2/§4.5 define.

mod coerce;
pub mod confirmation;
mod discipline;
pub mod errors;

use std::sync::Arc;

use lattice_browser::{BrowserDriver, CancellationToken};
use lattice_llm::LlmProvider;
use lattice_policy::{PolicyConfig, PolicyVerdict, RunMode};
use lattice_prompt::{build_reasoning_prompt, parse_planner_response, RawPlannerResponse};
use lattice_types::{CommandBatch, Evidence, LogicalSuccess, PageContext, StepOutcome};

pub use confirmation::{AlwaysAllowLowRisk, AlwaysDeny, ConfirmSummary, ConfirmationCallback};
pub use errors::ExecutorError;

/// One reasoning-step cycle, bundling the collaborators `reason_and_act`
/// needs so callers (the Coordinator) don't have to thread five
/// parameters through every call site.
pub struct StepExecutor {
    llm: Arc<dyn LlmProvider>,
    policy: PolicyConfig,
    confirmation: Arc<dyn ConfirmationCallback>,
}

impl StepExecutor {
    pub fn new(llm: Arc<dyn LlmProvider>, policy: PolicyConfig) -> Self {
        Self { llm, policy, confirmation: Arc::new(AlwaysDeny) }
    }

    pub fn with_confirmation(mut self, confirmation: Arc<dyn ConfirmationCallback>) -> Self {
        self.confirmation = confirmation;
        self
    }

    /// `reason_and_act(goal, ctx, mode, recent_actions) -> StepOutcome`
    /// (spec §4.5), executed against `driver` under `cancel`.
    pub async fn reason_and_act(
        &self,
        goal: &str,
        ctx: &PageContext,
        mode: RunMode,
        recent_actions: &[String],
        breadcrumbs: &[String],
        driver: &mut dyn BrowserDriver,
        cancel: &mut CancellationToken,
    ) -> StepOutcome {
        // Step 1: build the deterministic prompt.
        let prompt = build_reasoning_prompt(goal, ctx, recent_actions, breadcrumbs);

        // Step 2: call the LLM, tolerating a transport failure with one
        // retry, then a malformed reply with tolerant re-parse, and
        // finally degrading to a synthesized noop (spec §7).
        let raw_reply = self.call_llm_with_retry(&prompt).await;
        let parsed = self.parse_reply(&raw_reply);

        // Steps 3-5: coerce into a validated, capped CommandBatch.
        let (batch, mut coercion_errors) = coerce::coerce(parsed, ctx);
        let (batch, discipline_errors) = discipline::enforce(batch, ctx);
        coercion_errors.extend(discipline_errors);

        // Step 6: safety classification.
        let decision = lattice_policy::classify(&batch, ctx, mode, batch.confidence, &self.policy);
        if decision.verdict == PolicyVerdict::Deny || (decision.verdict == PolicyVerdict::Confirm && {
            let summary = ConfirmSummary {
                rationale: batch.rationale.clone(),
                confidence: batch.confidence,
                command_count: batch.commands.len(),
            };
            !self.confirmation.confirm(&decision.reasons, &summary).await
        }) {
            tracing::info!(reasons = ?decision.reasons, "step paused by safety policy");
            return StepOutcome {
                confidence: batch.confidence,
                rationale: batch.rationale.clone(),
                breadcrumb: String::new(),
                evidence: Evidence::empty_with_pause_reasons(decision.reasons),
                batch,
                logical_success: LogicalSuccess::Unknown,
            };
        }

        // Step 7: execute via the browser controller.
        let mut evidence = lattice_browser::execute_action_batch(driver, &batch, ctx, cancel).await;
        evidence.errors.extend(coercion_errors);

        // Step 8: package and return. Logical-success arbitration is the
        // Coordinator's job (spec §4.7); the executor only reports driver
        // truth plus evidence.
        StepOutcome {
            confidence: batch.confidence,
            rationale: batch.rationale.clone(),
            breadcrumb: batch.breadcrumb.clone(),
            evidence,
            batch,
            logical_success: LogicalSuccess::Unknown,
        }
    }

    async fn call_llm_with_retry(&self, prompt: &str) -> String {
        let system = lattice_prompt::SYSTEM_INSTRUCTIONS;
        match self.llm.chat(system, prompt).await {
            Ok(reply) => reply,
            Err(first_err) => {
                tracing::warn!(error = %first_err, "llm transport error, retrying once");
                match self.llm.chat(system, prompt).await {
                    Ok(reply) => reply,
                    Err(second_err) => {
                        tracing::warn!(error = %second_err, "llm transport error on retry, synthesizing noop");
                        r#"{"commands": [], "confidence": 0.0, "rationale": "llm transport failed twice", "breadcrumb": ""}"#.to_string()
                    }
                }
            }
        }
    }

    fn parse_reply(&self, raw_reply: &str) -> RawPlannerResponse {
        match parse_planner_response(raw_reply) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(error = %err, "llm reply failed to parse, synthesizing noop");
                RawPlannerResponse {
                    commands: Vec::new(),
                    confidence: 0.0,
                    rationale: format!("unparseable planner reply: {err}"),
                    breadcrumb: String::new(),
                    override_reason: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_browser::FakeBrowserDriver;
    use lattice_llm::ScriptedProvider;
    use lattice_types::{Command, Element};

    fn ctx_with_candidate() -> PageContext {
        PageContext {
            interactive: vec![Element {
                tag: "button".into(),
                candidate_id: 1,
                selectors: vec!["#go".into()],
                score: 5.0,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn valid_click_reply_executes_and_reports_evidence() {
        let llm = Arc::new(ScriptedProvider::new(vec![
            r#"{"commands": [{"type": "click", "candidate_id": 1}], "confidence": 0.9, "rationale": "r", "breadcrumb": "clicked go"}"#
                .to_string(),
        ]));
        let executor = StepExecutor::new(llm, PolicyConfig::default());
        let ctx = ctx_with_candidate();
        let mut driver = FakeBrowserDriver::new("<button id=\"go\">Go</button>");
        driver.set_click_effect("#go", "<div>done</div>");
        let (_c, mut token) = lattice_browser::Canceller::new();

        let outcome = executor.reason_and_act("click go", &ctx, RunMode::Autonomous, &[], &[], &mut driver, &mut token).await;

        assert_eq!(outcome.batch.commands, vec![Command::Click { candidate_id: 1 }]);
        assert!(outcome.evidence.success);
        assert!(outcome.evidence.changed);
        assert_eq!(outcome.breadcrumb, "clicked go");
    }

    #[tokio::test]
    async fn malformed_reply_synthesizes_noop_and_still_returns_outcome() {
        let llm = Arc::new(ScriptedProvider::new(vec!["not json at all".to_string()]));
        let executor = StepExecutor::new(llm, PolicyConfig::default());
        let ctx = ctx_with_candidate();
        let mut driver = FakeBrowserDriver::new("<div>x</div>");
        let (_c, mut token) = lattice_browser::Canceller::new();

        let outcome = executor.reason_and_act("do something", &ctx, RunMode::Autonomous, &[], &[], &mut driver, &mut token).await;

        assert_eq!(outcome.batch.commands, vec![Command::Noop]);
        assert!(!outcome.evidence.changed);
    }

    #[tokio::test]
    async fn unresolved_candidate_id_drops_command_to_noop() {
        let llm = Arc::new(ScriptedProvider::new(vec![
            r#"{"commands": [{"type": "click", "candidate_id": 999}], "confidence": 0.5, "rationale": "r", "breadcrumb": "b"}"#.to_string(),
        ]));
        let executor = StepExecutor::new(llm, PolicyConfig::default());
        let ctx = ctx_with_candidate();
        let mut driver = FakeBrowserDriver::new("<div>x</div>");
        let (_c, mut token) = lattice_browser::Canceller::new();

        let outcome = executor.reason_and_act("click missing", &ctx, RunMode::Autonomous, &[], &[], &mut driver, &mut token).await;
        assert_eq!(outcome.batch.commands, vec![Command::Noop]);
    }

    #[tokio::test]
    async fn destructive_navigation_is_denied_and_nothing_executes() {
        let llm = Arc::new(ScriptedProvider::new(vec![
            r#"{"commands": [{"type": "navigate", "url": "https://example.com/account/delete-account"}], "confidence": 0.9, "rationale": "r", "breadcrumb": "b"}"#
                .to_string(),
        ]));
        let executor = StepExecutor::new(llm, PolicyConfig::default());
        let ctx = PageContext::default();
        let mut driver = FakeBrowserDriver::new("<div>x</div>");
        let (_c, mut token) = lattice_browser::Canceller::new();

        let outcome = executor.reason_and_act("delete my account", &ctx, RunMode::Interactive, &[], &[], &mut driver, &mut token).await;

        assert!(outcome.evidence.findings.contains_key("pause_reasons"));
        assert_eq!(outcome.evidence.dom_before_sig, "");
    }

    #[tokio::test]
    async fn zip_type_auto_appends_enter_and_produces_changed_evidence() {
        let llm = Arc::new(ScriptedProvider::new(vec![
            r#"{"commands": [{"type": "type", "candidate_id": 1, "text": "45305"}], "confidence": 0.8, "rationale": "typing zip", "breadcrumb": "Entered ZIP code 45305"}"#
                .to_string(),
        ]));
        let executor = StepExecutor::new(llm, PolicyConfig::default());
        let ctx = PageContext {
            interactive: vec![Element {
                tag: "input".into(),
                candidate_id: 1,
                selectors: vec!["input[name*='zip']".into()],
                score: 5.0,
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut driver = FakeBrowserDriver::new("<input name=\"zip\">");
        driver.set_type_effect("input[name*='zip']", "<div>results</div>");
        let (_c, mut token) = lattice_browser::Canceller::new();

        let outcome = executor
            .reason_and_act("find stores near 45305", &ctx, RunMode::Autonomous, &[], &[], &mut driver, &mut token)
            .await;

        assert_eq!(outcome.batch.commands.len(), 2);
        assert!(matches!(outcome.batch.commands[1], Command::Press { ref key, .. } if key == "Enter"));
        assert!(outcome.evidence.changed);
        assert!(outcome.breadcrumb.contains("45305"));
    }
}
