#![allow(dead_code)]

//! Lattice web agent: the root crate wiring the Coordinator (§4.7) to a
//! real browser and LLM provider behind the single public entry point
//! spec §6 names, `execute_cognitive_web_task`.

pub mod audit;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod observation;

use std::sync::Arc;

pub use config::RuntimeConfig;
pub use coordinator::{Coordinator, WebTaskResult};
pub use errors::LatticeError;

use lattice_browser::{BrowserDriver, Canceller, ChromiumBrowserDriver};
use lattice_llm::LlmProvider;
use lattice_memory::Lattice;

/// `execute_cognitive_web_task(goal, url, llm_client, lattice) ->
/// {success, goal, url, timestamp}` (spec §6): the single user-visible
/// entry point, matching the literal signature the spec names. Drives a
/// real [`ChromiumBrowserDriver`] internally and loads configuration from
/// the environment/config file via [`RuntimeConfig::load`].
///
/// Tests and the CLI use [`execute_cognitive_web_task_with_driver`]
/// directly so a [`lattice_browser::FakeBrowserDriver`] can stand in for
/// Chromium — this function is the literal public surface, that one is
/// the dependency-injectable variant behind it.
pub async fn execute_cognitive_web_task(
    goal: &str,
    url: &str,
    llm_client: Arc<dyn LlmProvider>,
    lattice: &mut Lattice,
) -> WebTaskResult {
    let cfg = RuntimeConfig::load(None).unwrap_or_default();
    let mut driver = ChromiumBrowserDriver::new();
    let max_iterations = cfg.max_iterations;
    execute_cognitive_web_task_with_driver(goal, url, llm_client, lattice, &mut driver, &cfg, true, max_iterations).await
}

/// Dependency-injectable variant of [`execute_cognitive_web_task`]: takes
/// an explicit [`BrowserDriver`] and [`RuntimeConfig`] instead of
/// constructing Chromium and loading configuration itself.
#[allow(clippy::too_many_arguments)]
pub async fn execute_cognitive_web_task_with_driver(
    goal: &str,
    url: &str,
    llm_client: Arc<dyn LlmProvider>,
    lattice: &mut Lattice,
    driver: &mut dyn BrowserDriver,
    cfg: &RuntimeConfig,
    headless: bool,
    max_iterations: u32,
) -> WebTaskResult {
    let audit = crate::audit::AuditWriter::new(cfg.debug_dir.clone(), cfg.debug, &lattice.session_id().to_string());
    let coordinator = Coordinator::new(llm_client, cfg.policy.clone(), cfg.dom.clone(), cfg.run_mode)
        .with_step_sleep_ms(cfg.step_sleep_ms)
        .with_headless(headless)
        .with_audit(audit);
    let (_canceller, mut token) = Canceller::new();
    coordinator.execute_web_task(driver, &mut token, lattice, url, goal, max_iterations).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_browser::FakeBrowserDriver;
    use lattice_llm::ScriptedProvider;
    use lattice_types::SessionId;

    #[tokio::test]
    async fn execute_cognitive_web_task_with_driver_reports_success() {
        let click_reply =
            r#"{"commands": [{"type": "click", "candidate_id": 1}], "confidence": 0.9, "rationale": "r", "breadcrumb": "clicked go"}"#
                .to_string();
        let llm = Arc::new(ScriptedProvider::new(vec![click_reply.clone(), click_reply]));
        let mut driver = FakeBrowserDriver::new("<button id=\"go\">Go</button>");
        driver.set_click_effect("#go", "<div>done</div>");
        let mut lattice = Lattice::new(SessionId::new());
        let cfg = RuntimeConfig::default();

        let result =
            execute_cognitive_web_task_with_driver("click go", "https://fake.test", llm, &mut lattice, &mut driver, &cfg, true, 3).await;

        assert!(result.success);
        assert_eq!(result.goal, "click go");
    }
}
