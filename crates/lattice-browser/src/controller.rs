//! `execute_action_batch` (spec §4.4): turns a `CommandBatch` into
//! `Evidence` by resolving each `candidate_id` against the governing
//! `PageContext`, trying selectors in order, and measuring the DOM
//! signature delta across the batch.

use std::time::{Duration, Instant};

use lattice_dom::config::DomConfig;
use lattice_types::{Command, CommandBatch, Evidence, PageContext};

use crate::cancel::CancellationToken;
use crate::driver::{BrowserDriver, DriverVerb};
use crate::errors::BrowserError;

pub const DEBOUNCE_MS: u64 = 400;
const WAIT_POLL_MS: u64 = 100;

fn dom_signature(html: &str) -> String {
    let cfg = DomConfig::default();
    let compressed = lattice_dom::compress::compress(html, "", &cfg);
    lattice_dom::compress::signature(&compressed)
}

fn selectors_for(ctx: &PageContext, candidate_id: u32) -> Option<&[String]> {
    ctx.interactive
        .iter()
        .find(|e| e.candidate_id == candidate_id)
        .map(|e| e.selectors.as_slice())
}

/// Tries each selector in order, stopping at the first that succeeds
/// (spec §4.4 step 2: "materialize the first selector ... on failure, fall
/// back to the next selector").
async fn try_with_fallback(
    driver: &mut dyn BrowserDriver,
    selectors: &[String],
    build: impl Fn(String) -> DriverVerb,
) -> Result<(), BrowserError> {
    if selectors.is_empty() {
        return Err(BrowserError::VerbFailed("no selectors available".into()));
    }
    let mut last_err = None;
    for selector in selectors {
        let verb = build(selector.clone());
        match driver.execute_verb(&verb).await {
            Ok(()) => return Ok(()),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| BrowserError::VerbFailed("no selectors tried".into())))
}

async fn wait_for_signature_change(
    driver: &mut dyn BrowserDriver,
    before_sig: &str,
    timeout_ms: u64,
) -> String {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if let Ok((html, _, _)) = driver.get_current_dom().await {
            let sig = dom_signature(&html);
            if sig != before_sig || Instant::now() >= deadline {
                return sig;
            }
        } else if Instant::now() >= deadline {
            return before_sig.to_string();
        }
        tokio::time::sleep(Duration::from_millis(WAIT_POLL_MS.min(timeout_ms))).await;
    }
}

/// `execute_action_batch(batch, ctx) -> Evidence` (spec §4.4).
pub async fn execute_action_batch(
    driver: &mut dyn BrowserDriver,
    batch: &CommandBatch,
    ctx: &PageContext,
    cancel: &mut CancellationToken,
) -> Evidence {
    let started = Instant::now();
    let mut errors: Vec<String> = Vec::new();
    let mut used_candidate_id = None;

    let dom_before_sig = match driver.get_current_dom().await {
        Ok((html, _, _)) => dom_signature(&html),
        Err(e) => {
            errors.push(format!("dom_before capture failed: {e}"));
            String::new()
        }
    };

    'commands: for command in &batch.commands {
        if cancel.is_cancelled() {
            errors.push("cancelled".to_string());
            break 'commands;
        }

        let result: Result<(), BrowserError> = match command {
            Command::Navigate { url } => driver.navigate(url).await,
            Command::Click { candidate_id } => match selectors_for(ctx, *candidate_id) {
                Some(sels) => {
                    let outcome = try_with_fallback(driver, sels, |selector| DriverVerb::Click { selector }).await;
                    if outcome.is_ok() {
                        used_candidate_id = Some(*candidate_id);
                    }
                    outcome
                }
                None => Err(BrowserError::VerbFailed(format!("candidate_id {candidate_id} not found"))),
            },
            Command::Type { candidate_id, text, press_enter } => match selectors_for(ctx, *candidate_id) {
                Some(sels) => {
                    let text = text.clone();
                    let press_enter = *press_enter;
                    let outcome = try_with_fallback(driver, sels, move |selector| DriverVerb::Type {
                        selector,
                        text: text.clone(),
                        press_enter,
                    })
                    .await;
                    if outcome.is_ok() {
                        used_candidate_id = Some(*candidate_id);
                    }
                    outcome
                }
                None => Err(BrowserError::VerbFailed(format!("candidate_id {candidate_id} not found"))),
            },
            Command::Press { key, candidate_id } => {
                let selector = candidate_id.and_then(|id| selectors_for(ctx, id).and_then(|s| s.first().cloned()));
                if candidate_id.is_some() && selector.is_none() {
                    Err(BrowserError::VerbFailed(format!("candidate_id {:?} not found", candidate_id)))
                } else {
                    let outcome = driver.execute_verb(&DriverVerb::Press { key: key.clone(), selector }).await;
                    if outcome.is_ok() {
                        used_candidate_id = *candidate_id;
                    }
                    outcome
                }
            }
            Command::WaitFor { signature_change, timeout_ms } => {
                if *signature_change {
                    wait_for_signature_change(driver, &dom_before_sig, *timeout_ms).await;
                } else {
                    tokio::time::sleep(Duration::from_millis(*timeout_ms)).await;
                }
                Ok(())
            }
            Command::Noop => Ok(()),
        };

        if let Err(e) = result {
            let is_navigate = command.is_navigate();
            errors.push(e.to_string());
            if is_navigate {
                break 'commands;
            }
        }
    }

    tokio::time::sleep(Duration::from_millis(DEBOUNCE_MS)).await;

    let dom_after_sig = match driver.get_current_dom().await {
        Ok((html, _, _)) => dom_signature(&html),
        Err(e) => {
            errors.push(format!("dom_after capture failed: {e}"));
            dom_before_sig.clone()
        }
    };

    let changed = dom_before_sig != dom_after_sig;
    let success = errors.is_empty() && !batch.commands.is_empty();

    Evidence {
        success,
        dom_before_sig,
        dom_after_sig,
        changed,
        used_candidate_id,
        errors,
        timing_ms: started.elapsed().as_millis() as u64,
        findings: Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeBrowserDriver;
    use lattice_types::Element;

    fn ctx_with_one_candidate(selector: &str) -> PageContext {
        PageContext {
            interactive: vec![Element {
                tag: "button".into(),
                candidate_id: 1,
                selectors: vec![selector.to_string()],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn successful_click_reports_changed_and_success() {
        let mut driver = FakeBrowserDriver::new("<button id=\"go\">Go</button>");
        driver.set_click_effect("#go", "<div>clicked</div>");
        let ctx = ctx_with_one_candidate("#go");
        let batch = CommandBatch { commands: vec![Command::Click { candidate_id: 1 }], ..Default::default() };
        let (_c, mut token) = crate::cancel::Canceller::new();

        let evidence = execute_action_batch(&mut driver, &batch, &ctx, &mut token).await;
        assert!(evidence.success);
        assert!(evidence.changed);
        assert_eq!(evidence.used_candidate_id, Some(1));
        assert!(evidence.errors.is_empty());
    }

    #[tokio::test]
    async fn unresolvable_candidate_id_is_an_error_not_a_panic() {
        let mut driver = FakeBrowserDriver::new("<button id=\"go\">Go</button>");
        let ctx = PageContext::default();
        let batch = CommandBatch { commands: vec![Command::Click { candidate_id: 99 }], ..Default::default() };
        let (_c, mut token) = crate::cancel::Canceller::new();

        let evidence = execute_action_batch(&mut driver, &batch, &ctx, &mut token).await;
        assert!(!evidence.success);
        assert_eq!(evidence.errors.len(), 1);
        assert!(!evidence.changed);
    }

    #[tokio::test]
    async fn failed_navigate_is_terminal() {
        let mut driver = FakeBrowserDriver::new("<a>x</a>");
        driver.fail_next_navigate();
        let ctx = PageContext::default();
        let batch = CommandBatch {
            commands: vec![Command::Navigate { url: "https://x".into() }, Command::Noop],
            ..Default::default()
        };
        let (_c, mut token) = crate::cancel::Canceller::new();

        let evidence = execute_action_batch(&mut driver, &batch, &ctx, &mut token).await;
        assert_eq!(evidence.errors.len(), 1);
        assert!(!evidence.success);
    }

    #[tokio::test]
    async fn no_change_when_commands_have_no_effect() {
        let mut driver = FakeBrowserDriver::new("<div>static</div>");
        let ctx = PageContext::default();
        let batch = CommandBatch { commands: vec![Command::Noop], ..Default::default() };
        let (_c, mut token) = crate::cancel::Canceller::new();

        let evidence = execute_action_batch(&mut driver, &batch, &ctx, &mut token).await;
        assert!(!evidence.changed);
        assert_eq!(evidence.dom_before_sig, evidence.dom_after_sig);
    }
}
