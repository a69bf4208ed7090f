//! Command-batch safety classification (spec §4.3 `classify`).

use lattice_types::{Command, CommandBatch, PageContext};

use crate::config::PolicyConfig;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RunMode {
    /// No human is watching; a `Confirm` verdict degrades to a policy
    /// default rather than blocking on a callback that will never answer.
    Autonomous,
    /// A human (or an injected confirmation callback) can be consulted.
    Interactive,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PolicyVerdict {
    Auto,
    Confirm,
    Deny,
}

#[derive(Clone, Debug)]
pub struct PolicyDecision {
    pub verdict: PolicyVerdict,
    pub reasons: Vec<String>,
}

impl PolicyDecision {
    pub fn is_auto(&self) -> bool {
        self.verdict == PolicyVerdict::Auto
    }
}

fn host_of(url_str: &str) -> Option<String> {
    url::Url::parse(url_str).ok().and_then(|u| u.host_str().map(str::to_string))
}

fn host_is_approved(host: &str, cfg: &PolicyConfig) -> bool {
    if cfg.approved_hosts.is_empty() {
        return true;
    }
    cfg.approved_hosts.iter().any(|h| host == h || host.ends_with(&format!(".{h}")))
}

/// `classify(batch, ctx, mode, confidence) -> {auto, confirm, deny, reasons}`
/// (spec §4.3). Default policy: `deny` for obviously destructive or
/// out-of-scope navigations; `confirm` once reasons accumulate past
/// `cfg.confirm_reason_threshold`; `auto` otherwise.
pub fn classify(batch: &CommandBatch, ctx: &PageContext, mode: RunMode, confidence: f64, cfg: &PolicyConfig) -> PolicyDecision {
    let mut reasons = Vec::new();
    let mut hard_deny = false;

    for command in &batch.commands {
        match command {
            Command::Navigate { url } => {
                let url_lower = url.to_lowercase();
                if let Some(host) = host_of(url) {
                    if !host_is_approved(&host, cfg) {
                        reasons.push(format!("navigation target outside approved host set: {host}"));
                    }
                } else {
                    reasons.push(format!("navigation url could not be parsed: {url}"));
                }
                for kw in &cfg.sensitive_domain_keywords {
                    if url_lower.contains(kw.as_str()) {
                        reasons.push(format!("navigation targets a sensitive domain pattern: {kw}"));
                    }
                }
                for kw in &cfg.destructive_keywords {
                    if url_lower.contains(kw.as_str()) {
                        reasons.push(format!("navigation url matches a destructive action pattern: {kw}"));
                        hard_deny = true;
                    }
                }
            }
            Command::Type { text, .. } => {
                let text_lower = text.to_lowercase();
                for kw in &cfg.sensitive_text_keywords {
                    if text_lower.contains(kw.as_str()) {
                        reasons.push(format!("typed text matches a sensitive pattern: {kw}"));
                    }
                }
            }
            Command::Click { .. } | Command::Press { .. } | Command::WaitFor { .. } | Command::Noop => {}
        }
    }

    let url_lower = ctx.url.to_lowercase();
    for kw in &cfg.sensitive_domain_keywords {
        if url_lower.contains(kw.as_str()) && batch.commands.iter().any(|c| matches!(c, Command::Type { .. } | Command::Click { .. })) {
            reasons.push(format!("current page is a sensitive domain: {kw}"));
        }
    }

    if mode == RunMode::Autonomous && confidence < cfg.low_confidence_threshold {
        reasons.push(format!("low planner confidence ({confidence:.2}) while running autonomously"));
    }

    reasons.dedup();

    let verdict = if hard_deny {
        PolicyVerdict::Deny
    } else if reasons.len() >= cfg.confirm_reason_threshold {
        PolicyVerdict::Confirm
    } else {
        PolicyVerdict::Auto
    };

    PolicyDecision { verdict, reasons }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_types::Command;

    fn ctx() -> PageContext {
        PageContext { url: "https://example.com/menu".into(), ..Default::default() }
    }

    #[test]
    fn benign_click_is_auto() {
        let batch = CommandBatch { commands: vec![Command::Click { candidate_id: 1 }], ..Default::default() };
        let cfg = PolicyConfig::default();
        let decision = classify(&batch, &ctx(), RunMode::Autonomous, 0.9, &cfg);
        assert!(decision.is_auto());
        assert!(decision.reasons.is_empty());
    }

    #[test]
    fn navigation_outside_approved_hosts_confirms_with_four_reasons() {
        let mut cfg = PolicyConfig::default();
        cfg.approved_hosts = vec!["example.com".into()];
        let batch = CommandBatch {
            commands: vec![Command::Navigate { url: "https://totally-different.example.net/checkout/payment/login".into() }],
            ..Default::default()
        };
        let decision = classify(&batch, &ctx(), RunMode::Autonomous, 0.5, &cfg);
        assert_eq!(decision.verdict, PolicyVerdict::Confirm);
        assert_eq!(decision.reasons.len(), 4);
    }

    #[test]
    fn destructive_keyword_is_a_hard_deny() {
        let cfg = PolicyConfig::default();
        let batch = CommandBatch {
            commands: vec![Command::Navigate { url: "https://example.com/account/delete-account".into() }],
            ..Default::default()
        };
        let decision = classify(&batch, &ctx(), RunMode::Interactive, 1.0, &cfg);
        assert_eq!(decision.verdict, PolicyVerdict::Deny);
    }

    #[test]
    fn sensitive_typed_text_is_flagged() {
        let cfg = PolicyConfig::default();
        let batch = CommandBatch {
            commands: vec![Command::Type { candidate_id: 2, text: "CVV 123".into(), press_enter: false }],
            ..Default::default()
        };
        let decision = classify(&batch, &ctx(), RunMode::Autonomous, 0.9, &cfg);
        assert!(decision.reasons.iter().any(|r| r.contains("sensitive pattern")));
    }

    #[test]
    fn low_confidence_only_counts_in_autonomous_mode() {
        let cfg = PolicyConfig::default();
        let batch = CommandBatch { commands: vec![Command::Click { candidate_id: 1 }], ..Default::default() };
        let autonomous = classify(&batch, &ctx(), RunMode::Autonomous, 0.1, &cfg);
        let interactive = classify(&batch, &ctx(), RunMode::Interactive, 0.1, &cfg);
        assert_eq!(autonomous.reasons.len(), 1);
        assert!(interactive.reasons.is_empty());
    }
}
