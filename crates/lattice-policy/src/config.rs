//! Thresholds and host/keyword sets governing classification (SPEC_FULL
//! §0.7): the source's heuristics were ad-hoc and under-specified, so here
//! they are configuration rather than hard-coded constants.

#[derive(Clone, Debug)]
pub struct PolicyConfig {
    /// Hosts (exact or suffix match) a `navigate` may target without being
    /// flagged as a risk. Empty means "don't restrict navigation by host".
    pub approved_hosts: Vec<String>,
    /// Number of accumulated risk reasons at which the verdict becomes
    /// `Confirm` instead of `Auto`.
    pub confirm_reason_threshold: usize,
    /// Keywords that, found in typed text, flag a payment/PII risk reason.
    pub sensitive_text_keywords: Vec<String>,
    /// Keywords that, found in a navigation URL path/host, flag a
    /// sensitive-domain risk reason.
    pub sensitive_domain_keywords: Vec<String>,
    /// Hard-deny: any of these present forces `Deny` regardless of reason
    /// count (e.g. known destructive account actions).
    pub destructive_keywords: Vec<String>,
    /// Below this, planner confidence itself counts as a risk reason when
    /// running autonomously (no human present to catch a bad guess).
    pub low_confidence_threshold: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            approved_hosts: Vec::new(),
            confirm_reason_threshold: 3,
            sensitive_text_keywords: vec![
                "card number".into(),
                "cvv".into(),
                "cvc".into(),
                "ssn".into(),
                "social security".into(),
                "password".into(),
                "routing number".into(),
            ],
            sensitive_domain_keywords: vec![
                "checkout".into(),
                "payment".into(),
                "billing".into(),
                "account/delete".into(),
                "login".into(),
            ],
            destructive_keywords: vec![
                "delete-account".into(),
                "delete_account".into(),
                "close-account".into(),
                "wire-transfer".into(),
            ],
            low_confidence_threshold: 0.4,
        }
    }
}
