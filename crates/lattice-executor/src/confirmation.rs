//! Injected human-in-the-loop hook (spec §4.3/§4.5 step 6): when the
//! safety policy returns `Confirm`, the executor asks whoever is watching.
//! In non-interactive runs no callback is supplied and the step pauses.

use async_trait::async_trait;

/// Everything a confirmation callback needs to decide, beyond the risk
/// `reasons` list itself (spec §4.3 "an injected confirmation callback").
#[derive(Clone, Debug)]
pub struct ConfirmSummary {
    pub rationale: String,
    pub confidence: f64,
    pub command_count: usize,
}

#[async_trait]
pub trait ConfirmationCallback: Send + Sync {
    /// Returns `true` if the batch is approved to run despite the listed
    /// risk reasons.
    async fn confirm(&self, reasons: &[String], summary: &ConfirmSummary) -> bool;
}

/// Always denies. The safe default for autonomous runs with no attached
/// human.
pub struct AlwaysDeny;

#[async_trait]
impl ConfirmationCallback for AlwaysDeny {
    async fn confirm(&self, _reasons: &[String], _summary: &ConfirmSummary) -> bool {
        false
    }
}

/// Non-interactive policy default for autonomous runs (spec §4.3: "deny
/// high-risk, allow low-risk"): approves a batch that accumulated at most
/// one risk reason, denies anything riskier.
pub struct AlwaysAllowLowRisk;

#[async_trait]
impl ConfirmationCallback for AlwaysAllowLowRisk {
    async fn confirm(&self, reasons: &[String], _summary: &ConfirmSummary) -> bool {
        reasons.len() <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> ConfirmSummary {
        ConfirmSummary { rationale: "r".into(), confidence: 0.9, command_count: 1 }
    }

    #[tokio::test]
    async fn always_deny_denies_even_with_no_reasons() {
        assert!(!AlwaysDeny.confirm(&[], &summary()).await);
    }

    #[tokio::test]
    async fn always_allow_low_risk_allows_a_single_reason() {
        assert!(AlwaysAllowLowRisk.confirm(&["one reason".to_string()], &summary()).await);
    }

    #[tokio::test]
    async fn always_allow_low_risk_denies_multiple_reasons() {
        assert!(!AlwaysAllowLowRisk.confirm(&["a".to_string(), "b".to_string()], &summary()).await);
    }
}
