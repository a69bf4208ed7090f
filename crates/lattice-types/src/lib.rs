#![allow(dead_code)]

//! Shared data model for the lattice web agent: the `Element`, `PageContext`,
//! `Command`/`CommandBatch`, `Evidence`, `StepOutcome`, `LatticeEvent`,
//! `Task` and `Lattice` types that every other crate in the workspace
//! builds on. Kept dependency-light and free of async/IO so it can sit at
//! the bottom of the dependency graph.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

#[cfg(feature = "serde-full")]
use serde::{Deserialize, Serialize};

macro_rules! serde_derive {
    () => {
        #[cfg_attr(feature = "serde-full", derive(Serialize, Deserialize))]
    };
}

/// Shallow error type shared by the core crates; each crate defines its own
/// richer `thiserror` enum and converts into/out of this where it crosses a
/// module boundary that doesn't need the detail.
#[derive(Debug, Error, Clone)]
pub enum LatticeTypeError {
    #[error("{0}")]
    Message(String),
}

impl LatticeTypeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

serde_derive!();
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

serde_derive!();
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One interactive candidate on a page. See spec §3.
serde_derive!();
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
    pub tag: String,
    pub text: String,
    pub attrs: std::collections::BTreeMap<String, String>,
    /// Ordered, most-unique-first, length <= 5, `selectors[0]` non-empty
    /// whenever the element is non-degenerate.
    pub selectors: Vec<String>,
    pub score: f64,
    /// Assigned immediately before prompt emission; unique within a
    /// PageContext.
    pub candidate_id: u32,
}

pub const ELEMENT_TEXT_MAX_CHARS: usize = 80;

impl Element {
    pub fn truncated_text(&self) -> String {
        truncate_chars(&self.text, ELEMENT_TEXT_MAX_CHARS)
    }
}

pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}

/// Domain-agnostic rule for arbitrating logical success of a planned step,
/// threaded through the plan instead of hard-coded in the coordinator
/// (SPEC_FULL §0.7).
serde_derive!();
#[derive(Clone, Debug, PartialEq, Default)]
pub enum VerificationRule {
    /// No independent verification; defer entirely to driver-level success.
    #[default]
    None,
    /// The post-step URL must match one of these substrings.
    UrlPattern(Vec<String>),
    /// `Evidence.findings` must contain this key with a truthy JSON value.
    FindingFlag(String),
    /// The DOM signature must differ before/after the step.
    DomChanged,
}

serde_derive!();
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StepKind {
    Action,
    Observation,
}

/// One entry in the coordinator's plan: a natural-language sub-goal plus its
/// classification and (optional) verification rule.
serde_derive!();
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedStep {
    pub step_number: u32,
    pub description: String,
    pub kind: StepKind,
    pub verification: VerificationRule,
}

/// One observation of the browser state. See spec §3.
serde_derive!();
#[derive(Clone, Debug, Default)]
pub struct PageContext {
    pub url: String,
    pub title: String,
    /// 16-hex-char hash of the compressed DOM.
    pub signature: String,
    /// Pruned structural HTML: interactive nodes + up to 3 ancestor
    /// generations, everything else unwrapped.
    pub skeleton: String,
    /// Compressed but not pruned.
    pub raw_dom: String,
    /// Ranked (descending by score), length bounded.
    pub interactive: Vec<Element>,

    pub step_number: u32,
    pub total_steps: u32,
    pub overall_goal: String,
    pub current_step_goal: String,

    pub recent_events: Vec<String>,
    pub previous_signature: Option<String>,
    pub lattice_state: Option<LatticeStateBrief>,
    pub breadcrumbs: Vec<String>,
}

serde_derive!();
#[derive(Clone, Debug, Default)]
pub struct LatticeStateBrief {
    pub planned_steps: Vec<String>,
    pub current_index: usize,
    pub accumulated_patterns: Vec<String>,
}

/// One atomic browser verb. A command references elements *only* by
/// `candidate_id`, never by raw selector supplied by the planner
/// (hallucination-proof discipline, spec §3/§9).
serde_derive!();
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Navigate { url: String },
    Click { candidate_id: u32 },
    Type { candidate_id: u32, text: String, press_enter: bool },
    Press { key: String, candidate_id: Option<u32> },
    WaitFor { signature_change: bool, timeout_ms: u64 },
    Noop,
}

impl Command {
    pub fn candidate_id(&self) -> Option<u32> {
        match self {
            Command::Click { candidate_id } => Some(*candidate_id),
            Command::Type { candidate_id, .. } => Some(*candidate_id),
            Command::Press { candidate_id, .. } => *candidate_id,
            _ => None,
        }
    }

    pub fn is_navigate(&self) -> bool {
        matches!(self, Command::Navigate { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Command::Navigate { .. } => "navigate",
            Command::Click { .. } => "click",
            Command::Type { .. } => "type",
            Command::Press { .. } => "press",
            Command::WaitFor { .. } => "wait_for",
            Command::Noop => "noop",
        }
    }
}

/// 1-3 commands plus planner metadata. See spec §3.
serde_derive!();
#[derive(Clone, Debug, Default)]
pub struct CommandBatch {
    pub commands: Vec<Command>,
    pub confidence: f64,
    pub rationale: String,
    pub breadcrumb: String,
    pub override_reason: Option<String>,
}

impl CommandBatch {
    pub fn noop(rationale: impl Into<String>) -> Self {
        Self {
            commands: vec![Command::Noop],
            confidence: 0.0,
            rationale: rationale.into(),
            breadcrumb: String::new(),
            override_reason: None,
        }
    }

    pub const MAX_COMMANDS: usize = 3;
}

/// Outcome of executing a batch. See spec §3.
serde_derive!();
#[derive(Clone, Debug, Default)]
pub struct Evidence {
    pub success: bool,
    pub dom_before_sig: String,
    pub dom_after_sig: String,
    pub changed: bool,
    pub used_candidate_id: Option<u32>,
    pub errors: Vec<String>,
    pub timing_ms: u64,
    pub findings: std::collections::BTreeMap<String, serde_json::Value>,
}

impl Evidence {
    pub fn empty_with_pause_reasons(reasons: Vec<String>) -> Self {
        let mut findings = std::collections::BTreeMap::new();
        findings.insert(
            "pause_reasons".to_string(),
            serde_json::Value::Array(reasons.into_iter().map(serde_json::Value::String).collect()),
        );
        Self {
            success: false,
            dom_before_sig: String::new(),
            dom_after_sig: String::new(),
            changed: false,
            used_candidate_id: None,
            errors: Vec::new(),
            timing_ms: 0,
            findings,
        }
    }
}

serde_derive!();
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LogicalSuccess {
    True,
    False,
    Unknown,
}

/// `{CommandBatch, Evidence, confidence, rationale, breadcrumb,
/// logical_success}`. See spec §3.
serde_derive!();
#[derive(Clone, Debug)]
pub struct StepOutcome {
    pub batch: CommandBatch,
    pub evidence: Evidence,
    pub confidence: f64,
    pub rationale: String,
    pub breadcrumb: String,
    pub logical_success: LogicalSuccess,
}

serde_derive!();
#[derive(Clone, Debug)]
pub enum LatticeEventType {
    UserRequest,
    PlanGenerated,
    WebStepCompleted,
    WebDecision,
    TaskCompleted,
    Error,
}

/// Immutable append record. See spec §3.
serde_derive!();
#[derive(Clone, Debug)]
pub struct LatticeEvent {
    pub event_type: LatticeEventType,
    /// Serializes as RFC 3339 (ISO-8601) per spec §6, not a unix epoch.
    #[cfg(feature = "serde-full")]
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[cfg(not(feature = "serde-full"))]
    pub timestamp: u64,
    pub payload: serde_json::Value,
}

serde_derive!();
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompletedStepStatus {
    InProgress,
    Completed,
}

serde_derive!();
#[derive(Clone, Debug)]
pub struct CompletedStep {
    pub step_number: u32,
    pub description: String,
    pub user_input: Option<String>,
    pub result: serde_json::Value,
    pub status: CompletedStepStatus,
}

serde_derive!();
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TaskStatus {
    Active,
    Completed,
    Abandoned,
}

/// `{task_id, query, task_plan, completed_steps, status, domain}`. See spec
/// §3. At most one `Task` in a `Lattice` may be `Active` (P6).
serde_derive!();
#[derive(Clone, Debug)]
pub struct Task {
    pub task_id: TaskId,
    pub query: String,
    pub task_plan: Vec<String>,
    pub completed_steps: Vec<CompletedStep>,
    pub status: TaskStatus,
    pub domain: Option<String>,
}

impl Task {
    pub fn new(query: impl Into<String>, task_plan: Vec<String>) -> Self {
        Self {
            task_id: TaskId::new(),
            query: query.into(),
            task_plan,
            completed_steps: Vec::new(),
            status: TaskStatus::Active,
            domain: None,
        }
    }

    pub fn progress(&self) -> (usize, usize) {
        (self.completed_steps.len(), self.task_plan.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_text_truncation_is_char_bounded() {
        let el = Element {
            text: "x".repeat(200),
            ..Default::default()
        };
        assert_eq!(el.truncated_text().chars().count(), ELEMENT_TEXT_MAX_CHARS);
    }

    #[test]
    fn command_candidate_id_extraction() {
        assert_eq!(Command::Click { candidate_id: 7 }.candidate_id(), Some(7));
        assert_eq!(Command::Noop.candidate_id(), None);
        assert!(Command::Navigate { url: "https://x".into() }.is_navigate());
    }

    #[test]
    fn single_active_task_invariant_is_caller_enforced() {
        let t = Task::new("goal", vec!["a".into(), "b".into()]);
        assert_eq!(t.status, TaskStatus::Active);
        assert_eq!(t.progress(), (0, 2));
    }
}
