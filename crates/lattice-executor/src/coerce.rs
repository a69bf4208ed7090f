//! Coercion of the tolerant `RawPlannerResponse` schema into a validated
//! `CommandBatch` (spec §4.5 steps 3-5): unknown command types are
//! dropped, `candidate_id`s that don't resolve in the governing
//! `PageContext` are dropped, the auto-append-Enter rule runs, and the
//! batch is capped to 3 commands (P3, P4).

use lattice_prompt::RawPlannerResponse;
use lattice_types::{Command, CommandBatch, PageContext};

use crate::errors::ExecutorError;

const SEARCH_FIELD_HINTS: &[&str] = &["search", "zip", "postal", "query", "location", "address", "city"];
const PII_HINTS: &[&str] = &["card", "cvv", "cvc", "ssn", "password", "routing"];

fn candidate_exists(ctx: &PageContext, candidate_id: u32) -> bool {
    ctx.interactive.iter().any(|e| e.candidate_id == candidate_id)
}

fn looks_like_search_field(ctx: &PageContext, candidate_id: u32) -> bool {
    let Some(el) = ctx.interactive.iter().find(|e| e.candidate_id == candidate_id) else {
        return false;
    };
    let haystack: String = el
        .selectors
        .iter()
        .cloned()
        .chain(el.attrs.get("placeholder").cloned())
        .chain(el.attrs.get("name").cloned())
        .chain(el.attrs.get("aria-label").cloned())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    SEARCH_FIELD_HINTS.iter().any(|h| haystack.contains(h))
}

fn looks_like_pii(text: &str) -> bool {
    let lower = text.to_lowercase();
    text.chars().count() >= 50 || PII_HINTS.iter().any(|h| lower.contains(h))
}

/// Coerces one raw command, dropping it (with a diagnostic) instead of
/// ever panicking or propagating past the batch.
fn coerce_one(raw: &lattice_prompt::RawCommand, ctx: &PageContext, errors: &mut Vec<String>) -> Option<Command> {
    match raw.kind.as_str() {
        "navigate" => match &raw.url {
            Some(url) if !url.is_empty() => Some(Command::Navigate { url: url.clone() }),
            _ => {
                errors.push("navigate command missing url".to_string());
                None
            }
        },
        "click" => match raw.candidate_id {
            Some(id) if candidate_exists(ctx, id) => Some(Command::Click { candidate_id: id }),
            Some(id) => {
                errors.push(ExecutorError::UnresolvedCandidate(id).to_string());
                None
            }
            None => {
                errors.push("click command missing candidate_id".to_string());
                None
            }
        },
        "type" => match raw.candidate_id {
            Some(id) if candidate_exists(ctx, id) => Some(Command::Type {
                candidate_id: id,
                text: raw.text.clone().unwrap_or_default(),
                press_enter: raw.press_enter.unwrap_or(false),
            }),
            Some(id) => {
                errors.push(ExecutorError::UnresolvedCandidate(id).to_string());
                None
            }
            None => {
                errors.push("type command missing candidate_id".to_string());
                None
            }
        },
        "press" => match raw.candidate_id {
            Some(id) if !candidate_exists(ctx, id) => {
                errors.push(ExecutorError::UnresolvedCandidate(id).to_string());
                None
            }
            _ => Some(Command::Press {
                key: raw.key.clone().unwrap_or_else(|| "Enter".to_string()),
                candidate_id: raw.candidate_id,
            }),
        },
        "wait_for" => Some(Command::WaitFor {
            signature_change: true,
            timeout_ms: raw.text.as_deref().and_then(|t| t.parse().ok()).unwrap_or(5_000),
        }),
        "noop" => Some(Command::Noop),
        other => {
            errors.push(ExecutorError::UnknownCommandType(other.to_string()).to_string());
            None
        }
    }
}

/// Applies the auto-append-Enter rule (spec §4.5 step 4): a `type` into a
/// search-like field that didn't already request `press_enter` gets a
/// trailing `Press{Enter}` appended, unless the typed text looks like PII
/// (the field probably isn't a search box after all).
fn apply_auto_enter(commands: Vec<Command>, ctx: &PageContext) -> Vec<Command> {
    let mut out = Vec::with_capacity(commands.len() + 1);
    for command in commands {
        let append_enter = match &command {
            Command::Type { candidate_id, text, press_enter } => {
                !press_enter && !looks_like_pii(text) && looks_like_search_field(ctx, *candidate_id)
            }
            _ => false,
        };
        let candidate_id = command.candidate_id();
        out.push(command);
        if append_enter {
            out.push(Command::Press { key: "Enter".to_string(), candidate_id });
        }
    }
    out
}

/// Coerces a raw planner reply into a capped, validated `CommandBatch`
/// (spec §4.5 steps 3-5). Never fails: an empty or fully-invalid reply
/// degrades to `noop` (spec §7 "command-resolution-error").
pub fn coerce(raw: RawPlannerResponse, ctx: &PageContext) -> (CommandBatch, Vec<String>) {
    let mut errors = Vec::new();
    let commands: Vec<Command> = raw.commands.iter().filter_map(|c| coerce_one(c, ctx, &mut errors)).collect();
    let commands = apply_auto_enter(commands, ctx);

    let mut commands = commands;
    commands.truncate(CommandBatch::MAX_COMMANDS);

    if commands.is_empty() {
        commands.push(Command::Noop);
    }

    let batch = CommandBatch {
        commands,
        confidence: raw.confidence,
        rationale: raw.rationale,
        breadcrumb: raw.breadcrumb,
        override_reason: raw.override_reason,
    };
    (batch, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_prompt::RawCommand;
    use lattice_types::Element;

    fn ctx_with_search_field() -> PageContext {
        PageContext {
            interactive: vec![Element {
                tag: "input".into(),
                candidate_id: 1,
                selectors: vec!["input[name*='zip']".into()],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn unknown_command_type_is_dropped_with_error() {
        let raw = RawPlannerResponse { commands: vec![RawCommand { kind: "scroll".into(), ..Default::default() }], ..Default::default() };
        let (batch, errors) = coerce(raw, &PageContext::default());
        assert_eq!(batch.commands, vec![Command::Noop]);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn unresolved_candidate_id_is_dropped() {
        let raw = RawPlannerResponse {
            commands: vec![RawCommand { kind: "click".into(), candidate_id: Some(42), ..Default::default() }],
            ..Default::default()
        };
        let (batch, errors) = coerce(raw, &PageContext::default());
        assert_eq!(batch.commands, vec![Command::Noop]);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn empty_reply_synthesizes_noop() {
        let raw = RawPlannerResponse::default();
        let (batch, _) = coerce(raw, &PageContext::default());
        assert_eq!(batch.commands, vec![Command::Noop]);
    }

    #[test]
    fn ten_commands_are_capped_to_three() {
        let ctx = PageContext::default();
        let raw = RawPlannerResponse {
            commands: (0..10).map(|_| RawCommand { kind: "noop".into(), ..Default::default() }).collect(),
            ..Default::default()
        };
        let (batch, _) = coerce(raw, &ctx);
        assert_eq!(batch.commands.len(), 3);
    }

    #[test]
    fn auto_append_enter_for_zip_field() {
        let ctx = ctx_with_search_field();
        let raw = RawPlannerResponse {
            commands: vec![RawCommand {
                kind: "type".into(),
                candidate_id: Some(1),
                text: Some("45305".into()),
                press_enter: Some(false),
                ..Default::default()
            }],
            ..Default::default()
        };
        let (batch, _) = coerce(raw, &ctx);
        assert_eq!(batch.commands.len(), 2);
        assert!(matches!(batch.commands[1], Command::Press { ref key, candidate_id: Some(1) } if key == "Enter"));
    }

    #[test]
    fn auto_append_enter_skipped_when_already_set() {
        let ctx = ctx_with_search_field();
        let raw = RawPlannerResponse {
            commands: vec![RawCommand {
                kind: "type".into(),
                candidate_id: Some(1),
                text: Some("45305".into()),
                press_enter: Some(true),
                ..Default::default()
            }],
            ..Default::default()
        };
        let (batch, _) = coerce(raw, &ctx);
        assert_eq!(batch.commands.len(), 1);
    }

    #[test]
    fn auto_append_enter_skipped_for_pii_looking_text() {
        let ctx = ctx_with_search_field();
        let raw = RawPlannerResponse {
            commands: vec![RawCommand {
                kind: "type".into(),
                candidate_id: Some(1),
                text: Some("card number 4111111111111111".into()),
                press_enter: Some(false),
                ..Default::default()
            }],
            ..Default::default()
        };
        let (batch, _) = coerce(raw, &ctx);
        assert_eq!(batch.commands.len(), 1);
    }
}
