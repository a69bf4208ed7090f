//! Selection-discipline enforcement (spec §4.2 "Selection discipline",
//! enforced by the executor): a planner may not repeat a candidate that
//! just failed without an `override_reason`, and may not pick outside the
//! top-10 by score at all, nor outside the top-5 without justification.

use once_cell::sync::Lazy;
use regex::Regex;

use lattice_types::{Command, CommandBatch, PageContext};

const TOP_STRICT: usize = 5;
const TOP_HARD_CAP: usize = 10;
const RECENT_WINDOW: usize = 3;

static CANDIDATE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"candidate=(\d+)").unwrap());

fn rank_of(ctx: &PageContext, candidate_id: u32) -> Option<usize> {
    ctx.interactive.iter().position(|e| e.candidate_id == candidate_id).map(|idx| idx + 1)
}

fn recently_referenced(ctx: &PageContext, candidate_id: u32) -> bool {
    let start = ctx.recent_events.len().saturating_sub(RECENT_WINDOW);
    ctx.recent_events[start..]
        .iter()
        .any(|line| CANDIDATE_TOKEN.captures_iter(line).any(|c| c[1].parse::<u32>().ok() == Some(candidate_id)))
}

/// A loose proxy for "citing >= 2 concrete signals": a non-trivial,
/// multi-clause justification rather than a one-word excuse.
fn override_reason_is_substantive(reason: &Option<String>) -> bool {
    match reason {
        Some(r) => {
            let trimmed = r.trim();
            !trimmed.is_empty() && trimmed.len() >= 12 && trimmed.split_whitespace().count() >= 3
        }
        None => false,
    }
}

/// Drops (with a diagnostic) any command whose `candidate_id` violates
/// the top-10 hard cap or the top-5/override gate, or that repeats a
/// candidate referenced in the last 3 recent events without a
/// substantive `override_reason`. Falls back to `noop` if nothing
/// survives.
pub fn enforce(mut batch: CommandBatch, ctx: &PageContext) -> (CommandBatch, Vec<String>) {
    let mut violations = Vec::new();
    let override_ok = override_reason_is_substantive(&batch.override_reason);

    batch.commands.retain(|command| {
        let Some(candidate_id) = command.candidate_id() else {
            return true;
        };
        let Some(rank) = rank_of(ctx, candidate_id) else {
            return true;
        };

        if rank > TOP_HARD_CAP {
            violations.push(format!("candidate_id {candidate_id} ranked #{rank}, outside the top-{TOP_HARD_CAP} hard cap"));
            return false;
        }
        if rank > TOP_STRICT && !override_ok {
            violations.push(format!(
                "candidate_id {candidate_id} ranked #{rank}, outside top-{TOP_STRICT} without a substantive override_reason"
            ));
            return false;
        }
        if recently_referenced(ctx, candidate_id) && !override_ok {
            violations.push(format!(
                "candidate_id {candidate_id} was referenced in the last {RECENT_WINDOW} events without an override_reason explaining the retry"
            ));
            return false;
        }
        true
    });

    if batch.commands.is_empty() {
        batch.commands.push(Command::Noop);
    }

    (batch, violations)
}
