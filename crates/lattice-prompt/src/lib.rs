#![allow(dead_code)]

//! Prompt Builder / Planner Protocol (spec §4.2, component C2): assembles
//! the deterministic planning prompt and defines the tolerant schema used
//! to parse the planner's JSON reply. Candidate resolution, top-5/top-10
//! override enforcement, and command capping are the Step Executor's job.

mod errors;
mod prompt;
mod schema;

pub use errors::PromptError;
pub use prompt::{build_reasoning_prompt, MAX_CANDIDATES, MAX_SELECTORS_PER_CANDIDATE, SYSTEM_INSTRUCTIONS};
pub use schema::{first_balanced_json_object, parse_planner_response, RawCommand, RawPlannerResponse};
