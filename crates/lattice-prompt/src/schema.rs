//! Response schema enforced on the planner's reply (spec §4.2). Kept as a
//! thin, permissive `serde` shape: coercion into the domain `CommandBatch`
//! (candidate-id resolution, top-10/top-5 discipline, command cap) is the
//! Step Executor's job, not this crate's — this is strictly schema, not
//! policy.

use serde::Deserialize;

use crate::errors::PromptError;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawCommand {
    #[serde(rename = "type")]
    pub kind: String,
    pub candidate_id: Option<u32>,
    pub text: Option<String>,
    pub url: Option<String>,
    pub key: Option<String>,
    pub press_enter: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawPlannerResponse {
    pub commands: Vec<RawCommand>,
    pub confidence: f64,
    pub rationale: String,
    pub breadcrumb: String,
    pub override_reason: Option<String>,
}

/// Locates the first balanced `{…}` span in `text` and returns its slice.
/// Tolerates prose before/after the JSON object, markdown code fences, and
/// nested braces inside string literals (a naive brace counter would break
/// on `{"text": "a { b"}`, so quote state is tracked).
pub fn first_balanced_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        let c = b as char;
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Tolerant parse of a planner reply into the raw schema (spec §4.2,
/// §9 "LLM JSON robustness"). Never panics; every failure mode is a
/// `PromptError` the caller is expected to degrade to `noop` on.
pub fn parse_planner_response(raw_reply: &str) -> Result<RawPlannerResponse, PromptError> {
    let object = first_balanced_json_object(raw_reply).ok_or(PromptError::NoJsonObject)?;
    let parsed: RawPlannerResponse = serde_json::from_str(object)?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_object_from_surrounding_prose() {
        let text = "Sure, here you go:\n```json\n{\"commands\": [], \"confidence\": 0.5, \"rationale\": \"r\", \"breadcrumb\": \"b\"}\n```\nhope that helps";
        let obj = first_balanced_json_object(text).unwrap();
        let parsed: RawPlannerResponse = serde_json::from_str(obj).unwrap();
        assert_eq!(parsed.confidence, 0.5);
    }

    #[test]
    fn tolerates_braces_inside_string_literals() {
        let text = r#"{"commands": [{"type": "type", "candidate_id": 3, "text": "a { b } c"}], "confidence": 1, "rationale": "x", "breadcrumb": "y"}"#;
        let parsed = parse_planner_response(text).unwrap();
        assert_eq!(parsed.commands[0].text.as_deref(), Some("a { b } c"));
    }

    #[test]
    fn no_json_object_is_an_error_not_a_panic() {
        let result = parse_planner_response("I cannot help with that.");
        assert!(matches!(result, Err(PromptError::NoJsonObject)));
    }

    #[test]
    fn malformed_json_is_a_schema_error_not_a_panic() {
        let result = parse_planner_response(r#"{"commands": [}"#);
        assert!(result.is_err());
    }

    #[test]
    fn defaults_fill_in_missing_optional_fields() {
        let parsed = parse_planner_response(r#"{"commands": []}"#).unwrap();
        assert_eq!(parsed.confidence, 0.0);
        assert!(parsed.override_reason.is_none());
    }
}
