use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("no balanced JSON object found in planner reply")]
    NoJsonObject,
    #[error("planner reply failed schema validation: {0}")]
    SchemaInvalid(#[from] serde_json::Error),
}
