use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ConfigError(pub String);

/// Why a single model response produced no rows.
///
/// Always non-fatal: the runner logs it and moves on to the next
/// (target, provider) pair.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("model returned an empty response")]
    EmptyResponse,
    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),
}
