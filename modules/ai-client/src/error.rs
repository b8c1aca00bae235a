use thiserror::Error;

/// Failure taxonomy shared by both provider clients.
///
/// `Auth` is never retried; `Transient` covers rate limits, 5xx responses,
/// and connection errors and is eligible for retry.
#[derive(Error, Debug)]
pub enum AiError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("transient service error: {0}")]
    Transient(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl AiError {
    /// Classify an HTTP error status into the retry taxonomy.
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            AiError::Auth(format!("{status}: {body}"))
        } else {
            AiError::Transient(format!("{status}: {body}"))
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AiError::Transient(_))
    }
}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        AiError::Transient(err.to_string())
    }
}
