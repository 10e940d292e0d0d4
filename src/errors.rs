use slack_morphism::errors::SlackClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("Failed to parse Slack request: {0}")]
    ParseError(String),

    #[error("Failed to access Slack API: {0}")]
    ApiError(String),

    #[error("Failed to access OpenAI API: {0}")]
    OpenAIError(String),

    #[error("Failed to send HTTP request: {0}")]
    HttpError(String),

    #[error("Failed to persist configuration: {0}")]
    PersistenceError(String),

    #[error("{0}")]
    GeneralError(String),
}

// Transport failures, 5xx replies and rate limits map to `HttpError`; those
// are the only ones worth retrying. Slack `ok: false` replies stay `ApiError`.
impl From<SlackClientError> for BotError {
    fn from(error: SlackClientError) -> Self {
        let transient = match &error {
            SlackClientError::ApiError(e) => TRANSIENT_SLACK_CODES.contains(&e.code.as_str()),
            SlackClientError::HttpError(e) => e.status_code.is_server_error(),
            SlackClientError::HttpProtocolError(_)
            | SlackClientError::EndOfStream(_)
            | SlackClientError::SystemError(_)
            | SlackClientError::RateLimitError(_) => true,
            SlackClientError::ProtocolError(_) | SlackClientError::SocketModeProtocolError(_) => {
                false
            }
        };
        if transient {
            BotError::HttpError(error.to_string())
        } else {
            BotError::ApiError(error.to_string())
        }
    }
}

const TRANSIENT_SLACK_CODES: &[&str] = &[
    "ratelimited",
    "internal_error",
    "fatal_error",
    "service_unavailable",
    "request_timeout",
];

impl BotError {
    /// Whether the same request could succeed if sent again.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, BotError::HttpError(_))
    }
}

impl From<reqwest::Error> for BotError {
    fn from(error: reqwest::Error) -> Self {
        BotError::HttpError(error.to_string())
    }
}

impl From<serde_json::Error> for BotError {
    fn from(error: serde_json::Error) -> Self {
        BotError::ParseError(error.to_string())
    }
}

impl From<std::io::Error> for BotError {
    fn from(error: std::io::Error) -> Self {
        BotError::PersistenceError(error.to_string())
    }
}
