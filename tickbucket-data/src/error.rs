use crate::subscription::trade::Cursor;
use reqwest::StatusCode;
use thiserror::Error;

/// All errors generated in `tickbucket-data`.
///
/// HTTP status failures are mapped into dedicated variants before any response body is
/// parsed, so a rate limited request is always reported as [`DataError::RateLimited`] even if
/// the exchange returns a malformed body alongside it.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum DataError {
    #[error("requested endpoint not found (404)")]
    NotFound,

    #[error("malformed request (400)")]
    BadRequest,

    #[error("unauthorized (401)")]
    Unauthorized,

    #[error("forbidden (403)")]
    Forbidden,

    #[error("rate limit reached for the endpoint (429)")]
    RateLimited,

    #[error("service unavailable, global rate limit reached (503)")]
    ServiceUnavailable,

    #[error("internal server error ({status})")]
    InternalServer { status: u16 },

    #[error("failed to decode trade data: {0}")]
    Decode(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("Kraken API error: {0}")]
    Api(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DataError {
    /// Map a non-success HTTP [`StatusCode`] to a [`DataError`].
    ///
    /// Returns `None` for statuses below 400, which carry a body worth parsing.
    pub fn from_status(status: StatusCode) -> Option<Self> {
        let error = match status.as_u16() {
            code if code < 400 => return None,
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            503 => Self::ServiceUnavailable,
            code => Self::InternalServer { status: code },
        };

        Some(error)
    }

    /// Determines if the [`DataError`] was caused by the exchange throttling requests.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited | Self::ServiceUnavailable)
    }
}

impl From<reqwest::Error> for DataError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.to_string())
    }
}

impl From<serde_json::Error> for DataError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error.to_string())
    }
}

/// [`DataError`] that aborted a trade polling session, along with the [`Cursor`] that was in
/// flight when it occurred.
///
/// Callers that need to resume should persist the cursor of the last *emitted* cluster rather
/// than this one, since the open cluster of an aborted session is discarded.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("trade polling aborted at cursor {cursor}: {error}")]
pub struct PollError {
    pub cursor: Cursor,
    #[source]
    pub error: DataError,
}
