//! Client error types.

use crate::types::Status;

/// Errors that can occur while talking to the brokerage.
///
/// A response whose result code is not `"0"` is *not* an error: it comes back
/// inside `Ok` with its [`Status`] intact. [`Error::Rejected`] only appears
/// when a caller asks a rejected response for something that requires
/// success, such as the order key of a new order.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(&'static str),

    #[error("no session: login returned {0}")]
    NoSession(Status),

    #[error("session is closed")]
    SessionClosed,

    #[error("session expired on the server: {0}")]
    SessionExpired(String),

    #[error("request refused (p_errno={errno}): {message}")]
    Refused { errno: String, message: String },

    #[error("rejected: {0}")]
    Rejected(Status),

    #[error("malformed response: field `{field}` = {value:?}: {reason}")]
    MalformedResponse {
        field: String,
        value: String,
        reason: String,
    },

    #[error("failed to decode response JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed stream frame: {reason} ({frame:?})")]
    MalformedFrame { reason: String, frame: String },

    #[error("event stream closed by server (p_errno={errno}): {message}")]
    StreamStatus { errno: String, message: String },
}

impl Error {
    pub(crate) fn malformed(field: &str, value: &str, reason: impl Into<String>) -> Self {
        Error::MalformedResponse {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn frame(reason: impl Into<String>, frame: &str) -> Self {
        Error::MalformedFrame {
            reason: reason.into(),
            frame: frame.to_string(),
        }
    }

    /// True for failures that mean the session can no longer be used.
    pub fn is_session_error(&self) -> bool {
        matches!(
            self,
            Error::NoSession(_) | Error::SessionClosed | Error::SessionExpired(_)
        )
    }

    /// True for failures caused by a response that did not match the protocol.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Error::MalformedResponse { .. } | Error::Json(_) | Error::MalformedFrame { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
