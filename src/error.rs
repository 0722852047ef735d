use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

pub type Result<T> = std::result::Result<T, Error>;

/// Every way a vowel request can fail.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or unknown `X-API-KEY`.
    #[error("invalid API key")]
    Auth,

    /// Parameters could not be coerced into a vowel grid.
    #[error("invalid parameter '{name}': {message}")]
    Validation { name: String, message: String },

    /// The synthesizer rejected the grid or failed while rendering it.
    #[error("synthesis failed: {0}")]
    Synthesis(String),

    /// The rendered samples could not be packed into a WAV file.
    #[error("encoding failed: {0}")]
    Encoding(String),

    /// Startup configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn validation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::Auth => StatusCode::UNAUTHORIZED,
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::Synthesis(_) | Error::Encoding(_) | Error::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The message sent back to the client. Details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            Error::Auth => "Invalid API key.",
            Error::Validation { .. } => "Error when processing query parameters.",
            Error::Synthesis(_) | Error::Encoding(_) | Error::Config(_) => {
                "Error when processing Praat objects."
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            error!("request failed: {self}");
        } else {
            warn!("request rejected: {self}");
        }
        let body = ErrorBody {
            error: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_class() {
        assert_eq!(Error::Auth.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            Error::validation("f1", "not a number").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Synthesis("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::Encoding("silent".into()).public_message(),
            Error::Synthesis("boom".into()).public_message()
        );
    }

    #[test]
    fn display_keeps_details() {
        let err = Error::validation("duration", "expected a number, got \"long\"");
        assert_eq!(
            err.to_string(),
            "invalid parameter 'duration': expected a number, got \"long\""
        );
    }
}
