// ================================================================
// File: tokenrepro-common/src/error.rs
// ================================================================

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Generic code used when an error carries no code of its own.
pub const UNKNOWN_ERROR_CODE: &str = "unknown_error";

/// One entry of the identity platform's `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_message: Option<String>,
}

/// Body shape of a non-2xx response from the identity platform.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Keyring error: {0}")]
    Keyring(String),

    #[error("Sign-in cancelled: {0}")]
    Cancelled(String),

    /// An identity platform API call failed with a status and a structured error list.
    #[error("{message}")]
    Upstream {
        status: u16,
        message: String,
        errors: Vec<ApiErrorDetail>,
    },
}

impl Error {
    /// Builds an `Upstream` error from a raw response body, falling back to a
    /// status-only message when the body is not the platform's error shape.
    pub fn upstream(status: u16, body: &str) -> Self {
        let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed
            .errors
            .first()
            .map(|e| {
                e.long_message
                    .clone()
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| e.message.clone())
            })
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("Request failed with status {}", status));
        Error::Upstream {
            status,
            message,
            errors: parsed.errors,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Upstream { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// First error code of an upstream error. `None` for an empty list.
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::Upstream { errors, .. } => errors.first().map(|e| e.code.as_str()),
            _ => None,
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Parse(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Parse(s.to_string())
    }
}

impl From<chrono::format::ParseError> for Error {
    fn from(err: chrono::format::ParseError) -> Self {
        Error::Parse(err.to_string())
    }
}

impl From<keyring::Error> for Error {
    fn from(err: keyring::Error) -> Self {
        Error::Keyring(err.to_string())
    }
}
