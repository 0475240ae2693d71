//! Typed errors for calls against the hosted backend.
//!
//! Every failure coming back from the REST tables, edge functions or the
//! transport itself is folded into a small closed set of kinds so callers can
//! match on what happened instead of digging through untyped payloads.

use serde::Deserialize;
use thiserror::Error;

/// Closed set of backend failure kinds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Transport failure: connection refused, DNS, timeout, broken body
    #[error("network error: {0}")]
    Network(String),

    /// Missing or invalid credentials, or a row-level security rejection
    #[error("permission denied: {0}")]
    Permission(String),

    /// The row, table or function does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The request was rejected because of its content
    #[error("validation failed: {0}")]
    Validation(String),

    /// Anything else, including server errors and malformed payloads
    #[error("backend error{}: {message}", status_suffix(.status))]
    Unknown { status: Option<u16>, message: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

/// Error payload shape shared by the REST layer, the auth layer and edge functions.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    error_description: Option<String>,
}

impl ErrorBody {
    fn code(&self) -> Option<String> {
        match &self.code {
            Some(serde_json::Value::String(code)) => Some(code.clone()),
            Some(serde_json::Value::Number(code)) => Some(code.to_string()),
            _ => None,
        }
    }

    fn message(&self) -> Option<String> {
        self.message
            .clone()
            .or_else(|| self.error_description.clone())
            .or_else(|| self.msg.clone())
            .or_else(|| match &self.error {
                Some(serde_json::Value::String(error)) => Some(error.clone()),
                Some(other) => other
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string),
                None => None,
            })
    }
}

impl BackendError {
    /// Map a backend error code to a kind.
    ///
    /// Covers the REST layer's own `PGRST` codes and the SQLSTATE codes the
    /// database surfaces through it. Returns `None` for codes with no
    /// specific meaning, so the caller can fall back to the HTTP status.
    pub fn from_code(code: &str, message: impl Into<String>) -> Option<Self> {
        let message = message.into();
        match code {
            // Single-row request matched zero rows
            "PGRST116" => Some(Self::NotFound(message)),
            // Unknown table / relation
            "PGRST205" | "42P01" | "42883" => Some(Self::NotFound(message)),
            // JWT missing, expired or rejected
            "PGRST301" | "PGRST302" | "PGRST303" => Some(Self::Permission(message)),
            // insufficient_privilege (row-level security)
            "42501" => Some(Self::Permission(message)),
            // Unparsable query string or request body
            "PGRST100" | "PGRST102" | "PGRST204" => Some(Self::Validation(message)),
            // Integrity constraint violations and data exceptions
            c if c.len() == 5 && (c.starts_with("23") || c.starts_with("22")) => {
                Some(Self::Validation(message))
            }
            _ => None,
        }
    }

    /// Map an HTTP status alone to a kind.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::Permission(message),
            404 | 406 => Self::NotFound(message),
            400 | 409 | 422 => Self::Validation(message),
            _ => Self::Unknown {
                status: Some(status),
                message,
            },
        }
    }

    /// Build an error from a non-success response.
    ///
    /// The error code in the body wins over the status; the body's message
    /// is used when present, otherwise the raw body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed
            .message()
            .unwrap_or_else(|| body.trim().to_string());

        if let Some(code) = parsed.code() {
            if let Some(err) = Self::from_code(&code, message.clone()) {
                return err;
            }
        }

        Self::from_status(status, message)
    }

    /// Build the error used when a success response does not have the expected shape.
    pub fn malformed(status: Option<u16>, detail: impl std::fmt::Display) -> Self {
        Self::Unknown {
            status,
            message: format!("malformed response: {}", detail),
        }
    }

    /// Whether repeating the same request might succeed.
    ///
    /// Network failures, rate limiting and server-side errors are transient;
    /// permission, not-found and validation failures are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Unknown {
                status: Some(status),
                ..
            } => *status == 429 || *status >= 500,
            Self::Unknown { status: None, .. } => false,
            Self::Permission(_) | Self::NotFound(_) | Self::Validation(_) => false,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::malformed(err.status().map(|s| s.as_u16()), err);
        }
        match err.status() {
            Some(status) => Self::from_status(status.as_u16(), err.to_string()),
            None => Self::Network(err.to_string()),
        }
    }
}
