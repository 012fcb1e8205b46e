//! Client error taxonomy
//!
//! Every failure a caller can observe falls into one of four buckets:
//! client-side validation (never reaches the network), transport failure,
//! a server-reported failure with an optional `detail`, or a rejected
//! credential. Rejected credentials get their own variant so the store can
//! route them through its auth-failure policy, but their user-facing text is
//! built exactly like any other server failure.

use serde::Deserialize;
use thiserror::Error;

/// Result type alias for the feed client
pub type Result<T> = std::result::Result<T, ClientError>;

/// Shown when neither the server nor the transport gave anything better
pub const GENERIC_FAILURE: &str = "request failed";

/// Guards evaluated before any network call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("login required")]
    LoginRequired,

    #[error("content required")]
    ContentRequired,

    #[error("title required")]
    TitleRequired,

    #[error("content must be at most {max} characters")]
    ContentTooLong { max: usize },

    #[error("username required")]
    UsernameRequired,

    #[error("password required")]
    PasswordRequired,

    #[error("password must be between {min} and {max} characters")]
    PasswordLength { min: usize, max: usize },

    #[error("token must not be empty")]
    EmptyToken,
}

/// Unified error type for feed client operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// Blocked client-side, no request was sent
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Network or connection failure
    #[error("Request failed: {0}")]
    Transport(String),

    /// 401 from the server
    #[error("Not authenticated: {}", .detail.as_deref().unwrap_or("credential rejected"))]
    Unauthenticated { detail: Option<String> },

    /// Any other non-success status
    #[error("Server error ({status}): {}", .detail.as_deref().unwrap_or(GENERIC_FAILURE))]
    Server { status: u16, detail: Option<String> },

    /// Response body did not match the expected shape
    #[error("Invalid response: {0}")]
    Decode(String),

    /// Token store could not be read or written
    #[error("Token storage error: {0}")]
    Storage(String),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Build the error for a non-success response from its status and body
    pub fn from_response(status: u16, body: &str) -> Self {
        let detail = extract_detail(body);
        if status == 401 {
            Self::Unauthenticated { detail }
        } else {
            Self::Server { status, detail }
        }
    }

    /// Whether the server rejected the credential
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthenticated { .. })
    }

    /// Whether the request was blocked before reaching the network
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// HTTP status reported by the server, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Unauthenticated { .. } => Some(401),
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-provided detail message
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Unauthenticated { detail } | Self::Server { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Text to show the user
    ///
    /// Validation errors show their own message, server failures show the
    /// server's detail verbatim, everything else collapses to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            _ => self.detail().unwrap_or(fallback).to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<Detail>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Detail {
    Message(String),
    Items(Vec<DetailItem>),
}

#[derive(Deserialize)]
struct DetailItem {
    msg: Option<String>,
}

/// Pull `detail` out of an error body
///
/// Accepts `{"detail": "text"}` and the validation shape
/// `{"detail": [{"msg": "text", ...}]}`; the first message wins.
fn extract_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        Detail::Message(message) => Some(message),
        Detail::Items(items) => items.into_iter().find_map(|item| item.msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_detail_is_surfaced_verbatim() {
        let err = ClientError::from_response(400, r#"{"detail":"Username already registered"}"#);
        assert_eq!(err.status_code(), Some(400));
        assert_eq!(err.user_message(GENERIC_FAILURE), "Username already registered");
    }

    #[test]
    fn test_validation_detail_uses_first_message() {
        let body = r#"{"detail":[{"loc":["body","content"],"msg":"String should have at most 500 characters","type":"string_too_long"}]}"#;
        let err = ClientError::from_response(422, body);
        assert_eq!(err.detail(), Some("String should have at most 500 characters"));
    }

    #[test]
    fn test_401_is_distinct_kind() {
        let err = ClientError::from_response(401, r#"{"detail":"Could not validate credentials"}"#);
        assert!(err.is_unauthenticated());
        assert_eq!(err.user_message(GENERIC_FAILURE), "Could not validate credentials");
    }

    #[test]
    fn test_missing_detail_falls_back() {
        let err = ClientError::from_response(500, "Internal Server Error");
        assert_eq!(err.detail(), None);
        assert_eq!(err.user_message("post failed"), "post failed");

        let err = ClientError::Transport("connection refused".into());
        assert_eq!(err.user_message(GENERIC_FAILURE), GENERIC_FAILURE);
    }

    #[test]
    fn test_validation_message() {
        let err: ClientError = ValidationError::ContentRequired.into();
        assert!(err.is_validation());
        assert_eq!(err.user_message(GENERIC_FAILURE), "content required");

        let err: ClientError = ValidationError::PasswordLength { min: 8, max: 72 }.into();
        assert_eq!(err.to_string(), "password must be between 8 and 72 characters");
    }
}
