//! User-facing outcome messages
//!
//! Forms and reaction toggles report their outcome through a [`Notice`].
//! Blocking notices correspond to failures the user has to acknowledge
//! (a rejected like), the rest are transient status lines.

use std::fmt;

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    /// Must be acknowledged before continuing
    pub blocking: bool,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
            blocking: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
            blocking: false,
        }
    }

    pub fn blocking(mut self) -> Self {
        self.blocking = true;
        self
    }

    /// Failure notice for `action`
    ///
    /// Validation errors are shown as-is. Anything else reads
    /// `"<action> failed: <detail>"`, using `fallback` when the server gave
    /// no detail.
    pub fn failure(action: &str, err: &ClientError, fallback: &str) -> Self {
        match err {
            ClientError::Validation(validation) => Self::error(validation.to_string()),
            _ => Self::error(format!("{action} failed: {}", err.user_message(fallback))),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.level {
            NoticeLevel::Success => "ok",
            NoticeLevel::Error => "error",
        };
        if self.blocking {
            write!(f, "[{label}!] {}", self.message)
        } else {
            write!(f, "[{label}] {}", self.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ValidationError, GENERIC_FAILURE};

    #[test]
    fn test_failure_uses_server_detail() {
        let err = ClientError::from_response(400, r#"{"detail":"Post not found"}"#);
        let notice = Notice::failure("like", &err, GENERIC_FAILURE);
        assert!(notice.is_error());
        assert_eq!(notice.message, "like failed: Post not found");
    }

    #[test]
    fn test_failure_falls_back_to_generic() {
        let err = ClientError::Transport("connection reset".into());
        let notice = Notice::failure("comment", &err, GENERIC_FAILURE);
        assert_eq!(notice.message, "comment failed: request failed");
    }

    #[test]
    fn test_validation_shown_verbatim() {
        let err: ClientError = ValidationError::ContentRequired.into();
        let notice = Notice::failure("comment", &err, GENERIC_FAILURE);
        assert_eq!(notice.message, "content required");
    }

    #[test]
    fn test_display() {
        assert_eq!(Notice::success("posted").to_string(), "[ok] posted");
        assert_eq!(
            Notice::error("like failed: request failed").blocking().to_string(),
            "[error!] like failed: request failed"
        );
    }
}
