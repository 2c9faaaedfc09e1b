//! User-facing notifications emitted by the orchestration layer.
//!
//! Action failures and validation problems surface as transient
//! notifications; connectivity is reported separately via connection
//! snapshots and is never a blocking error.

use serde::Serialize;

/// A typed, user-visible notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Notification {
    /// A user action completed.
    Success { message: String },
    /// A user action failed; carries the best-available message.
    Error { message: String },
    /// A local validation problem; the action never reached the network.
    Validation { message: String },
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self::Success {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// The human-readable message, regardless of kind.
    pub fn message(&self) -> &str {
        match self {
            Self::Success { message } | Self::Error { message } | Self::Validation { message } => {
                message
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_is_kind_independent() {
        assert_eq!(Notification::success("ok").message(), "ok");
        assert_eq!(Notification::error("boom").message(), "boom");
        assert_eq!(Notification::validation("empty").message(), "empty");
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_value(Notification::error("boom")).unwrap();
        assert_eq!(json["kind"], "error");
        assert_eq!(json["message"], "boom");
    }
}
